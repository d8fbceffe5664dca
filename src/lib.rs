pub mod artifact;
pub mod classify;
pub mod config;
pub mod executor;
pub mod observability;
pub mod pipeline;
pub mod report;
pub mod stages;
pub mod validation;

pub use config::HarnessConfig;
pub use executor::{CommandExecutor, CommandOutput, CommandSpec, SystemExecutor};
pub use pipeline::{PipelineRunner, StageResult, StageStatus};
pub use report::{Outcome, PipelineReport};
