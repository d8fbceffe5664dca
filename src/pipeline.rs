use std::fmt;
use std::path::PathBuf;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::artifact::{ArtifactDescriptor, ArtifactKind};
use crate::classify::Classification;
use crate::config::HarnessConfig;
use crate::executor::{CommandExecutor, CommandOutput, CommandSpec};
use crate::report::{Glyph, PipelineReport, ReportLine};
use crate::stages;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Success,
    Failure,
    Skipped,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportSection {
    Compilation,
    Bindings,
}

impl ReportSection {
    pub fn number(self) -> usize {
        match self {
            Self::Compilation => 1,
            Self::Bindings => 2,
        }
    }

    pub fn heading(self) -> &'static str {
        match self {
            Self::Compilation => "Testing Rust compilation...",
            Self::Bindings => "Testing wasm-bindgen...",
        }
    }
}

#[derive(Debug, Error)]
pub enum StageError {
    #[error("{}", command_detail(.program, .exit_code, .output))]
    Command {
        program: String,
        exit_code: i32,
        output: String,
        cause: Option<Classification>,
    },
    #[error("not found: {}", .path.display())]
    MissingArtifact { path: PathBuf, kind: ArtifactKind },
    #[error("failed to inspect {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StageError {
    pub fn command(spec: &CommandSpec, output: CommandOutput, cause: Option<Classification>) -> Self {
        Self::Command {
            program: spec.program.clone(),
            exit_code: output.exit_code,
            output: output.output,
            cause,
        }
    }

    pub fn cause(&self) -> Option<&Classification> {
        match self {
            Self::Command { cause, .. } => cause.as_ref(),
            _ => None,
        }
    }
}

fn command_detail(program: &str, exit_code: &i32, output: &str) -> String {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        format!("'{program}' exited with status {exit_code}")
    } else {
        trimmed.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precondition {
    Ready,
    Skip(String),
}

/// Ready only when `dependency` succeeded. A failed dependency skips with
/// `on_failure`; a skipped dependency passes its own skip reason along.
pub fn require_success(prior: &[StageResult], dependency: &str, on_failure: &str) -> Precondition {
    match prior.iter().find(|result| result.stage == dependency) {
        Some(result) => match result.status {
            StageStatus::Success => Precondition::Ready,
            StageStatus::Failure => Precondition::Skip(on_failure.to_string()),
            StageStatus::Skipped => Precondition::Skip(result.detail.clone()),
        },
        None => Precondition::Skip(format!("stage '{dependency}' has not run")),
    }
}

#[derive(Debug, Clone, Default)]
pub struct StageOutcome {
    pub detail: String,
    pub lines: Vec<ReportLine>,
    pub artifact: Option<ArtifactDescriptor>,
}

impl StageOutcome {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
            ..Self::default()
        }
    }

    pub fn line(mut self, glyph: Glyph, text: impl Into<String>) -> Self {
        self.lines.push(ReportLine::new(glyph, text));
        self
    }

    pub fn with_artifact(mut self, artifact: ArtifactDescriptor) -> Self {
        self.artifact = Some(artifact);
        self
    }
}

pub struct PipelineContext<'a> {
    pub config: &'a HarnessConfig,
    pub executor: &'a dyn CommandExecutor,
    pub artifact: Option<ArtifactDescriptor>,
}

pub trait Stage {
    fn name(&self) -> &'static str;
    fn label(&self) -> &'static str;
    fn section(&self) -> ReportSection;
    fn precondition(&self, prior: &[StageResult]) -> Precondition;

    /// Lines printed ahead of the stage's own result whenever it runs,
    /// whether it then succeeds or fails.
    fn preamble(&self, _config: &HarnessConfig) -> Vec<ReportLine> {
        Vec::new()
    }

    fn run(&self, ctx: &mut PipelineContext<'_>) -> Result<StageOutcome, StageError>;
}

#[derive(Debug, Clone, Serialize)]
pub struct StageResult {
    pub stage: String,
    pub label: String,
    pub section: ReportSection,
    pub status: StageStatus,
    pub detail: String,
    pub cause: Option<Classification>,
    pub artifact: Option<ArtifactDescriptor>,
    pub duration_ms: f64,
    #[serde(skip)]
    pub lines: Vec<ReportLine>,
}

impl StageResult {
    pub fn success(stage: &dyn Stage, outcome: StageOutcome) -> Self {
        let mut lines = outcome.lines;
        if lines.is_empty() {
            lines.push(ReportLine::new(
                Glyph::Success,
                format!("{}: SUCCESS", stage.label()),
            ));
        }
        Self {
            stage: stage.name().to_string(),
            label: stage.label().to_string(),
            section: stage.section(),
            status: StageStatus::Success,
            detail: outcome.detail,
            cause: None,
            artifact: outcome.artifact,
            duration_ms: 0.0,
            lines,
        }
    }

    pub fn failure(stage: &dyn Stage, error: StageError) -> Self {
        let detail = error.to_string();
        let cause = error.cause().cloned();

        let mut lines = vec![ReportLine::new(
            Glyph::Failure,
            format!("{}: FAILED", stage.label()),
        )];
        for (idx, text) in detail.lines().enumerate() {
            let text = if idx == 0 {
                format!("Error: {text}")
            } else {
                format!("       {text}")
            };
            lines.push(ReportLine::new(Glyph::Plain, text));
        }
        if let Some(cause) = &cause {
            lines.extend(
                cause
                    .notes
                    .iter()
                    .map(|note| ReportLine::new(Glyph::Note, note.clone())),
            );
        }

        let artifact = match error {
            StageError::MissingArtifact { path, kind } => Some(ArtifactDescriptor {
                path,
                kind,
                metadata: None,
            }),
            _ => None,
        };

        Self {
            stage: stage.name().to_string(),
            label: stage.label().to_string(),
            section: stage.section(),
            status: StageStatus::Failure,
            detail,
            cause,
            artifact,
            duration_ms: 0.0,
            lines,
        }
    }

    pub fn skipped(stage: &dyn Stage, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            stage: stage.name().to_string(),
            label: stage.label().to_string(),
            section: stage.section(),
            status: StageStatus::Skipped,
            lines: vec![ReportLine::new(
                Glyph::Skip,
                format!("Skipping {} ({reason})", stage.label()),
            )],
            detail: reason,
            cause: None,
            artifact: None,
            duration_ms: 0.0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == StageStatus::Success
    }
}

pub struct PipelineRunner<E> {
    stages: Vec<Box<dyn Stage>>,
    config: HarnessConfig,
    executor: E,
}

impl<E: CommandExecutor> PipelineRunner<E> {
    pub fn new(config: HarnessConfig, executor: E) -> Self {
        Self {
            stages: stages::default_stages(),
            config,
            executor,
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    pub fn run(&self) -> PipelineReport {
        self.run_with_progress(|_| {})
    }

    #[instrument(skip_all, fields(project = %self.config.project.name))]
    pub fn run_with_progress<F>(&self, mut progress: F) -> PipelineReport
    where
        F: FnMut(&StageResult),
    {
        let mut report = PipelineReport::new(&self.config);
        let mut ctx = PipelineContext {
            config: &self.config,
            executor: &self.executor,
            artifact: None,
        };

        for stage in &self.stages {
            let span = tracing::span!(tracing::Level::DEBUG, "stage", stage = stage.name());
            let _span_guard = span.enter();

            let result = match stage.precondition(&report.stages) {
                Precondition::Skip(reason) => {
                    debug!(%reason, "Stage skipped");
                    StageResult::skipped(stage.as_ref(), reason)
                }
                Precondition::Ready => {
                    let started = Instant::now();
                    let outcome = stage.run(&mut ctx);
                    let elapsed = started.elapsed();
                    let mut result = match outcome {
                        Ok(outcome) => StageResult::success(stage.as_ref(), outcome),
                        Err(err) => {
                            if let Some(cause) = err.cause() {
                                warn!(tag = %cause.tag, pattern = %cause.pattern, "Recognised tooling defect");
                            } else {
                                debug!(error = %err, "Stage failed");
                            }
                            StageResult::failure(stage.as_ref(), err)
                        }
                    };
                    result.duration_ms = elapsed.as_secs_f64() * 1_000.0;
                    let mut lines = stage.preamble(&self.config);
                    lines.append(&mut result.lines);
                    result.lines = lines;
                    result
                }
            };

            progress(&result);
            report.stages.push(result);
        }

        info!(outcome = %report.outcome(), "Verification pipeline finished");
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    impl Stage for Named {
        fn name(&self) -> &'static str {
            self.0
        }

        fn label(&self) -> &'static str {
            "Named"
        }

        fn section(&self) -> ReportSection {
            ReportSection::Compilation
        }

        fn precondition(&self, _prior: &[StageResult]) -> Precondition {
            Precondition::Ready
        }

        fn run(&self, _ctx: &mut PipelineContext<'_>) -> Result<StageOutcome, StageError> {
            Ok(StageOutcome::new(""))
        }
    }

    #[test]
    fn skipped_dependency_propagates_its_reason() {
        let prior = vec![
            StageResult::failure(
                &Named("compile"),
                StageError::Command {
                    program: "cargo".into(),
                    exit_code: 101,
                    output: String::new(),
                    cause: None,
                },
            ),
            StageResult::skipped(&Named("artifact"), "compilation failed"),
        ];

        assert_eq!(
            require_success(&prior, "compile", "compilation failed"),
            Precondition::Skip("compilation failed".into())
        );
        assert_eq!(
            require_success(&prior, "artifact", "no artifact available"),
            Precondition::Skip("compilation failed".into())
        );
        assert!(matches!(
            require_success(&prior, "bindgen", "x"),
            Precondition::Skip(_)
        ));
    }

    #[test]
    fn empty_command_output_falls_back_to_exit_status() {
        let err = StageError::Command {
            program: "wasm-bindgen".into(),
            exit_code: 2,
            output: "  \n".into(),
            cause: None,
        };
        assert_eq!(err.to_string(), "'wasm-bindgen' exited with status 2");
    }

    #[test]
    fn skipped_results_carry_no_outcome_data() {
        let result = StageResult::skipped(&Named("bindgen"), "no artifact available");
        assert_eq!(result.status, StageStatus::Skipped);
        assert_eq!(result.detail, "no artifact available");
        assert!(result.cause.is_none());
        assert!(result.artifact.is_none());
        assert_eq!(result.lines.len(), 1);
        assert_eq!(result.lines[0].glyph, Glyph::Skip);
    }

    #[test]
    fn failure_lines_indent_multiline_output() {
        let result = StageResult::failure(
            &Named("compile"),
            StageError::Command {
                program: "cargo".into(),
                exit_code: 101,
                output: "error[E0502]: cannot borrow\n --> src/lib.rs:4:5\n".into(),
                cause: None,
            },
        );
        let texts: Vec<_> = result.lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "Named: FAILED",
                "Error: error[E0502]: cannot borrow",
                "        --> src/lib.rs:4:5",
            ]
        );
    }
}
