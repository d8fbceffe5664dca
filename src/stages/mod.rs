use tracing::debug;

use crate::artifact::{ArtifactDescriptor, ArtifactKind, size_kb};
use crate::executor::CommandSpec;
use crate::pipeline::{
    PipelineContext, Precondition, ReportSection, Stage, StageError, StageOutcome, StageResult,
    require_success,
};
use crate::config::HarnessConfig;
use crate::report::{Glyph, ReportLine};

mod bindgen;

pub use bindgen::BindgenStage;

pub const COMPILE_STAGE: &str = "compile";
pub const ARTIFACT_STAGE: &str = "artifact";
pub const BINDGEN_STAGE: &str = "bindgen";

pub fn default_stages() -> Vec<Box<dyn Stage>> {
    vec![
        Box::new(CompileStage),
        Box::new(ArtifactCheckStage),
        Box::new(BindgenStage),
    ]
}

pub struct CompileStage;

impl Stage for CompileStage {
    fn name(&self) -> &'static str {
        COMPILE_STAGE
    }

    fn label(&self) -> &'static str {
        "Rust compilation"
    }

    fn section(&self) -> ReportSection {
        ReportSection::Compilation
    }

    fn precondition(&self, _prior: &[StageResult]) -> Precondition {
        Precondition::Ready
    }

    fn preamble(&self, config: &HarnessConfig) -> Vec<ReportLine> {
        config
            .compiler
            .flags_var()
            .map(|(name, value)| ReportLine::new(Glyph::Plain, format!("Using {name}: {value}")))
            .into_iter()
            .collect()
    }

    fn run(&self, ctx: &mut PipelineContext<'_>) -> Result<StageOutcome, StageError> {
        let compiler = &ctx.config.compiler;
        let mut spec = CommandSpec::new(&compiler.program, ctx.config.project_root())
            .args(compiler.build_args());
        if let Some((name, value)) = compiler.flags_var() {
            spec = spec.env(name, value);
        }

        debug!(command = %spec, "Invoking compiler");
        let output = ctx.executor.execute(&spec);
        if !output.success() {
            return Err(StageError::command(&spec, output, None));
        }

        Ok(
            StageOutcome::new(format!("built {} ({})", compiler.target, compiler.profile))
                .line(Glyph::Success, "Rust compilation: SUCCESS"),
        )
    }
}

// A file left by an earlier run satisfies the check just the same.
pub struct ArtifactCheckStage;

impl Stage for ArtifactCheckStage {
    fn name(&self) -> &'static str {
        ARTIFACT_STAGE
    }

    fn label(&self) -> &'static str {
        "WASM file"
    }

    fn section(&self) -> ReportSection {
        ReportSection::Compilation
    }

    fn precondition(&self, prior: &[StageResult]) -> Precondition {
        require_success(prior, COMPILE_STAGE, "compilation failed")
    }

    fn run(&self, ctx: &mut PipelineContext<'_>) -> Result<StageOutcome, StageError> {
        ctx.artifact = None;
        let path = ctx.config.artifact_path();
        let mut artifact = ArtifactDescriptor::file(&path);
        let found = artifact
            .inspect()
            .map_err(|source| StageError::Io {
                path: path.clone(),
                source,
            })?;
        if !found {
            return Err(StageError::MissingArtifact {
                path,
                kind: ArtifactKind::File,
            });
        }

        let kb = size_kb(artifact.size_bytes().unwrap_or_default());
        debug!(path = %path.display(), kb, "Artifact present");
        ctx.artifact = Some(artifact.clone());
        Ok(StageOutcome::new(format!("{kb}KB"))
            .line(Glyph::Success, format!("WASM file generated: {kb}KB"))
            .with_artifact(artifact))
    }
}
