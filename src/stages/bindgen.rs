use tracing::debug;

use crate::artifact::{ArtifactDescriptor, ArtifactKind};
use crate::classify::classify;
use crate::executor::CommandSpec;
use crate::pipeline::{
    PipelineContext, Precondition, ReportSection, Stage, StageError, StageOutcome, StageResult,
    require_success,
};
use crate::report::Glyph;

use super::{ARTIFACT_STAGE, BINDGEN_STAGE};

pub struct BindgenStage;

impl Stage for BindgenStage {
    fn name(&self) -> &'static str {
        BINDGEN_STAGE
    }

    fn label(&self) -> &'static str {
        "wasm-bindgen"
    }

    fn section(&self) -> ReportSection {
        ReportSection::Bindings
    }

    fn precondition(&self, prior: &[StageResult]) -> Precondition {
        require_success(prior, ARTIFACT_STAGE, "no artifact available")
    }

    fn run(&self, ctx: &mut PipelineContext<'_>) -> Result<StageOutcome, StageError> {
        let config = ctx.config;
        let Some(artifact) = ctx.artifact.as_ref() else {
            return Err(StageError::MissingArtifact {
                path: config.artifact_path(),
                kind: ArtifactKind::File,
            });
        };
        debug!(artifact = %artifact.path.display(), "Generating bindings");

        let spec = CommandSpec::new(&config.bindgen.program, config.project_root())
            .args(config.bindgen.build_args(&config.artifact_relative_path()));
        debug!(command = %spec, "Invoking binding generator");
        let output = ctx.executor.execute(&spec);
        if !output.success() {
            let cause = classify(&config.rules, &output.output);
            return Err(StageError::command(&spec, output, cause));
        }

        let out_dir = config.output_dir();
        let mut generated = ArtifactDescriptor::directory(&out_dir);
        let listed = generated.inspect().map_err(|source| StageError::Io {
            path: out_dir.clone(),
            source,
        })?;

        let files = generated.entries().join(", ");
        let mut outcome =
            StageOutcome::new(files.clone()).line(Glyph::Success, "wasm-bindgen: SUCCESS");
        if listed {
            outcome = outcome.line(Glyph::Success, format!("Generated files: {files}"));
        } else {
            debug!(out_dir = %out_dir.display(), "Output directory missing after success");
        }
        Ok(outcome.with_artifact(generated))
    }
}
