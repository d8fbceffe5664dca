use std::collections::BTreeMap;

use serde::Serialize;
use tracing::info;

use crate::pipeline::{StageResult, StageStatus};
use crate::report::PipelineReport;

#[derive(Debug, Default, Serialize, Clone, PartialEq)]
pub struct PipelineMetrics {
    pub stages: BTreeMap<String, StageMetrics>,
    pub executed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub total_duration_ms: f64,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct StageMetrics {
    pub status: StageStatus,
    pub duration_ms: f64,
}

impl PipelineMetrics {
    pub fn from_report(report: &PipelineReport) -> Self {
        let mut metrics = Self::default();
        for result in &report.stages {
            metrics.record(result);
        }
        metrics
    }

    fn record(&mut self, result: &StageResult) {
        match result.status {
            StageStatus::Skipped => self.skipped += 1,
            StageStatus::Failure => {
                self.executed += 1;
                self.failed += 1;
            }
            StageStatus::Success => self.executed += 1,
        }
        self.total_duration_ms += result.duration_ms;
        self.stages.insert(
            result.stage.clone(),
            StageMetrics {
                status: result.status,
                duration_ms: result.duration_ms,
            },
        );
    }
}

pub fn log_metrics(metrics: &PipelineMetrics) {
    info!(
        total_duration_ms = metrics.total_duration_ms,
        executed = metrics.executed,
        failed = metrics.failed,
        skipped = metrics.skipped,
        "Pipeline metrics summary"
    );
    for (stage, stage_metrics) in &metrics.stages {
        info!(
            stage = stage.as_str(),
            status = %stage_metrics.status,
            duration_ms = stage_metrics.duration_ms,
            "Stage metrics"
        );
    }
}
