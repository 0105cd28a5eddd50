//! Per-stage record accounting

use std::collections::BTreeMap;

use serde::Serialize;

use crate::utils::logging::log_stage_summary;

/// Row counts around one filtering step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterStep {
    /// Step name
    pub name: String,
    /// Rows entering the step
    pub input: usize,
    /// Rows leaving the step
    pub output: usize,
}

impl FilterStep {
    /// Rows removed by the step
    #[must_use]
    pub fn removed(&self) -> usize {
        self.input.saturating_sub(self.output)
    }
}

/// Filtering steps and tolerated data-quality anomalies of one stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StageReport {
    /// Stage name
    pub stage: String,
    /// Steps in execution order
    pub steps: Vec<FilterStep>,
    /// Anomaly counts by kind
    pub anomalies: BTreeMap<String, usize>,
}

impl StageReport {
    /// Start an empty report
    #[must_use]
    pub fn new(stage: &str) -> Self {
        Self {
            stage: stage.to_string(),
            ..Self::default()
        }
    }

    /// Record and log a filtering step
    pub fn record(&mut self, name: &str, input: usize, output: usize) {
        log_stage_summary(&format!("{} / {name}", self.stage), input, output);
        self.steps.push(FilterStep {
            name: name.to_string(),
            input,
            output,
        });
    }

    /// Count a tolerated anomaly; non-zero counts are logged as warnings
    pub fn anomaly(&mut self, kind: &str, count: usize) {
        if count > 0 {
            log::warn!("{}: {count} {kind}", self.stage);
        }
        *self.anomalies.entry(kind.to_string()).or_insert(0) += count;
    }

    /// Rows leaving the last step
    #[must_use]
    pub fn final_count(&self) -> Option<usize> {
        self.steps.last().map(|s| s.output)
    }
}
