use std::time::{SystemTime, UNIX_EPOCH};

use tracing::info;

/// Row counts before/after each pipeline step of one stage.
pub struct StageTracker {
    stage: String,
    steps: Vec<StepMetric>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepMetric {
    pub step: String,
    pub before: usize,
    pub after: usize,
}

impl StepMetric {
    pub fn removed(&self) -> usize {
        self.before.saturating_sub(self.after)
    }
}

impl StageTracker {
    pub fn new(stage: &str) -> Self {
        StageTracker {
            stage: stage.to_string(),
            steps: Vec::new(),
        }
    }

    pub fn record(&mut self, step: &str, before: usize, after: usize) {
        let metric = StepMetric {
            step: step.to_string(),
            before,
            after,
        };
        info!(
            stage = %self.stage,
            step,
            rows = after,
            removed = metric.removed(),
            "step finished"
        );
        self.steps.push(metric);
    }

    pub fn steps(&self) -> &[StepMetric] {
        &self.steps
    }

    /// Rows removed across all steps.
    pub fn total_removed(&self) -> usize {
        self.steps().iter().map(StepMetric::removed).sum()
    }
}

pub fn new_run_id() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format!("run-{}", now)
}
