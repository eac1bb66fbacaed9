//! Sequential generation loop: one request per row, fixed pause in between.

use std::thread;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use super::client::{Generation, TextGenerator};
use super::prompt::build_prompt;
use crate::table::{Cell, Table};

pub const BLOCKED_TAG: &str = "BLOCKED_BY_SAFETY_FILTER";
pub const FAILED_TAG: &str = "API_CALL_FAILED";

/// Blocks between two requests.
pub trait Pacer {
    fn pause(&mut self, delay: Duration);
}

pub struct ThreadSleep;

impl Pacer for ThreadSleep {
    fn pause(&mut self, delay: Duration) {
        thread::sleep(delay);
    }
}

/// Terminal state of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    SafetyBlocked,
    CallFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    /// 1-based position in the batch.
    pub id: usize,
    pub request: String,
    /// Generated text or a tagged error string.
    pub content: String,
    pub outcome: Outcome,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub blocked: usize,
    pub failed: usize,
}

pub struct GenerationOrchestrator<G, P> {
    generator: G,
    pacer: P,
    delay: Duration,
    show_progress: bool,
}

impl<G: TextGenerator, P: Pacer> GenerationOrchestrator<G, P> {
    pub fn new(generator: G, pacer: P, delay: Duration) -> Self {
        GenerationOrchestrator {
            generator,
            pacer,
            delay,
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Issues one request per row, in order. Failures are recorded inline
    /// and never stop the batch; nothing is retried.
    pub fn run(&mut self, requests: &[String]) -> Vec<GenerationResult> {
        let pb = if self.show_progress {
            let pb = ProgressBar::new(requests.len() as u64);
            if let Ok(style) =
                ProgressStyle::default_bar().template("[{elapsed_precise}] {bar:40} {pos}/{len} (eta {eta})")
            {
                pb.set_style(style.progress_chars("=> "));
            }
            pb
        } else {
            ProgressBar::hidden()
        };

        let mut results = Vec::with_capacity(requests.len());
        for (idx, request) in requests.iter().enumerate() {
            let id = idx + 1;
            let (outcome, content) = self.issue(id, request);
            results.push(GenerationResult {
                id,
                request: request.clone(),
                content,
                outcome,
            });
            pb.inc(1);

            if id < requests.len() {
                self.pacer.pause(self.delay);
            }
        }
        pb.finish_and_clear();
        results
    }

    fn issue(&self, id: usize, request: &str) -> (Outcome, String) {
        match self.generator.generate(&build_prompt(request)) {
            Ok(Generation::Text(text)) => {
                info!(id, chars = text.chars().count(), "generated");
                (Outcome::Succeeded, text)
            }
            Ok(Generation::Blocked { reason }) => {
                let reason = reason.unwrap_or_else(|| "unknown".to_string());
                warn!(id, %reason, "blocked by safety filter");
                (Outcome::SafetyBlocked, format!("{BLOCKED_TAG}({reason})"))
            }
            Err(e) => {
                warn!(id, error = %e, "generation call failed");
                (Outcome::CallFailed, format!("{FAILED_TAG}({e})"))
            }
        }
    }
}

pub fn summarize(results: &[GenerationResult]) -> BatchSummary {
    let mut summary = BatchSummary::default();
    for r in results {
        match r.outcome {
            Outcome::Succeeded => summary.succeeded += 1,
            Outcome::SafetyBlocked => summary.blocked += 1,
            Outcome::CallFailed => summary.failed += 1,
        }
    }
    summary
}

/// `id`, `request`, `content` columns, one row per result.
pub fn results_table(results: &[GenerationResult]) -> Table {
    let mut table = Table::new(vec!["id".into(), "request".into(), "content".into()]);
    for r in results {
        table.push_row(vec![
            Cell::Number(r.id as f64),
            Cell::text(r.request.as_str()),
            Cell::text(r.content.as_str()),
        ]);
    }
    table
}
