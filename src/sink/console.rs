// src/sink/console.rs

//! Terminal presentation for the `ido-installer` binary.
//!
//! Step output goes to STDOUT verbatim. Status changes, elapsed time and the
//! end of the run are reported through `tracing`, which writes to STDERR.

use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::{error, info, trace, warn};

use crate::engine::format_elapsed;
use crate::sink::StatusSink;
use crate::types::{RunOutcome, StepStatus};

#[derive(Debug)]
pub struct ConsoleSink {
    step_names: Vec<String>,
    elapsed_secs: AtomicU64,
}

impl ConsoleSink {
    pub fn new(step_names: Vec<String>) -> Self {
        Self {
            step_names,
            elapsed_secs: AtomicU64::new(0),
        }
    }

    fn step_name(&self, index: usize) -> &str {
        self.step_names
            .get(index)
            .map(String::as_str)
            .unwrap_or("<unknown>")
    }

    fn elapsed(&self) -> String {
        format_elapsed(Duration::from_secs(
            self.elapsed_secs.load(Ordering::Relaxed),
        ))
    }
}

impl StatusSink for ConsoleSink {
    fn on_step_status_changed(&self, index: usize, status: StepStatus) {
        let step = self.step_name(index);
        let elapsed = self.elapsed();
        match status {
            StepStatus::Failed => {
                error!(index, step, %status, %elapsed, "step status changed")
            }
            StepStatus::Cancelled => {
                warn!(index, step, %status, %elapsed, "step status changed")
            }
            _ => info!(index, step, %status, %elapsed, "step status changed"),
        }
    }

    fn on_log_appended(&self, text: &str) {
        let mut out = std::io::stdout().lock();
        // A closed stdout must not take the run down with it.
        let _ = out.write_all(text.as_bytes()).and_then(|()| out.flush());
    }

    fn on_elapsed(&self, elapsed: Duration) {
        self.elapsed_secs.store(elapsed.as_secs(), Ordering::Relaxed);
        trace!(elapsed = %format_elapsed(elapsed), "time elapsed");
    }

    fn on_run_ended(&self, outcome: RunOutcome) {
        let elapsed = self.elapsed();
        if outcome.is_success() {
            info!(%outcome, %elapsed, "installation finished");
        } else {
            error!(%outcome, %elapsed, "installation did not finish");
        }
    }
}
