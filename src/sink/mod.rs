// src/sink/mod.rs

//! Status sinks: where the engine publishes progress.
//!
//! The coordinator, the process runner and the elapsed-time reporter all call
//! into a [`StatusSink`] from their own Tokio tasks. Implementations must be
//! cheap and non-blocking, and are responsible for moving the updates onto
//! whatever presentation context they own (a UI thread, a terminal, ...).
//!
//! - [`channel`] forwards every callback as a [`StatusEvent`] over an mpsc
//!   channel, for UIs that drain updates on their own loop.
//! - [`console`] is the presentation used by the `ido-installer` binary.

use std::time::Duration;

use crate::types::{RunOutcome, StepStatus};

pub mod channel;
pub mod console;

pub use channel::ChannelSink;
pub use console::ConsoleSink;

/// Observer interface between the engine and the presentation layer.
pub trait StatusSink: Send + Sync {
    /// A step moved to a new status.
    fn on_step_status_changed(&self, index: usize, status: StepStatus);

    /// Text to append to the visible log (step stdout, captured stderr).
    fn on_log_appended(&self, text: &str);

    /// Time since the run started, rounded to the reporter's tick.
    fn on_elapsed(&self, elapsed: Duration);

    /// The run is over. Called exactly once per run, after the last status
    /// change and the last elapsed-time publication.
    fn on_run_ended(&self, outcome: RunOutcome);
}

/// One sink callback, reified so it can travel over a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    StepStatusChanged { index: usize, status: StepStatus },
    LogAppended(String),
    Elapsed(Duration),
    RunEnded(RunOutcome),
}
