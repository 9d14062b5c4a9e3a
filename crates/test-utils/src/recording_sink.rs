use std::sync::Mutex;
use std::time::Duration;

use ido_installer::sink::{StatusEvent, StatusSink};
use ido_installer::types::{RunOutcome, StepStatus};

/// A sink that records every callback, in order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<StatusEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<StatusEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Final status of each of `len` steps, replaying the recorded changes.
    pub fn final_statuses(&self, len: usize) -> Vec<StepStatus> {
        let mut statuses = vec![StepStatus::Pending; len];
        for event in self.events() {
            if let StatusEvent::StepStatusChanged { index, status } = event {
                statuses[index] = status;
            }
        }
        statuses
    }

    /// Every status change, in publication order.
    pub fn status_changes(&self) -> Vec<(usize, StepStatus)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                StatusEvent::StepStatusChanged { index, status } => Some((index, status)),
                _ => None,
            })
            .collect()
    }

    /// The visible log, as the UI would show it.
    pub fn log(&self) -> String {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                StatusEvent::LogAppended(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn elapsed(&self) -> Vec<Duration> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                StatusEvent::Elapsed(d) => Some(d),
                _ => None,
            })
            .collect()
    }

    pub fn run_endings(&self) -> Vec<RunOutcome> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                StatusEvent::RunEnded(outcome) => Some(outcome),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: StatusEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl StatusSink for RecordingSink {
    fn on_step_status_changed(&self, index: usize, status: StepStatus) {
        self.push(StatusEvent::StepStatusChanged { index, status });
    }

    fn on_log_appended(&self, text: &str) {
        self.push(StatusEvent::LogAppended(text.to_string()));
    }

    fn on_elapsed(&self, elapsed: Duration) {
        self.push(StatusEvent::Elapsed(elapsed));
    }

    fn on_run_ended(&self, outcome: RunOutcome) {
        self.push(StatusEvent::RunEnded(outcome));
    }
}
