// src/sink/channel.rs

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::trace;

use crate::sink::{StatusEvent, StatusSink};
use crate::types::{RunOutcome, StepStatus};

/// Sink that turns every callback into a [`StatusEvent`] on an unbounded
/// channel.
///
/// Sending never blocks, so it is safe from any thread. If the receiving side
/// has gone away the event is dropped.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<StatusEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<StatusEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn publish(&self, event: StatusEvent) {
        if let Err(err) = self.tx.send(event) {
            trace!(event = ?err.0, "status receiver dropped; discarding event");
        }
    }
}

impl StatusSink for ChannelSink {
    fn on_step_status_changed(&self, index: usize, status: StepStatus) {
        self.publish(StatusEvent::StepStatusChanged { index, status });
    }

    fn on_log_appended(&self, text: &str) {
        self.publish(StatusEvent::LogAppended(text.to_string()));
    }

    fn on_elapsed(&self, elapsed: Duration) {
        self.publish(StatusEvent::Elapsed(elapsed));
    }

    fn on_run_ended(&self, outcome: RunOutcome) {
        self.publish(StatusEvent::RunEnded(outcome));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn forwards_events_in_order() {
        let (sink, mut rx) = ChannelSink::new();

        sink.on_step_status_changed(0, StepStatus::InProgress);
        sink.on_log_appended("hello\n");
        sink.on_run_ended(RunOutcome::Completed);

        assert_eq!(
            rx.recv().await,
            Some(StatusEvent::StepStatusChanged {
                index: 0,
                status: StepStatus::InProgress
            })
        );
        assert_eq!(
            rx.recv().await,
            Some(StatusEvent::LogAppended("hello\n".to_string()))
        );
        assert_eq!(
            rx.recv().await,
            Some(StatusEvent::RunEnded(RunOutcome::Completed))
        );
    }

    #[test]
    fn dropped_receiver_is_not_an_error() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        sink.on_elapsed(Duration::from_secs(1));
    }
}
