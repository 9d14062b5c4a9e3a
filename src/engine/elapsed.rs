// src/engine/elapsed.rs

//! Elapsed-time reporter.
//!
//! Publishes "time since the run started" to the status sink once per tick,
//! independently of step boundaries, until the coordinator stops it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::sink::StatusSink;

/// Default publication interval.
pub const ELAPSED_TICK: Duration = Duration::from_secs(1);

/// Handle to a running reporter. Consumed by [`ElapsedReporter::stop`], so a
/// reporter can never be restarted.
#[derive(Debug)]
pub struct ElapsedReporter {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl ElapsedReporter {
    /// Start the wall clock and the periodic publication.
    ///
    /// The first publication (zero) happens immediately. Values are rounded
    /// to the tick and strictly increasing.
    pub fn start(sink: Arc<dyn StatusSink>, tick: Duration) -> Self {
        let tick = tick.max(Duration::from_millis(1));
        let (stop, mut stop_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let started = Instant::now();
            let mut ticker = tokio::time::interval(tick);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut last: Option<Duration> = None;

            loop {
                tokio::select! {
                    biased;
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        let elapsed = round_to(started.elapsed(), tick);
                        if last.is_some_and(|prev| elapsed <= prev) {
                            continue;
                        }
                        last = Some(elapsed);
                        sink.on_elapsed(elapsed);
                    }
                }
            }

            debug!(elapsed = ?started.elapsed(), "elapsed-time reporter stopped");
        });

        Self { stop, handle }
    }

    /// Stop publishing and wait until the reporter task has finished, so no
    /// publication can follow this call.
    pub async fn stop(self) {
        let _ = self.stop.send(());
        if let Err(err) = self.handle.await {
            warn!(error = %err, "elapsed-time reporter task failed");
        }
    }
}

fn round_to(elapsed: Duration, unit: Duration) -> Duration {
    let unit_ns = unit.as_nanos().max(1);
    let steps = (elapsed.as_nanos() + unit_ns / 2) / unit_ns;
    let nanos = steps.saturating_mul(unit_ns);
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

/// Render a duration the way the installer title shows it: `45s`, `3m7s`,
/// `1h2m0s`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}h{m}m{s}s")
    } else if m > 0 {
        format!("{m}m{s}s")
    } else {
        format!("{s}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_nearest_tick() {
        let sec = Duration::from_secs(1);
        assert_eq!(round_to(Duration::from_millis(499), sec), Duration::ZERO);
        assert_eq!(round_to(Duration::from_millis(500), sec), sec);
        assert_eq!(
            round_to(Duration::from_millis(2_600), sec),
            Duration::from_secs(3)
        );
    }

    #[test]
    fn formats_like_a_clock() {
        assert_eq!(format_elapsed(Duration::ZERO), "0s");
        assert_eq!(format_elapsed(Duration::from_secs(45)), "45s");
        assert_eq!(format_elapsed(Duration::from_secs(187)), "3m7s");
        assert_eq!(format_elapsed(Duration::from_secs(3720)), "1h2m0s");
    }
}
