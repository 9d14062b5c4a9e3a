// src/engine/abort.rs

//! Single-shot abort of the step that is currently running.
//!
//! The run loop is the only writer of the active-process slot: it arms the
//! slot right after a step's process launches and disarms it once the process
//! is gone. Each arming carries a fresh one-shot token. The abort path never
//! installs or clears the slot; it only consumes the token, so:
//!
//! - aborting with nothing armed (between steps, after the run) does nothing;
//! - aborting twice for the same process delivers a single token;
//! - the process group itself is signaled by the run loop, which cannot
//!   target a stale handle.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::exec::ProcessGroup;

#[derive(Debug)]
struct ActiveProcess {
    step: usize,
    group: ProcessGroup,
    token: Option<oneshot::Sender<()>>,
}

/// Cloneable handle used by the driving activity to abort a run.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    slot: Arc<Mutex<Option<ActiveProcess>>>,
}

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the coordinator to terminate the running step's process group.
    ///
    /// Returns `true` if the request was delivered to a running step, `false`
    /// if there was nothing to abort (a safe no-op).
    pub fn request_abort(&self) -> bool {
        let mut slot = self.lock();
        let Some(active) = slot.as_mut() else {
            debug!("abort requested but no step process is running; ignoring");
            return false;
        };

        match active.token.take() {
            Some(token) => {
                let delivered = token.send(()).is_ok();
                info!(
                    step = active.step,
                    pgid = active.group.id(),
                    delivered,
                    "abort requested for running step"
                );
                delivered
            }
            None => {
                debug!(
                    step = active.step,
                    "abort already requested for this step process; ignoring"
                );
                false
            }
        }
    }

    /// Whether an abort request would currently have an effect.
    ///
    /// UIs use this to enable or disable their abort affordance.
    pub fn is_armed(&self) -> bool {
        self.lock()
            .as_ref()
            .is_some_and(|active| active.token.is_some())
    }

    /// Index of the step whose process is alive, if any.
    pub fn active_step(&self) -> Option<usize> {
        self.lock().as_ref().map(|active| active.step)
    }

    pub(crate) fn arm(&self, step: usize, group: ProcessGroup) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        *self.lock() = Some(ActiveProcess {
            step,
            group,
            token: Some(tx),
        });
        rx
    }

    pub(crate) fn disarm(&self) {
        self.lock().take();
    }

    fn lock(&self) -> MutexGuard<'_, Option<ActiveProcess>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
