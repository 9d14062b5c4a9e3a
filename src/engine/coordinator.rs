// src/engine/coordinator.rs

//! Sequential execution of a step list.
//!
//! The coordinator owns the run loop: it starts the elapsed-time reporter,
//! launches each step through a [`ProcessBackend`], publishes status changes,
//! and stops at the first failure or abort. Steps never overlap; a step only
//! starts once its predecessor is `Done`.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::engine::abort::AbortHandle;
use crate::engine::board::StepBoard;
use crate::engine::elapsed::{ELAPSED_TICK, ElapsedReporter};
use crate::exec::{
    ExitFuture, LaunchRequest, LaunchedProcess, ProcessBackend, ProcessExit, ProcessGroup,
    TerminationSignal,
};
use crate::sink::StatusSink;
use crate::types::{RunEnvironment, RunOutcome, Step, StepStatus};

/// How long an aborted step gets between SIGTERM and SIGKILL.
pub const DEFAULT_KILL_GRACE: Duration = Duration::from_secs(10);

/// How long a killed group may take to disappear before the run moves on.
const KILL_SETTLE: Duration = Duration::from_secs(1);

const GROUP_POLL: Duration = Duration::from_millis(20);

/// Knobs for a coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorOptions {
    /// Working directory of every step (the installer root).
    pub root_dir: PathBuf,
    /// Period of the elapsed-time reporter.
    pub elapsed_tick: Duration,
    /// Grace period after the termination request before the group is killed.
    pub kill_grace: Duration,
}

impl CoordinatorOptions {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            elapsed_tick: ELAPSED_TICK,
            kill_grace: DEFAULT_KILL_GRACE,
        }
    }

    pub fn with_elapsed_tick(mut self, tick: Duration) -> Self {
        self.elapsed_tick = tick;
        self
    }

    pub fn with_kill_grace(mut self, grace: Duration) -> Self {
        self.kill_grace = grace;
        self
    }
}

/// How a single step ended.
#[derive(Debug)]
enum StepEnd {
    Exited(ProcessExit),
    WaitFailed(std::io::Error),
    Aborted,
}

impl StepEnd {
    fn from_wait(result: std::io::Result<ProcessExit>) -> Self {
        match result {
            Ok(exit) => StepEnd::Exited(exit),
            Err(err) => StepEnd::WaitFailed(err),
        }
    }
}

/// Drives a step list through a process backend, one step at a time.
pub struct Coordinator<B: ProcessBackend> {
    backend: B,
    sink: Arc<dyn StatusSink>,
    options: CoordinatorOptions,
    abort: AbortHandle,
}

impl<B: ProcessBackend> fmt::Debug for Coordinator<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coordinator")
            .field("options", &self.options)
            .field("abort", &self.abort)
            .finish_non_exhaustive()
    }
}

impl<B: ProcessBackend> Coordinator<B> {
    pub fn new(backend: B, sink: Arc<dyn StatusSink>, options: CoordinatorOptions) -> Self {
        Self {
            backend,
            sink,
            options,
            abort: AbortHandle::new(),
        }
    }

    /// Handle through which the driving activity can abort the running step.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Run every step in order and report how the run ended.
    ///
    /// The sink sees the run end exactly once, after the elapsed-time reporter
    /// has been stopped.
    pub async fn run(&self, steps: &[Step], env: &RunEnvironment) -> RunOutcome {
        info!(
            steps = steps.len(),
            env_vars = env.len(),
            root = %self.options.root_dir.display(),
            "installation run started"
        );

        let reporter = ElapsedReporter::start(Arc::clone(&self.sink), self.options.elapsed_tick);
        let mut board = StepBoard::new(steps.len());

        let outcome = self.run_steps(steps, env, &mut board).await;

        reporter.stop().await;
        info!(
            %outcome,
            done = board.count(StepStatus::Done),
            total = steps.len(),
            "installation run ended"
        );
        self.sink.on_run_ended(outcome);
        outcome
    }

    async fn run_steps(
        &self,
        steps: &[Step],
        env: &RunEnvironment,
        board: &mut StepBoard,
    ) -> RunOutcome {
        for (index, step) in steps.iter().enumerate() {
            self.mark(board, index, StepStatus::InProgress);

            let request = LaunchRequest {
                index,
                step,
                env,
                cwd: &self.options.root_dir,
            };

            let launched = match self.backend.launch(request, Arc::clone(&self.sink)) {
                Ok(launched) => launched,
                Err(err) => {
                    error!(index, step = %step.name, error = %err, "step could not be launched");
                    self.sink.on_log_appended(&format!("\n{err}\n"));
                    self.mark(board, index, StepStatus::Failed);
                    return RunOutcome::LaunchFailed(index);
                }
            };

            match self.supervise(index, step, launched).await {
                StepEnd::Exited(exit) if exit.success() => {
                    info!(index, step = %step.name, "step finished");
                    if !exit.stderr.is_empty() {
                        debug!(index, stderr = %exit.stderr, "stderr of successful step");
                    }
                    self.mark(board, index, StepStatus::Done);
                }
                StepEnd::Exited(exit) => {
                    error!(
                        index,
                        step = %step.name,
                        status = %exit.describe(),
                        "step failed"
                    );
                    if !exit.stderr.is_empty() {
                        self.sink.on_log_appended(&format!("\n{}", exit.stderr));
                    }
                    self.mark(board, index, StepStatus::Failed);
                    return RunOutcome::StepFailed(index);
                }
                StepEnd::WaitFailed(err) => {
                    error!(index, step = %step.name, error = %err, "lost track of step process");
                    self.sink.on_log_appended(&format!(
                        "\nerror while running '{}': {err}\n",
                        step.name
                    ));
                    self.mark(board, index, StepStatus::Failed);
                    return RunOutcome::StepFailed(index);
                }
                StepEnd::Aborted => {
                    self.mark(board, index, StepStatus::Cancelled);
                    return RunOutcome::Aborted;
                }
            }
        }

        RunOutcome::Completed
    }

    /// Wait for the step's process while the abort token is armed.
    async fn supervise(&self, index: usize, step: &Step, launched: LaunchedProcess) -> StepEnd {
        let LaunchedProcess { group, mut exit } = launched;
        let token = self.abort.arm(index, group);

        // A natural exit that is already available wins over an abort.
        let end = tokio::select! {
            biased;
            result = &mut exit => StepEnd::from_wait(result),
            signal = token => match signal {
                Ok(()) => self.terminate(index, step, group, &mut exit).await,
                Err(_) => StepEnd::from_wait(exit.await),
            },
        };

        self.abort.disarm();
        end
    }

    /// Terminate the step's process group and wait until it is gone.
    ///
    /// The group counts as gone once the leader has been reaped and no member
    /// is left. Whatever survives `kill_grace` gets SIGKILL.
    async fn terminate(
        &self,
        index: usize,
        step: &Step,
        group: ProcessGroup,
        exit: &mut ExitFuture,
    ) -> StepEnd {
        warn!(
            index,
            step = %step.name,
            pgid = group.id(),
            "abort requested; terminating step process group"
        );
        self.signal(group, TerminationSignal::Terminate);

        let mut reaped = None;
        let settled =
            tokio::time::timeout(self.options.kill_grace, self.settle(group, exit, &mut reaped))
                .await;

        if settled.is_err() {
            warn!(
                index,
                pgid = group.id(),
                leader_reaped = reaped.is_some(),
                grace = ?self.options.kill_grace,
                "step process group ignored termination; killing it"
            );
            self.signal(group, TerminationSignal::Kill);
            if reaped.is_none() {
                reaped = Some(exit.await);
            }
            let gone = tokio::time::timeout(KILL_SETTLE, self.wait_group_gone(group)).await;
            if gone.is_err() {
                // Killed members the init process has not reaped yet.
                warn!(index, pgid = group.id(), "killed process group still has members");
            }
        }

        match reaped {
            Some(Ok(exit)) => {
                info!(index, status = %exit.describe(), "aborted step process exited")
            }
            Some(Err(err)) => {
                warn!(index, error = %err, "error while reaping aborted step process")
            }
            None => {}
        }
        StepEnd::Aborted
    }

    /// Reap the leader, then wait for the rest of its group.
    async fn settle(
        &self,
        group: ProcessGroup,
        exit: &mut ExitFuture,
        reaped: &mut Option<std::io::Result<ProcessExit>>,
    ) {
        if reaped.is_none() {
            *reaped = Some(exit.await);
        }
        self.wait_group_gone(group).await;
    }

    async fn wait_group_gone(&self, group: ProcessGroup) {
        loop {
            match self.backend.group_exists(group) {
                Ok(false) => return,
                Ok(true) => {}
                Err(err) => {
                    warn!(pgid = group.id(), error = %err, "cannot probe process group");
                    return;
                }
            }
            tokio::time::sleep(GROUP_POLL).await;
        }
    }

    fn signal(&self, group: ProcessGroup, signal: TerminationSignal) {
        if let Err(err) = self.backend.signal_group(group, signal) {
            warn!(pgid = group.id(), ?signal, error = %err, "failed to signal process group");
        }
    }

    fn mark(&self, board: &mut StepBoard, index: usize, status: StepStatus) {
        match board.advance(index, status) {
            Ok(()) => self.sink.on_step_status_changed(index, status),
            Err(err) => error!(index, %status, error = %err, "refusing step status change"),
        }
    }
}
