// src/exec/backend.rs

//! Pluggable process backend abstraction.
//!
//! The coordinator talks to a `ProcessBackend` instead of spawning processes
//! itself. Production code uses [`ShellBackend`](super::ShellBackend); tests
//! can provide a fake that records launches and signals without touching the
//! OS.

use std::fmt;
use std::future::Future;
use std::io;
use std::path::Path;
use std::pin::Pin;
use std::process::ExitStatus;
use std::sync::Arc;

use crate::errors::Result;
use crate::sink::StatusSink;
use crate::types::{RunEnvironment, Step};

/// Resolves once the launched process has exited and its output has been
/// drained.
pub type ExitFuture = Pin<Box<dyn Future<Output = io::Result<ProcessExit>> + Send>>;

/// Everything needed to launch one step.
#[derive(Debug, Clone, Copy)]
pub struct LaunchRequest<'a> {
    pub index: usize,
    pub step: &'a Step,
    pub env: &'a RunEnvironment,
    pub cwd: &'a Path,
}

/// Identifier of the process group a step runs in.
///
/// The group id equals the pid of the step's direct child, so signaling the
/// group reaches every process the step spawned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessGroup(u32);

impl ProcessGroup {
    pub fn new(pgid: u32) -> Self {
        Self(pgid)
    }

    pub fn id(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ProcessGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Signal sent to a whole process group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationSignal {
    /// Polite request (SIGTERM).
    Terminate,
    /// Last resort once the grace period has passed (SIGKILL).
    Kill,
}

/// A step process that has been started.
pub struct LaunchedProcess {
    pub group: ProcessGroup,
    pub exit: ExitFuture,
}

impl fmt::Debug for LaunchedProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LaunchedProcess")
            .field("group", &self.group)
            .finish_non_exhaustive()
    }
}

/// How a step process ended, plus everything it wrote to stderr.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessExit {
    pub code: Option<i32>,
    pub signal: Option<i32>,
    pub stderr: String,
}

impl ProcessExit {
    pub fn exited(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            signal: None,
            stderr: stderr.into(),
        }
    }

    pub fn signaled(signal: i32) -> Self {
        Self {
            code: None,
            signal: Some(signal),
            stderr: String::new(),
        }
    }

    pub fn from_status(status: ExitStatus, stderr: String) -> Self {
        #[cfg(unix)]
        let signal = std::os::unix::process::ExitStatusExt::signal(&status);
        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: status.code(),
            signal,
            stderr,
        }
    }

    /// Only a clean exit with status 0 counts as success.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn describe(&self) -> String {
        match (self.code, self.signal) {
            (Some(code), _) => format!("exit code {code}"),
            (None, Some(signal)) => format!("terminated by signal {signal}"),
            (None, None) => "unknown exit status".to_string(),
        }
    }
}

/// Trait abstracting how step processes are launched and signaled.
pub trait ProcessBackend: Send + Sync {
    /// Start the step's process.
    ///
    /// Stdout must be forwarded to `sink` while the process runs; stderr is
    /// collected and returned in the [`ProcessExit`] once it has ended.
    /// An `Err` here is a launch failure: nothing is running afterwards.
    fn launch(
        &self,
        request: LaunchRequest<'_>,
        sink: Arc<dyn StatusSink>,
    ) -> Result<LaunchedProcess>;

    /// Signal every process in `group`.
    ///
    /// Best-effort: a group that no longer exists is not an error.
    fn signal_group(&self, group: ProcessGroup, signal: TerminationSignal) -> Result<()>;

    /// Whether any member of `group` still exists.
    ///
    /// The group outlives its leader when a descendant survives it, so a
    /// finished [`ExitFuture`] does not mean the group is gone.
    fn group_exists(&self, group: ProcessGroup) -> Result<bool>;
}
