// src/types.rs

//! Data model shared by the coordinator, the process runner and status sinks.

use std::collections::BTreeMap;
use std::fmt;

/// One named external command in the installation sequence.
///
/// Steps are immutable once the step list is built; a step's identity is its
/// position in that list, so two steps may share a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub name: String,
    pub command: String,
}

impl Step {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
        }
    }
}

/// Per-step progress as seen by the status sink.
///
/// Legal transitions are `Pending -> InProgress` and
/// `InProgress -> {Done, Failed, Cancelled}`. Terminal states are never left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepStatus {
    Pending,
    InProgress,
    Done,
    Failed,
    /// The step's process group was terminated by an abort request.
    Cancelled,
}

impl StepStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StepStatus::Done | StepStatus::Failed | StepStatus::Cancelled
        )
    }

    pub fn can_transition_to(self, next: StepStatus) -> bool {
        match self {
            StepStatus::Pending => next == StepStatus::InProgress,
            StepStatus::InProgress => next.is_terminal(),
            // Terminal states are never left.
            _ => false,
        }
    }

    /// Short label shown next to the step name.
    pub fn label(self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::InProgress => "in-progress...",
            StepStatus::Done => "done",
            StepStatus::Failed => "failed!",
            StepStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Environment overlay applied identically to every step's process.
///
/// Built once before a run starts; the coordinator only ever reads it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunEnvironment {
    vars: BTreeMap<String, String>,
}

impl RunEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert; a later value for the same name wins.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl From<BTreeMap<String, String>> for RunEnvironment {
    fn from(vars: BTreeMap<String, String>) -> Self {
        Self { vars }
    }
}

impl<K, V> FromIterator<(K, V)> for RunEnvironment
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Terminal classification of a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every step finished with exit status 0.
    Completed,
    /// The user aborted the step that was running.
    Aborted,
    /// The step at this index started but exited unsuccessfully.
    StepFailed(usize),
    /// The step at this index could not be started at all.
    LaunchFailed(usize),
}

impl RunOutcome {
    pub fn is_success(self) -> bool {
        matches!(self, RunOutcome::Completed)
    }

    /// Process exit code used by the `ido-installer` binary.
    pub fn exit_code(self) -> i32 {
        match self {
            RunOutcome::Completed => 0,
            RunOutcome::StepFailed(_) | RunOutcome::LaunchFailed(_) => 1,
            RunOutcome::Aborted => 130,
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Completed => f.write_str("completed"),
            RunOutcome::Aborted => f.write_str("aborted"),
            RunOutcome::StepFailed(index) => write!(f, "step {index} failed"),
            RunOutcome::LaunchFailed(index) => write!(f, "step {index} could not be launched"),
        }
    }
}
