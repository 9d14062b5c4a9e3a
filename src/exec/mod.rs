// src/exec/mod.rs

//! Process execution layer.
//!
//! This module runs one installation step at a time as an external process,
//! using `tokio::process::Command`, and streams its output to a status sink.
//!
//! - [`backend`] provides the `ProcessBackend` trait the coordinator talks to,
//!   plus the types describing a launched process and how it ended.
//! - [`process`] is the production `ShellBackend`: one process group per step,
//!   live stdout, stderr collected until exit, group-wide termination.

pub mod backend;
pub mod process;

pub use backend::{
    ExitFuture, LaunchRequest, LaunchedProcess, ProcessBackend, ProcessExit, ProcessGroup,
    TerminationSignal,
};
pub use process::{DEFAULT_SHELL, ShellBackend, process_group_exists, signal_process_group};
