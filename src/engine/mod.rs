// src/engine/mod.rs

//! Execution engine for the installer.
//!
//! This module ties together:
//! - the coordinator's run loop ([`coordinator`]), which runs steps strictly
//!   one after another and decides continue-vs-stop,
//! - per-step status bookkeeping ([`board`]),
//! - single-shot abort of the running step ([`abort`]),
//! - the independent elapsed-time reporter ([`elapsed`]).

pub mod abort;
pub mod board;
pub mod coordinator;
pub mod elapsed;

pub use abort::AbortHandle;
pub use board::StepBoard;
pub use coordinator::{Coordinator, CoordinatorOptions, DEFAULT_KILL_GRACE};
pub use elapsed::{ELAPSED_TICK, ElapsedReporter, format_elapsed};
