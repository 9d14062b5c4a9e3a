// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

use crate::types::StepStatus;

#[derive(Error, Debug)]
pub enum InstallerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// The step's process could not be started (missing shell, bad cwd, ...).
    #[error("failed to launch step '{step}': {source}")]
    LaunchError {
        step: String,
        #[source]
        source: std::io::Error,
    },

    #[error("illegal status change for step {index}: {from} -> {to}")]
    InvalidTransition {
        index: usize,
        from: StepStatus,
        to: StepStatus,
    },

    #[error("step {0} cannot start before every earlier step is done")]
    StepOutOfOrder(usize),

    #[error("step index {0} is out of range")]
    UnknownStep(usize),
}

pub type Result<T> = std::result::Result<T, InstallerError>;
