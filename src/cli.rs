// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `ido-installer`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "ido-installer",
    version,
    about = "Run a cluster installation plan step by step.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the plan file (TOML) produced by the setup wizard.
    #[arg(long, value_name = "PATH", default_value = "Install.toml")]
    pub plan: String,

    /// Installer root used as the working directory of every step.
    ///
    /// Overrides `[config].root` from the plan.
    #[arg(long, value_name = "DIR")]
    pub root: Option<String>,

    /// Shell used to run each step as `<shell> -c "<command>"`.
    ///
    /// Overrides `[config].shell` from the plan.
    #[arg(long, value_name = "PATH")]
    pub shell: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `IDO_INSTALLER_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate the plan and print it, but don't run any step.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
