// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod sink;
pub mod types;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{PlanFile, load_and_validate};
use crate::engine::{AbortHandle, Coordinator, CoordinatorOptions};
use crate::exec::ShellBackend;
use crate::sink::ConsoleSink;
use crate::types::RunOutcome;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - plan loading
/// - shell backend + console sink
/// - the coordinator
/// - Ctrl-C → abort of the running step
///
/// Returns `None` for `--dry-run`, otherwise the outcome of the run.
pub async fn run(args: CliArgs) -> Result<Option<RunOutcome>> {
    let plan_path = PathBuf::from(&args.plan);
    let plan = load_and_validate(&plan_path)
        .with_context(|| format!("loading plan {}", plan_path.display()))?;

    let root_dir = installer_root_dir(
        &plan_path,
        plan.config().root.as_deref(),
        args.root.as_deref(),
    );
    let shell = args.shell.clone().unwrap_or_else(|| plan.config().shell.clone());

    if args.dry_run {
        print_dry_run(&plan, &root_dir, &shell);
        return Ok(None);
    }

    let options = CoordinatorOptions::new(&root_dir)
        .with_kill_grace(Duration::from_secs(plan.config().kill_grace_secs));

    let step_names = plan.steps().iter().map(|s| s.name.clone()).collect();
    let sink = Arc::new(ConsoleSink::new(step_names));
    let coordinator = Coordinator::new(ShellBackend::new(shell), sink, options);

    let ctrl_c = tokio::spawn(abort_on_ctrl_c(coordinator.abort_handle()));

    let outcome = coordinator.run(plan.steps(), plan.env()).await;

    ctrl_c.abort();
    Ok(Some(outcome))
}

/// Every Ctrl-C aborts whatever step is running at that moment.
async fn abort_on_ctrl_c(abort: AbortHandle) {
    loop {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("failed to listen for Ctrl+C: {e}");
            return;
        }
        if abort.request_abort() {
            info!("Ctrl-C received; aborting running step");
        } else {
            warn!("Ctrl-C received but no step is running; nothing to abort");
        }
    }
}

/// Figure out the installer root.
///
/// - `--root` wins, taken as given.
/// - Otherwise `[config].root`, resolved against the plan file's directory
///   when relative.
/// - Otherwise the plan file's directory; a bare filename like
///   `Install.toml` (parent = "") falls back to the current directory.
pub fn installer_root_dir(
    plan_path: &Path,
    plan_root: Option<&Path>,
    cli_root: Option<&str>,
) -> PathBuf {
    if let Some(root) = cli_root {
        return PathBuf::from(root);
    }

    let plan_dir = match plan_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    };

    match plan_root {
        Some(root) if root.is_absolute() => root.to_path_buf(),
        Some(root) => plan_dir.join(root),
        None => plan_dir,
    }
}

/// Simple dry-run output: print steps and the environment names.
fn print_dry_run(plan: &PlanFile, root_dir: &Path, shell: &str) {
    println!("ido-installer dry-run");
    println!("  shell = {shell}");
    println!("  root = {}", root_dir.display());
    println!("  kill_grace_secs = {}", plan.config().kill_grace_secs);
    println!();

    println!("env ({}):", plan.env().len());
    for name in plan.env().names() {
        println!("  - {name}");
    }
    println!();

    println!("steps ({}):", plan.steps().len());
    for (index, step) in plan.steps().iter().enumerate() {
        println!("  {}. {}", index + 1, step.name);
        println!("      cmd: {}", step.command);
    }

    debug!("dry-run complete (no execution)");
}
