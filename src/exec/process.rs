// src/exec/process.rs

//! Shell-backed step processes.
//!
//! Each step runs as `<shell> -c "<command>"` in its own process group, with
//! the run environment layered over the inherited one. Stdout is pumped into
//! the status sink chunk by chunk; stderr is drained in the background and
//! handed back with the exit status.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::{InstallerError, Result};
use crate::exec::backend::{
    LaunchRequest, LaunchedProcess, ProcessBackend, ProcessExit, ProcessGroup, TerminationSignal,
};
use crate::sink::StatusSink;

/// Interpreter used when neither the plan nor the CLI names one.
pub const DEFAULT_SHELL: &str = "/bin/bash";

const READ_CHUNK: usize = 8 * 1024;

/// Production backend spawning real processes through a shell.
#[derive(Debug, Clone)]
pub struct ShellBackend {
    shell: PathBuf,
}

impl ShellBackend {
    pub fn new(shell: impl Into<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
        }
    }

    pub fn shell(&self) -> &Path {
        &self.shell
    }
}

impl Default for ShellBackend {
    fn default() -> Self {
        Self::new(DEFAULT_SHELL)
    }
}

impl ProcessBackend for ShellBackend {
    fn launch(
        &self,
        request: LaunchRequest<'_>,
        sink: Arc<dyn StatusSink>,
    ) -> Result<LaunchedProcess> {
        let step = request.step;
        info!(
            index = request.index,
            step = %step.name,
            cmd = %step.command,
            shell = %self.shell.display(),
            cwd = %request.cwd.display(),
            "starting step process"
        );

        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c")
            .arg(&step.command)
            .current_dir(request.cwd)
            .envs(request.env.iter())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| InstallerError::LaunchError {
            step: step.name.clone(),
            source,
        })?;

        let pid = child.id().ok_or_else(|| InstallerError::LaunchError {
            step: step.name.clone(),
            source: io::Error::other("process exited before its pid could be read"),
        })?;
        let group = ProcessGroup::new(pid);
        debug!(index = request.index, pgid = pid, "step process spawned");

        let stdout = child.stdout.take();
        let stderr = child
            .stderr
            .take()
            .map(|stderr| tokio::spawn(collect_stderr(stderr)));

        let exit = Box::pin(async move {
            if let Some(stdout) = stdout {
                pump_stdout(stdout, &*sink).await?;
            }

            let stderr = match stderr {
                Some(handle) => handle.await.map_err(io::Error::other)??,
                None => String::new(),
            };

            let status = child.wait().await?;
            Ok::<_, io::Error>(ProcessExit::from_status(status, stderr))
        });

        Ok(LaunchedProcess { group, exit })
    }

    fn signal_group(&self, group: ProcessGroup, signal: TerminationSignal) -> Result<()> {
        signal_process_group(group, signal)?;
        Ok(())
    }

    fn group_exists(&self, group: ProcessGroup) -> Result<bool> {
        Ok(process_group_exists(group)?)
    }
}

fn checked_pgid(group: ProcessGroup) -> io::Result<libc::pid_t> {
    let pgid = libc::pid_t::try_from(group.id())
        .map_err(|_| io::Error::other(format!("process group id {group} out of range")))?;
    // kill(0) / kill(-1) would hit our own group or every process we may signal.
    if pgid <= 1 {
        return Err(io::Error::other(format!(
            "refusing to signal reserved process group {pgid}"
        )));
    }
    Ok(pgid)
}

/// Send `signal` to every member of `group`.
///
/// A group that has already disappeared (`ESRCH`) counts as success: the
/// process finished on its own before the signal could reach it.
pub fn signal_process_group(group: ProcessGroup, signal: TerminationSignal) -> io::Result<()> {
    let pgid = checked_pgid(group)?;
    let signo = match signal {
        TerminationSignal::Terminate => libc::SIGTERM,
        TerminationSignal::Kill => libc::SIGKILL,
    };

    // SAFETY: kill(2) has no memory-safety preconditions.
    let rc = unsafe { libc::kill(-pgid, signo) };
    if rc == 0 {
        debug!(pgid, signo, "signaled process group");
        return Ok(());
    }

    let err = io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        debug!(pgid, signo, "process group already gone; nothing to signal");
        return Ok(());
    }
    Err(err)
}

/// Probe `group` with signal 0.
///
/// Unreaped zombies still count as members, so callers should bound how long
/// they wait for this to turn `false`.
pub fn process_group_exists(group: ProcessGroup) -> io::Result<bool> {
    let pgid = checked_pgid(group)?;

    // SAFETY: kill(2) with signal 0 only checks for existence and permission.
    if unsafe { libc::kill(-pgid, 0) } == 0 {
        return Ok(true);
    }

    let err = io::Error::last_os_error();
    match err.raw_os_error() {
        Some(libc::ESRCH) => Ok(false),
        // Someone is there, we just may not signal them.
        Some(libc::EPERM) => Ok(true),
        _ => Err(err),
    }
}

/// Forward everything the step writes to stdout as soon as it arrives.
async fn pump_stdout<R>(mut stdout: R, sink: &dyn StatusSink) -> io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; READ_CHUNK];
    let mut pending: Vec<u8> = Vec::new();

    loop {
        let n = stdout.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        pending.extend_from_slice(&buf[..n]);
        let text = drain_utf8(&mut pending);
        if !text.is_empty() {
            sink.on_log_appended(&text);
        }
    }

    if !pending.is_empty() {
        sink.on_log_appended(&String::from_utf8_lossy(&pending));
    }
    Ok(())
}

async fn collect_stderr<R>(mut stderr: R) -> io::Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut bytes = Vec::new();
    stderr.read_to_end(&mut bytes).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Take the longest decodable prefix out of `pending`.
///
/// A multi-byte character split across two reads stays in `pending` until the
/// rest of it arrives. Genuinely invalid bytes are replaced lossily.
fn drain_utf8(pending: &mut Vec<u8>) -> String {
    match std::str::from_utf8(pending.as_slice()) {
        Ok(text) => {
            let text = text.to_owned();
            pending.clear();
            text
        }
        Err(e) if e.error_len().is_none() => {
            let tail = pending.split_off(e.valid_up_to());
            let text = String::from_utf8_lossy(pending.as_slice()).into_owned();
            *pending = tail;
            text
        }
        Err(_) => {
            let text = String::from_utf8_lossy(pending.as_slice()).into_owned();
            pending.clear();
            text
        }
    }
}
