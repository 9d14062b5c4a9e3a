use std::collections::{HashMap, HashSet};
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

use ido_installer::errors::{InstallerError, Result};
use ido_installer::exec::{
    LaunchRequest, LaunchedProcess, ProcessBackend, ProcessExit, ProcessGroup, TerminationSignal,
};
use ido_installer::sink::StatusSink;

const SIGKILL: i32 = 9;
const SIGTERM: i32 = 15;

/// What a fake step process does once launched.
#[derive(Debug, Clone)]
pub enum FakeBehaviour {
    /// Write `stdout` to the sink, then exit with `code` and `stderr`.
    ///
    /// Resolves on first poll, so the step is never observable as abortable.
    Exit {
        code: i32,
        stdout: String,
        stderr: String,
    },
    /// Run until the group is signaled.
    Hang,
    /// Run until the group is killed; SIGTERM is ignored.
    IgnoreTerm,
    /// The leader exits on SIGTERM, but a descendant that ignores it keeps
    /// the group alive until it is killed.
    OrphanIgnoresTerm,
    /// The process cannot be started at all.
    FailLaunch,
}

impl FakeBehaviour {
    pub fn exit(code: i32) -> Self {
        FakeBehaviour::Exit {
            code,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    pub fn output(code: i32, stdout: &str, stderr: &str) -> Self {
        FakeBehaviour::Exit {
            code,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        }
    }

    /// Commands of the form `exit N` exit with `N`; anything else succeeds.
    fn from_command(command: &str) -> Self {
        let code = command
            .trim()
            .strip_prefix("exit ")
            .and_then(|n| n.trim().parse().ok())
            .unwrap_or(0);
        FakeBehaviour::exit(code)
    }
}

/// One recorded `launch` call.
#[derive(Debug, Clone)]
pub struct LaunchRecord {
    pub index: usize,
    pub name: String,
    pub command: String,
    pub cwd: PathBuf,
    pub env: Vec<(String, String)>,
    pub group: Option<ProcessGroup>,
}

struct Hanging {
    ignore_term: bool,
    leaves_orphan: bool,
    exit_tx: oneshot::Sender<ProcessExit>,
}

#[derive(Default)]
struct FakeState {
    next_pgid: u32,
    launches: Vec<LaunchRecord>,
    signals: Vec<(ProcessGroup, TerminationSignal)>,
    hanging: HashMap<ProcessGroup, Hanging>,
    orphaned: HashSet<ProcessGroup>,
}

/// A process backend that spawns nothing.
///
/// - records every launch and every group signal
/// - resolves processes according to a per-command [`FakeBehaviour`]
///
/// Clones share state, so a test can keep one clone for inspection while the
/// coordinator owns another.
#[derive(Clone, Default)]
pub struct FakeBackend {
    behaviours: Arc<HashMap<String, FakeBehaviour>>,
    state: Arc<Mutex<FakeState>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give `command` a specific behaviour.
    pub fn with(mut self, command: &str, behaviour: FakeBehaviour) -> Self {
        Arc::make_mut(&mut self.behaviours).insert(command.to_string(), behaviour);
        self
    }

    pub fn launches(&self) -> Vec<LaunchRecord> {
        self.state.lock().unwrap().launches.clone()
    }

    pub fn launched_names(&self) -> Vec<String> {
        self.launches().into_iter().map(|l| l.name).collect()
    }

    pub fn signals(&self) -> Vec<(ProcessGroup, TerminationSignal)> {
        self.state.lock().unwrap().signals.clone()
    }

    /// Number of `signal` deliveries to `group`.
    pub fn signal_count(&self, group: ProcessGroup, signal: TerminationSignal) -> usize {
        self.signals()
            .into_iter()
            .filter(|(g, s)| *g == group && *s == signal)
            .count()
    }

    fn behaviour_for(&self, command: &str) -> FakeBehaviour {
        self.behaviours
            .get(command)
            .cloned()
            .unwrap_or_else(|| FakeBehaviour::from_command(command))
    }
}

impl ProcessBackend for FakeBackend {
    fn launch(
        &self,
        request: LaunchRequest<'_>,
        sink: Arc<dyn StatusSink>,
    ) -> Result<LaunchedProcess> {
        let behaviour = self.behaviour_for(&request.step.command);
        let mut state = self.state.lock().unwrap();

        let mut record = LaunchRecord {
            index: request.index,
            name: request.step.name.clone(),
            command: request.step.command.clone(),
            cwd: request.cwd.to_path_buf(),
            env: request
                .env
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            group: None,
        };

        if let FakeBehaviour::FailLaunch = behaviour {
            state.launches.push(record);
            return Err(InstallerError::LaunchError {
                step: request.step.name.clone(),
                source: io::Error::new(io::ErrorKind::NotFound, "fake shell not found"),
            });
        }

        state.next_pgid += 1;
        let group = ProcessGroup::new(10_000 + state.next_pgid);
        record.group = Some(group);
        state.launches.push(record);

        let exit: ido_installer::exec::ExitFuture = match behaviour {
            FakeBehaviour::Exit {
                code,
                stdout,
                stderr,
            } => Box::pin(async move {
                if !stdout.is_empty() {
                    sink.on_log_appended(&stdout);
                }
                Ok(ProcessExit::exited(code, stderr))
            }),
            FakeBehaviour::Hang
            | FakeBehaviour::IgnoreTerm
            | FakeBehaviour::OrphanIgnoresTerm => {
                let (exit_tx, exit_rx) = oneshot::channel();
                state.hanging.insert(
                    group,
                    Hanging {
                        ignore_term: matches!(behaviour, FakeBehaviour::IgnoreTerm),
                        leaves_orphan: matches!(behaviour, FakeBehaviour::OrphanIgnoresTerm),
                        exit_tx,
                    },
                );
                Box::pin(async move {
                    exit_rx
                        .await
                        .map_err(|_| io::Error::other("fake process abandoned"))
                })
            }
            FakeBehaviour::FailLaunch => unreachable!("handled above"),
        };

        Ok(LaunchedProcess { group, exit })
    }

    fn signal_group(&self, group: ProcessGroup, signal: TerminationSignal) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.signals.push((group, signal));
        if signal == TerminationSignal::Kill {
            state.orphaned.remove(&group);
        }

        let resolves = match state.hanging.get(&group) {
            Some(h) => signal == TerminationSignal::Kill || !h.ignore_term,
            None => false,
        };
        if resolves {
            if let Some(h) = state.hanging.remove(&group) {
                if h.leaves_orphan && signal == TerminationSignal::Terminate {
                    state.orphaned.insert(group);
                }
                let signo = match signal {
                    TerminationSignal::Terminate => SIGTERM,
                    TerminationSignal::Kill => SIGKILL,
                };
                let _ = h.exit_tx.send(ProcessExit::signaled(signo));
            }
        }
        Ok(())
    }

    fn group_exists(&self, group: ProcessGroup) -> Result<bool> {
        let state = self.state.lock().unwrap();
        Ok(state.hanging.contains_key(&group) || state.orphaned.contains(&group))
    }
}
