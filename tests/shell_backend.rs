// tests/shell_backend.rs

use ido_installer_test_utils::builders::{env, steps};
use ido_installer_test_utils::recording_sink::RecordingSink;
use ido_installer_test_utils::{init_tracing, wait_until_armed, with_timeout};

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use ido_installer::engine::{Coordinator, CoordinatorOptions};
use ido_installer::exec::ShellBackend;
use ido_installer::types::{RunEnvironment, RunOutcome, StepStatus};

type TestResult = Result<(), Box<dyn Error>>;

fn sh_coordinator(
    sink: &Arc<RecordingSink>,
    root: &std::path::Path,
) -> Coordinator<ShellBackend> {
    let options = CoordinatorOptions::new(root).with_kill_grace(Duration::from_secs(1));
    Coordinator::new(ShellBackend::new("/bin/sh"), sink.clone(), options)
}

#[tokio::test]
async fn stdout_env_and_cwd_reach_the_step() -> TestResult {
    init_tracing();
    let root = tempfile::tempdir()?;
    let sink = Arc::new(RecordingSink::new());
    let coord = sh_coordinator(&sink, root.path());

    let plan = steps(&[
        ("Print env", "echo \"url=$IDO_CLUSTER_URL\""),
        ("Print cwd", "pwd -P"),
    ]);
    let vars = env(&[("IDO_CLUSTER_URL", "https://cluster.example")]);

    let outcome = with_timeout(coord.run(&plan, &vars)).await;

    assert_eq!(outcome, RunOutcome::Completed);
    let log = sink.log();
    assert!(log.contains("url=https://cluster.example\n"), "log was: {log}");
    let canonical = root.path().canonicalize()?;
    assert!(
        log.contains(&format!("{}\n", canonical.display())),
        "log was: {log}"
    );
    Ok(())
}

#[tokio::test]
async fn inherited_environment_is_kept() -> TestResult {
    init_tracing();
    let root = tempfile::tempdir()?;
    let sink = Arc::new(RecordingSink::new());
    let coord = sh_coordinator(&sink, root.path());

    // PATH is not part of the run environment; it comes from the parent.
    let plan = steps(&[("Uses PATH", "sleep 0 && echo ok")]);
    let outcome = with_timeout(coord.run(&plan, &RunEnvironment::new())).await;

    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(sink.log(), "ok\n");
    Ok(())
}

#[tokio::test]
async fn stderr_follows_stdout_when_step_fails() -> TestResult {
    init_tracing();
    let root = tempfile::tempdir()?;
    let sink = Arc::new(RecordingSink::new());
    let coord = sh_coordinator(&sink, root.path());

    let plan = steps(&[
        ("Fails", "echo before; echo 'no such chart' >&2; exit 4"),
        ("Never", "echo never"),
    ]);
    let outcome = with_timeout(coord.run(&plan, &RunEnvironment::new())).await;

    assert_eq!(outcome, RunOutcome::StepFailed(0));
    let log = sink.log();
    assert!(log.starts_with("before\n"), "log was: {log}");
    assert!(log.contains("no such chart"));
    assert!(!log.contains("never"));
    assert_eq!(
        sink.final_statuses(2),
        vec![StepStatus::Failed, StepStatus::Pending]
    );
    Ok(())
}

#[tokio::test]
async fn stderr_of_successful_step_is_not_shown() -> TestResult {
    init_tracing();
    let root = tempfile::tempdir()?;
    let sink = Arc::new(RecordingSink::new());
    let coord = sh_coordinator(&sink, root.path());

    let plan = steps(&[("Warns", "echo warning >&2; echo fine")]);
    let outcome = with_timeout(coord.run(&plan, &RunEnvironment::new())).await;

    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(sink.log(), "fine\n");
    Ok(())
}

#[tokio::test]
async fn missing_shell_is_a_launch_failure() -> TestResult {
    init_tracing();
    let root = tempfile::tempdir()?;
    let sink = Arc::new(RecordingSink::new());
    let options = CoordinatorOptions::new(root.path());
    let coord = Coordinator::new(
        ShellBackend::new("/definitely/not/a/shell"),
        sink.clone(),
        options,
    );

    let plan = steps(&[("A", "echo a"), ("B", "echo b")]);
    let outcome = with_timeout(coord.run(&plan, &RunEnvironment::new())).await;

    assert_eq!(outcome, RunOutcome::LaunchFailed(0));
    assert_eq!(
        sink.final_statuses(2),
        vec![StepStatus::Failed, StepStatus::Pending]
    );
    assert!(sink.log().contains("failed to launch step 'A'"), "log was: {}", sink.log());
    Ok(())
}

#[tokio::test]
async fn abort_terminates_long_running_step() -> TestResult {
    init_tracing();
    let root = tempfile::tempdir()?;
    let sink = Arc::new(RecordingSink::new());
    let coord = sh_coordinator(&sink, root.path());
    let abort = coord.abort_handle();

    let plan = steps(&[("Wait", "echo started; sleep 100"), ("After", "echo after")]);
    let env = RunEnvironment::new();

    let (outcome, requested) = with_timeout(async {
        tokio::join!(coord.run(&plan, &env), async {
            wait_until_armed(&abort).await;
            abort.request_abort()
        })
    })
    .await;

    assert!(requested);
    assert_eq!(outcome, RunOutcome::Aborted);
    assert_eq!(
        sink.final_statuses(2),
        vec![StepStatus::Cancelled, StepStatus::Pending]
    );
    assert!(!sink.log().contains("after"));
    Ok(())
}

/// Process state letter from `/proc/<pid>/stat`, or `None` once it is gone.
#[cfg(target_os = "linux")]
fn proc_state(pid: u32) -> Option<char> {
    let stat = std::fs::read_to_string(format!("/proc/{pid}/stat")).ok()?;
    // The command name is parenthesised and may contain spaces.
    let after_comm = stat.rsplit_once(')')?.1;
    after_comm.trim_start().chars().next()
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn abort_reaches_grandchildren() -> TestResult {
    init_tracing();
    let root = tempfile::tempdir()?;
    let pid_file = root.path().join("grandchild.pid");
    let sink = Arc::new(RecordingSink::new());
    let coord = sh_coordinator(&sink, root.path());
    let abort = coord.abort_handle();

    let plan = steps(&[(
        "Spawns",
        "sleep 100 & echo $! > grandchild.pid; wait",
    )]);
    let env = RunEnvironment::new();

    let (outcome, grandchild) = with_timeout(async {
        tokio::join!(coord.run(&plan, &env), async {
            wait_until_armed(&abort).await;
            let mut pid = None;
            for _ in 0..200 {
                if let Ok(text) = std::fs::read_to_string(&pid_file) {
                    if let Ok(parsed) = text.trim().parse::<u32>() {
                        pid = Some(parsed);
                        break;
                    }
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            abort.request_abort();
            pid
        })
    })
    .await;

    assert_eq!(outcome, RunOutcome::Aborted);
    let grandchild = grandchild.ok_or("grandchild pid was never written")?;

    // The orphaned sleep is reparented; once signaled it is either reaped or
    // left as a zombie, never running.
    let mut state = proc_state(grandchild);
    for _ in 0..100 {
        if matches!(state, None | Some('Z')) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        state = proc_state(grandchild);
    }
    assert!(
        matches!(state, None | Some('Z')),
        "grandchild {grandchild} still alive in state {state:?}"
    );
    Ok(())
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn abort_kills_descendant_that_ignores_term() -> TestResult {
    init_tracing();
    let root = tempfile::tempdir()?;
    let pid_file = root.path().join("stubborn.pid");
    let sink = Arc::new(RecordingSink::new());
    let options = CoordinatorOptions::new(root.path()).with_kill_grace(Duration::from_secs(1));
    let coord = Coordinator::new(ShellBackend::new("/bin/sh"), sink.clone(), options);
    let abort = coord.abort_handle();

    // The descendant detaches from the step's pipes, so the leader's exit
    // alone says nothing about it.
    let plan = steps(&[(
        "Detaches",
        "(trap '' TERM; exec sleep 100) >/dev/null 2>&1 </dev/null & \
         echo $! > stubborn.pid; sleep 100",
    )]);
    let env = RunEnvironment::new();

    let (outcome, stubborn) = with_timeout(async {
        tokio::join!(coord.run(&plan, &env), async {
            wait_until_armed(&abort).await;
            let mut pid = None;
            for _ in 0..200 {
                if let Ok(text) = std::fs::read_to_string(&pid_file) {
                    if let Ok(parsed) = text.trim().parse::<u32>() {
                        pid = Some(parsed);
                        break;
                    }
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            abort.request_abort();
            pid
        })
    })
    .await;

    assert_eq!(outcome, RunOutcome::Aborted);
    let stubborn = stubborn.ok_or("descendant pid was never written")?;

    // Checked right at run end: SIGKILL has already been delivered.
    let mut state = proc_state(stubborn);
    for _ in 0..10 {
        if matches!(state, None | Some('Z')) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        state = proc_state(stubborn);
    }
    assert!(
        matches!(state, None | Some('Z')),
        "descendant {stubborn} outlived the aborted run in state {state:?}"
    );
    Ok(())
}
