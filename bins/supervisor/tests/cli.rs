//! Runs the `supervisor` binary as a child process.

use chroma_icc::{ProducerChannel, ResourceError, ResourceNames};
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

fn supervisor() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_supervisor"));
    cmd.env("RUST_LOG", "debug")
        .stdout(Stdio::null())
        .stderr(Stdio::inherit());
    cmd
}

fn namespace(tag: &str) -> String {
    format!("chroma_cli_{}_{tag}", std::process::id())
}

/// Polls until the supervisor has created its names.
fn wait_until_serving(child: &mut Child, names: &ResourceNames) {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        if ProducerChannel::attach(names).is_ok() {
            return;
        }
        if let Some(status) = child.try_wait().unwrap() {
            panic!("supervisor exited early: {status}");
        }
        assert!(Instant::now() < deadline, "supervisor never came up");
        std::thread::sleep(Duration::from_millis(10));
    }
}

fn wait_with_deadline(child: &mut Child) -> ExitStatus {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        if let Some(status) = child.try_wait().unwrap() {
            return status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            panic!("supervisor did not exit before the deadline");
        }
        std::thread::sleep(Duration::from_millis(10));
    }
}

fn terminate(child: &Child) {
    kill(Pid::from_raw(child.id() as i32), Signal::SIGTERM).unwrap();
}

#[test]
fn zero_limit_is_rejected() {
    let status = supervisor().args(["-n", "0"]).status().unwrap();
    assert!(!status.success());
}

#[test]
fn malformed_delay_is_rejected() {
    let status = supervisor().args(["--delay", "soon"]).status().unwrap();
    assert!(!status.success());
}

#[test]
fn missing_config_file_is_an_error() {
    let status = supervisor()
        .args(["--config", "/nonexistent/supervisor.toml"])
        .status()
        .unwrap();
    assert!(!status.success());
}

#[test]
fn sigterm_without_producers_cleans_up_and_exits_zero() {
    let ns = namespace("sigterm");
    let names = ResourceNames::with_namespace(&ns);
    let mut child = supervisor()
        .args(["-n", "1", "--namespace", &ns])
        .spawn()
        .unwrap();

    wait_until_serving(&mut child, &names);
    terminate(&child);

    let status = wait_with_deadline(&mut child);
    assert!(status.success(), "{status}");
    assert!(matches!(
        ProducerChannel::attach(&names),
        Err(ResourceError::MissingOwner { .. })
    ));
}

#[test]
fn sigterm_during_startup_delay_exits_promptly() {
    let ns = namespace("delay");
    let names = ResourceNames::with_namespace(&ns);
    let mut child = supervisor()
        .args(["-w", "60", "--namespace", &ns])
        .spawn()
        .unwrap();

    wait_until_serving(&mut child, &names);
    let sent = Instant::now();
    terminate(&child);

    let status = wait_with_deadline(&mut child);
    assert!(status.success(), "{status}");
    assert!(sent.elapsed() < Duration::from_secs(5));
    assert!(ProducerChannel::attach(&names).is_err());
}

#[test]
fn second_supervisor_in_namespace_fails() {
    let ns = namespace("second");
    let names = ResourceNames::with_namespace(&ns);
    let mut first = supervisor().args(["--namespace", &ns]).spawn().unwrap();
    wait_until_serving(&mut first, &names);

    let status = supervisor().args(["--namespace", &ns]).status().unwrap();
    assert!(!status.success());

    // The failed start must not have removed the running supervisor's names.
    assert!(ProducerChannel::attach(&names).is_ok());

    terminate(&first);
    assert!(wait_with_deadline(&mut first).success());
}
