//! End-to-end tests against the `shutdownd` binary.

#![cfg(unix)]

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

const READY_LINE: &str = "Shutdown triggers armed";

fn scratch_dir(test: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("shutdownd-{}-{}", test, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Spawn the daemon and block until it reports its triggers are armed.
fn spawn_daemon(args: &[&str]) -> Child {
    let mut child = Command::new(env!("CARGO_BIN_EXE_shutdownd"))
        .args(args)
        .args(["--log-level", "info"])
        .env_remove("RUST_LOG")
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn shutdownd");

    let stdout = child.stdout.take().unwrap();
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in BufReader::new(stdout).lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok(line) if line.contains(READY_LINE) => break,
            Ok(_) => continue,
            Err(_) => {
                let _ = child.kill();
                panic!("shutdownd never became ready");
            }
        }
    }
    // Keep draining so the daemon never blocks on a full pipe.
    thread::spawn(move || while rx.recv().is_ok() {});
    child
}

fn wait_exit(child: &mut Child, timeout: Duration) -> ExitStatus {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait().unwrap() {
            return status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            panic!("shutdownd did not exit within {:?}", timeout);
        }
        thread::sleep(Duration::from_millis(20));
    }
}

fn path_arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_sigterm_removes_pid_file_and_exits_cleanly() {
    let dir = scratch_dir("sigterm");
    let pid_file = dir.join("shutdownd.pid");

    let mut child = spawn_daemon(&["--pid-file", path_arg(&pid_file)]);
    let written = std::fs::read_to_string(&pid_file).unwrap();
    assert_eq!(written.trim(), child.id().to_string());

    let status = Command::new("kill")
        .args(["-TERM", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());

    let status = wait_exit(&mut child, Duration::from_secs(10));
    assert_eq!(status.code(), Some(0));
    assert!(!pid_file.exists());

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_sentinel_file_stops_daemon() {
    let dir = scratch_dir("sentinel");
    let sentinel = dir.join("stop");
    let pid_file = dir.join("shutdownd.pid");
    let config = dir.join("shutdownd.toml");
    std::fs::write(
        &config,
        format!(
            r#"
[shutdown]
callback_timeout_secs = 5

[shutdown.file_trigger]
path = "{}"
poll_interval_ms = 50
"#,
            sentinel.display()
        ),
    )
    .unwrap();

    let mut child = spawn_daemon(&[
        "--config",
        path_arg(&config),
        "--pid-file",
        path_arg(&pid_file),
    ]);
    assert!(pid_file.exists());

    std::fs::write(&sentinel, b"").unwrap();

    let status = wait_exit(&mut child, Duration::from_secs(10));
    assert_eq!(status.code(), Some(0));
    assert!(!pid_file.exists());
    assert!(!sentinel.exists());

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_invalid_config_is_rejected() {
    let dir = scratch_dir("invalid");
    let config = dir.join("shutdownd.toml");
    std::fs::write(&config, "[shutdown]\ncallback_timeout_secs = 0\n").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_shutdownd"))
        .args(["--config", path_arg(&config)])
        .output()
        .unwrap();
    assert!(!output.status.success());

    std::fs::remove_dir_all(&dir).unwrap();
}
