//! Signal trigger driven by real signals sent to this test process.
//!
//! Each test subscribes to a different signal so they can run in parallel.

#![cfg(unix)]

use std::io::{BufRead, BufReader};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use graceful_shutdown::lifecycle::{Coordinator, ShutdownState, SignalTrigger, TermSignal};

mod common;
use common::{counting_callback, hanging_callback, RecordingSink};

/// Set in the child process spawned by `test_repeated_signal_forces_exit`.
const FORCE_EXIT_CHILD: &str = "GRACEFUL_SHUTDOWN_FORCE_EXIT_CHILD";

fn send_signal(name: &str) {
    let status = Command::new("kill")
        .arg(format!("-{}", name))
        .arg(std::process::id().to_string())
        .status()
        .expect("failed to run kill");
    assert!(status.success());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_sigterm_runs_all_callbacks_and_reports_failure() {
    let sink = RecordingSink::new();
    let coordinator = Coordinator::new();
    coordinator
        .add_trigger(SignalTrigger::default().exit_on_finish(false))
        .unwrap();
    coordinator.set_error_sink(sink.clone()).unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    coordinator
        .add_callback(counting_callback(calls.clone(), Duration::from_millis(10), None))
        .unwrap();
    coordinator
        .add_callback(counting_callback(calls.clone(), Duration::from_millis(5), Some("disk busy")))
        .unwrap();
    coordinator
        .add_callback(counting_callback(calls.clone(), Duration::ZERO, None))
        .unwrap();
    coordinator.start().unwrap();

    send_signal("TERM");

    tokio::time::timeout(Duration::from_secs(5), coordinator.wait_terminated())
        .await
        .expect("shutdown did not complete after SIGTERM");

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    let errors = sink.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, "callback");
    assert_eq!(errors[0].cause.as_deref(), Some("disk busy"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_repeated_signals_run_one_sequence() {
    let sink = RecordingSink::new();
    let coordinator = Coordinator::new();
    coordinator
        .add_trigger(
            SignalTrigger::new([TermSignal::User2])
                .with_name("usr2")
                .exit_on_finish(false),
        )
        .unwrap();
    coordinator.set_error_sink(sink.clone()).unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    coordinator
        .add_callback(counting_callback(calls.clone(), Duration::from_millis(100), None))
        .unwrap();
    coordinator.start().unwrap();

    let mut states = coordinator.subscribe();
    send_signal("USR2");
    states
        .wait_for(|s| *s != ShutdownState::Idle)
        .await
        .unwrap();
    // Delivered mid-shutdown: must be ignored, not crash the process.
    send_signal("USR2");

    tokio::time::timeout(Duration::from_secs(5), coordinator.wait_terminated())
        .await
        .expect("shutdown did not complete after SIGUSR2");
    send_signal("USR2");
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(sink.errors().is_empty());
}

/// Child side: a shutdown that can never finish on its own.
fn run_force_exit_child() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    runtime.block_on(async {
        let coordinator = Coordinator::new();
        coordinator
            .add_trigger(SignalTrigger::default().force_exit_on_repeat(true))
            .unwrap();
        coordinator.add_callback(hanging_callback()).unwrap();
        coordinator
            .add_callback(graceful_shutdown::lifecycle::callback_fn(|_t: String| async {
                println!("callback running");
                Ok(())
            }))
            .unwrap();
        coordinator.start().unwrap();
        println!("child ready");

        tokio::time::sleep(Duration::from_secs(30)).await;
    });
    panic!("child was never forced to exit");
}

#[test]
fn test_repeated_signal_forces_exit() {
    if std::env::var_os(FORCE_EXIT_CHILD).is_some() {
        run_force_exit_child();
        return;
    }

    let mut child = Command::new(std::env::current_exe().unwrap())
        .args(["--exact", "test_repeated_signal_forces_exit", "--nocapture"])
        .env(FORCE_EXIT_CHILD, "1")
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();

    let (tx, rx) = std::sync::mpsc::channel();
    let stdout = child.stdout.take().unwrap();
    std::thread::spawn(move || {
        for line in BufReader::new(stdout).lines().map_while(Result::ok) {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    let wait_for_line = |wanted: &str| loop {
        let line = rx
            .recv_timeout(Duration::from_secs(10))
            .unwrap_or_else(|_| panic!("child never printed {:?}", wanted));
        if line.contains(wanted) {
            break;
        }
    };
    let kill_term = |pid: u32| {
        let status = Command::new("kill")
            .args(["-TERM", &pid.to_string()])
            .status()
            .unwrap();
        assert!(status.success());
    };

    wait_for_line("child ready");
    kill_term(child.id());
    // The first signal has been consumed once the sequence is running.
    wait_for_line("callback running");
    kill_term(child.id());

    let deadline = std::time::Instant::now() + Duration::from_secs(10);
    let status = loop {
        if let Some(status) = child.try_wait().unwrap() {
            break status;
        }
        if std::time::Instant::now() >= deadline {
            let _ = child.kill();
            panic!("child ignored the repeated signal");
        }
        std::thread::sleep(Duration::from_millis(20));
    };
    assert_eq!(status.code(), Some(graceful_shutdown::lifecycle::signals::EXIT_FORCED));
}
