// tests/worker_process.rs

#![cfg(unix)]

use std::time::Duration;

use regex::Regex;
use tokio::time::timeout;

use freshrun::errors::FreshrunError;
use freshrun::exec::{RestartToken, WorkerExit, WorkerSpec, start_worker};
use freshrun::output::{OutputSink, RecordKind};

fn spec(dir: &std::path::Path, cmd: &str, ready: Option<&str>) -> WorkerSpec {
    WorkerSpec {
        cmd: cmd.to_string(),
        dir: dir.to_path_buf(),
        ready_on_stdout: ready.map(|r| Regex::new(r).expect("regex")),
        ready_timeout: Duration::from_secs(5),
        grace_period: Duration::from_millis(300),
    }
}

#[tokio::test]
async fn ready_line_then_cancel_terminates_worker() {
    let dir = tempfile::tempdir().expect("tempdir");
    let sink = OutputSink::detached("demo");
    let token = RestartToken::new();

    let running = timeout(
        Duration::from_secs(5),
        start_worker(
            spec(dir.path(), "echo booting; echo listening on 8080; exec sleep 30", Some("listening")),
            token.signal(),
            sink.clone(),
        ),
    )
    .await
    .expect("ready in time")
    .expect("started");
    assert!(running.pid.is_some());

    let handle = tokio::spawn(running.supervision);
    token.close();
    let exit = timeout(Duration::from_secs(5), handle)
        .await
        .expect("terminated in time")
        .expect("join");
    assert_eq!(exit, WorkerExit::Cancelled);

    let stdout = sink.records(RecordKind::Stdout);
    assert!(stdout.iter().any(|r| r.message == "booting"));
}

#[tokio::test]
async fn sigterm_ignoring_worker_is_killed_after_grace() {
    let dir = tempfile::tempdir().expect("tempdir");
    let sink = OutputSink::detached("demo");
    let token = RestartToken::new();

    let running = start_worker(
        spec(
            dir.path(),
            "trap '' TERM; echo up; while true; do sleep 0.1; done",
            Some("^up$"),
        ),
        token.signal(),
        sink,
    )
    .await
    .expect("started");

    let handle = tokio::spawn(running.supervision);
    token.close();
    let exit = timeout(Duration::from_secs(5), handle)
        .await
        .expect("killed in time")
        .expect("join");
    assert_eq!(exit, WorkerExit::Cancelled);
}

#[tokio::test]
async fn failing_before_readiness_is_a_start_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let token = RestartToken::new();

    let err = start_worker(
        spec(dir.path(), "echo nope >&2; exit 2", Some("listening")),
        token.signal(),
        OutputSink::detached("demo"),
    )
    .await
    .expect_err("worker died");
    assert!(matches!(err, FreshrunError::WorkerStart(_)));
}

#[tokio::test]
async fn natural_exit_is_logged() {
    let dir = tempfile::tempdir().expect("tempdir");
    let sink = OutputSink::detached("demo");
    let token = RestartToken::new();

    let running = start_worker(
        spec(dir.path(), "echo hi; echo warn >&2", None),
        token.signal(),
        sink.clone(),
    )
    .await
    .expect("started");
    let exit = timeout(Duration::from_secs(5), running.supervision)
        .await
        .expect("exited");
    assert_eq!(exit, WorkerExit::Exited(Some(0)));

    let logs = sink.records(RecordKind::Log);
    assert!(logs.iter().any(|r| r.message.contains("worker exited")));
}

#[tokio::test]
async fn invalid_utf8_output_does_not_stop_streaming() {
    let dir = tempfile::tempdir().expect("tempdir");
    let sink = OutputSink::detached("demo");
    let token = RestartToken::new();

    let running = timeout(
        Duration::from_secs(5),
        start_worker(
            spec(
                dir.path(),
                r"printf 'first\n\377\376bad\nlistening\n'; printf '\377err\nerr after\n' >&2; echo after; exec sleep 30",
                Some("^listening$"),
            ),
            token.signal(),
            sink.clone(),
        ),
    )
    .await
    .expect("readiness matched after invalid bytes")
    .expect("started");
    let handle = tokio::spawn(running.supervision);

    let streamed = timeout(Duration::from_secs(5), async {
        loop {
            let stdout = sink.records(RecordKind::Stdout);
            let stderr = sink.records(RecordKind::Error);
            if stdout.iter().any(|r| r.message == "after")
                && stderr.iter().any(|r| r.message == "err after")
            {
                return (stdout, stderr);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;

    token.close();
    let exit = timeout(Duration::from_secs(5), handle)
        .await
        .expect("terminated in time")
        .expect("join");
    assert_eq!(exit, WorkerExit::Cancelled);

    let (stdout, stderr) = streamed.expect("lines after invalid bytes were recorded");
    let lines: Vec<&str> = stdout.iter().map(|r| r.message.as_str()).collect();
    assert_eq!(lines[0], "first");
    assert!(lines[1].ends_with("bad"));
    assert!(lines[1].contains('\u{FFFD}'));
    assert_eq!(&lines[2..], ["listening", "after"]);
    assert!(stderr.iter().any(|r| r.message.ends_with("err") && r.message.contains('\u{FFFD}')));
}

#[tokio::test]
async fn stale_generation_never_spawns() {
    let dir = tempfile::tempdir().expect("tempdir");
    let marker = dir.path().join("spawned");
    let mut token = RestartToken::new();
    let stale = token.signal();
    token.replace();

    let err = start_worker(
        spec(dir.path(), &format!("touch {}; exec sleep 30", marker.display()), None),
        stale,
        OutputSink::detached("demo"),
    )
    .await
    .expect_err("superseded generation");
    assert!(matches!(err, FreshrunError::WorkerStart(msg) if msg.contains("superseded")));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!marker.exists());
}
