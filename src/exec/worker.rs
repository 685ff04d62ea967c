// src/exec/worker.rs

//! Long-lived worker process: start, readiness, output streaming and
//! supervision until exit or cancellation.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use regex::Regex;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout};
use tokio::sync::oneshot;
use tokio::time::sleep;
#[cfg(unix)]
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::errors::{FreshrunError, Result};
use crate::exec::command::shell_command;
use crate::exec::restart::RestartSignal;
use crate::output::{LogRecord, OutputSink};
use crate::watch::BoxFuture;

const RUN_TAG: &str = "Run";

/// How a worker's supervision ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerExit {
    /// Process exited on its own.
    Exited(Option<i32>),
    /// Restart token closed; process was terminated.
    Cancelled,
    /// Waiting on the process failed.
    Failed(String),
}

/// A started worker. Driving `supervision` to completion is what keeps the
/// process alive and streamed; dropping it kills the process.
pub struct RunningWorker {
    pub pid: Option<u32>,
    pub supervision: BoxFuture<'static, WorkerExit>,
}

impl std::fmt::Debug for RunningWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunningWorker")
            .field("pid", &self.pid)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct WorkerSpec {
    pub cmd: String,
    pub dir: PathBuf,
    pub ready_on_stdout: Option<Regex>,
    pub ready_timeout: Duration,
    pub grace_period: Duration,
}

/// Spawn the worker and wait until it is considered started.
///
/// Without `ready_on_stdout` the worker is started as soon as the process is
/// spawned. With it, the first matching stdout line marks readiness; if
/// nothing matches within `ready_timeout` the worker is treated as started
/// anyway. Exiting unsuccessfully before readiness is a start failure, and
/// so is a signal whose generation has already been replaced.
pub async fn start_worker(
    spec: WorkerSpec,
    signal: RestartSignal,
    sink: OutputSink,
) -> Result<RunningWorker> {
    if signal.is_superseded() {
        return Err(FreshrunError::WorkerStart(format!(
            "generation {} was superseded before `{}` started",
            signal.generation(),
            spec.cmd
        )));
    }
    info!(cmd = %spec.cmd, generation = signal.generation(), "starting worker");

    let mut cmd = shell_command(&spec.cmd, &spec.dir, None);
    cmd.stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);

    let mut child = cmd
        .spawn()
        .map_err(|e| FreshrunError::WorkerStart(format!("spawning `{}`: {e}", spec.cmd)))?;
    let pid = child.id();

    let (ready_tx, ready_rx) = oneshot::channel();
    if let Some(stdout) = child.stdout.take() {
        spawn_stdout_reader(stdout, spec.ready_on_stdout.clone(), ready_tx, sink.clone());
    }
    if let Some(stderr) = child.stderr.take() {
        spawn_stderr_reader(stderr, sink.clone());
    }

    let mut early_exit = None;
    if spec.ready_on_stdout.is_some() {
        // Stdout closing without a match leaves the timeout or the exit to decide.
        let readiness = async {
            if ready_rx.await.is_err() {
                debug!("stdout closed before readiness line");
                std::future::pending::<()>().await;
            }
        };
        tokio::select! {
            _ = readiness => debug!("worker reported ready"),
            _ = sleep(spec.ready_timeout) => {
                warn!(timeout = ?spec.ready_timeout, "no readiness line from worker; assuming started");
            }
            status = child.wait() => {
                let status = status.map_err(|e| FreshrunError::WorkerStart(e.to_string()))?;
                if !status.success() {
                    return Err(FreshrunError::WorkerStart(format!(
                        "`{}` exited with {status} before becoming ready",
                        spec.cmd
                    )));
                }
                early_exit = Some(status);
            }
        }
    }

    let grace = spec.grace_period;
    let supervision: BoxFuture<'static, WorkerExit> = match early_exit {
        Some(status) => Box::pin(async move { report_exit(&sink, status) }),
        None => Box::pin(supervise(child, signal, grace, sink)),
    };

    Ok(RunningWorker { pid, supervision })
}

fn spawn_stdout_reader(
    stdout: ChildStdout,
    ready_on_stdout: Option<Regex>,
    ready_tx: oneshot::Sender<()>,
    sink: OutputSink,
) {
    tokio::spawn(async move {
        let mut ready_tx = Some(ready_tx);
        for_each_line(stdout, |line| {
            if let Some(re) = &ready_on_stdout
                && re.is_match(&line)
                && let Some(tx) = ready_tx.take()
            {
                debug!("worker readiness line matched");
                let _ = tx.send(());
            }
            sink.stdout(LogRecord::new(line).with_tag(RUN_TAG));
        })
        .await;
        debug!("worker stdout closed");
    });
}

fn spawn_stderr_reader(stderr: ChildStderr, sink: OutputSink) {
    tokio::spawn(async move {
        for_each_line(stderr, |line| {
            sink.error(LogRecord::new(line).with_tag(RUN_TAG));
        })
        .await;
    });
}

/// Drain `reader` until EOF, handing each line (lossily decoded, without the
/// trailing newline) to `on_line`.
async fn for_each_line<R, F>(reader: R, mut on_line: F)
where
    R: AsyncRead + Unpin,
    F: FnMut(String),
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                while matches!(buf.last(), Some(b'\n' | b'\r')) {
                    buf.pop();
                }
                on_line(String::from_utf8_lossy(&buf).into_owned());
            }
            Err(err) => {
                debug!(error = %err, "worker pipe read failed");
                break;
            }
        }
    }
}

async fn supervise(
    mut child: Child,
    signal: RestartSignal,
    grace: Duration,
    sink: OutputSink,
) -> WorkerExit {
    tokio::select! {
        biased;

        _ = signal.cancelled() => {
            info!(generation = signal.generation(), "restart requested; stopping worker");
            terminate(&mut child, grace).await;
            WorkerExit::Cancelled
        }

        status = child.wait() => match status {
            Ok(status) => report_exit(&sink, status),
            Err(e) => {
                sink.error(LogRecord::new(format!("waiting for worker failed: {e}")).with_tag(RUN_TAG));
                WorkerExit::Failed(e.to_string())
            }
        }
    }
}

fn report_exit(sink: &OutputSink, status: ExitStatus) -> WorkerExit {
    sink.log(LogRecord::new(format!("worker exited with {status}")).with_tag(RUN_TAG));
    WorkerExit::Exited(status.code())
}

/// SIGTERM the worker's process group, then SIGKILL once `grace` runs out.
async fn terminate(child: &mut Child, grace: Duration) {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            signal_group(pid, "TERM").await;
            if timeout(grace, child.wait()).await.is_ok() {
                return;
            }
            warn!(pid, ?grace, "worker ignored SIGTERM; killing");
            signal_group(pid, "KILL").await;
        }
    }
    #[cfg(not(unix))]
    let _ = grace;

    if let Err(e) = child.kill().await {
        debug!(error = %e, "kill after termination");
    }
}

#[cfg(unix)]
async fn signal_group(pgid: u32, signal: &str) {
    let status = tokio::process::Command::new("kill")
        .arg(format!("-{signal}"))
        .arg("--")
        .arg(format!("-{pgid}"))
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;
    match status {
        Ok(status) if status.success() => {}
        Ok(status) => debug!(pgid, signal, %status, "kill reported failure"),
        Err(e) => warn!(pgid, signal, error = %e, "could not run kill"),
    }
}
