// src/exec/hooks.rs

//! Before/after command lists and the shutdown signal listener.

use std::path::PathBuf;
use std::process::Stdio;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::exec::command::shell_command;
use crate::output::{LogRecord, OutputSink};

const HOOK_TAG: &str = "After/Before";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    Before,
    After,
}

impl HookPhase {
    fn label(self) -> &'static str {
        match self {
            HookPhase::Before => "before",
            HookPhase::After => "after",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HookSummary {
    pub ran: usize,
    pub failed: usize,
}

/// Runs hook commands sequentially from the project root.
#[derive(Debug, Clone)]
pub struct HookExecutor {
    root: PathBuf,
    sink: OutputSink,
}

impl HookExecutor {
    pub fn new(root: impl Into<PathBuf>, sink: OutputSink) -> Self {
        Self {
            root: root.into(),
            sink,
        }
    }

    /// Run every command in order. A failing command is reported and the
    /// rest of the list still runs.
    pub async fn run(&self, phase: HookPhase, commands: &[String]) -> HookSummary {
        let mut summary = HookSummary::default();
        for cmd in commands {
            summary.ran += 1;
            if !self.run_one(phase, cmd).await {
                summary.failed += 1;
            }
        }
        if !commands.is_empty() {
            debug!(phase = phase.label(), ?summary, "hooks finished");
        }
        summary
    }

    async fn run_one(&self, phase: HookPhase, cmd: &str) -> bool {
        info!(phase = phase.label(), cmd, "running hook");
        let mut command = shell_command(cmd, &self.root, None);
        command.stdout(Stdio::piped()).stderr(Stdio::piped());

        let out = match command.output().await {
            Ok(out) => out,
            Err(e) => {
                self.sink.error(
                    LogRecord::new(format!("{} command `{cmd}` could not start: {e}", phase.label()))
                        .with_tag(HOOK_TAG),
                );
                return false;
            }
        };

        let stdout = String::from_utf8_lossy(&out.stdout);
        let stderr = String::from_utf8_lossy(&out.stderr);
        if !stdout.trim().is_empty() {
            self.sink.stdout(
                LogRecord::new(format!("{} command `{cmd}`", phase.label()))
                    .with_tag(HOOK_TAG)
                    .with_output(stdout.trim_end()),
            );
        }
        if !stderr.trim().is_empty() {
            self.sink.error(
                LogRecord::new(format!("{} command `{cmd}`", phase.label()))
                    .with_tag(HOOK_TAG)
                    .with_output(stderr.trim_end()),
            );
        }
        if !out.status.success() {
            self.sink.error(
                LogRecord::new(format!(
                    "{} command `{cmd}` exited with {}",
                    phase.label(),
                    out.status
                ))
                .with_tag(HOOK_TAG),
            );
            return false;
        }
        true
    }
}

/// Spawn the process-wide termination listener.
///
/// The returned receiver flips to `true` on Ctrl+C (or SIGTERM on Unix).
/// If no handler can be installed the value simply never changes.
pub fn spawn_signal_listener() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if wait_for_termination().await {
            info!("termination requested");
            tx.send_replace(true);
            // Keep the sender alive so late subscribers still see `true`.
            tx.closed().await;
        }
    });
    rx
}

async fn wait_for_termination() -> bool {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                return ctrl_c().await;
            }
        };
        tokio::select! {
            received = ctrl_c() => received,
            _ = sigterm.recv() => true,
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c().await
    }
}

async fn ctrl_c() -> bool {
    match tokio::signal::ctrl_c().await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<bool>().await
        }
    }
}
