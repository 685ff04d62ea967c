// src/exec/command.rs

//! Shell command construction and one-shot capture.

use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;
use tracing::debug;

/// Result of a one-shot toolchain step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutput {
    pub success: bool,
    pub code: Option<i32>,
    /// stdout followed by stderr.
    pub output: String,
    pub elapsed: Duration,
}

impl StepOutput {
    pub fn ok(elapsed: Duration) -> Self {
        Self {
            success: true,
            code: Some(0),
            output: String::new(),
            elapsed,
        }
    }

    pub fn failed(output: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            success: false,
            code: None,
            output: output.into(),
            elapsed,
        }
    }
}

/// Build a shell command appropriate for the platform, running in `dir`.
///
/// `target` (a file or directory) is appended as a single argument, so paths
/// with spaces need no quoting in the configured command.
pub fn shell_command(cmd: &str, dir: &Path, target: Option<&Path>) -> Command {
    let mut command = if cfg!(windows) {
        let mut line = cmd.to_string();
        if let Some(target) = target {
            line.push_str(&format!(" \"{}\"", target.display()));
        }
        let mut c = Command::new("cmd");
        c.arg("/C").arg(line);
        c
    } else {
        let mut c = Command::new("sh");
        match target {
            Some(target) => {
                c.arg("-c")
                    .arg(format!("{cmd} \"$@\""))
                    .arg("freshrun")
                    .arg(target);
            }
            None => {
                c.arg("-c").arg(cmd);
            }
        }
        c
    };
    command.current_dir(dir).stdin(Stdio::null());
    command
}

/// Run `cmd` to completion, capturing combined output and wall time.
///
/// A command that cannot even be spawned is reported as a failed step with
/// the spawn error as its output.
pub async fn run_captured(cmd: &str, dir: &Path, target: Option<&Path>) -> StepOutput {
    let started = Instant::now();
    debug!(cmd, ?dir, ?target, "running step command");

    let mut command = shell_command(cmd, dir, target);
    command.kill_on_drop(true);

    match command.output().await {
        Ok(out) => {
            let mut output = String::from_utf8_lossy(&out.stdout).into_owned();
            output.push_str(&String::from_utf8_lossy(&out.stderr));
            StepOutput {
                success: out.status.success(),
                code: out.status.code(),
                output,
                elapsed: started.elapsed(),
            }
        }
        Err(err) => StepOutput::failed(
            format!("failed to spawn `{cmd}`: {err}"),
            started.elapsed(),
        ),
    }
}
