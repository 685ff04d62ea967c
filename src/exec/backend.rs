// src/exec/backend.rs

//! Pluggable toolchain backend.
//!
//! The pipeline talks to a `ToolchainBackend` instead of spawning processes
//! itself. Production uses [`RealToolchain`]; tests swap in a fake that
//! records invocations and simulates workers.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{Settings, WatchedProject};
use crate::errors::Result;
use crate::exec::command::{StepOutput, run_captured};
use crate::exec::restart::RestartSignal;
use crate::exec::worker::{RunningWorker, WorkerSpec, start_worker};
use crate::output::OutputSink;
use crate::types::StepKind;
use crate::watch::BoxFuture;

pub trait ToolchainBackend: Send + Sync + 'static {
    /// Run a one-shot step (`fmt`, `test`, `generate`, `install`, `build`)
    /// in `dir`, with `target` appended as an argument when given.
    fn run_step<'a>(
        &'a self,
        step: StepKind,
        dir: &'a Path,
        target: Option<&'a Path>,
    ) -> BoxFuture<'a, StepOutput>;

    /// Start the worker for one generation. Resolves once the worker is
    /// considered started; the returned supervision future runs until the
    /// worker exits or `signal` is cancelled.
    fn start_worker(
        &self,
        signal: RestartSignal,
        sink: OutputSink,
    ) -> BoxFuture<'_, Result<RunningWorker>>;
}

/// Runs the project's configured commands through the platform shell.
#[derive(Debug, Clone)]
pub struct RealToolchain {
    project: Arc<WatchedProject>,
    grace_period: Duration,
    ready_timeout: Duration,
}

impl RealToolchain {
    pub fn new(project: Arc<WatchedProject>, settings: &Settings) -> Self {
        Self {
            project,
            grace_period: settings.grace_period,
            ready_timeout: settings.ready_timeout,
        }
    }
}

impl ToolchainBackend for RealToolchain {
    fn run_step<'a>(
        &'a self,
        step: StepKind,
        dir: &'a Path,
        target: Option<&'a Path>,
    ) -> BoxFuture<'a, StepOutput> {
        let cmd = self.project.tools.command(step).cmd.clone();
        Box::pin(async move { run_captured(&cmd, dir, target).await })
    }

    fn start_worker(
        &self,
        signal: RestartSignal,
        sink: OutputSink,
    ) -> BoxFuture<'_, Result<RunningWorker>> {
        let run = self.project.tools.command(StepKind::Run);
        let spec = WorkerSpec {
            cmd: run.cmd.clone(),
            dir: self.project.root.clone(),
            ready_on_stdout: run.ready_on_stdout.clone(),
            ready_timeout: self.ready_timeout,
            grace_period: self.grace_period,
        };
        Box::pin(start_worker(spec, signal, sink))
    }
}
