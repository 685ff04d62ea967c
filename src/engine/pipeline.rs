// src/engine/pipeline.rs

//! Async IO shell around [`GenerationPlan`]: runs toolchain steps, reports
//! their outcomes and supervises the worker across restarts.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::WatchedProject;
use crate::engine::core::{GenerationPlan, GenerationToggles};
use crate::engine::{PipelineCommand, PipelineState, StepOutcome};
use crate::exec::{RestartToken, StepOutput, ToolchainBackend, WorkerExit};
use crate::output::{LogRecord, OutputSink};
use crate::types::StepKind;
use crate::watch::{ClassifiedChange, ScanReport};

/// Counters exposed for tests and the final session summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunnerStats {
    pub generations: u64,
    pub worker_starts: u64,
    /// Cancellations issued while the previous worker was still running.
    pub cancellations: u64,
}

#[derive(Debug)]
struct ActiveWorker {
    generation: u64,
    handle: JoinHandle<WorkerExit>,
}

pub struct PipelineRunner<T: ToolchainBackend> {
    project: Arc<WatchedProject>,
    toolchain: Arc<T>,
    sink: OutputSink,
    token: RestartToken,
    worker: Option<ActiveWorker>,
    retiring: Vec<ActiveWorker>,
    state: PipelineState,
    stats: RunnerStats,
}

impl<T: ToolchainBackend> PipelineRunner<T> {
    pub fn new(project: Arc<WatchedProject>, toolchain: Arc<T>, sink: OutputSink) -> Self {
        Self {
            project,
            toolchain,
            sink,
            token: RestartToken::new(),
            worker: None,
            retiring: Vec::new(),
            state: PipelineState::Idle,
            stats: RunnerStats::default(),
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn stats(&self) -> RunnerStats {
        self.stats
    }

    pub fn sink(&self) -> &OutputSink {
        &self.sink
    }

    pub fn set_scanning(&mut self, scanning: bool) {
        self.state = if scanning {
            PipelineState::Scanning
        } else {
            PipelineState::Idle
        };
    }

    /// Generation of the live restart token.
    pub fn generation(&self) -> u64 {
        self.token.generation()
    }

    pub fn has_live_worker(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|active| !active.handle.is_finished())
    }

    pub async fn fmt(&mut self, file: &Path) -> StepOutcome {
        let dir = file
            .parent()
            .unwrap_or(self.project.root.as_path())
            .to_path_buf();
        self.one_shot(StepKind::Fmt, &dir, Some(file)).await
    }

    pub async fn test(&mut self, dir: &Path) -> StepOutcome {
        self.one_shot(StepKind::Test, dir, None).await
    }

    pub async fn generate(&mut self, dir: &Path) -> StepOutcome {
        self.one_shot(StepKind::Generate, dir, None).await
    }

    pub async fn install(&mut self) -> StepOutcome {
        let root = self.project.root.clone();
        self.one_shot(StepKind::Install, &root, None).await
    }

    pub async fn build(&mut self) -> StepOutcome {
        let root = self.project.root.clone();
        self.one_shot(StepKind::Build, &root, None).await
    }

    /// Eager pass after the initial scan: generate and test every registered
    /// directory, then format every watched file.
    pub async fn prewarm(&mut self, report: &ScanReport) {
        for dir in &report.dirs {
            self.generate(dir).await;
            self.test(dir).await;
        }
        for file in &report.files {
            self.fmt(file).await;
        }
    }

    /// Cancel the worker, run the per-change steps, then a new generation.
    /// The old worker is already stopping while fmt and test run.
    pub async fn handle_change(&mut self, change: &ClassifiedChange) -> Option<StepKind> {
        self.retire_if_running();
        self.fmt(&change.observed).await;
        self.test(&change.dir).await;
        self.generate(&change.dir).await;
        self.generation_steps().await
    }

    /// Run one generation: cancel the previous worker, then install, build
    /// and start a new worker, stopping at the first failure.
    pub async fn restart(&mut self) -> Option<StepKind> {
        self.retire_if_running();
        self.generation_steps().await
    }

    fn retire_if_running(&mut self) {
        if self.project.tools.enabled(StepKind::Run) {
            self.retire_worker();
        }
    }

    async fn generation_steps(&mut self) -> Option<StepKind> {
        self.stats.generations += 1;
        let mut plan = GenerationPlan::new(GenerationToggles::from_tools(&self.project.tools));
        let mut command = plan.begin();
        loop {
            self.state = plan.state();
            let outcome = match command {
                PipelineCommand::Install => self.install().await,
                PipelineCommand::Build => self.build().await,
                PipelineCommand::StartWorker => self.run().await,
                PipelineCommand::Finish => break,
            };
            command = plan.advance(outcome);
        }
        self.state = plan.state();

        if let Some(step) = plan.failed_step() {
            debug!(project = %self.project.name, %step, "generation stopped early");
        }
        plan.failed_step()
    }

    /// Start a worker for the live generation, after every retired worker
    /// has finished tearing down.
    pub async fn run(&mut self) -> StepOutcome {
        if !self.project.tools.enabled(StepKind::Run) {
            return StepOutcome::Skipped;
        }

        for retired in std::mem::take(&mut self.retiring) {
            match retired.handle.await {
                Ok(exit) => debug!(generation = retired.generation, ?exit, "previous worker done"),
                Err(e) => warn!(generation = retired.generation, error = %e, "worker task failed"),
            }
        }

        let started = Instant::now();
        self.stats.worker_starts += 1;
        let generation = self.token.generation();
        match self
            .toolchain
            .start_worker(self.token.signal(), self.sink.clone())
            .await
        {
            Ok(running) => {
                self.sink.log(
                    LogRecord::new(format!(
                        "Has been run in {:.3} s",
                        started.elapsed().as_secs_f64()
                    ))
                    .with_tag(StepKind::Run.label()),
                );
                info!(project = %self.project.name, generation, pid = ?running.pid, "worker started");
                let handle = tokio::spawn(running.supervision);
                self.worker = Some(ActiveWorker { generation, handle });
                StepOutcome::Succeeded
            }
            Err(err) => {
                self.sink.error(
                    LogRecord::new(err.to_string())
                        .with_tag(StepKind::Run.label())
                        .with_path(&self.project.root),
                );
                StepOutcome::Failed
            }
        }
    }

    /// Close the live token, wait for every worker to stop.
    pub async fn shutdown(&mut self) {
        self.token.close();
        if let Some(active) = self.worker.take() {
            self.retiring.push(active);
        }
        for retired in std::mem::take(&mut self.retiring) {
            if let Err(e) = retired.handle.await {
                warn!(generation = retired.generation, error = %e, "worker task failed");
            }
        }
        self.state = PipelineState::Idle;
        info!(project = %self.project.name, stats = ?self.stats, "pipeline stopped");
    }

    fn retire_worker(&mut self) {
        if let Some(active) = self.worker.take() {
            if !active.handle.is_finished() {
                self.stats.cancellations += 1;
                debug!(generation = active.generation, "cancelling running worker");
            }
            self.retiring.push(active);
        }
        let next = self.token.replace();
        debug!(generation = next, "restart token replaced");
    }

    async fn one_shot(&mut self, step: StepKind, dir: &Path, target: Option<&Path>) -> StepOutcome {
        if !self.project.tools.enabled(step) {
            return StepOutcome::Skipped;
        }
        let output = self.toolchain.run_step(step, dir, target).await;
        self.report(step, target.unwrap_or(dir), output)
    }

    fn report(&self, step: StepKind, path: &Path, output: StepOutput) -> StepOutcome {
        if output.success {
            self.sink.log(
                LogRecord::new(format!(
                    "{} in {:.3} s",
                    past_tense(step),
                    output.elapsed.as_secs_f64()
                ))
                .with_tag(step.label())
                .with_path(path),
            );
            StepOutcome::Succeeded
        } else {
            self.sink.error(
                LogRecord::new(format!("{} failed", step.label()))
                    .with_tag(step.label())
                    .with_path(path)
                    .with_output(output.output),
            );
            StepOutcome::Failed
        }
    }
}

fn past_tense(step: StepKind) -> &'static str {
    match step {
        StepKind::Fmt => "Formatted",
        StepKind::Test => "Tested",
        StepKind::Generate => "Generated",
        StepKind::Install => "Installed",
        StepKind::Build => "Built",
        StepKind::Run => "Has been run",
    }
}
