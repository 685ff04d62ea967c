// src/engine/session.rs

//! One watch session per project: the main event loop.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::config::WatchedProject;
use crate::engine::pipeline::PipelineRunner;
use crate::errors::Result;
use crate::exec::{HookExecutor, HookPhase, ToolchainBackend};
use crate::fs::FileSystem;
use crate::output::{LogRecord, OutputSink};
use crate::watch::{ChangeEvent, Clock, Debouncer, PathClassifier, ScanReport, TreeScanner, WatchStrategy};

/// Outcome of one [`Session::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStep {
    /// A change was accepted and its pipeline ran.
    Rebuilt,
    /// An event was dropped, or a watch error was reported.
    Ignored,
    /// Shutdown requested or the change stream ended.
    Stopped,
}

enum Next {
    Shutdown,
    Change(Option<Result<ChangeEvent>>),
}

pub struct Session<T: ToolchainBackend> {
    project: Arc<WatchedProject>,
    fs: Arc<dyn FileSystem>,
    strategy: Box<dyn WatchStrategy>,
    debouncer: Debouncer,
    runner: PipelineRunner<T>,
    hooks: HookExecutor,
    sink: OutputSink,
    shutdown: watch::Receiver<bool>,
}

impl<T: ToolchainBackend> Session<T> {
    pub fn new(
        project: Arc<WatchedProject>,
        fs: Arc<dyn FileSystem>,
        strategy: Box<dyn WatchStrategy>,
        clock: Arc<dyn Clock>,
        toolchain: Arc<T>,
        sink: OutputSink,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let debouncer = Debouncer::new(PathClassifier::new(&project), clock);
        let runner = PipelineRunner::new(project.clone(), toolchain, sink.clone());
        let hooks = HookExecutor::new(project.root.clone(), sink.clone());
        Self {
            project,
            fs,
            strategy,
            debouncer,
            runner,
            hooks,
            sink,
            shutdown,
        }
    }

    pub fn sink(&self) -> &OutputSink {
        &self.sink
    }

    pub fn runner(&self) -> &PipelineRunner<T> {
        &self.runner
    }

    pub fn debouncer(&self) -> &Debouncer {
        &self.debouncer
    }

    /// Before hooks, initial scan, eager pass and the first generation.
    ///
    /// A missing root is fatal; everything else is reported to the sink.
    pub async fn start(&mut self) -> Result<ScanReport> {
        self.hooks.run(HookPhase::Before, &self.project.before).await;

        self.runner.set_scanning(true);
        let report = TreeScanner::new(self.fs.as_ref(), &self.project, self.debouncer.classifier())
            .scan(self.strategy.as_mut(), &self.sink)?;
        self.runner.set_scanning(false);

        self.sink.log(LogRecord::new(format!(
            "Watching {} files in {} directories ({:?} mode)",
            report.file_count(),
            report.dir_count(),
            self.strategy.mode()
        )));

        self.runner.prewarm(&report).await;
        self.runner.restart().await;
        self.debouncer.advance_to_now();
        Ok(report)
    }

    /// Wait for the next change (or shutdown) and handle it.
    pub async fn step(&mut self) -> SessionStep {
        let watermark = self.debouncer.watermark();
        let next = tokio::select! {
            biased;
            _ = shutdown_requested(&mut self.shutdown) => Next::Shutdown,
            item = self.strategy.next_change(watermark) => Next::Change(item),
        };

        match next {
            Next::Shutdown => SessionStep::Stopped,
            Next::Change(None) => {
                debug!(project = %self.project.name, "change stream ended");
                SessionStep::Stopped
            }
            Next::Change(Some(Err(err))) => {
                self.sink.error(LogRecord::new(err.to_string()).with_tag("Watch"));
                SessionStep::Ignored
            }
            Next::Change(Some(Ok(event))) => {
                let accepted = self.debouncer.accept(self.strategy.as_ref(), &event);
                match accepted {
                    Some(change) => {
                        self.runner.handle_change(&change).await;
                        SessionStep::Rebuilt
                    }
                    None => SessionStep::Ignored,
                }
            }
        }
    }

    /// After hooks, then stop the worker.
    pub async fn finish(&mut self) {
        self.hooks.run(HookPhase::After, &self.project.after).await;
        self.runner.shutdown().await;
    }

    pub async fn run(mut self) -> Result<()> {
        info!(project = %self.project.name, root = ?self.project.root, "session starting");
        self.start().await?;
        while self.step().await != SessionStep::Stopped {}
        self.finish().await;
        info!(project = %self.project.name, "session finished");
        Ok(())
    }
}

/// Resolves once shutdown is requested; never if the listener went away
/// without requesting it.
async fn shutdown_requested(rx: &mut watch::Receiver<bool>) {
    let requested = rx.wait_for(|stop| *stop).await.is_ok();
    if !requested {
        std::future::pending::<()>().await;
    }
}
