use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use freshrun::errors::{FreshrunError, Result};
use freshrun::exec::{RestartSignal, RunningWorker, StepOutput, ToolchainBackend, WorkerExit};
use freshrun::output::{LogRecord, OutputSink};
use freshrun::types::StepKind;
use freshrun::watch::BoxFuture;

/// One recorded `run_step` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub step: StepKind,
    pub dir: PathBuf,
    pub target: Option<PathBuf>,
}

#[derive(Debug, Default)]
struct WorkerCounters {
    starts: AtomicUsize,
    cancelled: AtomicUsize,
    live: AtomicUsize,
    max_live: AtomicUsize,
}

/// A fake toolchain that:
/// - records every step invocation
/// - fails the steps it was told to fail
/// - simulates workers that run until their restart signal is cancelled.
#[derive(Debug, Default)]
pub struct FakeToolchain {
    invocations: Mutex<Vec<Invocation>>,
    /// Restart signal of the most recently started worker.
    latest_worker: Mutex<Option<RestartSignal>>,
    /// For each step call: was the latest worker already cancelled?
    worker_cancelled_at: Mutex<Vec<(StepKind, bool)>>,
    failing: Mutex<HashSet<StepKind>>,
    worker_fails: AtomicBool,
    workers: Arc<WorkerCounters>,
}

impl FakeToolchain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_step(&self, step: StepKind) {
        self.failing.lock().unwrap().insert(step);
    }

    pub fn succeed_step(&self, step: StepKind) {
        self.failing.lock().unwrap().remove(&step);
    }

    pub fn fail_worker_start(&self, fail: bool) {
        self.worker_fails.store(fail, Ordering::SeqCst);
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }

    pub fn invocations_of(&self, step: StepKind) -> Vec<Invocation> {
        self.invocations()
            .into_iter()
            .filter(|inv| inv.step == step)
            .collect()
    }

    pub fn count(&self, step: StepKind) -> usize {
        self.invocations_of(step).len()
    }

    pub fn worker_starts(&self) -> usize {
        self.workers.starts.load(Ordering::SeqCst)
    }

    pub fn cancelled_workers(&self) -> usize {
        self.workers.cancelled.load(Ordering::SeqCst)
    }

    pub fn live_workers(&self) -> usize {
        self.workers.live.load(Ordering::SeqCst)
    }

    /// Whether the latest worker's signal was already cancelled at each call
    /// of `step` made while some worker had been started.
    pub fn worker_cancelled_during(&self, step: StepKind) -> Vec<bool> {
        self.worker_cancelled_at
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _)| *s == step)
            .map(|(_, cancelled)| *cancelled)
            .collect()
    }

    /// Highest number of simultaneously live workers ever observed.
    pub fn max_live_workers(&self) -> usize {
        self.workers.max_live.load(Ordering::SeqCst)
    }
}

impl ToolchainBackend for FakeToolchain {
    fn run_step<'a>(
        &'a self,
        step: StepKind,
        dir: &'a Path,
        target: Option<&'a Path>,
    ) -> BoxFuture<'a, StepOutput> {
        self.invocations.lock().unwrap().push(Invocation {
            step,
            dir: dir.to_path_buf(),
            target: target.map(Path::to_path_buf),
        });
        if let Some(signal) = self.latest_worker.lock().unwrap().as_ref() {
            self.worker_cancelled_at
                .lock()
                .unwrap()
                .push((step, signal.is_cancelled()));
        }
        let fails = self.failing.lock().unwrap().contains(&step);

        Box::pin(async move {
            let elapsed = Duration::from_millis(1);
            if fails {
                StepOutput::failed(format!("{step}: simulated failure"), elapsed)
            } else {
                StepOutput::ok(elapsed)
            }
        })
    }

    fn start_worker(
        &self,
        signal: RestartSignal,
        sink: OutputSink,
    ) -> BoxFuture<'_, Result<RunningWorker>> {
        let workers = Arc::clone(&self.workers);
        let fails = self.worker_fails.load(Ordering::SeqCst);
        *self.latest_worker.lock().unwrap() = Some(signal.clone());

        Box::pin(async move {
            workers.starts.fetch_add(1, Ordering::SeqCst);
            if fails {
                return Err(FreshrunError::WorkerStart("simulated start failure".into()));
            }

            let live = workers.live.fetch_add(1, Ordering::SeqCst) + 1;
            workers.max_live.fetch_max(live, Ordering::SeqCst);
            sink.stdout(
                LogRecord::new(format!("worker generation {} listening", signal.generation()))
                    .with_tag("Run"),
            );

            let supervision = Box::pin(async move {
                signal.cancelled().await;
                workers.cancelled.fetch_add(1, Ordering::SeqCst);
                workers.live.fetch_sub(1, Ordering::SeqCst);
                WorkerExit::Cancelled
            });
            Ok(RunningWorker {
                pid: None,
                supervision,
            })
        })
    }
}
