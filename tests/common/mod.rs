#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

use notify::event::{DataChange, ModifyKind};
use notify::{Event, EventKind};
use tokio::sync::watch;

use freshrun::config::WatchedProject;
use freshrun::engine::Session;
use freshrun::fs::mock::MockFileSystem;
use freshrun::output::OutputSink;
use freshrun::watch::{EventWatcher, ManualClock, RawEventSender};
use freshrun_test_utils::fake_toolchain::FakeToolchain;

pub use freshrun_test_utils::{init_tracing, with_timeout};

pub const ROOT: &str = "/proj";
/// Clock value at session start; fixture files are older.
pub const START: i64 = 10_000;

pub fn p(rel: &str) -> PathBuf {
    Path::new(ROOT).join(rel)
}

/// A small Go module:
///
/// ```text
/// /proj/main.go
/// /proj/pkg/util.go
/// /proj/pkg/util_test.go
/// /proj/vendor/dep/dep.go     (ignored via "vendor")
/// /proj/.git/hooks/pre.go     (hidden)
/// /proj/README.md             (unwatched extension)
/// ```
pub fn go_module() -> MockFileSystem {
    let fs = MockFileSystem::new();
    let old = START - 100;
    fs.add_file(p("main.go"), old);
    fs.add_file(p("pkg/util.go"), old);
    fs.add_file(p("pkg/util_test.go"), old);
    fs.add_file(p("vendor/dep/dep.go"), old);
    fs.add_file(p(".git/hooks/pre.go"), old);
    fs.add_file(p("README.md"), old);
    fs
}

/// Notify event as produced by a content write.
pub fn write_event(path: &Path) -> notify::Result<Event> {
    Ok(Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
        .add_path(path.to_path_buf()))
}

pub fn secs(t: i64) -> std::time::SystemTime {
    UNIX_EPOCH + Duration::from_secs(t as u64)
}

pub struct Harness {
    pub session: Session<FakeToolchain>,
    pub fs: MockFileSystem,
    pub clock: ManualClock,
    pub toolchain: Arc<FakeToolchain>,
    pub sink: OutputSink,
    pub events: RawEventSender,
    pub shutdown: watch::Sender<bool>,
}

impl Harness {
    /// Session over `fs` with an event watcher fed through `events`.
    pub fn new(project: WatchedProject, fs: MockFileSystem) -> Self {
        let clock = ManualClock::new(START);
        let toolchain = Arc::new(FakeToolchain::new());
        let sink = OutputSink::detached(project.name.clone());
        let (watcher, events) = EventWatcher::detached(Arc::new(fs.clone()));
        let (shutdown, shutdown_rx) = watch::channel(false);

        let session = Session::new(
            Arc::new(project),
            Arc::new(fs.clone()),
            Box::new(watcher),
            Arc::new(clock.clone()),
            toolchain.clone(),
            sink.clone(),
            shutdown_rx,
        );

        Self {
            session,
            fs,
            clock,
            toolchain,
            sink,
            events,
            shutdown,
        }
    }

    /// Simulate a save of `path` at time `t`.
    pub fn save(&self, path: &Path, t: i64) {
        self.clock.set(t);
        self.fs.touch(path, t);
        self.events.send(write_event(path)).expect("event channel open");
    }
}
