// src/output/mod.rs

//! Structured pipeline output.
//!
//! Every step outcome, hook result, worker line and watch error ends up here
//! as a [`LogRecord`] in one of three independent, append-only sequences
//! (stdout / log / error). After each emission a notification is posted on a
//! single-slot channel so a presentation layer knows new data is available;
//! posting never blocks.

pub mod persist;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Local};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{info, trace, warn};

pub use persist::FileSinks;

/// Which sequence a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Stdout,
    Log,
    Error,
}

impl RecordKind {
    pub fn label(self) -> &'static str {
        match self {
            RecordKind::Stdout => "stdout",
            RecordKind::Log => "log",
            RecordKind::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub time: DateTime<Local>,
    pub kind: RecordKind,
    pub message: String,
    /// Error-type / origin tag, e.g. `"Build"` or `"After/Before"`.
    pub tag: Option<String>,
    pub path: Option<PathBuf>,
    /// Captured output of an external process.
    pub output: Option<String>,
}

impl LogRecord {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            time: Local::now(),
            kind: RecordKind::Log,
            message: message.into(),
            tag: None,
            path: None,
            output: None,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Attach captured process output; blank output is dropped.
    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        let output = output.into();
        if !output.trim().is_empty() {
            self.output = Some(output);
        }
        self
    }

    /// `timestamp NAME : text [path] [captured-output]`
    pub fn render(&self, name: &str) -> String {
        let mut line = format!(
            "{} {} : {}",
            self.time.format("%Y-%m-%d %H:%M:%S"),
            name,
            self.message
        );
        if let Some(path) = &self.path {
            line.push(' ');
            line.push_str(&path.display().to_string());
        }
        if let Some(output) = &self.output {
            line.push(' ');
            line.push_str(output.trim_end());
        }
        line
    }
}

#[derive(Debug, Default)]
struct Buffers {
    stdout: Vec<LogRecord>,
    log: Vec<LogRecord>,
    error: Vec<LogRecord>,
}

impl Buffers {
    fn get_mut(&mut self, kind: RecordKind) -> &mut Vec<LogRecord> {
        match kind {
            RecordKind::Stdout => &mut self.stdout,
            RecordKind::Log => &mut self.log,
            RecordKind::Error => &mut self.error,
        }
    }

    fn get(&self, kind: RecordKind) -> &Vec<LogRecord> {
        match kind {
            RecordKind::Stdout => &self.stdout,
            RecordKind::Log => &self.log,
            RecordKind::Error => &self.error,
        }
    }
}

struct SinkInner {
    project: String,
    echo: bool,
    buffers: Mutex<Buffers>,
    files: Option<FileSinks>,
    notify_tx: mpsc::Sender<()>,
}

/// Cheap to clone; all clones append to the same sequences.
#[derive(Clone)]
pub struct OutputSink {
    inner: Arc<SinkInner>,
}

impl fmt::Debug for OutputSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputSink")
            .field("project", &self.inner.project)
            .field("echo", &self.inner.echo)
            .field("persist", &self.inner.files.is_some())
            .finish_non_exhaustive()
    }
}

impl OutputSink {
    /// Create a sink plus the receiving end of its "new data" channel.
    pub fn new(
        project: impl Into<String>,
        echo: bool,
        files: Option<FileSinks>,
    ) -> (Self, mpsc::Receiver<()>) {
        let (notify_tx, notify_rx) = mpsc::channel(1);
        let sink = Self {
            inner: Arc::new(SinkInner {
                project: project.into(),
                echo,
                buffers: Mutex::new(Buffers::default()),
                files,
                notify_tx,
            }),
        };
        (sink, notify_rx)
    }

    /// A sink with no echo, no persistence and nobody listening.
    pub fn detached(project: impl Into<String>) -> Self {
        Self::new(project, false, None).0
    }

    pub fn project(&self) -> &str {
        &self.inner.project
    }

    fn buffers(&self) -> MutexGuard<'_, Buffers> {
        self.inner
            .buffers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn emit(&self, kind: RecordKind, mut record: LogRecord) {
        record.kind = kind;
        let line = record.render(&self.inner.project);

        match kind {
            RecordKind::Error => warn!(
                project = %self.inner.project,
                tag = record.tag.as_deref().unwrap_or(""),
                "{}",
                record.message
            ),
            _ => info!(
                project = %self.inner.project,
                kind = kind.label(),
                tag = record.tag.as_deref().unwrap_or(""),
                "{}",
                record.message
            ),
        }

        if let Some(files) = &self.inner.files {
            files.append(kind, &line);
        }
        if self.inner.echo {
            println!("{line}");
        }

        self.buffers().get_mut(kind).push(record);

        match self.inner.notify_tx.try_send(()) {
            Ok(()) => {}
            // A notification is already pending; it covers this record too.
            Err(TrySendError::Full(())) => {}
            Err(TrySendError::Closed(())) => trace!("no output listener"),
        }
    }

    pub fn stdout(&self, record: LogRecord) {
        self.emit(RecordKind::Stdout, record);
    }

    pub fn log(&self, record: LogRecord) {
        self.emit(RecordKind::Log, record);
    }

    pub fn error(&self, record: LogRecord) {
        self.emit(RecordKind::Error, record);
    }

    /// Snapshot of one sequence, oldest first.
    pub fn records(&self, kind: RecordKind) -> Vec<LogRecord> {
        self.buffers().get(kind).clone()
    }

    pub fn count(&self, kind: RecordKind) -> usize {
        self.buffers().get(kind).len()
    }
}
