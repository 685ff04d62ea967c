// src/watch/event.rs

//! Event-driven strategy backed by `notify`.

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, trace};

use crate::errors::{FreshrunError, Result};
use crate::fs::FileSystem;
use crate::types::WatchMode;
use crate::watch::debounce::Watermark;
use crate::watch::strategy::{BoxFuture, ChangeEvent, ChangeSource, WatchStrategy};

/// Sender half used to feed raw notify results into an [`EventWatcher`].
pub type RawEventSender = mpsc::UnboundedSender<notify::Result<Event>>;

/// Registers individual paths with the platform watcher and turns its events
/// into [`ChangeEvent`]s.
///
/// Pure metadata changes (chmod, atime, ...) are discarded, and paths that no
/// longer exist when stat'ed (delete/rename artifacts) are dropped silently.
pub struct EventWatcher {
    fs: Arc<dyn FileSystem>,
    watcher: Option<RecommendedWatcher>,
    events_rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
    registered: HashSet<PathBuf>,
    pending: VecDeque<ChangeEvent>,
}

impl fmt::Debug for EventWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventWatcher")
            .field("registered", &self.registered.len())
            .field("pending", &self.pending.len())
            .field("attached", &self.watcher.is_some())
            .finish_non_exhaustive()
    }
}

impl EventWatcher {
    /// Create a watcher attached to the platform notification facility.
    pub fn new(fs: Arc<dyn FileSystem>) -> Result<Self> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        // Closure called synchronously by notify whenever an event arrives.
        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                if events_tx.send(res).is_err() {
                    // Receiver dropped: the session is shutting down.
                    trace!("event watcher receiver gone; dropping notify event");
                }
            },
            Config::default(),
        )?;

        info!("event watcher created");
        Ok(Self {
            fs,
            watcher: Some(watcher),
            events_rx,
            registered: HashSet::new(),
            pending: VecDeque::new(),
        })
    }

    /// A watcher with no platform backend; events are injected through the
    /// returned sender. Registration only records membership.
    pub fn detached(fs: Arc<dyn FileSystem>) -> (Self, RawEventSender) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            fs,
            watcher: None,
            events_rx,
            registered: HashSet::new(),
            pending: VecDeque::new(),
        };
        (watcher, events_tx)
    }

    fn enqueue(&mut self, event: Event) {
        if !is_content_change(&event.kind) {
            trace!(kind = ?event.kind, paths = ?event.paths, "non-content event; discarding");
            return;
        }

        for path in event.paths {
            match self.fs.modified(&path) {
                Ok(modified) => self.pending.push_back(ChangeEvent {
                    path,
                    modified,
                    source: ChangeSource::Event,
                }),
                Err(_) => debug!(?path, "path vanished before stat; dropping event"),
            }
        }
    }
}

/// Whether a notify event kind can imply a content change.
pub fn is_content_change(kind: &EventKind) -> bool {
    match kind {
        EventKind::Access(_) => false,
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        _ => true,
    }
}

impl WatchStrategy for EventWatcher {
    fn mode(&self) -> WatchMode {
        WatchMode::Event
    }

    fn register(&mut self, path: &Path) -> Result<()> {
        if let Some(watcher) = self.watcher.as_mut() {
            watcher
                .watch(path, RecursiveMode::NonRecursive)
                .map_err(|e| FreshrunError::Registration {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })?;
        }
        self.registered.insert(path.to_path_buf());
        Ok(())
    }

    fn is_registered(&self, path: &Path) -> bool {
        self.registered.contains(path)
    }

    fn next_change(
        &mut self,
        _watermark: Watermark,
    ) -> BoxFuture<'_, Option<Result<ChangeEvent>>> {
        Box::pin(async move {
            loop {
                if let Some(change) = self.pending.pop_front() {
                    return Some(Ok(change));
                }

                match self.events_rx.recv().await {
                    Some(Ok(event)) => self.enqueue(event),
                    Some(Err(err)) => return Some(Err(FreshrunError::Watch(err))),
                    None => {
                        debug!("notify event channel closed");
                        return None;
                    }
                }
            }
        })
    }
}
