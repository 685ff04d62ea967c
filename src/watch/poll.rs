// src/watch/poll.rs

//! Polling strategy: re-walk the watched roots and compare modification
//! times against the debounce watermark.

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, trace};

use crate::errors::Result;
use crate::fs::FileSystem;
use crate::types::WatchMode;
use crate::watch::classifier::PathClassifier;
use crate::watch::debounce::Watermark;
use crate::watch::strategy::{BoxFuture, ChangeEvent, ChangeSource, WatchStrategy};

/// One full cycle over all roots takes roughly `interval`: each root gets
/// `interval / roots.len()` before its walk.
#[derive(Debug)]
pub struct PollWatcher {
    fs: Arc<dyn FileSystem>,
    roots: Vec<PathBuf>,
    classifier: PathClassifier,
    interval: Duration,
    registered: HashSet<PathBuf>,
    pending: VecDeque<ChangeEvent>,
    cursor: usize,
}

impl PollWatcher {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        roots: Vec<PathBuf>,
        classifier: PathClassifier,
        interval: Duration,
    ) -> Self {
        Self {
            fs,
            roots,
            classifier,
            interval,
            registered: HashSet::new(),
            pending: VecDeque::new(),
            cursor: 0,
        }
    }

    /// Time spent waiting before each root's walk.
    pub fn slice(&self) -> Duration {
        let n = self.roots.len().max(1) as u32;
        self.interval / n
    }

    /// Walk one root, queueing every registered path newer than `watermark`.
    pub fn walk(&mut self, root: &Path, watermark: Watermark) {
        let mut stack = vec![root.to_path_buf()];

        while let Some(path) = stack.pop() {
            if self.classifier.is_ignored(&path) {
                continue;
            }
            let is_dir = self.fs.is_dir(&path);
            if is_dir && self.classifier.is_hidden(&path) {
                continue;
            }

            if self.registered.contains(&path) {
                match self.fs.modified(&path) {
                    Ok(modified) if watermark.admits(modified) => {
                        trace!(?path, "poll: modified since watermark");
                        self.pending.push_back(ChangeEvent {
                            path: path.clone(),
                            modified,
                            source: ChangeSource::Poll,
                        });
                    }
                    Ok(_) => {}
                    Err(_) => debug!(?path, "poll: registered path vanished"),
                }
            }

            if is_dir {
                match self.fs.read_dir(&path) {
                    // Reverse so the stack pops children in sorted order.
                    Ok(children) => stack.extend(children.into_iter().rev()),
                    Err(err) => debug!(?path, error = %err, "poll: cannot read dir"),
                }
            }
        }
    }
}

impl WatchStrategy for PollWatcher {
    fn mode(&self) -> WatchMode {
        WatchMode::Poll
    }

    fn register(&mut self, path: &Path) -> Result<()> {
        self.registered.insert(path.to_path_buf());
        Ok(())
    }

    fn is_registered(&self, path: &Path) -> bool {
        self.registered.contains(path)
    }

    fn next_change(
        &mut self,
        watermark: Watermark,
    ) -> BoxFuture<'_, Option<Result<ChangeEvent>>> {
        Box::pin(async move {
            if self.roots.is_empty() {
                return None;
            }
            loop {
                if let Some(change) = self.pending.pop_front() {
                    return Some(Ok(change));
                }

                sleep(self.slice()).await;
                let root = self.roots[self.cursor].clone();
                self.cursor = (self.cursor + 1) % self.roots.len();
                self.walk(&root, watermark);
            }
        })
    }
}
