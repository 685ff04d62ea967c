// src/watch/strategy.rs

//! The watch-strategy contract shared by [`EventWatcher`](super::EventWatcher)
//! and [`PollWatcher`](super::PollWatcher).
//!
//! The session only ever holds a `Box<dyn WatchStrategy>`; nothing downstream
//! branches on which variant is active.

use std::fmt::Debug;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::time::SystemTime;

use crate::errors::Result;
use crate::types::WatchMode;
use crate::watch::debounce::Watermark;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Where a [`ChangeEvent`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeSource {
    Event,
    Poll,
}

/// A candidate change: consumed once by the debouncer, then dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub modified: SystemTime,
    pub source: ChangeSource,
}

pub trait WatchStrategy: Send + Debug {
    fn mode(&self) -> WatchMode;

    /// Start watching `path` (a file or a directory).
    fn register(&mut self, path: &Path) -> Result<()>;

    fn is_registered(&self, path: &Path) -> bool;

    /// Wait for the next candidate change.
    ///
    /// `watermark` is the debouncer's current gate; the polling variant uses
    /// it to decide what counts as modified. `None` means the underlying
    /// source is gone and the session should stop watching. `Some(Err(_))`
    /// is a recoverable watch error.
    fn next_change(&mut self, watermark: Watermark)
    -> BoxFuture<'_, Option<Result<ChangeEvent>>>;
}
