// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Classifying paths (ignore rules, watched extensions, canonical names).
//! - The two interchangeable watch strategies: `notify` events and polling.
//! - The initial tree scan that registers what to watch.
//! - The watermark debouncer that decides whether a change is "real".
//!
//! It does **not** run any toolchain commands; it only turns filesystem
//! activity into [`ClassifiedChange`]s for the engine.

pub mod classifier;
pub mod debounce;
pub mod event;
pub mod path_utils;
pub mod poll;
pub mod scanner;
pub mod strategy;

use std::sync::Arc;

pub use classifier::{ClassifiedChange, IgnoreRules, PathClassifier, canonical_name};
pub use debounce::{Clock, Debouncer, ManualClock, SystemClock, Watermark};
pub use event::{EventWatcher, RawEventSender};
pub use poll::PollWatcher;
pub use scanner::{ScanReport, TreeScanner};
pub use strategy::{BoxFuture, ChangeEvent, ChangeSource, WatchStrategy};

use crate::config::WatchedProject;
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::types::WatchMode;

/// Build the strategy for `mode`. Failing to create the platform watcher is
/// fatal to the session.
pub fn build_strategy(
    mode: WatchMode,
    fs: Arc<dyn FileSystem>,
    project: &WatchedProject,
    classifier: &PathClassifier,
) -> Result<Box<dyn WatchStrategy>> {
    Ok(match mode {
        WatchMode::Event => Box::new(EventWatcher::new(fs)?),
        WatchMode::Poll => Box::new(PollWatcher::new(
            fs,
            project.roots(),
            classifier.clone(),
            project.poll_interval,
        )),
    })
}
