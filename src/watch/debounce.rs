// src/watch/debounce.rs

//! The watermark gate.
//!
//! A change is accepted only if its modification time, truncated to whole
//! seconds, is strictly newer than the watermark. Acceptance moves the
//! watermark to "now" before anything downstream runs, so files rewritten by
//! the pipeline itself within the same second are not seen as new changes.
//!
//! The debouncer lives inside the session pump; check-and-advance happens on
//! `&mut self` and needs no lock.

use std::fmt::Debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, trace};

use crate::watch::classifier::{ClassifiedChange, PathClassifier};
use crate::watch::strategy::{ChangeEvent, WatchStrategy};

/// Seconds since the Unix epoch, negative for pre-epoch times.
pub fn unix_secs(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs() as i64,
        Err(e) => -(e.duration().as_secs() as i64) - 1,
    }
}

/// "Last accepted change" instant at second resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Watermark(i64);

impl Watermark {
    pub fn from_secs(secs: i64) -> Self {
        Self(secs)
    }

    pub fn secs(self) -> i64 {
        self.0
    }

    /// True if `modified` is strictly newer than the watermark.
    pub fn admits(self, modified: SystemTime) -> bool {
        unix_secs(modified) > self.0
    }
}

/// Source of "now" for the debouncer.
pub trait Clock: Send + Sync + Debug {
    fn now_secs(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> i64 {
        unix_secs(SystemTime::now())
    }
}

/// Clock that only moves when told to; clones share the same instant.
#[derive(Debug, Clone, Default)]
pub struct ManualClock(Arc<AtomicI64>);

impl ManualClock {
    pub fn new(secs: i64) -> Self {
        Self(Arc::new(AtomicI64::new(secs)))
    }

    pub fn set(&self, secs: i64) {
        self.0.store(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_secs(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct Debouncer {
    watermark: Watermark,
    classifier: PathClassifier,
    clock: Arc<dyn Clock>,
}

impl Debouncer {
    /// Start with the watermark at the clock's current second.
    pub fn new(classifier: PathClassifier, clock: Arc<dyn Clock>) -> Self {
        let watermark = Watermark(clock.now_secs());
        Self {
            watermark,
            classifier,
            clock,
        }
    }

    pub fn watermark(&self) -> Watermark {
        self.watermark
    }

    pub fn classifier(&self) -> &PathClassifier {
        &self.classifier
    }

    /// Move the watermark to now (never backwards).
    pub fn advance_to_now(&mut self) {
        let now = Watermark(self.clock.now_secs());
        if now > self.watermark {
            self.watermark = now;
        }
    }

    /// Gate a raw change; on acceptance the watermark has already moved to
    /// `max(now, mtime)`.
    pub fn accept(
        &mut self,
        strategy: &dyn WatchStrategy,
        event: &ChangeEvent,
    ) -> Option<ClassifiedChange> {
        if !strategy.is_registered(&event.path) {
            trace!(path = ?event.path, "not registered; ignoring change");
            return None;
        }

        if !self.watermark.admits(event.modified) {
            trace!(
                path = ?event.path,
                mtime = unix_secs(event.modified),
                watermark = self.watermark.0,
                "not newer than watermark; ignoring change"
            );
            return None;
        }

        let change = self.classifier.classify(&event.path)?;

        // A future-dated mtime must still close the gate behind itself.
        let now = Watermark(self.clock.now_secs());
        self.watermark = now.max(Watermark(unix_secs(event.modified)));
        debug!(
            file = ?change.file,
            ext = %change.ext,
            source = ?event.source,
            watermark = self.watermark.0,
            "change accepted"
        );
        Some(change)
    }
}
