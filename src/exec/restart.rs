// src/exec/restart.rs

//! Restart tokens: one live token per session, one generation per token.
//!
//! Closing a token is level-triggered: a [`RestartSignal`] taken from it
//! stays cancelled forever after, so a supervision task can check at any
//! point without missing the signal. Every token also carries a generation
//! number from a shared counter, letting a late-scheduled task notice that
//! it has been superseded even before it looks at the cancel flag.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;

/// Number of the live generation, shared by a token and all its signals.
#[derive(Debug, Clone)]
pub struct GenerationCounter(Arc<AtomicU64>);

impl GenerationCounter {
    fn new() -> Self {
        Self(Arc::new(AtomicU64::new(1)))
    }

    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    fn bump(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[derive(Debug)]
pub struct RestartToken {
    generation: u64,
    cancel_tx: watch::Sender<bool>,
    live: GenerationCounter,
}

impl Default for RestartToken {
    fn default() -> Self {
        Self::new()
    }
}

impl RestartToken {
    /// Generation 1.
    pub fn new() -> Self {
        let live = GenerationCounter::new();
        Self::for_generation(live.current(), live)
    }

    fn for_generation(generation: u64, live: GenerationCounter) -> Self {
        let (cancel_tx, _) = watch::channel(false);
        Self {
            generation,
            cancel_tx,
            live,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn counter(&self) -> &GenerationCounter {
        &self.live
    }

    pub fn signal(&self) -> RestartSignal {
        RestartSignal {
            generation: self.generation,
            cancel_rx: self.cancel_tx.subscribe(),
            live: self.live.clone(),
        }
    }

    pub fn close(&self) {
        self.cancel_tx.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        *self.cancel_tx.borrow()
    }

    /// Close this generation and become the next one. Returns the new
    /// generation number.
    pub fn replace(&mut self) -> u64 {
        self.close();
        let next = self.live.bump();
        *self = Self::for_generation(next, self.live.clone());
        next
    }
}

/// Receiving side of a [`RestartToken`], handed to a worker's supervisor.
#[derive(Debug, Clone)]
pub struct RestartSignal {
    generation: u64,
    cancel_rx: watch::Receiver<bool>,
    live: GenerationCounter,
}

impl RestartSignal {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True once the token was closed (or dropped).
    pub fn is_cancelled(&self) -> bool {
        *self.cancel_rx.borrow() || self.cancel_rx.has_changed().is_err()
    }

    /// True once a newer generation exists.
    pub fn is_superseded(&self) -> bool {
        self.live.current() != self.generation
    }

    /// Resolves once the token is closed; immediately if it already was.
    pub async fn cancelled(&self) {
        let mut rx = self.cancel_rx.clone();
        // Err means the token was dropped, which also ends the generation.
        let _ = rx.wait_for(|closed| *closed).await;
    }
}
