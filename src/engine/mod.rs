// src/engine/mod.rs

//! Orchestration engine for freshrun.
//!
//! This module ties together:
//! - the per-generation plan (install, build, run; short-circuit on failure)
//! - the pipeline runner that executes steps and supervises the worker
//! - the session loop that reacts to:
//!   - classified file changes
//!   - watch errors
//!   - the shutdown signal
//!
//! The pure state machine lives in [`core`]; the async/IO shell is
//! implemented in [`pipeline`] and [`session`].

pub mod core;
pub mod pipeline;
pub mod session;

pub use self::core::{GenerationPlan, GenerationToggles};
pub use pipeline::{PipelineRunner, RunnerStats};
pub use session::Session;

/// Where a project's pipeline currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineState {
    #[default]
    Idle,
    Scanning,
    Installing,
    Building,
    Running,
}

/// Result of one pipeline step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Succeeded,
    Failed,
    /// Step disabled for this project.
    Skipped,
}

impl StepOutcome {
    pub fn is_failure(self) -> bool {
        matches!(self, StepOutcome::Failed)
    }
}

/// What the IO shell should do next for the current generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineCommand {
    Install,
    Build,
    StartWorker,
    Finish,
}
