// src/exec/mod.rs

//! Process execution: one-shot steps, the long-lived worker, hooks.

pub mod backend;
pub mod command;
pub mod hooks;
pub mod restart;
pub mod worker;

pub use backend::{RealToolchain, ToolchainBackend};
pub use command::{StepOutput, run_captured, shell_command};
pub use hooks::{HookExecutor, HookPhase, HookSummary, spawn_signal_listener};
pub use restart::{GenerationCounter, RestartSignal, RestartToken};
pub use worker::{RunningWorker, WorkerExit, WorkerSpec, start_worker};
