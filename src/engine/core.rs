// src/engine/core.rs

//! Pure generation state machine.
//!
//! A generation walks install, build and run in that order, skipping
//! disabled stages. A failed install or build ends the generation without
//! starting a worker. The plan does no IO; the pipeline runner feeds it step
//! outcomes and executes the commands it returns.

use crate::config::Tools;
use crate::engine::{PipelineCommand, PipelineState, StepOutcome};
use crate::types::StepKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationToggles {
    pub install: bool,
    pub build: bool,
    pub run: bool,
}

impl GenerationToggles {
    pub fn from_tools(tools: &Tools) -> Self {
        Self {
            install: tools.enabled(StepKind::Install),
            build: tools.enabled(StepKind::Build),
            run: tools.enabled(StepKind::Run),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationPlan {
    toggles: GenerationToggles,
    state: PipelineState,
    failed: Option<StepKind>,
}

impl GenerationPlan {
    pub fn new(toggles: GenerationToggles) -> Self {
        Self {
            toggles,
            state: PipelineState::Idle,
            failed: None,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Step that ended the generation early, if any.
    pub fn failed_step(&self) -> Option<StepKind> {
        self.failed
    }

    /// Start a generation and return its first command.
    pub fn begin(&mut self) -> PipelineCommand {
        self.failed = None;
        self.state = PipelineState::Idle;
        self.next_from(PipelineState::Idle)
    }

    /// Feed the outcome of the command last returned.
    pub fn advance(&mut self, outcome: StepOutcome) -> PipelineCommand {
        match self.state {
            PipelineState::Installing | PipelineState::Building if outcome.is_failure() => {
                self.failed = Some(match self.state {
                    PipelineState::Installing => StepKind::Install,
                    _ => StepKind::Build,
                });
                self.state = PipelineState::Idle;
                PipelineCommand::Finish
            }
            PipelineState::Installing | PipelineState::Building => self.next_from(self.state),
            PipelineState::Running => {
                if outcome.is_failure() {
                    self.failed = Some(StepKind::Run);
                    self.state = PipelineState::Idle;
                }
                PipelineCommand::Finish
            }
            PipelineState::Idle | PipelineState::Scanning => PipelineCommand::Finish,
        }
    }

    fn next_from(&mut self, from: PipelineState) -> PipelineCommand {
        let install = from == PipelineState::Idle && self.toggles.install;
        let build = matches!(from, PipelineState::Idle | PipelineState::Installing)
            && self.toggles.build;
        let run = from != PipelineState::Running && self.toggles.run;

        let (state, command) = if install {
            (PipelineState::Installing, PipelineCommand::Install)
        } else if build {
            (PipelineState::Building, PipelineCommand::Build)
        } else if run {
            (PipelineState::Running, PipelineCommand::StartWorker)
        } else {
            (PipelineState::Idle, PipelineCommand::Finish)
        };
        self.state = state;
        command
    }
}
