#![allow(dead_code)]

use std::path::PathBuf;
use std::time::Duration;

use freshrun::config::{ConfigFile, RawConfigFile, ToolCommand, WatchedProject};
use freshrun::types::StepKind;

/// Builder for `WatchedProject` to simplify test setup.
///
/// Starts from the Go defaults with `.go` watched and every step that
/// touches the outside world left as configured by default.
pub struct ProjectBuilder {
    project: WatchedProject,
}

impl ProjectBuilder {
    pub fn new(name: &str, root: impl Into<PathBuf>) -> Self {
        let mut project = WatchedProject::new(name, root);
        project.extensions.insert(".go".to_string());
        Self { project }
    }

    pub fn with_extension(mut self, ext: &str) -> Self {
        self.project
            .extensions
            .insert(freshrun::config::project::normalize_extension(ext));
        self
    }

    pub fn with_ignore(mut self, rule: &str) -> Self {
        self.project.ignore.push(rule.to_string());
        self
    }

    pub fn with_watch_dir(mut self, dir: &str) -> Self {
        if self.project.watch_dirs == [PathBuf::from(".")] {
            self.project.watch_dirs.clear();
        }
        self.project.watch_dirs.push(PathBuf::from(dir));
        self
    }

    pub fn with_before(mut self, cmd: &str) -> Self {
        self.project.before.push(cmd.to_string());
        self
    }

    pub fn with_after(mut self, cmd: &str) -> Self {
        self.project.after.push(cmd.to_string());
        self
    }

    pub fn enable(mut self, step: StepKind) -> Self {
        self.project.tools.set_enabled(step, true);
        self
    }

    pub fn disable(mut self, step: StepKind) -> Self {
        self.project.tools.set_enabled(step, false);
        self
    }

    /// Enable only the given steps.
    pub fn only(mut self, steps: &[StepKind]) -> Self {
        for step in StepKind::ALL {
            self.project.tools.set_enabled(step, steps.contains(&step));
        }
        self
    }

    pub fn with_command(mut self, step: StepKind, cmd: &str) -> Self {
        let mut command = ToolCommand::default_for(step);
        command.enabled = true;
        command.cmd = cmd.to_string();
        self.project.tools.set(step, command);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.project.poll_interval = interval;
        self
    }

    pub fn build(self) -> WatchedProject {
        self.project
    }
}

/// Parse and validate a TOML snippet.
pub fn config_from_toml(src: &str) -> freshrun::errors::Result<ConfigFile> {
    let raw: RawConfigFile = toml::from_str(src)?;
    ConfigFile::try_from(raw)
}
