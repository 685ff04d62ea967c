// src/config/project.rs

//! The immutable per-session project aggregate.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;

use crate::types::StepKind;

/// Resolved command for one toolchain step.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    pub enabled: bool,
    pub cmd: String,
    /// Worker readiness pattern; only consulted for [`StepKind::Run`].
    pub ready_on_stdout: Option<Regex>,
}

impl ToolCommand {
    /// Built-in default for `step`.
    pub fn default_for(step: StepKind) -> Self {
        Self {
            enabled: step.enabled_by_default(),
            cmd: step.default_command().to_string(),
            ready_on_stdout: None,
        }
    }
}

/// Per-step commands and enable flags.
#[derive(Debug, Clone)]
pub struct Tools {
    entries: BTreeMap<StepKind, ToolCommand>,
}

impl Default for Tools {
    fn default() -> Self {
        let entries = StepKind::ALL
            .iter()
            .map(|&step| (step, ToolCommand::default_for(step)))
            .collect();
        Self { entries }
    }
}

impl Tools {
    pub fn command(&self, step: StepKind) -> &ToolCommand {
        // Every step is populated in `Default`, and `set` only replaces entries.
        &self.entries[&step]
    }

    pub fn enabled(&self, step: StepKind) -> bool {
        self.command(step).enabled
    }

    pub fn set(&mut self, step: StepKind, command: ToolCommand) {
        self.entries.insert(step, command);
    }

    pub fn set_enabled(&mut self, step: StepKind, enabled: bool) {
        if let Some(entry) = self.entries.get_mut(&step) {
            entry.enabled = enabled;
        }
    }
}

/// One watched project: everything a watch session needs, fixed at session
/// start.
#[derive(Debug, Clone)]
pub struct WatchedProject {
    pub name: String,
    /// Project base directory; toolchain commands run here.
    pub root: PathBuf,
    /// Directories to scan, relative to `root`.
    pub watch_dirs: Vec<PathBuf>,
    /// Watched extensions, always with a leading dot (e.g. `".go"`).
    pub extensions: BTreeSet<String>,
    /// Ignore rules (substrings or globs) matched against root-relative paths.
    pub ignore: Vec<String>,
    pub before: Vec<String>,
    pub after: Vec<String>,
    pub tools: Tools,
    pub poll_interval: Duration,
}

impl WatchedProject {
    /// A project with Go toolchain defaults and no extensions or ignores.
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            watch_dirs: vec![PathBuf::from(".")],
            extensions: BTreeSet::new(),
            ignore: Vec::new(),
            before: Vec::new(),
            after: Vec::new(),
            tools: Tools::default(),
            poll_interval: Duration::from_secs(1),
        }
    }

    /// Absolute (or root-joined) directories to scan.
    pub fn roots(&self) -> Vec<PathBuf> {
        self.watch_dirs
            .iter()
            .map(|dir| {
                if dir == Path::new(".") {
                    self.root.clone()
                } else {
                    self.root.join(dir)
                }
            })
            .collect()
    }
}

/// Normalise an extension to its dotted form: `"go"` -> `".go"`.
pub fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim();
    if ext.starts_with('.') {
        ext.to_string()
    } else {
        format!(".{ext}")
    }
}
