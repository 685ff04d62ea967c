// src/config/model.rs

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::config::project::WatchedProject;
use crate::types::WatchMode;

/// Raw configuration as read from a TOML file.
///
/// ```toml
/// [settings]
/// mode = "poll"
/// poll_interval = "500ms"
///
/// [[project]]
/// name = "api"
/// path = "."
/// extensions = [".go"]
/// ignore = ["vendor"]
///
/// [project.tools.run]
/// cmd = "go run ./cmd/api"
/// ```
///
/// This is only the deserialized shape; use `ConfigFile::try_from` (see
/// `validate.rs`) to obtain something the engine can run.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    /// Global behaviour from `[settings]`.
    #[serde(default)]
    pub settings: SettingsSection,

    /// All projects from `[[project]]`.
    #[serde(default, rename = "project")]
    pub projects: Vec<ProjectSection>,
}

/// `[settings]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SettingsSection {
    /// `"event"` (default) or `"poll"`.
    #[serde(default)]
    pub mode: WatchMode,

    /// Full polling cycle length, split evenly across watched directories.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,

    /// Time a cancelled worker gets between SIGTERM and SIGKILL.
    #[serde(default = "default_grace_period")]
    pub grace_period: String,

    /// Upper bound on waiting for `ready_on_stdout`.
    #[serde(default = "default_ready_timeout")]
    pub ready_timeout: String,

    /// Print every pipeline record to stdout.
    #[serde(default = "default_true")]
    pub echo: bool,

    #[serde(default)]
    pub files: FilesSection,
}

fn default_poll_interval() -> String {
    "1s".to_string()
}

fn default_grace_period() -> String {
    "3s".to_string()
}

fn default_ready_timeout() -> String {
    "10s".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for SettingsSection {
    fn default() -> Self {
        Self {
            mode: WatchMode::default(),
            poll_interval: default_poll_interval(),
            grace_period: default_grace_period(),
            ready_timeout: default_ready_timeout(),
            echo: true,
            files: FilesSection::default(),
        }
    }
}

/// `[settings.files]`: which OutputSink sequences are appended to disk.
#[derive(Debug, Clone, Deserialize)]
pub struct FilesSection {
    #[serde(default)]
    pub outputs: bool,
    #[serde(default)]
    pub logs: bool,
    #[serde(default)]
    pub errors: bool,
    /// Directory for the log files, relative to each project root.
    #[serde(default = "default_files_dir")]
    pub dir: String,
}

fn default_files_dir() -> String {
    ".freshrun".to_string()
}

impl Default for FilesSection {
    fn default() -> Self {
        Self {
            outputs: false,
            logs: false,
            errors: false,
            dir: default_files_dir(),
        }
    }
}

/// `[[project]]` entry.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProjectSection {
    pub name: String,

    /// Project root; relative paths are resolved against the config file's directory.
    #[serde(default)]
    pub path: String,

    /// Directories (relative to `path`) to scan and watch. Defaults to `["."]`.
    #[serde(default)]
    pub watch: Vec<String>,

    /// Extensions of interest, with or without the leading dot.
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Substrings (or globs, if they contain `*?[{`) of paths to skip.
    #[serde(default)]
    pub ignore: Vec<String>,

    /// Commands run once before the first scan.
    #[serde(default)]
    pub before: Vec<String>,

    /// Commands run once after a termination signal.
    #[serde(default)]
    pub after: Vec<String>,

    #[serde(default)]
    pub tools: ToolsSection,
}

/// `[project.tools]`: per-step overrides.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ToolsSection {
    #[serde(default)]
    pub fmt: Option<ToolSection>,
    #[serde(default)]
    pub test: Option<ToolSection>,
    #[serde(default)]
    pub generate: Option<ToolSection>,
    #[serde(default)]
    pub install: Option<ToolSection>,
    #[serde(default)]
    pub build: Option<ToolSection>,
    #[serde(default)]
    pub run: Option<ToolSection>,
}

/// `[project.tools.<step>]`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ToolSection {
    /// If `None`, the step's built-in default applies.
    #[serde(default)]
    pub enabled: Option<bool>,

    /// Shell command; if `None`, the Go toolchain default for the step is used.
    #[serde(default)]
    pub cmd: Option<String>,

    /// Only meaningful for `run`: regex marking worker startup as complete.
    #[serde(default)]
    pub ready_on_stdout: Option<String>,
}

/// Persistence toggles resolved from `[settings.files]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistOptions {
    pub outputs: bool,
    pub logs: bool,
    pub errors: bool,
    pub dir: PathBuf,
}

impl PersistOptions {
    pub fn any(&self) -> bool {
        self.outputs || self.logs || self.errors
    }
}

/// Validated global settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub mode: WatchMode,
    pub poll_interval: Duration,
    pub grace_period: Duration,
    pub ready_timeout: Duration,
    pub echo: bool,
    pub persist: PersistOptions,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mode: WatchMode::Event,
            poll_interval: Duration::from_secs(1),
            grace_period: Duration::from_secs(3),
            ready_timeout: Duration::from_secs(10),
            echo: true,
            persist: PersistOptions {
                dir: PathBuf::from(default_files_dir()),
                ..PersistOptions::default()
            },
        }
    }
}

/// Validated configuration. Build it via `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub settings: Settings,
    pub projects: Vec<WatchedProject>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(settings: Settings, projects: Vec<WatchedProject>) -> Self {
        Self { settings, projects }
    }

    /// Resolve relative project roots against `base` (the config file's directory).
    pub fn with_base_dir(mut self, base: &Path) -> Self {
        for project in &mut self.projects {
            if project.root.is_relative() {
                project.root = base.join(&project.root);
            }
        }
        self
    }

    /// Look up a project by name.
    pub fn project(&self, name: &str) -> Option<&WatchedProject> {
        self.projects.iter().find(|p| p.name == name)
    }
}
