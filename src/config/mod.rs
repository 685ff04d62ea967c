// src/config/mod.rs

//! Configuration loading and validation for freshrun.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Resolve it into immutable per-session projects (`project.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate basic constraints (`validate.rs`).

pub mod loader;
pub mod model;
pub mod project;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{
    ConfigFile, FilesSection, PersistOptions, ProjectSection, RawConfigFile, Settings,
    SettingsSection, ToolSection, ToolsSection,
};
pub use project::{ToolCommand, Tools, WatchedProject};
