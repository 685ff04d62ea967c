// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FreshrunError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Watched root does not exist: {0:?}")]
    RootNotFound(PathBuf),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("Failed to register {path:?} with the watcher: {reason}")]
    Registration { path: PathBuf, reason: String },

    #[error("Worker failed to start: {0}")]
    WorkerStart(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, FreshrunError>;
