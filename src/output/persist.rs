// src/output/persist.rs

//! Append-only log files for the three record sequences.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::warn;

use crate::config::PersistOptions;
use crate::output::RecordKind;

pub const OUTPUTS_FILE: &str = "outputs.log";
pub const LOGS_FILE: &str = "logs.log";
pub const ERRORS_FILE: &str = "errors.log";

/// Which sequences are persisted, and where.
#[derive(Debug, Clone)]
pub struct FileSinks {
    dir: PathBuf,
    outputs: bool,
    logs: bool,
    errors: bool,
}

impl FileSinks {
    /// `None` if no sequence is persisted. Relative `options.dir` is resolved
    /// against `project_root`.
    pub fn from_options(project_root: &Path, options: &PersistOptions) -> Option<Self> {
        if !options.any() {
            return None;
        }
        let dir = if options.dir.is_absolute() {
            options.dir.clone()
        } else {
            project_root.join(&options.dir)
        };
        Some(Self {
            dir,
            outputs: options.outputs,
            logs: options.logs,
            errors: options.errors,
        })
    }

    pub fn path_for(&self, kind: RecordKind) -> Option<PathBuf> {
        let (enabled, name) = match kind {
            RecordKind::Stdout => (self.outputs, OUTPUTS_FILE),
            RecordKind::Log => (self.logs, LOGS_FILE),
            RecordKind::Error => (self.errors, ERRORS_FILE),
        };
        enabled.then(|| self.dir.join(name))
    }

    /// Append one rendered line. Failures are logged and otherwise ignored.
    pub fn append(&self, kind: RecordKind, line: &str) {
        let Some(path) = self.path_for(kind) else {
            return;
        };
        if let Err(err) = append_line(&path, line) {
            warn!(?path, error = %err, "failed to persist output record");
        }
    }
}

fn append_line(path: &Path, line: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating dir {:?}", parent))?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening {:?}", path))?;
    writeln!(file, "{line}").with_context(|| format!("writing to {:?}", path))?;
    Ok(())
}
