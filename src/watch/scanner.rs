// src/watch/scanner.rs

//! Initial tree walk: decide what to watch and register it.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::WatchedProject;
use crate::errors::{FreshrunError, Result};
use crate::fs::FileSystem;
use crate::output::{LogRecord, OutputSink, RecordKind};
use crate::watch::classifier::PathClassifier;
use crate::watch::strategy::WatchStrategy;

/// What a scan registered, in walk order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub dirs: Vec<PathBuf>,
    pub files: Vec<PathBuf>,
}

impl ScanReport {
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn dir_count(&self) -> usize {
        self.dirs.len()
    }
}

/// Walks each configured root and registers qualifying entries:
///
/// - ignored entries are skipped (directories with their whole subtree);
/// - hidden directories are skipped with their subtree;
/// - directories without an extension are registered;
/// - files are registered if their canonical extension is watched.
///
/// A failed registration is reported as an error record and the entry (and,
/// for directories, its subtree) is skipped; the scan itself carries on.
/// A missing root is fatal.
pub struct TreeScanner<'a> {
    fs: &'a dyn FileSystem,
    project: &'a WatchedProject,
    classifier: &'a PathClassifier,
}

impl<'a> TreeScanner<'a> {
    pub fn new(
        fs: &'a dyn FileSystem,
        project: &'a WatchedProject,
        classifier: &'a PathClassifier,
    ) -> Self {
        Self {
            fs,
            project,
            classifier,
        }
    }

    pub fn scan(
        &self,
        strategy: &mut dyn WatchStrategy,
        sink: &OutputSink,
    ) -> Result<ScanReport> {
        let mut report = ScanReport::default();

        for root in self.project.roots() {
            if !self.fs.exists(&root) {
                return Err(FreshrunError::RootNotFound(root));
            }
            self.walk_root(&root, strategy, sink, &mut report);
        }

        info!(
            project = %self.project.name,
            files = report.file_count(),
            dirs = report.dir_count(),
            "scan complete"
        );
        Ok(report)
    }

    fn walk_root(
        &self,
        root: &Path,
        strategy: &mut dyn WatchStrategy,
        sink: &OutputSink,
        report: &mut ScanReport,
    ) {
        let mut stack = vec![root.to_path_buf()];

        while let Some(path) = stack.pop() {
            if self.classifier.is_ignored(&path) {
                debug!(?path, "ignored");
                continue;
            }

            if self.fs.is_dir(&path) {
                if self.classifier.is_hidden(&path) {
                    debug!(?path, "hidden directory; skipping subtree");
                    continue;
                }

                if path.extension().is_none() {
                    if let Err(err) = strategy.register(&path) {
                        report_registration_failure(sink, &path, &err);
                        continue;
                    }
                    report.dirs.push(path.clone());
                }

                match self.fs.read_dir(&path) {
                    Ok(children) => stack.extend(children.into_iter().rev()),
                    Err(err) => {
                        sink.emit(
                            RecordKind::Error,
                            LogRecord::new(format!("cannot read directory: {err}"))
                                .with_tag("Watch")
                                .with_path(&path),
                        );
                    }
                }
            } else if self.classifier.watched_extension(&path).is_some() {
                if let Err(err) = strategy.register(&path) {
                    report_registration_failure(sink, &path, &err);
                    continue;
                }
                report.files.push(path);
            }
        }
    }
}

fn report_registration_failure(sink: &OutputSink, path: &Path, err: &FreshrunError) {
    sink.emit(
        RecordKind::Error,
        LogRecord::new(err.to_string())
            .with_tag("Watch")
            .with_path(path),
    );
}
