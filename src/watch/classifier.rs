// src/watch/classifier.rs

//! Path classification: ignore rules, watched extensions, and the canonical
//! file/extension pair reported for a change.
//!
//! Editors and tools often write decorated siblings of a source file
//! (`main.go_1712345`, `handler_test.go`). Everything from the first `_` in
//! the extension, and everything from the first `_` in the stem, is treated
//! as a versioning suffix and stripped before the extension is compared
//! against the watched set:
//!
//! | observed        | canonical file | canonical ext |
//! |-----------------|----------------|---------------|
//! | `foo.go`        | `foo.go`       | `.go`         |
//! | `foo_bar.go`    | `foo.go`       | `.go`         |
//! | `main.go_1234`  | `main.go`      | `.go`         |
//! | `.go`           | rejected       |               |

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::warn;

use crate::config::WatchedProject;
use crate::watch::path_utils::{is_hidden_relative, relative_str};

/// A change that passed every filter, in canonical form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedChange {
    /// Canonical file path (versioning suffixes stripped).
    pub file: PathBuf,
    /// Canonical extension, with leading dot.
    pub ext: String,
    /// Directory containing the observed file.
    pub dir: PathBuf,
    /// The path the watcher actually reported.
    pub observed: PathBuf,
}

/// Split a file name into its canonical `(stem, extension)`.
///
/// Returns `None` when there is no extension or nothing precedes it. A name
/// that starts with `_` (`_helpers.go`) keeps its full prefix as the stem.
pub fn canonical_name(file_name: &str) -> Option<(&str, &str)> {
    let dot = file_name.rfind('.')?;
    let (prefix, raw_ext) = file_name.split_at(dot);

    let ext = match raw_ext.find('_') {
        Some(i) => &raw_ext[..i],
        None => raw_ext,
    };
    if prefix.is_empty() || ext.len() <= 1 {
        return None;
    }

    let stem = match prefix.find('_') {
        Some(0) | None => prefix,
        Some(i) => &prefix[..i],
    };
    Some((stem, ext))
}

/// True if an ignore rule should be compiled as a glob rather than matched
/// as a substring.
pub fn is_glob_pattern(rule: &str) -> bool {
    rule.contains(['*', '?', '[', '{'])
}

/// Ignore rules for one project: plain substrings plus compiled globs, both
/// matched against the root-relative path.
#[derive(Clone, Default)]
pub struct IgnoreRules {
    substrings: Vec<String>,
    globs: Option<GlobSet>,
}

impl fmt::Debug for IgnoreRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IgnoreRules")
            .field("substrings", &self.substrings)
            .field("globs", &self.globs.as_ref().map(GlobSet::len))
            .finish()
    }
}

impl IgnoreRules {
    pub fn new(rules: &[String]) -> Self {
        let mut substrings = Vec::new();
        let mut builder = GlobSetBuilder::new();
        let mut glob_count = 0;

        for rule in rules.iter().map(|r| r.trim()).filter(|r| !r.is_empty()) {
            if !is_glob_pattern(rule) {
                substrings.push(rule.to_string());
                continue;
            }
            match Glob::new(rule) {
                Ok(glob) => {
                    builder.add(glob);
                    glob_count += 1;
                }
                Err(err) => warn!(rule, error = %err, "invalid ignore glob; skipping"),
            }
        }

        let globs = if glob_count == 0 {
            None
        } else {
            match builder.build() {
                Ok(set) => Some(set),
                Err(err) => {
                    warn!(error = %err, "failed to compile ignore globs; ignoring them");
                    None
                }
            }
        };

        Self { substrings, globs }
    }

    pub fn matches(&self, rel_path: &str) -> bool {
        if self.substrings.iter().any(|s| rel_path.contains(s.as_str())) {
            return true;
        }
        self.globs
            .as_ref()
            .is_some_and(|set| set.is_match(rel_path))
    }
}

/// Stateless classifier built once per session from the project.
#[derive(Debug, Clone)]
pub struct PathClassifier {
    root: PathBuf,
    extensions: BTreeSet<String>,
    ignore: IgnoreRules,
}

impl PathClassifier {
    pub fn new(project: &WatchedProject) -> Self {
        Self {
            root: project.root.clone(),
            extensions: project.extensions.clone(),
            ignore: IgnoreRules::new(&project.ignore),
        }
    }

    fn relative(&self, path: &Path) -> String {
        relative_str(&self.root, path)
            .unwrap_or_else(|| path.to_string_lossy().replace('\\', "/"))
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        self.ignore.matches(&self.relative(path))
    }

    pub fn is_hidden(&self, path: &Path) -> bool {
        is_hidden_relative(&self.relative(path))
    }

    /// Canonical extension of `path`, if it is one we watch.
    pub fn watched_extension(&self, path: &Path) -> Option<String> {
        let name = path.file_name()?.to_str()?;
        let (_, ext) = canonical_name(name)?;
        self.extensions.contains(ext).then(|| ext.to_string())
    }

    /// Full classification: ignore rules, canonical name, watched extension.
    pub fn classify(&self, path: &Path) -> Option<ClassifiedChange> {
        if self.is_ignored(path) {
            return None;
        }
        let name = path.file_name()?.to_str()?;
        let (stem, ext) = canonical_name(name)?;
        if !self.extensions.contains(ext) {
            return None;
        }

        Some(ClassifiedChange {
            file: path.with_file_name(format!("{stem}{ext}")),
            ext: ext.to_string(),
            dir: path.parent().map(Path::to_path_buf).unwrap_or_default(),
            observed: path.to_path_buf(),
        })
    }
}
