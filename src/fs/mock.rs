// src/fs/mock.rs

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Result, anyhow};

use super::FileSystem;

#[derive(Debug, Clone)]
enum MockKind {
    File,
    Dir(BTreeSet<String>), // child names
}

#[derive(Debug, Clone)]
struct MockEntry {
    kind: MockKind,
    modified: SystemTime,
}

/// In-memory filesystem with explicit modification times (whole seconds
/// since the Unix epoch), shared between clones.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    entries: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
}

fn at(secs: i64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs.max(0) as u64)
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, MockEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create (or overwrite) a file with the given mtime, creating parents.
    pub fn add_file(&self, path: impl AsRef<Path>, mtime_secs: i64) {
        let path = path.as_ref().to_path_buf();
        let mut entries = self.lock();
        Self::link_parent(&mut entries, &path);
        entries.insert(
            path,
            MockEntry {
                kind: MockKind::File,
                modified: at(mtime_secs),
            },
        );
    }

    /// Create a directory (and its parents).
    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        let mut entries = self.lock();
        Self::ensure_dir(&mut entries, &path);
    }

    /// Set the mtime of an existing entry, as a write would.
    pub fn touch(&self, path: impl AsRef<Path>, mtime_secs: i64) {
        if let Some(entry) = self.lock().get_mut(path.as_ref()) {
            entry.modified = at(mtime_secs);
        }
    }

    /// Remove a file or an (assumed empty) directory.
    pub fn remove(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut entries = self.lock();
        entries.remove(path);
        if let (Some(parent), Some(name)) = (path.parent(), path.file_name()) {
            if let Some(MockEntry {
                kind: MockKind::Dir(children),
                ..
            }) = entries.get_mut(parent)
            {
                children.remove(&name.to_string_lossy().to_string());
            }
        }
    }

    fn ensure_dir(entries: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
        if entries.contains_key(path) {
            return;
        }
        Self::link_parent(entries, path);
        entries.insert(
            path.to_path_buf(),
            MockEntry {
                kind: MockKind::Dir(BTreeSet::new()),
                modified: UNIX_EPOCH,
            },
        );
    }

    fn link_parent(entries: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
        let Some(parent) = path.parent() else {
            return;
        };
        if parent.as_os_str().is_empty() {
            return;
        }
        Self::ensure_dir(entries, parent);
        if let (Some(name), Some(MockEntry {
            kind: MockKind::Dir(children),
            ..
        })) = (path.file_name(), entries.get_mut(parent))
        {
            children.insert(name.to_string_lossy().to_string());
        }
    }
}

impl FileSystem for MockFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.lock().contains_key(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(
            self.lock().get(path),
            Some(MockEntry {
                kind: MockKind::File,
                ..
            })
        )
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(
            self.lock().get(path),
            Some(MockEntry {
                kind: MockKind::Dir(_),
                ..
            })
        )
    }

    fn modified(&self, path: &Path) -> Result<SystemTime> {
        self.lock()
            .get(path)
            .map(|e| e.modified)
            .ok_or_else(|| anyhow!("File not found: {:?}", path))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        match self.lock().get(path) {
            Some(MockEntry {
                kind: MockKind::Dir(children),
                ..
            }) => Ok(children.iter().map(|name| path.join(name)).collect()),
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }
}
