//! Document persistence.
//!
//! The orchestrator writes every coordination document through a
//! [`DocumentStore`], so tests can swap the filesystem for [`MemoryStore`].

use crate::error::{FlowError, Result};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

pub trait DocumentStore {
    /// Write `content` to `path`, creating parent directories as needed.
    fn write(&self, path: &Path, content: &str) -> Result<()>;
    fn mkdir_recursive(&self, path: &Path) -> Result<()>;
    fn read(&self, path: &Path) -> Result<String>;
    /// Entry names directly under `path`, sorted.
    fn list(&self, path: &Path) -> Result<Vec<String>>;
}

impl<S: DocumentStore + ?Sized> DocumentStore for &S {
    fn write(&self, path: &Path, content: &str) -> Result<()> {
        (**self).write(path, content)
    }

    fn mkdir_recursive(&self, path: &Path) -> Result<()> {
        (**self).mkdir_recursive(path)
    }

    fn read(&self, path: &Path) -> Result<String> {
        (**self).read(path)
    }

    fn list(&self, path: &Path) -> Result<Vec<String>> {
        (**self).list(path)
    }
}

// ---------------------------------------------------------------------------
// FsStore
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct FsStore;

impl DocumentStore for FsStore {
    fn write(&self, path: &Path, content: &str) -> Result<()> {
        crate::io::atomic_write(path, content.as_bytes())
    }

    fn mkdir_recursive(&self, path: &Path) -> Result<()> {
        crate::io::ensure_dir(path)
    }

    fn read(&self, path: &Path) -> Result<String> {
        if !path.exists() {
            return Err(FlowError::DocumentNotFound(path.display().to_string()));
        }
        Ok(std::fs::read_to_string(path)?)
    }

    fn list(&self, path: &Path) -> Result<Vec<String>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-memory store. Single-threaded, like the orchestrator that drives it.
#[derive(Debug, Default)]
pub struct MemoryStore {
    files: RefCell<BTreeMap<PathBuf, String>>,
    dirs: RefCell<BTreeSet<PathBuf>>,
    fail_writes_under: RefCell<Vec<PathBuf>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write below `prefix` fail with a permission error.
    pub fn fail_writes_under(&self, prefix: impl Into<PathBuf>) {
        self.fail_writes_under.borrow_mut().push(prefix.into());
    }

    pub fn len(&self) -> usize {
        self.files.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.borrow().is_empty()
    }
}

impl DocumentStore for MemoryStore {
    fn write(&self, path: &Path, content: &str) -> Result<()> {
        if self
            .fail_writes_under
            .borrow()
            .iter()
            .any(|p| path.starts_with(p))
        {
            return Err(FlowError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                format!("write denied: {}", path.display()),
            )));
        }
        if let Some(parent) = path.parent() {
            self.mkdir_recursive(parent)?;
        }
        self.files
            .borrow_mut()
            .insert(path.to_path_buf(), content.to_string());
        Ok(())
    }

    fn mkdir_recursive(&self, path: &Path) -> Result<()> {
        let mut dirs = self.dirs.borrow_mut();
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            dirs.insert(ancestor.to_path_buf());
        }
        Ok(())
    }

    fn read(&self, path: &Path) -> Result<String> {
        self.files
            .borrow()
            .get(path)
            .cloned()
            .ok_or_else(|| FlowError::DocumentNotFound(path.display().to_string()))
    }

    fn list(&self, path: &Path) -> Result<Vec<String>> {
        let mut names = BTreeSet::new();
        let files = self.files.borrow();
        let dirs = self.dirs.borrow();
        for p in files.keys().chain(dirs.iter()) {
            if p.parent() == Some(path) {
                if let Some(name) = p.file_name() {
                    names.insert(name.to_string_lossy().into_owned());
                }
            }
        }
        Ok(names.into_iter().collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
