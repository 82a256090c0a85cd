//! Filesystem helpers shared by [`crate::store::FsStore`] and the config layer.

use crate::error::Result;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Write `data` to `path` through a sibling tempfile and a rename, so a
/// reader never sees a half-written document. Parent directories are
/// created first.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    ensure_dir(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

pub fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)?;
    Ok(())
}

/// Scaffold a file that agents are expected to edit afterwards. Returns
/// `false`, leaving the file untouched, when it already exists.
pub fn write_if_missing(path: &Path, data: &[u8]) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    atomic_write(path, data).map(|()| true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_creates_parents_and_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reports/Verifier/doc.md");
        atomic_write(&path, b"first").unwrap();
        atomic_write(&path, b"second").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        // no tempfile left behind
        assert_eq!(std::fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }

    #[test]
    fn write_if_missing_keeps_existing_brief() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("features/auth/design.md");
        assert!(write_if_missing(&path, b"scaffold").unwrap());
        std::fs::write(&path, b"agent notes").unwrap();
        assert!(!write_if_missing(&path, b"scaffold").unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "agent notes");
    }
}
