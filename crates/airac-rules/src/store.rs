//! File stores the rule engine reads from and writes to
//!
//! [`DiskStore`] edits the install tree in place. [`OverlayStore`] reads
//! through to disk but keeps every write in memory, which lets a dry run
//! execute a whole plan, with later rules seeing earlier rules' edits,
//! without touching the filesystem.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use airac_fs::{NormalizedPath, io};

use crate::Result;

/// Storage of the files below an install root.
pub trait FileStore {
    /// Native install root
    fn root(&self) -> &Path;

    /// Every file under the root, relative and sorted
    fn list(&self) -> Result<Vec<NormalizedPath>>;

    fn read(&self, path: &NormalizedPath) -> Result<Vec<u8>>;

    fn exists(&self, path: &NormalizedPath) -> bool;

    fn write(&mut self, path: &NormalizedPath, content: &[u8]) -> Result<()>;
}

/// Reads and writes the install tree directly.
#[derive(Debug, Clone)]
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl FileStore for DiskStore {
    fn root(&self) -> &Path {
        &self.root
    }

    fn list(&self) -> Result<Vec<NormalizedPath>> {
        Ok(io::walk_files(&self.root)?)
    }

    fn read(&self, path: &NormalizedPath) -> Result<Vec<u8>> {
        Ok(io::read_bytes(&path.under(&self.root))?)
    }

    fn exists(&self, path: &NormalizedPath) -> bool {
        path.under(&self.root).is_file()
    }

    fn write(&mut self, path: &NormalizedPath, content: &[u8]) -> Result<()> {
        Ok(io::write_atomic(&path.under(&self.root), content)?)
    }
}

/// Copy-on-write view of the install tree held in memory.
#[derive(Debug, Clone)]
pub struct OverlayStore {
    root: PathBuf,
    overlay: BTreeMap<NormalizedPath, Vec<u8>>,
    /// Disk files hidden from the view
    removed: BTreeSet<NormalizedPath>,
}

impl OverlayStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            overlay: BTreeMap::new(),
            removed: BTreeSet::new(),
        }
    }

    /// Drop `path` from the view. The file on disk is kept.
    pub fn remove(&mut self, path: &NormalizedPath) {
        self.overlay.remove(path);
        self.removed.insert(path.clone());
    }

    /// Paths written so far, sorted
    pub fn written(&self) -> impl Iterator<Item = &NormalizedPath> {
        self.overlay.keys()
    }
}

impl FileStore for OverlayStore {
    fn root(&self) -> &Path {
        &self.root
    }

    fn list(&self) -> Result<Vec<NormalizedPath>> {
        let mut files = io::walk_files(&self.root)?;
        files.retain(|path| !self.removed.contains(path));
        files.extend(self.overlay.keys().cloned());
        files.sort();
        files.dedup();
        Ok(files)
    }

    fn read(&self, path: &NormalizedPath) -> Result<Vec<u8>> {
        match self.overlay.get(path) {
            Some(content) => Ok(content.clone()),
            None if self.removed.contains(path) => Err(airac_fs::Error::io(
                path.under(&self.root),
                std::io::ErrorKind::NotFound.into(),
            )
            .into()),
            None => Ok(io::read_bytes(&path.under(&self.root))?),
        }
    }

    fn exists(&self, path: &NormalizedPath) -> bool {
        self.overlay.contains_key(path)
            || (!self.removed.contains(path) && path.under(&self.root).is_file())
    }

    fn write(&mut self, path: &NormalizedPath, content: &[u8]) -> Result<()> {
        self.removed.remove(path);
        self.overlay.insert(path.clone(), content.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn overlay_reads_through_and_never_writes_disk() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("Screen.txt"), "m_ScreenNumber:0").unwrap();

        let mut store = OverlayStore::new(temp.path());
        let path = NormalizedPath::new("Screen.txt");
        assert_eq!(store.read(&path).unwrap(), b"m_ScreenNumber:0");

        store.write(&path, b"m_ScreenNumber:1").unwrap();
        store.write(&NormalizedPath::new("New/file.txt"), b"x").unwrap();

        assert_eq!(store.read(&path).unwrap(), b"m_ScreenNumber:1");
        assert_eq!(
            std::fs::read_to_string(temp.path().join("Screen.txt")).unwrap(),
            "m_ScreenNumber:0"
        );
        assert!(!temp.path().join("New").exists());
        assert!(store.exists(&NormalizedPath::new("New/file.txt")));
        assert_eq!(
            store.list().unwrap(),
            vec![NormalizedPath::new("New/file.txt"), NormalizedPath::new("Screen.txt")]
        );
    }

    #[test]
    fn overlay_removal_hides_disk_files() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("Old.txt"), "old").unwrap();
        std::fs::write(temp.path().join("Kept.txt"), "kept").unwrap();
        let old = NormalizedPath::new("Old.txt");

        let mut store = OverlayStore::new(temp.path());
        store.remove(&old);

        assert!(!store.exists(&old));
        assert!(store.read(&old).is_err());
        assert_eq!(store.list().unwrap(), vec![NormalizedPath::new("Kept.txt")]);
        assert!(temp.path().join("Old.txt").is_file());

        store.write(&old, b"new").unwrap();
        assert_eq!(store.read(&old).unwrap(), b"new");
    }

    #[test]
    fn disk_store_writes_under_root() {
        let temp = TempDir::new().unwrap();
        let mut store = DiskStore::new(temp.path());
        store
            .write(&NormalizedPath::new("EDGG/NavData/isec.txt"), b"ISEC")
            .unwrap();
        assert_eq!(
            std::fs::read(temp.path().join("EDGG/NavData/isec.txt")).unwrap(),
            b"ISEC"
        );
    }
}
