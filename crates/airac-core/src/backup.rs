//! Snapshot and restore of an install tree
//!
//! Each snapshot is a mirror directory `<backup_dir>/<id>/` holding copies
//! of the files in scope, plus a manifest `<backup_dir>/<id>.snapshot.toml`
//! recording every relative path with its checksum. Snapshots are kept after
//! use so a user can restore one by hand later.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use airac_fs::{ConfigStore, NormalizedPath, compute_file_checksum, io, validate_relative_path};
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::scope::TreeScope;
use crate::{Error, Result};

const MANIFEST_SUFFIX: &str = ".snapshot.toml";

/// A file captured by a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotFile {
    /// Path relative to the captured root
    pub path: NormalizedPath,
    pub checksum: String,
}

/// Immutable record of a tree at one point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupSnapshot {
    /// `<REGION>_<YYYYmmdd_HHMMSS>`, suffixed `-2`, `-3`, ... on collision
    pub id: String,
    pub region: String,
    /// The captured install root
    pub root: PathBuf,
    pub created: DateTime<Utc>,
    /// Whether the root existed when captured
    pub existed: bool,
    /// Directories in scope, so empty ones come back too
    #[serde(default)]
    pub dirs: Vec<NormalizedPath>,
    /// Paths outside the scope that did not exist when captured, with their
    /// missing parent directories. Restore removes them again.
    #[serde(default)]
    pub absent: Vec<NormalizedPath>,
    pub scope: TreeScope,
    #[serde(default)]
    pub files: Vec<SnapshotFile>,
}

impl BackupSnapshot {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn contains(&self, path: &NormalizedPath) -> bool {
        self.files.iter().any(|f| &f.path == path)
    }
}

/// What a restore changed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RestoreReport {
    /// Files rewritten from the backup copy
    pub restored: Vec<NormalizedPath>,
    /// Files created after the snapshot and removed
    pub removed: Vec<NormalizedPath>,
}

/// Manages snapshots under one backup directory
#[derive(Debug, Clone)]
pub struct BackupManager {
    backup_dir: PathBuf,
}

impl BackupManager {
    pub fn new(backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            backup_dir: backup_dir.into(),
        }
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Directory holding the file copies of snapshot `id`
    pub fn snapshot_dir(&self, id: &str) -> PathBuf {
        self.backup_dir.join(id)
    }

    fn manifest_path(&self, id: &str) -> PathBuf {
        self.backup_dir.join(format!("{}{}", id, MANIFEST_SUFFIX))
    }

    fn validate_id(id: &str) -> Result<()> {
        let valid = !id.is_empty()
            && !id.contains(['/', '\\'])
            && id != "."
            && id != ".."
            && validate_relative_path(id).is_ok();
        if valid {
            Ok(())
        } else {
            Err(Error::backup(format!("Invalid snapshot id: '{}'", id)))
        }
    }

    /// Pick a fresh id for `region` based on the local time.
    fn next_id(&self, region: &str) -> Result<String> {
        let base = format!("{}_{}", region, Local::now().format("%Y%m%d_%H%M%S"));
        Self::validate_id(&base)?;

        let taken = |id: &str| self.snapshot_dir(id).exists() || self.manifest_path(id).exists();
        if !taken(&base) {
            return Ok(base);
        }
        let mut counter = 2;
        loop {
            let candidate = format!("{}-{}", base, counter);
            if !taken(&candidate) {
                return Ok(candidate);
            }
            counter += 1;
        }
    }

    /// Capture the files of `root` inside `scope`.
    ///
    /// A missing root yields an empty snapshot. On failure nothing of the
    /// partial backup is left behind.
    pub fn snapshot(&self, root: &Path, region: &str, scope: &TreeScope) -> Result<BackupSnapshot> {
        self.snapshot_including(root, region, scope, &[])
    }

    /// Like [`snapshot`](Self::snapshot), and also cover `extra` files
    /// outside `scope` that a run is about to write. Existing ones are
    /// copied; missing ones are recorded so restore deletes them.
    pub fn snapshot_including(
        &self,
        root: &Path,
        region: &str,
        scope: &TreeScope,
        extra: &[NormalizedPath],
    ) -> Result<BackupSnapshot> {
        let id = self.next_id(region)?;
        match self.capture(&id, root, region, scope, extra) {
            Ok(snapshot) => {
                tracing::info!(
                    id = %snapshot.id,
                    files = snapshot.files.len(),
                    "Snapshot created"
                );
                Ok(snapshot)
            }
            Err(e) => {
                tracing::warn!(id = %id, error = %e, "Snapshot failed, discarding partial backup");
                let _ = fs::remove_dir_all(self.snapshot_dir(&id));
                let _ = fs::remove_file(self.manifest_path(&id));
                Err(e)
            }
        }
    }

    fn capture(
        &self,
        id: &str,
        root: &Path,
        region: &str,
        scope: &TreeScope,
        extra: &[NormalizedPath],
    ) -> Result<BackupSnapshot> {
        let mirror = self.snapshot_dir(id);
        fs::create_dir_all(&mirror).map_err(|e| airac_fs::Error::io(&mirror, e))?;

        let existed = root.is_dir();
        let (dirs, mut paths) = if existed {
            (
                scope.filter(io::walk_dirs(root)?),
                scope.filter(io::walk_files(root)?),
            )
        } else {
            tracing::debug!(root = %root.display(), "Nothing to back up");
            (Vec::new(), Vec::new())
        };

        let mut absent = BTreeSet::new();
        for path in extra.iter().filter(|p| !scope.contains(p)) {
            if path.under(root).is_file() {
                paths.push(path.clone());
                continue;
            }
            absent.insert(path.clone());
            let mut parent = path.parent();
            while let Some(dir) = parent {
                if dir.under(root).exists() {
                    break;
                }
                parent = dir.parent();
                absent.insert(dir);
            }
        }
        paths.sort();
        paths.dedup();

        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            let copy = path.under(&mirror);
            io::copy_file(&path.under(root), &copy)?;
            let checksum =
                compute_file_checksum(&copy).map_err(|e| airac_fs::Error::io(&copy, e))?;
            tracing::debug!(file = %path, "Backed up");
            files.push(SnapshotFile { path, checksum });
        }

        let snapshot = BackupSnapshot {
            id: id.to_string(),
            region: region.to_string(),
            root: root.to_path_buf(),
            created: Utc::now(),
            existed,
            dirs,
            absent: absent.into_iter().collect(),
            scope: scope.clone(),
            files,
        };
        ConfigStore::new().save(&self.manifest_path(id), &snapshot)?;
        Ok(snapshot)
    }

    /// Put the captured root back exactly as recorded.
    ///
    /// Every backup copy is verified before the first write. Files in scope
    /// that the snapshot does not know are removed. A failure part way
    /// leaves the tree in an intermediate state.
    pub fn restore(&self, snapshot: &BackupSnapshot) -> Result<RestoreReport> {
        let mirror = self.snapshot_dir(&snapshot.id);
        let root = &snapshot.root;

        for file in &snapshot.files {
            validate_relative_path(file.path.as_str()).map_err(Error::backup)?;
            let copy = file.path.under(&mirror);
            let actual = compute_file_checksum(&copy).map_err(|e| airac_fs::Error::io(&copy, e))?;
            if actual != file.checksum {
                return Err(Error::ChecksumMismatch {
                    path: file.path.to_string(),
                });
            }
        }

        let mut report = RestoreReport::default();

        for path in snapshot.scope.filter(io::walk_files(root)?) {
            if !snapshot.contains(&path) {
                let native = path.under(root);
                fs::remove_file(&native).map_err(|e| airac_fs::Error::io(&native, e))?;
                tracing::debug!(file = %path, "Removed file created after snapshot");
                report.removed.push(path);
            }
        }

        // Deepest first, so files go before the directories holding them
        let mut absent: Vec<&NormalizedPath> = snapshot.absent.iter().collect();
        absent.sort_by_key(|p| std::cmp::Reverse(p.as_str().matches('/').count()));
        for path in absent {
            validate_relative_path(path.as_str()).map_err(Error::backup)?;
            let native = path.under(root);
            if native.is_file() {
                fs::remove_file(&native).map_err(|e| airac_fs::Error::io(&native, e))?;
                tracing::debug!(file = %path, "Removed file created after snapshot");
                report.removed.push(path.clone());
            } else if fs::read_dir(&native).is_ok_and(|mut entries| entries.next().is_none()) {
                fs::remove_dir(&native).map_err(|e| airac_fs::Error::io(&native, e))?;
            }
        }

        for file in &snapshot.files {
            let target = file.path.under(root);
            let unchanged = target.is_file()
                && compute_file_checksum(&target).is_ok_and(|sum| sum == file.checksum);
            if unchanged {
                continue;
            }
            let content = io::read_bytes(&file.path.under(&mirror))?;
            io::write_atomic(&target, &content)?;
            tracing::debug!(file = %file.path, "Restored");
            report.restored.push(file.path.clone());
        }

        for dir in &snapshot.dirs {
            let native = dir.under(root);
            fs::create_dir_all(&native).map_err(|e| airac_fs::Error::io(&native, e))?;
        }

        // Only empty directories inside the scope are candidates for removal
        let mut keep: Vec<NormalizedPath> = io::walk_dirs(root)?
            .into_iter()
            .filter(|d| !snapshot.scope.contains(d))
            .collect();
        keep.extend(snapshot.dirs.iter().cloned());
        io::prune_empty_dirs(root, &keep)?;

        if !snapshot.existed
            && snapshot.scope == TreeScope::Whole
            && fs::read_dir(root).is_ok_and(|mut entries| entries.next().is_none())
        {
            fs::remove_dir(root).map_err(|e| airac_fs::Error::io(root, e))?;
        }

        tracing::info!(
            id = %snapshot.id,
            restored = report.restored.len(),
            removed = report.removed.len(),
            "Snapshot restored"
        );
        Ok(report)
    }

    pub fn load(&self, id: &str) -> Result<BackupSnapshot> {
        Self::validate_id(id)?;
        let manifest = self.manifest_path(id);
        if !manifest.is_file() {
            return Err(Error::SnapshotNotFound { id: id.to_string() });
        }
        Ok(ConfigStore::new().load(&manifest)?)
    }

    /// All readable snapshots, oldest first.
    pub fn list_snapshots(&self) -> Result<Vec<BackupSnapshot>> {
        if !self.backup_dir.is_dir() {
            return Ok(Vec::new());
        }

        let entries =
            fs::read_dir(&self.backup_dir).map_err(|e| airac_fs::Error::io(&self.backup_dir, e))?;
        let mut snapshots = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| airac_fs::Error::io(&self.backup_dir, e))?;
            let name = entry.file_name().to_string_lossy().to_string();
            let Some(id) = name.strip_suffix(MANIFEST_SUFFIX) else {
                continue;
            };
            match self.load(id) {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(e) => tracing::warn!(manifest = %name, error = %e, "Skipping unreadable snapshot"),
            }
        }
        snapshots.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.id.cmp(&b.id)));
        Ok(snapshots)
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        Self::validate_id(id)?;
        let manifest = self.manifest_path(id);
        if !manifest.is_file() {
            return Err(Error::SnapshotNotFound { id: id.to_string() });
        }
        let mirror = self.snapshot_dir(id);
        if mirror.exists() {
            fs::remove_dir_all(&mirror).map_err(|e| airac_fs::Error::io(&mirror, e))?;
        }
        fs::remove_file(&manifest).map_err(|e| airac_fs::Error::io(&manifest, e))?;
        tracing::info!(id = %id, "Snapshot deleted");
        Ok(())
    }
}
