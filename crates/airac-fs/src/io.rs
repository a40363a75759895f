//! Atomic writes and tree enumeration

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use fs2::FileExt;
use walkdir::WalkDir;

use crate::{Error, NormalizedPath, Result};

/// Write content atomically to a file with locking.
///
/// Uses write-to-temp-then-rename so a reader never observes a half-written
/// settings file. Parent directories are created as needed.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    // Same directory keeps the rename on one filesystem
    let temp_name = format!(
        ".{}.{}.tmp",
        path.file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        std::process::id()
    );
    let temp_path = path.with_file_name(&temp_name);

    let mut temp_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .map_err(|e| Error::io(&temp_path, e))?;

    temp_file
        .lock_exclusive()
        .map_err(|_| Error::LockFailed {
            path: path.to_path_buf(),
        })?;

    let written = temp_file
        .write_all(content)
        .and_then(|_| temp_file.sync_all());
    if let Err(e) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(Error::io(&temp_path, e));
    }

    temp_file.unlock().map_err(|_| Error::LockFailed {
        path: path.to_path_buf(),
    })?;
    drop(temp_file);

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        Error::io(path, e)
    })?;

    Ok(())
}

/// Read raw bytes from a file.
pub fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| Error::io(path, e))
}

/// Copy a file, creating the destination's parent directories.
pub fn copy_file(source: &Path, target: &Path) -> Result<u64> {
    if let Some(parent) = target.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    fs::copy(source, target).map_err(|e| Error::io(source, e))
}

/// List every regular file under `root`, relative to it and sorted.
///
/// A missing root yields an empty list. Symlinks are not followed.
pub fn walk_files(root: &Path) -> Result<Vec<NormalizedPath>> {
    walk(root, |ft| ft.is_file())
}

/// List every directory under `root` (excluding `root` itself), sorted.
pub fn walk_dirs(root: &Path) -> Result<Vec<NormalizedPath>> {
    walk(root, |ft| ft.is_dir())
}

fn walk(root: &Path, keep: impl Fn(&fs::FileType) -> bool) -> Result<Vec<NormalizedPath>> {
    if !root.exists() {
        return Ok(Vec::new());
    }

    let mut found = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::Walk {
            path: e.path().unwrap_or(root).to_path_buf(),
            message: e.to_string(),
        })?;
        if !keep(&entry.file_type()) {
            continue;
        }
        if let Some(rel) = NormalizedPath::relative(root, entry.path()) {
            found.push(rel);
        }
    }
    found.sort();
    Ok(found)
}

/// Remove directories under `root` that are empty, deepest first.
///
/// Directories listed in `keep` survive even when empty.
pub fn prune_empty_dirs(root: &Path, keep: &[NormalizedPath]) -> Result<()> {
    let mut dirs = walk_dirs(root)?;
    dirs.sort_by_key(|d| std::cmp::Reverse(d.as_str().matches('/').count()));
    for dir in dirs {
        if keep.contains(&dir) {
            continue;
        }
        let native = dir.under(root);
        let is_empty = fs::read_dir(&native)
            .map_err(|e| Error::io(&native, e))?
            .next()
            .is_none();
        if is_empty {
            tracing::debug!(dir = %dir, "Removing empty directory");
            fs::remove_dir(&native).map_err(|e| Error::io(&native, e))?;
        }
    }
    Ok(())
}
