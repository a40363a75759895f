//! Archive extraction into the install root

use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use airac_fs::{NormalizedPath, io};
use zip::ZipArchive;

use crate::scope::TreeScope;
use crate::{Error, Result};

/// A file entry of an archive, held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveFile {
    /// Path relative to the extraction root
    pub path: NormalizedPath,
    pub content: Vec<u8>,
}

/// Unpacks a package archive.
pub trait ArchiveExtractor {
    /// Every file entry of `archive` with its content.
    fn read(&self, archive: &Path) -> Result<Vec<ArchiveFile>>;

    /// Paths of the file entries of `archive`, relative to the extraction
    /// root. Nothing is written.
    fn list(&self, archive: &Path) -> Result<Vec<NormalizedPath>> {
        Ok(self.read(archive)?.into_iter().map(|file| file.path).collect())
    }

    /// Extract every entry of `archive` below `dest`, overwriting existing
    /// files. Returns the written files relative to `dest`.
    fn extract(&self, archive: &Path, dest: &Path) -> Result<Vec<NormalizedPath>>;
}

/// ZIP extraction with path sanitization.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipExtractor;

impl ZipExtractor {
    pub fn new() -> Self {
        Self
    }

    fn open(archive: &Path) -> Result<ZipArchive<File>> {
        let file = File::open(archive).map_err(|e| airac_fs::Error::io(archive, e))?;
        ZipArchive::new(file).map_err(|e| corrupt(archive, e.to_string()))
    }

    /// Walk the entries in archive order. `visit` gets the sanitized path
    /// and, for files, a reader over the content.
    fn each_entry(
        archive: &Path,
        mut visit: impl FnMut(NormalizedPath, Option<&mut dyn Read>) -> Result<()>,
    ) -> Result<()> {
        let mut zip = Self::open(archive)?;
        for i in 0..zip.len() {
            let mut entry = zip.by_index(i).map_err(|e| corrupt(archive, e.to_string()))?;
            let Some(relative) = entry.enclosed_name() else {
                return Err(corrupt(
                    archive,
                    format!("entry '{}' escapes the target directory", entry.name()),
                ));
            };
            let relative = NormalizedPath::new(relative);
            if entry.is_dir() {
                visit(relative, None)?;
            } else {
                visit(relative, Some(&mut entry as &mut dyn Read))?;
            }
        }
        Ok(())
    }
}

fn corrupt(archive: &Path, message: String) -> Error {
    Error::Archive {
        path: archive.to_path_buf(),
        message,
    }
}

fn read_entry(archive: &Path, path: &NormalizedPath, reader: &mut dyn Read) -> Result<Vec<u8>> {
    let mut content = Vec::new();
    reader
        .read_to_end(&mut content)
        .map_err(|e| corrupt(archive, format!("{}: {}", path, e)))?;
    Ok(content)
}

impl ArchiveExtractor for ZipExtractor {
    fn read(&self, archive: &Path) -> Result<Vec<ArchiveFile>> {
        let mut files = Vec::new();
        Self::each_entry(archive, |path, reader| {
            if let Some(reader) = reader {
                let content = read_entry(archive, &path, reader)?;
                files.push(ArchiveFile { path, content });
            }
            Ok(())
        })?;
        Ok(files)
    }

    fn list(&self, archive: &Path) -> Result<Vec<NormalizedPath>> {
        let mut paths = Vec::new();
        Self::each_entry(archive, |path, reader| {
            if reader.is_some() {
                paths.push(path);
            }
            Ok(())
        })?;
        Ok(paths)
    }

    fn extract(&self, archive: &Path, dest: &Path) -> Result<Vec<NormalizedPath>> {
        let mut written = Vec::new();
        Self::each_entry(archive, |relative, reader| {
            let target = relative.under(dest);
            let Some(reader) = reader else {
                fs::create_dir_all(&target).map_err(|e| airac_fs::Error::io(&target, e))?;
                return Ok(());
            };
            let content = read_entry(archive, &relative, reader)?;
            io::write_atomic(&target, &content)?;
            tracing::debug!(file = %relative, "Extracted");
            written.push(relative);
            Ok(())
        })?;

        tracing::info!(files = written.len(), dest = %dest.display(), "Archive extracted");
        Ok(written)
    }
}

/// Delete the files of the previous installation inside `scope`.
pub fn clear_scope(root: &Path, scope: &TreeScope) -> Result<Vec<NormalizedPath>> {
    let files = scope.filter(io::walk_files(root)?);
    for file in &files {
        let native = file.under(root);
        fs::remove_file(&native).map_err(|e| airac_fs::Error::io(&native, e))?;
    }

    let keep: Vec<NormalizedPath> = io::walk_dirs(root)?
        .into_iter()
        .filter(|d| !scope.contains(d))
        .collect();
    io::prune_empty_dirs(root, &keep)?;

    tracing::info!(files = files.len(), "Previous installation removed");
    Ok(files)
}

/// Rename top-level profiles as configured for the region.
///
/// Returns the `(from, to)` pairs that were applied.
pub fn apply_renames(root: &Path, renames: &[(String, String)]) -> Result<Vec<(String, String)>> {
    let mut applied = Vec::new();
    for (from, to) in renames {
        let source = root.join(from);
        if !source.is_file() {
            continue;
        }
        let target = root.join(to);
        fs::rename(&source, &target).map_err(|e| airac_fs::Error::io(&source, e))?;
        tracing::debug!(from = %from, to = %to, "Renamed profile");
        applied.push((from.clone(), to.clone()));
    }
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn build_zip(path: &Path, entries: &[(&str, &str)]) {
        let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
        for (name, content) in entries {
            if name.ends_with('/') {
                writer.add_directory(*name, SimpleFileOptions::default()).unwrap();
            } else {
                writer.start_file(*name, SimpleFileOptions::default()).unwrap();
                writer.write_all(content.as_bytes()).unwrap();
            }
        }
        writer.finish().unwrap();
    }

    #[test]
    fn extracts_files_and_directories() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("EDGG_2410.zip");
        build_zip(
            &archive,
            &[
                ("EDGG/", ""),
                ("EDGG/Settings/Screen.txt", "m_ScreenNumber:1"),
                ("EDGG FIR.prf", "LastSession\tserver\tAUTOMATIC"),
            ],
        );
        let dest = temp.path().join("es");

        let written = ZipExtractor::new().extract(&archive, &dest).unwrap();

        assert_eq!(
            written,
            vec![NormalizedPath::new("EDGG/Settings/Screen.txt"), NormalizedPath::new("EDGG FIR.prf")]
        );
        assert_eq!(
            fs::read_to_string(dest.join("EDGG/Settings/Screen.txt")).unwrap(),
            "m_ScreenNumber:1"
        );
    }

    #[test]
    fn lists_and_reads_without_writing() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("EDGG_2410.zip");
        build_zip(
            &archive,
            &[("EDGG/", ""), ("EDGG/Settings/Screen.txt", "m_ScreenNumber:1")],
        );
        let extractor = ZipExtractor::new();

        assert_eq!(
            extractor.list(&archive).unwrap(),
            vec![NormalizedPath::new("EDGG/Settings/Screen.txt")]
        );
        assert_eq!(
            extractor.read(&archive).unwrap(),
            vec![ArchiveFile {
                path: NormalizedPath::new("EDGG/Settings/Screen.txt"),
                content: b"m_ScreenNumber:1".to_vec(),
            }]
        );
        assert!(!temp.path().join("EDGG").exists());
    }

    #[test]
    fn rejects_escaping_entries() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("evil.zip");
        build_zip(&archive, &[("../outside.txt", "x")]);

        let err = ZipExtractor::new()
            .extract(&archive, &temp.path().join("es"))
            .unwrap_err();
        assert!(matches!(err, Error::Archive { .. }));
        assert!(!temp.path().join("outside.txt").exists());
    }

    #[test]
    fn garbage_is_an_archive_error() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("EDGG.zip");
        fs::write(&archive, b"<html>not a zip</html>").unwrap();
        let err = ZipExtractor::new().extract(&archive, temp.path()).unwrap_err();
        assert!(matches!(err, Error::Archive { .. }));
        let err = ZipExtractor::new().list(&archive).unwrap_err();
        assert!(matches!(err, Error::Archive { .. }));
    }

    #[test]
    fn clear_scope_keeps_other_regions() {
        let temp = TempDir::new().unwrap();
        for rel in ["EDGG/a.txt", "EDGG FIR.prf", "EDMM/b.txt"] {
            let path = temp.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "x").unwrap();
        }

        let removed = clear_scope(temp.path(), &TreeScope::for_region("EDGG", false)).unwrap();

        assert_eq!(removed.len(), 2);
        assert!(!temp.path().join("EDGG").exists());
        assert!(temp.path().join("EDMM/b.txt").exists());
    }

    #[test]
    fn renames_only_existing_profiles() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("iCAS2.prf"), "x").unwrap();
        let renames = vec![
            ("iCAS2.prf".to_string(), "EDMM FIR - Muenchen iCAS2.prf".to_string()),
            ("TWR_PHX_DAY.prf".to_string(), "EDMM FIR - TWR PHX Day.prf".to_string()),
        ];

        let applied = apply_renames(temp.path(), &renames).unwrap();

        assert_eq!(applied, vec![renames[0].clone()]);
        assert!(temp.path().join("EDMM FIR - Muenchen iCAS2.prf").is_file());
    }
}
