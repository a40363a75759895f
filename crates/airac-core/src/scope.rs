//! Which part of an install tree belongs to a package

use std::path::Path;

use airac_fs::NormalizedPath;
use airac_rules::FileStore;
use serde::{Deserialize, Serialize};

/// The part of an install root owned by one region's package.
///
/// With per-region subdirectories the whole root is the package. Otherwise
/// several packages share the root and a package owns the top-level
/// entries whose name starts with its region id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "prefix", rename_all = "lowercase")]
pub enum TreeScope {
    Whole,
    Prefixed(String),
}

impl TreeScope {
    pub fn for_region(region: &str, use_subdirs: bool) -> Self {
        if use_subdirs {
            Self::Whole
        } else {
            Self::Prefixed(region.to_string())
        }
    }

    pub fn contains(&self, path: &NormalizedPath) -> bool {
        match self {
            Self::Whole => true,
            Self::Prefixed(prefix) => path.first_component().is_some_and(|first| {
                first
                    .get(..prefix.len())
                    .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
            }),
        }
    }

    /// Keep only the paths inside this scope.
    pub fn filter(&self, paths: Vec<NormalizedPath>) -> Vec<NormalizedPath> {
        paths.into_iter().filter(|p| self.contains(p)).collect()
    }
}

/// A [`FileStore`] that only shows the files inside a [`TreeScope`].
///
/// Transforms run through it so that a package never edits files of other
/// packages sharing the install root, which its snapshot does not cover.
pub struct ScopedStore<'a> {
    inner: &'a mut dyn FileStore,
    scope: &'a TreeScope,
}

impl<'a> ScopedStore<'a> {
    pub fn new(inner: &'a mut dyn FileStore, scope: &'a TreeScope) -> Self {
        Self { inner, scope }
    }
}

impl FileStore for ScopedStore<'_> {
    fn root(&self) -> &Path {
        self.inner.root()
    }

    fn list(&self) -> airac_rules::Result<Vec<NormalizedPath>> {
        Ok(self.scope.filter(self.inner.list()?))
    }

    fn read(&self, path: &NormalizedPath) -> airac_rules::Result<Vec<u8>> {
        self.inner.read(path)
    }

    fn exists(&self, path: &NormalizedPath) -> bool {
        self.scope.contains(path) && self.inner.exists(path)
    }

    fn write(&mut self, path: &NormalizedPath, content: &[u8]) -> airac_rules::Result<()> {
        self.inner.write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("EDGG/Settings/Screen.txt", true)]
    #[case("EDGG.prf", true)]
    #[case("EDGG FIR - Langen.prf", true)]
    #[case("edgg/Plugins/x.txt", true)]
    #[case("EDMM/Settings/Screen.txt", false)]
    #[case("EDG.prf", false)]
    fn prefixed_scope(#[case] path: &str, #[case] expected: bool) {
        let scope = TreeScope::for_region("EDGG", false);
        assert_eq!(scope.contains(&NormalizedPath::new(path)), expected);
    }

    #[test]
    fn whole_scope_contains_everything() {
        let scope = TreeScope::for_region("EDGG", true);
        assert!(scope.contains(&NormalizedPath::new("anything/at/all.txt")));
    }

    #[test]
    fn scoped_store_hides_other_packages() {
        let temp = tempfile::TempDir::new().unwrap();
        for rel in ["EDGG FIR.prf", "EDMM FIR.prf", "EDGG/Settings/Screen.txt"] {
            let path = temp.path().join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, "x").unwrap();
        }

        let mut disk = airac_rules::DiskStore::new(temp.path());
        let scope = TreeScope::for_region("EDGG", false);
        let store = ScopedStore::new(&mut disk, &scope);

        assert_eq!(
            store.list().unwrap(),
            vec![
                NormalizedPath::new("EDGG FIR.prf"),
                NormalizedPath::new("EDGG/Settings/Screen.txt"),
            ]
        );
        assert!(!store.exists(&NormalizedPath::new("EDMM FIR.prf")));
    }
}
