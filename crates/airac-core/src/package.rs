//! Package sources and archive metadata

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::regions::RegionRegistry;
use crate::{Error, Result};

/// `EDGG-Full-Package_20250613...`, `EXCXO-Install_2410`: region letters,
/// then the AIRAC cycle as the first four digits, then an optional version.
static PACKAGE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Z]{4,5})(?:\D*?(\d{4})(?:\d*\D+?(\d{4}))?)?")
        .expect("Invalid package name regex")
});

/// Where the package comes from: exactly one of a region or an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageSource {
    /// Download the latest package for this region
    Region(String),
    /// Use an archive already on disk
    Archive(PathBuf),
}

impl PackageSource {
    /// Interpret a command-line argument.
    ///
    /// A registered region id with a download source wins. Anything else is
    /// an archive path: used as given when it exists, otherwise looked up in
    /// `download_dir` with `.zip` added when it has no extension.
    pub fn from_arg(arg: &str, registry: &RegionRegistry, download_dir: &Path) -> Self {
        let trimmed = arg.trim();
        let upper = trimmed.to_ascii_uppercase();
        if registry
            .get(&upper)
            .is_some_and(|registration| registration.download.is_some())
        {
            return Self::Region(upper);
        }

        let given = PathBuf::from(trimmed);
        if given.is_file() {
            return Self::Archive(given);
        }
        let mut candidate = download_dir.join(trimmed);
        if candidate.extension().is_none() {
            candidate.set_extension("zip");
        }
        Self::Archive(candidate)
    }
}

impl fmt::Display for PackageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Region(id) => write!(f, "region {}", id),
            Self::Archive(path) => write!(f, "archive {}", path.display()),
        }
    }
}

/// Metadata parsed from an archive file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageInfo {
    pub path: PathBuf,
    /// File stem
    pub name: String,
    pub region: String,
    pub airac: Option<String>,
    pub version: Option<String>,
}

impl PackageInfo {
    /// Parse `path`'s file name.
    ///
    /// `region_hint` is the region the archive was downloaded for; it is
    /// used when the name itself carries no region (`FIS_2410.zip`).
    pub fn parse(path: &Path, region_hint: Option<&str>) -> Result<Self> {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        let captures = PACKAGE_NAME.captures(&name);
        let group = |i: usize| {
            captures
                .as_ref()
                .and_then(|c| c.get(i))
                .map(|m| m.as_str().to_string())
        };

        let region = match (region_hint, group(1)) {
            (Some(hint), _) if name.to_ascii_uppercase().starts_with(&hint.to_ascii_uppercase()) => {
                hint.to_ascii_uppercase()
            }
            (_, Some(parsed)) => parsed,
            (Some(hint), None) => hint.to_ascii_uppercase(),
            (None, None) => {
                return Err(Error::resolution(format!(
                    "Cannot determine region from file name '{}'",
                    name
                )));
            }
        };

        let airac = group(2).or_else(|| last_four_digits(&name));
        let version = group(3);
        Ok(Self {
            path: path.to_path_buf(),
            name,
            region,
            airac,
            version,
        })
    }

    /// Package info for a region when no archive is at hand (dry runs).
    pub fn for_region(region: &str) -> Self {
        Self {
            path: PathBuf::new(),
            name: region.to_string(),
            region: region.to_string(),
            airac: None,
            version: None,
        }
    }
}

fn last_four_digits(name: &str) -> Option<String> {
    let digits: Vec<char> = name.chars().filter(char::is_ascii_digit).collect();
    (digits.len() >= 4).then(|| digits[digits.len() - 4..].iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("EDGG-Full-Package_20250613220519-241301-0016.zip", "EDGG", Some("2025"))]
    #[case("EXCXO-Install_2410.zip", "EXCXO", Some("2410"))]
    #[case("LPPO_2501.zip", "LPPO", Some("2501"))]
    #[case("BIRD_Install-Pack.zip", "BIRD", None)]
    fn parses_region_and_cycle(
        #[case] file: &str,
        #[case] region: &str,
        #[case] airac: Option<&str>,
    ) {
        let info = PackageInfo::parse(Path::new(file), None).unwrap();
        assert_eq!(info.region, region);
        assert_eq!(info.airac.as_deref(), airac);
    }

    #[test]
    fn version_follows_cycle() {
        let info = PackageInfo::parse(Path::new("EDMM-Full-Package_2410-0003.zip"), None).unwrap();
        assert_eq!(info.airac.as_deref(), Some("2410"));
        assert_eq!(info.version.as_deref(), Some("0003"));
    }

    #[test]
    fn hint_supplies_missing_region() {
        let info = PackageInfo::parse(Path::new("FIS_2410.zip"), Some("EDXX")).unwrap();
        assert_eq!(info.region, "EDXX");
        assert_eq!(info.airac.as_deref(), Some("2410"));
    }

    #[test]
    fn unparseable_name_is_a_resolution_error() {
        let err = PackageInfo::parse(Path::new("package.zip"), None).unwrap_err();
        assert!(matches!(err, Error::Resolution { .. }));
    }

    #[test]
    fn argument_classification() {
        let registry = RegionRegistry::with_builtins();
        let temp = tempfile::TempDir::new().unwrap();

        assert_eq!(
            PackageSource::from_arg("edgg", &registry, temp.path()),
            PackageSource::Region("EDGG".into())
        );
        assert_eq!(
            PackageSource::from_arg("EDGG-Full-Package_2410", &registry, temp.path()),
            PackageSource::Archive(temp.path().join("EDGG-Full-Package_2410.zip"))
        );

        let local = temp.path().join("LPPO_2501.zip");
        std::fs::write(&local, b"PK").unwrap();
        let arg = local.to_string_lossy().to_string();
        assert_eq!(
            PackageSource::from_arg(&arg, &registry, Path::new("/elsewhere")),
            PackageSource::Archive(local)
        );
    }
}
