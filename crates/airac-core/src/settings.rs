//! User settings
//!
//! Settings are an explicit record handed to the pipeline. They are loaded
//! from a TOML (or JSON) file through [`ConfigStore`] and validated before
//! any work starts.

use std::fmt;
use std::path::{Path, PathBuf};

use airac_fs::ConfigStore;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Value the template ships with; a settings file still holding it was never edited.
pub const PLACEHOLDER_CID: &str = "YOUR_VATSIM_ID";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub paths: PathSettings,
    pub login: LoginSettings,
    #[serde(default)]
    pub vccs: VccsSettings,
    #[serde(default)]
    pub options: OptionSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSettings {
    /// Where downloaded packages are stored and archive names are looked up
    pub download_dir: PathBuf,
    /// Settings directory of the target application
    pub install_dir: PathBuf,
    pub backup_dir: PathBuf,
    /// Navigraph data with `cycle_info.txt`, `AIRWAY.txt` and `ISEC.txt`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navdata_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_files_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginSettings {
    /// Numeric network id
    pub cid: String,
    pub password: String,
    pub name: String,
    pub rating: Rating,
    /// Observer callsign initials, without the `_OBS` suffix
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initials: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hoppie: Option<String>,
}

/// Voice settings written into profiles when present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VccsSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ptt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capture: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionSettings {
    /// Install each region into `<install_dir>/<REGION>`
    #[serde(default)]
    pub use_subdirs: bool,
    #[serde(default)]
    pub use_custom_files: bool,
    /// Delete the archive after a committed install
    #[serde(default)]
    pub delete_package: bool,
}

/// Controller rating, stored as its numeric profile value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Rating {
    S1 = 1,
    S2 = 2,
    S3 = 3,
    C1 = 4,
    C3 = 5,
}

impl TryFrom<u8> for Rating {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::S1),
            2 => Ok(Self::S2),
            3 => Ok(Self::S3),
            4 => Ok(Self::C1),
            5 => Ok(Self::C3),
            other => Err(format!("rating must be between 1 and 5, got {}", other)),
        }
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating as u8
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", u8::from(*self))
    }
}

impl Settings {
    /// Load and validate settings from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let settings: Self = ConfigStore::new().load(path)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        let cid = self.login.cid.trim();
        if cid.is_empty() || cid == PLACEHOLDER_CID {
            return Err(Error::config(
                "login.cid still holds the template value; enter your network id",
            ));
        }
        if !cid.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::config(format!("login.cid must be numeric, got '{}'", cid)));
        }
        if let Some(initials) = self.initials()
            && !initials.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(Error::config(format!(
                "login.initials must be letters or digits, got '{}'",
                initials
            )));
        }
        Ok(())
    }

    /// Observer initials when configured and non-empty.
    pub fn initials(&self) -> Option<&str> {
        non_empty(self.login.initials.as_deref())
    }

    pub fn hoppie_code(&self) -> Option<&str> {
        non_empty(self.login.hoppie.as_deref())
    }

    /// `<INITIALS>_OBS`
    pub fn observer_callsign(&self) -> Option<String> {
        self.initials().map(|i| format!("{}_OBS", i))
    }

    pub fn install_root(&self, region: &str) -> PathBuf {
        if self.options.use_subdirs {
            self.paths.install_dir.join(region)
        } else {
            self.paths.install_dir.clone()
        }
    }

    /// Commented starter file written when no settings exist yet.
    pub fn template() -> String {
        Self::template_for(&PathSettings::default_for_user())
    }

    fn template_for(paths: &PathSettings) -> String {
        format!(
            r#"# AIRAC updater settings

[paths]
# Downloaded packages; bare archive names are looked up here
download_dir = {download}
# Application settings directory receiving the packages
install_dir = {install}
# Snapshots of previous installations
backup_dir = {backup}
# Navigraph data (optional)
# navdata_dir = {navdata}
# Files copied over every installation (optional)
# custom_files_dir = {custom}

[login]
cid = "{placeholder}"
password = "YOUR_PASSWORD"
name = "YOUR REAL NAME"
# S1 = 1, S2 = 2, S3 = 3, C1 = 4, C3 = 5
rating = 1
# Observer callsign without the _OBS suffix
# initials = "XX"
# Hoppie logon code for CPDLC
# hoppie = "YOUR_HOPPIE_CODE"

[vccs]
# ptt = ""
# mode = ""
# playback = ""
# capture = ""

[options]
use_subdirs = false
use_custom_files = false
delete_package = false
"#,
            download = toml_path(&paths.download_dir),
            install = toml_path(&paths.install_dir),
            backup = toml_path(&paths.backup_dir),
            navdata = toml_path(&paths.install_dir.join("_NavData").join("Bin")),
            custom = toml_path(&paths.install_dir.join("_Custom")),
            placeholder = PLACEHOLDER_CID,
        )
    }
}

impl PathSettings {
    /// Platform defaults derived from the user's directories.
    pub fn default_for_user() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        let download_dir = dirs::download_dir().unwrap_or_else(|| home.join("Downloads"));
        let install_dir = dirs::config_dir()
            .unwrap_or_else(|| home.join(".config"))
            .join("EuroScope");
        Self {
            download_dir,
            backup_dir: install_dir.join("_Backups"),
            install_dir,
            navdata_dir: None,
            custom_files_dir: None,
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Quote a path as a TOML string, escaping quotes and separators as needed.
fn toml_path(path: &Path) -> String {
    toml::Value::String(path.display().to_string()).to_string()
}
