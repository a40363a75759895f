//! Core types for the region registry

use airac_rules::RuleAction;
use serde::Serialize;

use crate::acquire::DownloadSource;

/// Builds a region's layout rules.
pub type RegionBuilder = fn() -> Vec<RuleAction>;

/// Everything known about one region.
#[derive(Debug, Clone)]
pub struct RegionRegistration {
    /// Upper-case region id (e.g. "EDGG")
    pub id: String,
    /// Display name
    pub name: String,
    /// Where the latest package is published
    pub download: Option<DownloadSource>,
    /// Profile renames applied after extraction into a shared directory
    pub renames: Vec<(String, String)>,
    builder: RegionBuilder,
}

impl RegionRegistration {
    pub fn new(id: impl Into<String>, name: impl Into<String>, builder: RegionBuilder) -> Self {
        Self {
            id: id.into().to_ascii_uppercase(),
            name: name.into(),
            download: None,
            renames: Vec::new(),
            builder,
        }
    }

    /// Set the download source (builder pattern).
    pub fn with_download(mut self, index_url: &str, link_pattern: &str) -> Self {
        self.download = Some(DownloadSource::new(index_url, link_pattern));
        self
    }

    pub fn with_renames(mut self, renames: &[(&str, &str)]) -> Self {
        self.renames = renames
            .iter()
            .map(|(from, to)| (from.to_string(), to.to_string()))
            .collect();
        self
    }

    /// Region-specific rules only, without the shared ones.
    pub fn layout_rules(&self) -> Vec<RuleAction> {
        (self.builder)()
    }
}

/// Result of a registry lookup.
#[derive(Debug, Clone, Serialize)]
pub struct RegionRules {
    pub region: String,
    pub actions: Vec<RuleAction>,
    /// False when the region is not registered and no customization applies
    pub known: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

impl RegionRules {
    pub fn unknown(region: &str) -> Self {
        Self {
            region: region.to_string(),
            actions: Vec::new(),
            known: false,
            diagnostic: Some(format!(
                "No profile registered for region '{}'; no layout customization applied",
                region
            )),
        }
    }
}
