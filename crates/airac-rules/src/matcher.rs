//! Glob matching of rule targets against install-relative paths

use airac_fs::NormalizedPath;
use glob::{MatchOptions, Pattern};

use crate::{Error, Result};

/// Settings files live on case-insensitive filesystems.
const OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Compiled target glob plus optional file-name filter and exclusion.
#[derive(Debug, Clone)]
pub struct TargetMatcher {
    pattern: Pattern,
    /// Target had no `/`: match the file name at any depth
    by_name: bool,
    filter: Option<Pattern>,
    exclude: Option<Pattern>,
}

impl TargetMatcher {
    pub fn new(target: &str, name_filter: Option<&str>) -> Result<Self> {
        let target = target.replace('\\', "/");
        let by_name = !target.contains('/');
        let pattern = compile(&target)?;
        let filter = name_filter.map(compile).transpose()?;
        Ok(Self {
            pattern,
            by_name,
            filter,
            exclude: None,
        })
    }

    /// Drop paths whose file name matches `exclude`.
    pub fn excluding(mut self, exclude: Option<&str>) -> Result<Self> {
        self.exclude = exclude.map(compile).transpose()?;
        Ok(self)
    }

    pub fn matches(&self, path: &NormalizedPath) -> bool {
        let name = path.file_name().unwrap_or_default();
        let hit = if self.by_name {
            self.pattern.matches_with(name, OPTIONS)
        } else {
            self.pattern.matches_with(path.as_str(), OPTIONS)
        };
        hit && self
            .filter
            .as_ref()
            .is_none_or(|f| f.matches_with(name, OPTIONS))
            && !self
                .exclude
                .as_ref()
                .is_some_and(|e| e.matches_with(name, OPTIONS))
    }

    /// Matching entries of `candidates`, in their original order.
    pub fn select<'a>(&self, candidates: &'a [NormalizedPath]) -> Vec<&'a NormalizedPath> {
        candidates.iter().filter(|p| self.matches(p)).collect()
    }
}

fn compile(pattern: &str) -> Result<Pattern> {
    Pattern::new(pattern).map_err(|e| Error::InvalidGlob {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("*.prf", "EDGG/Profiles/EDGG_APP.prf", true)]
    #[case("*.prf", "EDGG.prf", true)]
    #[case("*TWR*.prf", "EDMM/EDMM_TWR_MUC.prf", true)]
    #[case("*TWR*.prf", "EDMM/EDMM_APP.prf", false)]
    #[case("EDGG/Settings/EDGG_General.txt", "EDGG/Settings/EDGG_General.txt", true)]
    #[case("EDGG/Settings/EDGG_General.txt", "edgg/settings/edgg_general.txt", true)]
    #[case("EDGG/Settings/*.txt", "EDGG/Settings/Sub/Screen.txt", false)]
    #[case("**/Settings/**/*Profil*.txt", "EDGG/Settings/Profiles.txt", true)]
    #[case("**/Settings/**/*Profil*.txt", "EDGG/Settings/EDGG/EDGG_Profiles.txt", true)]
    #[case("**/Plugins/TopSkyCPDLChoppieCode.txt", "EDWW/Plugins/TopSkyCPDLChoppieCode.txt", true)]
    fn target_matching(#[case] target: &str, #[case] path: &str, #[case] expected: bool) {
        let matcher = TargetMatcher::new(target, None).unwrap();
        assert_eq!(matcher.matches(&NormalizedPath::new(path)), expected);
    }

    #[test]
    fn name_filter_narrows_matches() {
        let matcher = TargetMatcher::new("*.prf", Some("*TWR*")).unwrap();
        assert!(matcher.matches(&NormalizedPath::new("EDDF_TWR.prf")));
        assert!(!matcher.matches(&NormalizedPath::new("EDDF_APP.prf")));
    }

    #[test]
    fn exclusion_removes_matches() {
        let matcher = TargetMatcher::new("*.prf", None)
            .unwrap()
            .excluding(Some("*twr*"))
            .unwrap();
        assert!(matcher.matches(&NormalizedPath::new("EDMM/EDMM_APP.prf")));
        assert!(!matcher.matches(&NormalizedPath::new("EDMM/EDMM_TWR.prf")));
    }

    #[test]
    fn invalid_glob_is_reported() {
        let err = TargetMatcher::new("EDGG/[", None).unwrap_err();
        assert!(matches!(err, Error::InvalidGlob { .. }));
    }
}
