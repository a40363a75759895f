//! Region registry storage

use std::collections::HashMap;

use super::types::{RegionRegistration, RegionRules};
use crate::{Error, Result};

/// Central registry of region profiles.
///
/// Filled once at startup and read-only afterwards.
pub struct RegionRegistry {
    regions: HashMap<String, RegionRegistration>,
}

impl RegionRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            regions: HashMap::new(),
        }
    }

    /// Create a registry pre-populated with all built-in regions.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for registration in super::builtins::builtin_registrations() {
            if let Err(e) = registry.register(registration) {
                tracing::warn!(error = %e, "Skipping built-in region");
            }
        }
        registry
    }

    /// Register a region. Ids are unique.
    pub fn register(&mut self, registration: RegionRegistration) -> Result<()> {
        if self.regions.contains_key(&registration.id) {
            return Err(Error::DuplicateRegion {
                id: registration.id,
            });
        }
        self.regions.insert(registration.id.clone(), registration);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&RegionRegistration> {
        self.regions.get(&id.to_ascii_uppercase())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// List all registered region ids (sorted).
    pub fn list(&self) -> Vec<&str> {
        let mut ids: Vec<_> = self.regions.keys().map(|s| s.as_str()).collect();
        ids.sort();
        ids
    }

    /// Ordered rules for `id`: the shared rules, then the region's own.
    ///
    /// An unknown id is not an error: it yields no rules and a diagnostic.
    pub fn rules_for(&self, id: &str) -> RegionRules {
        let Some(registration) = self.get(id) else {
            tracing::warn!(region = %id, "Unknown region");
            return RegionRules::unknown(id);
        };

        let mut actions = super::builtins::shared_rules();
        actions.extend(registration.layout_rules());
        RegionRules {
            region: registration.id.clone(),
            actions,
            known: true,
            diagnostic: None,
        }
    }
}

impl Default for RegionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use airac_rules::{RuleAction, TransformRule};

    fn custom_rules() -> Vec<RuleAction> {
        vec![TransformRule::file("screen", "TEST/Settings/Screen.txt")
            .set("m_ScreenNumber", "1")
            .into()]
    }

    #[test]
    fn unknown_region_yields_empty_rules_with_diagnostic() {
        let registry = RegionRegistry::with_builtins();
        let rules = registry.rules_for("ZZZZ");
        assert!(rules.actions.is_empty());
        assert!(!rules.known);
        assert!(rules.diagnostic.unwrap().contains("ZZZZ"));
    }

    #[test]
    fn registered_region_gets_shared_rules_first() {
        let mut registry = RegionRegistry::new();
        registry
            .register(RegionRegistration::new("test", "Test FIR", custom_rules))
            .unwrap();

        let rules = registry.rules_for("TEST");
        assert!(rules.known);
        let names: Vec<_> = rules.actions.iter().map(|a| a.name()).collect();
        let shared = super::super::builtins::shared_rules().len();
        assert_eq!(names.len(), shared + 1);
        assert_eq!(names.last(), Some(&"screen"));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = RegionRegistry::with_builtins();
        let err = registry
            .register(RegionRegistration::new("edgg", "Again", custom_rules))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateRegion { id } if id == "EDGG"));
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let registry = RegionRegistry::with_builtins();
        assert!(registry.contains("edmm"));
        assert_eq!(registry.rules_for("edmm").region, "EDMM");
    }
}
