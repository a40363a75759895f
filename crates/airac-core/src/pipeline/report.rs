//! Result types for a pipeline run

use std::path::PathBuf;

use airac_fs::NormalizedPath;
pub use airac_rules::{FileChange, RuleOutcome};
use serde::Serialize;

use crate::error::cause_chain;

/// States of the update state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Resolving,
    BackingUp,
    Extracting,
    Planning,
    Transforming,
    Committing,
    RollingBack,
    Done,
}

/// Terminal result of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// All edits applied
    Committed,
    /// A failure occurred and the snapshot was restored
    RolledBack,
    /// Nothing written; the result lists what would change
    DryRunOnly,
    /// A failure occurred with nothing restored
    Failed,
    /// A failure occurred and restoring the snapshot failed too
    Inconsistent,
}

impl Outcome {
    /// Process exit code for this outcome.
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Committed | Self::DryRunOnly => 0,
            Self::RolledBack | Self::Failed => 1,
            Self::Inconsistent => 3,
        }
    }

    pub fn is_success(self) -> bool {
        self.exit_code() == 0
    }
}

/// Everything a run did, or would have done.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub outcome: Outcome,
    /// The command-line source the run started from
    pub source: String,
    pub region: Option<String>,
    pub airac: Option<String>,
    pub archive: Option<PathBuf>,
    pub install_root: Option<PathBuf>,
    pub dry_run: bool,
    /// Stages entered, in order
    pub stages: Vec<Stage>,
    /// Id of the snapshot taken before the first destructive step
    pub snapshot: Option<String>,
    /// Number of files unpacked from the archive
    pub extracted: usize,
    /// Per-rule detail
    pub rules: Vec<RuleOutcome>,
    /// Files changed by rules and post steps, first change first
    pub modified: Vec<NormalizedPath>,
    pub changes: Vec<FileChange>,
    pub warnings: Vec<String>,
    /// Cause chain of the failure, outermost first
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub error: Vec<String>,
    /// Cause chain of a failed restore
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rollback_error: Vec<String>,
}

impl PipelineResult {
    /// An empty result; runs start from this and fill it in.
    pub fn new(source: String, dry_run: bool) -> Self {
        Self {
            outcome: Outcome::Failed,
            source,
            region: None,
            airac: None,
            archive: None,
            install_root: None,
            dry_run,
            stages: Vec::new(),
            snapshot: None,
            extracted: 0,
            rules: Vec::new(),
            modified: Vec::new(),
            changes: Vec::new(),
            warnings: Vec::new(),
            error: Vec::new(),
            rollback_error: Vec::new(),
        }
    }

    pub(crate) fn enter(&mut self, stage: Stage) {
        tracing::debug!(stage = ?stage, "Entering stage");
        self.stages.push(stage);
    }

    pub(crate) fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{}", message);
        self.warnings.push(message);
    }

    /// Finish as [`Outcome::Failed`] with `error`'s cause chain.
    pub(crate) fn fail(&mut self, error: &(dyn std::error::Error + 'static)) {
        tracing::error!(error = %error, "Update failed");
        self.outcome = Outcome::Failed;
        self.error = cause_chain(error);
    }

    /// Merge one rule's outcome. Warnings were logged by the engine.
    pub(crate) fn absorb(&mut self, outcome: RuleOutcome) {
        for change in &outcome.changes {
            if !self.modified.contains(&change.path) {
                self.modified.push(change.path.clone());
            }
            self.changes.push(change.clone());
        }
        self.warnings.extend(outcome.warnings.iter().cloned());
        self.rules.push(outcome);
    }

    /// Whether `stage` was entered.
    pub fn reached(&self, stage: Stage) -> bool {
        self.stages.contains(&stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        assert_eq!(Outcome::Committed.exit_code(), 0);
        assert_eq!(Outcome::DryRunOnly.exit_code(), 0);
        assert_eq!(Outcome::RolledBack.exit_code(), 1);
        assert_eq!(Outcome::Failed.exit_code(), 1);
        assert_eq!(Outcome::Inconsistent.exit_code(), 3);
    }

    #[test]
    fn absorb_deduplicates_modified_files() {
        let mut result = PipelineResult::new("EDGG".into(), false);
        let path = NormalizedPath::new("EDGG FIR.prf");
        for rule in ["login", "vccs"] {
            result.absorb(RuleOutcome {
                rule: rule.into(),
                matched: vec![path.clone()],
                modified: vec![path.clone()],
                changes: vec![FileChange {
                    path: path.clone(),
                    diff: None,
                }],
                warnings: Vec::new(),
            });
        }
        assert_eq!(result.modified, vec![path]);
        assert_eq!(result.changes.len(), 2);
        assert_eq!(result.rules.len(), 2);
    }

    #[test]
    fn serializes_snake_case() {
        let mut result = PipelineResult::new("EDGG".into(), true);
        result.enter(Stage::BackingUp);
        result.outcome = Outcome::DryRunOnly;
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["outcome"], "dry_run_only");
        assert_eq!(json["stages"][0], "backing_up");
        assert!(json.get("error").is_none());
    }
}
