//! Rule execution
//!
//! The engine resolves a rule's targets in a [`FileStore`], rewrites each
//! matched file in memory and writes it back only when the content changed.
//! Running a rule twice therefore reports nothing the second time.

use std::borrow::Cow;
use std::path::Path;

use airac_fs::{NormalizedPath, io};
use regex::{NoExpand, Regex, RegexBuilder};
use serde::Serialize;
use similar::TextDiff;

use crate::matcher::TargetMatcher;
use crate::rule::{CopyRule, Replacement, RuleAction, Scope, TransformRule};
use crate::store::{DiskStore, FileStore};
use crate::text::{self, Encoding};
use crate::{Error, Result};

/// A file a rule changed, or would change in a dry run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileChange {
    pub path: NormalizedPath,
    /// Unified diff of the edit, when requested and the file is text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
}

/// What one rule did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RuleOutcome {
    pub rule: String,
    /// Files the rule's target resolved to
    pub matched: Vec<NormalizedPath>,
    /// Files whose content changed
    pub modified: Vec<NormalizedPath>,
    /// Per-file detail for `modified`, in the same order
    pub changes: Vec<FileChange>,
    pub warnings: Vec<String>,
}

impl RuleOutcome {
    fn new(rule: &str) -> Self {
        Self {
            rule: rule.to_string(),
            ..Default::default()
        }
    }

    fn warn(&mut self, message: String) {
        tracing::warn!(rule = %self.rule, "{}", message);
        self.warnings.push(message);
    }

    fn record(&mut self, path: NormalizedPath, diff: Option<String>) {
        self.modified.push(path.clone());
        self.changes.push(FileChange { path, diff });
    }
}

/// A replacement with its regex compiled.
struct CompiledReplacement<'a> {
    regex: Regex,
    source: &'a Replacement,
}

/// Executes rules against a file store.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleEngine {
    diffs: bool,
}

impl RuleEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a unified diff to every reported change.
    pub fn with_diffs(mut self) -> Self {
        self.diffs = true;
        self
    }

    pub fn apply(&self, action: &RuleAction, store: &mut dyn FileStore) -> Result<RuleOutcome> {
        match action {
            RuleAction::Transform(rule) => self.apply_transform(rule, store),
            RuleAction::Copy(rule) => self.apply_copy(rule, store),
        }
    }

    pub fn apply_transform(
        &self,
        rule: &TransformRule,
        store: &mut dyn FileStore,
    ) -> Result<RuleOutcome> {
        let mut outcome = RuleOutcome::new(&rule.name);
        if rule.is_empty() {
            tracing::debug!(rule = %rule.name, "Rule has no edits");
            return Ok(outcome);
        }

        let matcher = TargetMatcher::new(&rule.target, rule.name_filter.as_deref())?
            .excluding(rule.exclude.as_deref())?;
        let replacements = compile_replacements(&rule.replacements)?;

        let files = store.list()?;
        let mut targets: Vec<NormalizedPath> =
            matcher.select(&files).into_iter().cloned().collect();

        if rule.scope == Scope::Single && targets.len() != 1 {
            let message = if targets.is_empty() {
                format!("No file matches '{}'", rule.target)
            } else {
                format!(
                    "Expected one file for '{}', found {}",
                    rule.target,
                    targets.len()
                )
            };
            outcome.warn(message);
            targets.clear();
        }
        if targets.is_empty() {
            tracing::debug!(rule = %rule.name, target = %rule.target, "Nothing to transform");
        }

        for path in targets {
            outcome.matched.push(path.clone());
            let original = store.read(&path)?;
            let decoded = text::decode(&original).ok_or_else(|| Error::NotText {
                path: path.under(store.root()),
            })?;

            let edited = transform_text(rule, &replacements, &decoded.text);
            if edited == decoded.text {
                tracing::debug!(rule = %rule.name, file = %path, "Already up to date");
                continue;
            }

            let bytes = encode(&edited, decoded.encoding, &path, store.root())?;
            let diff = self.diffs.then(|| unified_diff(&path, &decoded.text, &edited));
            store.write(&path, &bytes)?;
            tracing::debug!(rule = %rule.name, file = %path, "Updated");
            outcome.record(path, diff);
        }

        Ok(outcome)
    }

    pub fn apply_copy(&self, rule: &CopyRule, store: &mut dyn FileStore) -> Result<RuleOutcome> {
        let mut outcome = RuleOutcome::new(&rule.name);
        let target = NormalizedPath::new(&rule.target);

        let sources: Vec<(std::path::PathBuf, NormalizedPath)> = if rule.source.is_dir() {
            io::walk_files(&rule.source)?
                .into_iter()
                .map(|rel| (rel.under(&rule.source), target.join(rel.as_str())))
                .collect()
        } else if rule.source.is_file() {
            vec![(rule.source.clone(), target)]
        } else {
            return Err(Error::MissingSource {
                path: rule.source.clone(),
            });
        };

        for (source, dest) in sources {
            outcome.matched.push(dest.clone());
            let content = io::read_bytes(&source)?;
            let previous = if store.exists(&dest) {
                Some(store.read(&dest)?)
            } else {
                None
            };
            if previous.as_deref() == Some(content.as_slice()) {
                continue;
            }

            let diff = if self.diffs {
                let old = previous.as_deref().and_then(text::decode);
                let new = text::decode(&content);
                match (old, new) {
                    (Some(old), Some(new)) => Some(unified_diff(&dest, &old.text, &new.text)),
                    (None, Some(new)) if previous.is_none() => {
                        Some(unified_diff(&dest, "", &new.text))
                    }
                    _ => None,
                }
            } else {
                None
            };

            store.write(&dest, &content)?;
            tracing::debug!(rule = %rule.name, file = %dest, "Copied");
            outcome.record(dest, diff);
        }

        Ok(outcome)
    }
}

/// Apply a single transform rule directly to the tree at `root`.
///
/// Returns the files whose content changed.
pub fn apply_rule(rule: &TransformRule, root: &Path) -> Result<Vec<NormalizedPath>> {
    let mut store = DiskStore::new(root);
    let outcome = RuleEngine::new().apply_transform(rule, &mut store)?;
    Ok(outcome.modified)
}

fn compile_replacements(replacements: &[Replacement]) -> Result<Vec<CompiledReplacement<'_>>> {
    replacements
        .iter()
        .map(|source| {
            // Keep `.` and `$` off the `\r` of CRLF files
            RegexBuilder::new(&source.pattern)
                .multi_line(true)
                .crlf(true)
                .build()
                .map(|regex| CompiledReplacement { regex, source })
                .map_err(|e| Error::InvalidRegex {
                    pattern: source.pattern.clone(),
                    message: e.to_string(),
                })
        })
        .collect()
}

/// Assignments first, then replacements, each in declared order.
fn transform_text(
    rule: &TransformRule,
    replacements: &[CompiledReplacement<'_>],
    text: &str,
) -> String {
    let mut current = text.to_string();

    for assignment in &rule.assignments {
        if let Some(next) = owned(text::apply_assignment(&current, assignment, rule.delimiter)) {
            current = next;
        }
    }

    for compiled in replacements {
        let replaced = if compiled.source.literal {
            compiled
                .regex
                .replace_all(&current, NoExpand(&compiled.source.replacement))
        } else {
            compiled
                .regex
                .replace_all(&current, compiled.source.replacement.as_str())
        };
        if let Some(next) = owned(replaced) {
            current = next;
        }
    }

    current
}

fn owned(text: Cow<'_, str>) -> Option<String> {
    match text {
        Cow::Owned(s) => Some(s),
        Cow::Borrowed(_) => None,
    }
}

fn encode(text: &str, encoding: Encoding, path: &NormalizedPath, root: &Path) -> Result<Vec<u8>> {
    text::encode(text, encoding).map_err(|c| Error::Encoding {
        path: path.under(root),
        encoding: encoding.to_string(),
        message: format!("character '{}' is not representable", c),
    })
}

fn unified_diff(path: &NormalizedPath, old: &str, new: &str) -> String {
    TextDiff::from_lines(old, new)
        .unified_diff()
        .context_radius(2)
        .header(path.as_str(), path.as_str())
        .to_string()
}
