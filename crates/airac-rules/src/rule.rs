//! Rule data model
//!
//! Rules are plain data. Region profiles are lists of [`RuleAction`]s built
//! with the constructors below and executed by the engine.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Separator between a key and its value on a settings line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delimiter {
    /// `key = value` (TopSky settings)
    #[default]
    Equals,
    /// `key:value` (screen and symbology files)
    Colon,
    /// Tab separated records (`.prf` profiles); the key may span fields
    Tab,
}

impl Delimiter {
    pub fn as_char(self) -> char {
        match self {
            Self::Equals => '=',
            Self::Colon => ':',
            Self::Tab => '\t',
        }
    }

    /// Byte offset at which the value for `key` starts on `line`.
    ///
    /// `line` must not include its line terminator. Returns `None` when the
    /// line does not assign `key`.
    pub fn value_offset(self, line: &str, key: &str) -> Option<usize> {
        if key.is_empty() {
            return None;
        }
        match self {
            Self::Equals | Self::Colon => {
                let trimmed = line.trim_start_matches([' ', '\t']);
                let rest = trimmed.strip_prefix(key)?;
                let rest = rest.trim_start_matches([' ', '\t']);
                let value = rest.strip_prefix(self.as_char())?;
                let value = value.trim_start_matches([' ', '\t']);
                Some(line.len() - value.len())
            }
            Self::Tab => {
                if line
                    .strip_prefix(key)
                    .is_some_and(|rest| rest.starts_with('\t'))
                {
                    return Some(key.len() + 1);
                }
                // The key may follow a leading section field
                let needle = format!("\t{}\t", key);
                line.find(&needle).map(|idx| idx + needle.len())
            }
        }
    }
}

/// How many files a rule expects to match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Exactly one file; anything else is a warning and nothing is edited
    Single,
    /// Every matching file
    #[default]
    All,
}

/// Replace the value of `key` on every line that assigns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub key: String,
    pub value: String,
}

/// Regex search/replace over the whole file text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replacement {
    pub pattern: String,
    pub replacement: String,
    /// Insert `replacement` verbatim instead of expanding `$n` references
    #[serde(default)]
    pub literal: bool,
}

/// Declarative edit of one or more text files under the install root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformRule {
    /// Label used in logs and reports
    pub name: String,
    /// Glob relative to the install root. Without `/` it matches file names
    /// at any depth.
    pub target: String,
    /// Secondary glob on the file name narrowing the matches
    #[serde(default)]
    pub name_filter: Option<String>,
    /// Glob on the file name removing matches
    #[serde(default)]
    pub exclude: Option<String>,
    #[serde(default)]
    pub scope: Scope,
    #[serde(default)]
    pub delimiter: Delimiter,
    #[serde(default)]
    pub assignments: Vec<Assignment>,
    #[serde(default)]
    pub replacements: Vec<Replacement>,
    /// Failures on this rule are warnings instead of aborting the run
    #[serde(default)]
    pub optional: bool,
}

impl TransformRule {
    fn new(name: impl Into<String>, target: impl Into<String>, scope: Scope) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            name_filter: None,
            exclude: None,
            scope,
            delimiter: Delimiter::default(),
            assignments: Vec::new(),
            replacements: Vec::new(),
            optional: false,
        }
    }

    /// Update exactly one file at `path` (relative to the install root).
    pub fn file(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name, path, Scope::Single)
    }

    /// Update every file matching `glob`.
    pub fn matching(name: impl Into<String>, glob: impl Into<String>) -> Self {
        Self::new(name, glob, Scope::All)
    }

    /// Only touch matches whose file name also matches `glob`.
    pub fn filtered(mut self, glob: impl Into<String>) -> Self {
        self.name_filter = Some(glob.into());
        self
    }

    /// Skip matches whose file name matches `glob`.
    pub fn excluding(mut self, glob: impl Into<String>) -> Self {
        self.exclude = Some(glob.into());
        self
    }

    pub fn delimiter(mut self, delimiter: Delimiter) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.assignments.push(Assignment {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// Regex replacement; `$1` style references in `replacement` expand.
    pub fn replace(mut self, pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        self.replacements.push(Replacement {
            pattern: pattern.into(),
            replacement: replacement.into(),
            literal: false,
        });
        self
    }

    /// Regex replacement inserting `text` verbatim.
    pub fn replace_literal(mut self, pattern: impl Into<String>, text: impl Into<String>) -> Self {
        self.replacements.push(Replacement {
            pattern: pattern.into(),
            replacement: text.into(),
            literal: true,
        });
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty() && self.replacements.is_empty()
    }
}

/// Copy a file, or every file of a directory, into the install root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyRule {
    pub name: String,
    /// Absolute source path outside the install root
    pub source: PathBuf,
    /// Destination relative to the install root; a directory prefix when
    /// `source` is a directory
    pub target: String,
    #[serde(default)]
    pub optional: bool,
}

impl CopyRule {
    pub fn new(name: impl Into<String>, source: impl Into<PathBuf>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            target: target.into(),
            optional: false,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// One step of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RuleAction {
    Transform(TransformRule),
    Copy(CopyRule),
}

impl RuleAction {
    pub fn name(&self) -> &str {
        match self {
            Self::Transform(rule) => &rule.name,
            Self::Copy(rule) => &rule.name,
        }
    }

    pub fn is_optional(&self) -> bool {
        match self {
            Self::Transform(rule) => rule.optional,
            Self::Copy(rule) => rule.optional,
        }
    }
}

impl From<TransformRule> for RuleAction {
    fn from(rule: TransformRule) -> Self {
        Self::Transform(rule)
    }
}

impl From<CopyRule> for RuleAction {
    fn from(rule: CopyRule) -> Self {
        Self::Copy(rule)
    }
}
