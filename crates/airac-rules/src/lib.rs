//! Declarative transformation rules for plain-text settings files
//!
//! A [`TransformRule`] names a set of files by glob and lists the edits to
//! make in them: `key <delimiter> value` assignments first, regex
//! replacements second, each in declared order. A [`CopyRule`] copies files
//! into the tree. Both are executed by the [`RuleEngine`] against a
//! [`FileStore`], either the real disk or an in-memory overlay used for
//! dry runs.
//!
//! Rules are idempotent: a file is written (and reported) only when its
//! content actually changes.

pub mod engine;
pub mod error;
pub mod matcher;
pub mod rule;
pub mod store;
pub mod text;

pub use engine::{FileChange, RuleEngine, RuleOutcome, apply_rule};
pub use error::{Error, Result};
pub use matcher::TargetMatcher;
pub use rule::{Assignment, CopyRule, Delimiter, Replacement, RuleAction, Scope, TransformRule};
pub use store::{DiskStore, FileStore, OverlayStore};
pub use text::{DecodedText, Encoding};
