//! Error types for airac-core

use std::path::PathBuf;

/// Result type for airac-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while updating a package
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The package source could not be turned into an archive
    #[error("Cannot resolve package: {message}")]
    Resolution { message: String },

    /// A download or index request failed
    #[error("Request to {url} failed: {message}")]
    Network { url: String, message: String },

    /// The archive is unreadable or contains unsafe entries
    #[error("Archive error in {path}: {message}")]
    Archive { path: PathBuf, message: String },

    #[error("Backup error: {message}")]
    Backup { message: String },

    #[error("Snapshot not found: {id}")]
    SnapshotNotFound { id: String },

    /// A backed-up file no longer matches its recorded checksum
    #[error("Backup copy of {path} is corrupt (checksum mismatch)")]
    ChecksumMismatch { path: String },

    #[error("Invalid settings: {message}")]
    Config { message: String },

    #[error("Region already registered: {id}")]
    DuplicateRegion { id: String },

    /// Transform failure while running a rule
    #[error("Rule '{rule}' failed")]
    Rule {
        rule: String,
        #[source]
        source: airac_rules::Error,
    },

    // Transparent wrappers for underlying crate errors
    #[error(transparent)]
    Fs(#[from] airac_fs::Error),

    #[error(transparent)]
    Rules(#[from] airac_rules::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn resolution(message: impl Into<String>) -> Self {
        Self::Resolution {
            message: message.into(),
        }
    }

    pub fn backup(message: impl Into<String>) -> Self {
        Self::Backup {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Render an error and every `source()` below it, outermost first.
pub fn cause_chain(error: &(dyn std::error::Error + 'static)) -> Vec<String> {
    let mut chain = vec![error.to_string()];
    let mut current = error.source();
    while let Some(cause) = current {
        let message = cause.to_string();
        // Transparent wrappers repeat their inner message
        if chain.last() != Some(&message) {
            chain.push(message);
        }
        current = cause.source();
    }
    chain
}
