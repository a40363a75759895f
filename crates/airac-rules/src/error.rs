//! Error types for airac-rules

use std::path::PathBuf;

/// Result type for rule operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while applying a rule to a file.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The matched file holds binary data
    #[error("Not a text file: {path}")]
    NotText { path: PathBuf },

    /// The edited text cannot be written back in the file's encoding
    #[error("Cannot encode {path} as {encoding}: {message}")]
    Encoding {
        path: PathBuf,
        encoding: String,
        message: String,
    },

    #[error("Invalid glob pattern '{pattern}': {message}")]
    InvalidGlob { pattern: String, message: String },

    #[error("Invalid regex '{pattern}': {message}")]
    InvalidRegex { pattern: String, message: String },

    /// A copy rule's source does not exist
    #[error("Copy source not found: {path}")]
    MissingSource { path: PathBuf },

    #[error(transparent)]
    Fs(#[from] airac_fs::Error),
}
