//! Filesystem primitives for the AIRAC updater
//!
//! Provides normalized path handling, content checksums, atomic writes,
//! tree enumeration and settings-file loading shared by the other crates.

pub mod checksum;
pub mod config;
pub mod error;
pub mod io;
pub mod path;

pub use checksum::{compute_bytes_checksum, compute_content_checksum, compute_file_checksum};
pub use config::ConfigStore;
pub use error::{Error, Result};
pub use path::{NormalizedPath, validate_relative_path};
