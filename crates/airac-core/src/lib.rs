//! Core of the AIRAC package updater
//!
//! This crate ties the pieces of an update together:
//!
//! - [`settings`]: the user's settings record
//! - [`backup`]: snapshot and restore of an install tree
//! - [`regions`]: region id to rule list registry with the built-in regions
//! - [`package`]: package sources and archive name parsing
//! - [`acquire`] / [`extract`]: download and unpack collaborators
//! - [`pipeline`]: the update state machine with dry-run and rollback

pub mod acquire;
pub mod backup;
pub mod error;
pub mod extract;
pub mod package;
pub mod pipeline;
pub mod regions;
pub mod scope;
pub mod settings;

pub use acquire::{DownloadSource, FetchedPackage, HttpFetcher, PackageFetcher};
pub use backup::{BackupManager, BackupSnapshot, RestoreReport, SnapshotFile};
pub use error::{Error, Result, cause_chain};
pub use extract::{ArchiveExtractor, ArchiveFile, ZipExtractor};
pub use package::{PackageInfo, PackageSource};
pub use pipeline::{Outcome, Pipeline, PipelinePlan, PipelineResult, RunOptions, Stage};
pub use regions::{RegionRegistration, RegionRegistry, RegionRules};
pub use scope::{ScopedStore, TreeScope};
pub use settings::{Rating, Settings};
