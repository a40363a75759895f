//! Update pipeline
//!
//! The [`Pipeline`] runs the update state machine for one package. Its
//! collaborators (fetcher, extractor, settings, registry) are handed in, so
//! tests drive it with local archives and fake fetchers.

pub mod engine;
pub mod plan;
pub mod post;
pub mod report;

pub use engine::{Pipeline, RunOptions};
pub use plan::PipelinePlan;
pub use post::PostSteps;
pub use report::{Outcome, PipelineResult, Stage};
