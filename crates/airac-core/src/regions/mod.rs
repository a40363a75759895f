//! Region registry - region id to ordered rule list
//!
//! Every region registers a builder function; looking up rules never
//! branches on region ids. Adding a region means adding a registration in
//! [`builtins`] or calling [`RegionRegistry::register`] at startup.

mod builtins;
mod store;
mod types;

pub use builtins::{BUILTIN_COUNT, builtin_registrations, shared_rules};
pub use store::RegionRegistry;
pub use types::{RegionBuilder, RegionRegistration, RegionRules};
