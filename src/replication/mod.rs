//! # Replication
//!
//! The core of the replicator: name filter, version selector, disabled-secret
//! policy, first-error aggregation and the engine that ties them together.

pub mod aggregator;
pub mod deadline;
pub mod engine;
pub mod filter;
pub mod policy;
pub mod reporter;
pub mod versions;

pub use aggregator::FirstError;
pub use deadline::Deadline;
pub use engine::Replicator;
pub use filter::{allowed, NameFilter};
pub use policy::should_propagate;
pub use reporter::{Notice, Reporter, TracingReporter};
pub use versions::{VersionCursor, VersionMode, VersionOrder};
