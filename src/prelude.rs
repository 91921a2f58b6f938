//! # Prelude
//!
//! Re-exports commonly used types and traits for convenience.
//!
//! ```rust
//! use secret_replicator::prelude::*;
//! ```

// Engine and its collaborators
pub use crate::replication::{
    FirstError, Notice, Replicator, Reporter, TracingReporter, VersionMode, VersionOrder,
};

// Secret stores
pub use crate::store::key_vault::KeyVaultConnector;
pub use crate::store::memory::{MemoryConnector, MemoryStore};
pub use crate::store::{Page, SecretRecord, SecretStore, StoreConnector, VersionRef};

// Config types
pub use crate::config::{ReplicationJob, ReplicatorConfig};

// Common error types
pub use crate::error::{ReplicationError, StoreError};
