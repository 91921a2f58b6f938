//! # Secret Stores
//!
//! The capability-typed interface the replication engine talks to.
//!
//! Each store implements [`SecretStore`]:
//! - list secret names (paged)
//! - list the versions of one secret (paged)
//! - get a secret's value and metadata, optionally at a version
//! - set (overwrite) a secret, creating a new version in the store
//!
//! A [`StoreConnector`] turns a vault identity into a store session.
//! Implementations:
//! - `key_vault`: Azure Key Vault through the Secrets SDK
//! - `memory`: in-process versioned store with fault injection

use crate::error::StoreError;
use async_trait::async_trait;
use std::sync::Arc;

pub mod key_vault;
pub mod memory;
mod model;

pub use model::{Page, SecretRecord, VersionRef};

/// Remote secret store endpoint
///
/// Every call may fail independently. Sessions are shared by many concurrent
/// replication units, so implementations must be safe for concurrent use.
#[async_trait]
pub trait SecretStore: Send + Sync + std::fmt::Debug {
    /// Identity of the vault this session talks to, used in logs and errors
    fn identity(&self) -> &str;

    /// Fetch one page of secret names
    ///
    /// `next` is the continuation returned by the previous page, `None` for
    /// the first page. Items that could not be parsed are returned as
    /// per-item errors so the caller can skip them.
    async fn list_secret_names(&self, next: Option<String>) -> Result<Page<String>, StoreError>;

    /// Fetch one page of versions of `name`, in the store's listing order
    async fn list_secret_versions(
        &self,
        name: &str,
        next: Option<String>,
    ) -> Result<Page<VersionRef>, StoreError>;

    /// Get a secret; `None` means the current version
    async fn get_secret(&self, name: &str, version: Option<&str>)
        -> Result<SecretRecord, StoreError>;

    /// Overwrite the secret `record.name` with the record's value and metadata
    async fn set_secret(&self, record: &SecretRecord) -> Result<(), StoreError>;
}

/// Opens store sessions from vault identities
#[async_trait]
pub trait StoreConnector: Send + Sync + std::fmt::Debug {
    /// Establish a session to the vault named by `identity`
    async fn connect(&self, identity: &str) -> Result<Arc<dyn SecretStore>, StoreError>;
}
