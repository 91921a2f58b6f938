//! # Constants
//!
//! Shared constants used throughout the replicator.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Concurrency used when the configured limit is zero or negative
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Default deadline for a whole replication job (seconds)
pub const DEFAULT_JOB_TIMEOUT_SECS: u64 = 60 * 60;

/// DNS suffix appended to bare vault names
pub const DEFAULT_KEY_VAULT_DNS_SUFFIX: &str = "vault.azure.net";

/// OAuth scope for Key Vault data-plane tokens
pub const KEY_VAULT_SCOPE: &str = "https://vault.azure.net/.default";

/// Items handed out per listing page call
/// Matches the service's own `maxresults` cap
pub const KEY_VAULT_PAGE_SIZE: usize = 25;

/// Default tracing filter when neither `RUST_LOG` nor `LOG_LEVEL` is set
pub const DEFAULT_LOG_FILTER: &str = "secret_replicator=info";
