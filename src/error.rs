//! # Errors
//!
//! Error types for the store clients and the replication engine.
//!
//! `StoreError` is what a single remote call can fail with. `ReplicationError`
//! wraps it with the job context (which secret, which version, which vault) so
//! the one error a job surfaces is enough to act on.

use thiserror::Error;

/// Failure of a single secret store call
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store answered with a non-success status
    #[error("HTTP {status}: {code}: {message}")]
    Http {
        status: u16,
        code: String,
        message: String,
    },

    /// The secret (or version) exists but is disabled, so its value cannot be read
    #[error("secret {name} is disabled")]
    Disabled { name: String },

    /// Transport, credential or request-building failure inside the SDK
    #[error("Key Vault client error: {0}")]
    Azure(#[from] azure_core::Error),

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// An identifier returned by the store did not have the expected shape
    #[error("unexpected identifier format: {0}")]
    InvalidId(String),

    #[error("invalid vault identity {identity}: {reason}")]
    InvalidVault { identity: String, reason: String },

    /// The store is unreachable or refused the call for a non-HTTP reason
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Whether this error means the record is disabled at the source
    pub fn is_disabled(&self) -> bool {
        matches!(self, Self::Disabled { .. })
    }
}

/// Error recorded by a replication job
#[derive(Debug, Error)]
pub enum ReplicationError {
    /// Missing source or targets; nothing was attempted
    #[error("invalid job configuration: {0}")]
    Config(String),

    /// A session to the source or a target could not be established
    #[error("connect to vault {vault}: {source}")]
    Connection { vault: String, source: StoreError },

    #[error("list secrets in {vault}: {source}")]
    ListSecrets { vault: String, source: StoreError },

    #[error("list versions {name}: {source}")]
    ListVersions { name: String, source: StoreError },

    /// A listed identifier could not be parsed; only that item is skipped
    #[error("parse id: {source}")]
    Parse { source: StoreError },

    #[error("get {}: {source}", secret_ref(.name, .version))]
    Fetch {
        name: String,
        version: Option<String>,
        source: StoreError,
    },

    #[error("set {} in {target}: {source}", secret_ref(.name, .version))]
    Write {
        name: String,
        version: Option<String>,
        target: String,
        source: StoreError,
    },

    /// The job deadline elapsed before a remote call finished
    #[error("deadline exceeded during {operation}")]
    Deadline { operation: String },

    /// A replication task ended without reporting (panic or abort)
    #[error("replication task for {name} ended abnormally: {message}")]
    Unit { name: String, message: String },
}

impl ReplicationError {
    /// Short label used for metrics and structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Connection { .. } => "connection",
            Self::ListSecrets { .. } | Self::ListVersions { .. } => "listing",
            Self::Parse { .. } => "parse",
            Self::Fetch { .. } => "fetch",
            Self::Write { .. } => "write",
            Self::Deadline { .. } => "deadline",
            Self::Unit { .. } => "unit",
        }
    }
}

/// Render `name` or `name@version`
pub fn secret_ref(name: &str, version: &Option<String>) -> String {
    match version {
        Some(version) => format!("{name}@{version}"),
        None => name.to_string(),
    }
}
