//! Secret Replicator Library
//!
//! Replicates secrets from one source Azure Key Vault to one or more target
//! vaults, selected by name pattern, optionally across every historical
//! version, with bounded concurrency and first-error-wins reporting.
//! Tests are included in the module files and under `tests/`.
//!
//! ## Quick Start
//!
//! ```rust
//! use secret_replicator::prelude::*;
//! ```
//!
//! This brings commonly used types and traits into scope. For more specific imports,
//! use the individual modules.

pub mod auth;
pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod observability;
pub mod prelude;
pub mod replication;
pub mod store;
