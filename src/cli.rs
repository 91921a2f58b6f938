//! # CLI
//!
//! Command-line flags for `secret-replicator`.
//!
//! Every flag is optional and overrides the matching environment variable.
//!
//! ## Usage
//!
//! ```bash
//! # Copy every app-* secret except caches to two vaults
//! secret-replicator --source kv-src --targets kv-a,kv-b --include 'app-*' --exclude '*-cache'
//!
//! # Show what would be copied, including every historical version
//! secret-replicator --source kv-src --targets kv-a --latest-only=false --dry-run
//! ```

use crate::config::{split_list, ReplicatorConfig};
use crate::observability::LogFormat;
use crate::replication::VersionOrder;
use clap::Parser;
use std::path::PathBuf;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("BUILD_GIT_HASH"),
    ", built ",
    env!("BUILD_DATETIME"),
    ")"
);

/// Replicate Azure Key Vault secrets from a source vault to target vaults
#[derive(Parser, Debug, Default)]
#[command(name = "secret-replicator", version, long_version = LONG_VERSION)]
#[command(after_help = "\
Every flag can also be set through the environment:
  SOURCE_VAULT, TARGET_VAULTS, INCLUDE_PATTERNS, EXCLUDE_PATTERNS, DRY_RUN,
  CONCURRENCY, OVERRIDE_DISABLED, LATEST_ONLY, VERSION_ORDER, JOB_TIMEOUT_SECS,
  KEY_VAULT_DNS_SUFFIX, METRICS_FILE, LOG_LEVEL, LOG_FORMAT
")]
pub struct Cli {
    /// Source Key Vault name, or its full URL
    #[arg(long, value_name = "VAULT")]
    pub source: Option<String>,

    /// Comma-separated target Key Vault names or URLs
    #[arg(long, value_name = "VAULTS")]
    pub targets: Option<String>,

    /// Comma-separated glob patterns to include (e.g. 'app-*')
    #[arg(long, value_name = "PATTERNS")]
    pub include: Option<String>,

    /// Comma-separated glob patterns to exclude
    #[arg(long, value_name = "PATTERNS")]
    pub exclude: Option<String>,

    /// Read everything but do not write to targets
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_name = "BOOL")]
    pub dry_run: Option<bool>,

    /// Maximum secrets replicated concurrently
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    pub concurrency: Option<i64>,

    /// Copy secrets even if they are disabled at the source
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_name = "BOOL")]
    pub override_disabled: Option<bool>,

    /// Copy only current versions (true) or every version (false)
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_name = "BOOL")]
    pub latest_only: Option<bool>,

    /// Order of versions when copying every version: listing or oldest-first
    #[arg(long, value_name = "ORDER")]
    pub version_order: Option<VersionOrder>,

    /// Deadline for the whole run in seconds; 0 disables it
    #[arg(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    /// DNS suffix for bare vault names (e.g. vault.azure.cn)
    #[arg(long, value_name = "SUFFIX")]
    pub dns_suffix: Option<String>,

    /// Write Prometheus metrics to this file when the run ends
    #[arg(long, value_name = "PATH")]
    pub metrics_file: Option<PathBuf>,

    /// Tracing filter used when RUST_LOG is unset (e.g. debug)
    #[arg(long, value_name = "FILTER")]
    pub log_level: Option<String>,

    /// Log output format: text or json
    #[arg(long, value_name = "FORMAT")]
    pub log_format: Option<LogFormat>,
}

impl Cli {
    /// Layer the flags that were given over `config`
    #[must_use]
    pub fn merge(self, mut config: ReplicatorConfig) -> ReplicatorConfig {
        if let Some(source) = self.source {
            config.source_vault = source;
        }
        if let Some(targets) = self.targets {
            config.target_vaults = split_list(&targets);
        }
        if let Some(include) = self.include {
            config.include_patterns = split_list(&include);
        }
        if let Some(exclude) = self.exclude {
            config.exclude_patterns = split_list(&exclude);
        }
        if let Some(dry_run) = self.dry_run {
            config.dry_run = dry_run;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(override_disabled) = self.override_disabled {
            config.override_disabled = override_disabled;
        }
        if let Some(latest_only) = self.latest_only {
            config.latest_only = latest_only;
        }
        if let Some(version_order) = self.version_order {
            config.version_order = version_order;
        }
        if let Some(timeout_secs) = self.timeout_secs {
            config.job_timeout_secs = timeout_secs;
        }
        if let Some(dns_suffix) = self.dns_suffix {
            config.dns_suffix = dns_suffix;
        }
        if self.metrics_file.is_some() {
            config.metrics_file = self.metrics_file;
        }
        if self.log_level.is_some() {
            config.log_level = self.log_level;
        }
        if let Some(log_format) = self.log_format {
            config.log_format = log_format;
        }
        config
    }
}
