//! # Replicator Configuration
//!
//! Process-level settings loaded from environment variables.
//!
//! Every setting has a default and can be overridden by the matching CLI flag
//! (see `cli.rs`). A `.env` file in the working directory is loaded into the
//! environment before these are read.

use super::ReplicationJob;
use crate::constants::{DEFAULT_CONCURRENCY, DEFAULT_JOB_TIMEOUT_SECS, DEFAULT_KEY_VAULT_DNS_SUFFIX};
use crate::observability::LogFormat;
use crate::replication::{VersionMode, VersionOrder};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicatorConfig {
    /// Source vault (`SOURCE_VAULT`)
    pub source_vault: String,
    /// Target vaults (`TARGET_VAULTS`, comma separated)
    pub target_vaults: Vec<String>,
    /// Include globs (`INCLUDE_PATTERNS`)
    pub include_patterns: Vec<String>,
    /// Exclude globs (`EXCLUDE_PATTERNS`)
    pub exclude_patterns: Vec<String>,
    /// Read everything, write nothing (`DRY_RUN`)
    pub dry_run: bool,
    /// Units in flight (`CONCURRENCY`)
    pub concurrency: i64,
    /// Copy secrets disabled at the source (`OVERRIDE_DISABLED`)
    pub override_disabled: bool,
    /// Copy only current versions (`LATEST_ONLY`)
    pub latest_only: bool,
    /// History order in all-versions mode (`VERSION_ORDER`)
    pub version_order: VersionOrder,
    /// Deadline for the whole run; zero disables it (`JOB_TIMEOUT_SECS`)
    pub job_timeout_secs: u64,
    /// Suffix for bare vault names (`KEY_VAULT_DNS_SUFFIX`)
    pub dns_suffix: String,
    /// Prometheus textfile written after the run (`METRICS_FILE`)
    pub metrics_file: Option<PathBuf>,
    /// Tracing filter when `RUST_LOG` is unset (`LOG_LEVEL`)
    pub log_level: Option<String>,
    /// `text` or `json` (`LOG_FORMAT`)
    pub log_format: LogFormat,
}

impl Default for ReplicatorConfig {
    fn default() -> Self {
        Self {
            source_vault: String::new(),
            target_vaults: Vec::new(),
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            dry_run: false,
            concurrency: DEFAULT_CONCURRENCY as i64,
            override_disabled: false,
            latest_only: true,
            version_order: VersionOrder::default(),
            job_timeout_secs: DEFAULT_JOB_TIMEOUT_SECS,
            dns_suffix: DEFAULT_KEY_VAULT_DNS_SUFFIX.to_string(),
            metrics_file: None,
            log_level: None,
            log_format: LogFormat::default(),
        }
    }
}

impl ReplicatorConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            source_vault: env_var_or_default_str(&lookup, "SOURCE_VAULT", ""),
            target_vaults: split_list(&env_var_or_default_str(&lookup, "TARGET_VAULTS", "")),
            include_patterns: split_list(&env_var_or_default_str(&lookup, "INCLUDE_PATTERNS", "")),
            exclude_patterns: split_list(&env_var_or_default_str(&lookup, "EXCLUDE_PATTERNS", "")),
            dry_run: env_var_or_default_bool(&lookup, "DRY_RUN", defaults.dry_run),
            concurrency: env_var_or_default(&lookup, "CONCURRENCY", defaults.concurrency),
            override_disabled: env_var_or_default_bool(
                &lookup,
                "OVERRIDE_DISABLED",
                defaults.override_disabled,
            ),
            latest_only: env_var_or_default_bool(&lookup, "LATEST_ONLY", defaults.latest_only),
            version_order: env_var_or_default(&lookup, "VERSION_ORDER", defaults.version_order),
            job_timeout_secs: env_var_or_default(
                &lookup,
                "JOB_TIMEOUT_SECS",
                defaults.job_timeout_secs,
            ),
            dns_suffix: env_var_or_default_str(&lookup, "KEY_VAULT_DNS_SUFFIX", &defaults.dns_suffix),
            metrics_file: non_empty(&lookup, "METRICS_FILE").map(PathBuf::from),
            log_level: non_empty(&lookup, "LOG_LEVEL"),
            log_format: env_var_or_default(&lookup, "LOG_FORMAT", defaults.log_format),
        }
    }

    /// Deadline for a run, `None` when disabled
    pub fn job_timeout(&self) -> Option<Duration> {
        (self.job_timeout_secs > 0).then(|| Duration::from_secs(self.job_timeout_secs))
    }

    /// The job the engine runs
    pub fn job(&self) -> ReplicationJob {
        ReplicationJob {
            source: self.source_vault.clone(),
            targets: self.target_vaults.clone(),
            include: self.include_patterns.clone(),
            exclude: self.exclude_patterns.clone(),
            dry_run: self.dry_run,
            concurrency: self.concurrency,
            override_disabled: self.override_disabled,
            mode: VersionMode::from_latest_only(self.latest_only),
            order: self.version_order,
            timeout: self.job_timeout(),
        }
    }
}

/// Split a comma separated list, trimming entries and dropping empty ones
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read environment variable or return default value
fn env_var_or_default<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Read environment variable as boolean or return default
fn env_var_or_default_bool(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: bool,
) -> bool {
    lookup(key)
        .map(|v| {
            let v_lower = v.trim().to_lowercase();
            v_lower == "true" || v_lower == "1" || v_lower == "yes" || v_lower == "on"
        })
        .unwrap_or(default)
}

/// Read environment variable as string or return default
fn env_var_or_default_str(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: &str,
) -> String {
    lookup(key).unwrap_or_else(|| default.to_string())
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> ReplicatorConfig {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ReplicatorConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config, ReplicatorConfig::default());
        assert_eq!(config.concurrency, 8);
        assert!(config.latest_only);
        assert_eq!(config.job_timeout(), Some(Duration::from_secs(3600)));
    }

    #[test]
    fn test_reads_every_setting() {
        let config = config_from(&[
            ("SOURCE_VAULT", "kv-src"),
            ("TARGET_VAULTS", "kv-a, kv-b,,"),
            ("INCLUDE_PATTERNS", "app-*"),
            ("EXCLUDE_PATTERNS", "*-tmp , *-old"),
            ("DRY_RUN", "TRUE"),
            ("CONCURRENCY", "3"),
            ("OVERRIDE_DISABLED", "yes"),
            ("LATEST_ONLY", "false"),
            ("VERSION_ORDER", "oldest-first"),
            ("JOB_TIMEOUT_SECS", "0"),
            ("KEY_VAULT_DNS_SUFFIX", "vault.azure.cn"),
            ("METRICS_FILE", "/tmp/replicator.prom"),
            ("LOG_LEVEL", "debug"),
            ("LOG_FORMAT", "json"),
        ]);

        assert_eq!(config.source_vault, "kv-src");
        assert_eq!(config.target_vaults, vec!["kv-a", "kv-b"]);
        assert_eq!(config.include_patterns, vec!["app-*"]);
        assert_eq!(config.exclude_patterns, vec!["*-tmp", "*-old"]);
        assert!(config.dry_run);
        assert_eq!(config.concurrency, 3);
        assert!(config.override_disabled);
        assert!(!config.latest_only);
        assert_eq!(config.version_order, VersionOrder::OldestFirst);
        assert_eq!(config.job_timeout(), None);
        assert_eq!(config.dns_suffix, "vault.azure.cn");
        assert_eq!(config.metrics_file, Some(PathBuf::from("/tmp/replicator.prom")));
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_unparseable_values_fall_back_to_defaults() {
        let config = config_from(&[("CONCURRENCY", "many"), ("VERSION_ORDER", "random")]);
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.version_order, VersionOrder::Listing);
    }

    #[test]
    fn test_job_carries_settings() {
        let config = config_from(&[
            ("SOURCE_VAULT", "src"),
            ("TARGET_VAULTS", "t1"),
            ("LATEST_ONLY", "0"),
        ]);
        let job = config.job();
        assert_eq!(job.source, "src");
        assert_eq!(job.targets, vec!["t1"]);
        assert_eq!(job.mode, VersionMode::AllVersions);
        assert_eq!(job.timeout, Some(Duration::from_secs(3600)));
    }
}
