//! # Replication Job
//!
//! The fully resolved description of one replication run, handed to the
//! engine by the CLI. The engine never reads the environment itself.

use crate::constants::DEFAULT_CONCURRENCY;
use crate::error::ReplicationError;
use crate::replication::{VersionMode, VersionOrder};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplicationJob {
    /// Source vault identity (bare name or URL)
    pub source: String,
    /// Target vault identities; order is only used for reporting
    pub targets: Vec<String>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub dry_run: bool,
    /// Maximum units in flight; zero or negative means the default
    pub concurrency: i64,
    pub override_disabled: bool,
    pub mode: VersionMode,
    pub order: VersionOrder,
    /// Deadline for the whole run, `None` for unbounded
    pub timeout: Option<Duration>,
}

impl ReplicationJob {
    pub fn new(
        source: impl Into<String>,
        targets: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            source: source.into(),
            targets: targets.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Trim identities, drop empty and duplicate targets, keep target order
    ///
    /// # Errors
    /// Returns `ReplicationError::Config` when the source is empty or no
    /// target remains
    pub fn validated(mut self) -> Result<Self, ReplicationError> {
        self.source = self.source.trim().to_string();
        if self.source.is_empty() {
            return Err(ReplicationError::Config(
                "source vault is required".to_string(),
            ));
        }

        let mut targets: Vec<String> = Vec::with_capacity(self.targets.len());
        for target in &self.targets {
            let target = target.trim();
            if !target.is_empty() && !targets.iter().any(|seen| seen == target) {
                targets.push(target.to_string());
            }
        }
        if targets.is_empty() {
            return Err(ReplicationError::Config(
                "at least one target vault is required".to_string(),
            ));
        }
        self.targets = targets;
        Ok(self)
    }

    pub fn effective_concurrency(&self) -> usize {
        usize::try_from(self.concurrency)
            .ok()
            .filter(|&limit| limit > 0)
            .unwrap_or(DEFAULT_CONCURRENCY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_source() {
        let err = ReplicationJob::new("  ", ["t1"]).validated().unwrap_err();
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn test_requires_a_target() {
        let err = ReplicationJob::new("src", [" ", ""]).validated().unwrap_err();
        assert!(err.to_string().contains("target"));
    }

    #[test]
    fn test_targets_are_trimmed_and_deduplicated() {
        let job = ReplicationJob::new(" src ", ["t2", " t1", "t2 ", "t1"])
            .validated()
            .unwrap();
        assert_eq!(job.source, "src");
        assert_eq!(job.targets, vec!["t2", "t1"]);
    }

    #[test]
    fn test_concurrency_floor() {
        let mut job = ReplicationJob::new("src", ["t"]);
        assert_eq!(job.effective_concurrency(), DEFAULT_CONCURRENCY);
        job.concurrency = -3;
        assert_eq!(job.effective_concurrency(), DEFAULT_CONCURRENCY);
        job.concurrency = 3;
        assert_eq!(job.effective_concurrency(), 3);
    }
}
