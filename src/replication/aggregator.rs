//! First-error-wins aggregation across concurrent units.

use crate::error::ReplicationError;
use crate::observability::metrics;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use tracing::warn;

/// Set-once slot for the first error a job observes
///
/// Every recorded error is logged, but only the first one to arrive is kept.
#[derive(Debug, Default)]
pub struct FirstError {
    slot: Mutex<Option<ReplicationError>>,
    suppressed: AtomicUsize,
}

impl FirstError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, error: ReplicationError) {
        warn!(error.kind = error.kind(), error = %error, "Replication error");
        metrics::increment_replication_errors(error.kind());

        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(error);
        } else {
            self.suppressed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn is_set(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Errors recorded after the first one
    pub fn suppressed(&self) -> usize {
        self.suppressed.load(Ordering::Relaxed)
    }

    pub fn take(&self) -> Option<ReplicationError> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_keeps_first_error() {
        let errors = FirstError::new();
        assert!(!errors.is_set());
        errors.record(ReplicationError::Config("first".to_string()));
        errors.record(ReplicationError::Config("second".to_string()));

        assert!(errors.is_set());
        assert_eq!(errors.suppressed(), 1);
        assert_eq!(
            errors.take().map(|e| e.to_string()),
            Some("invalid job configuration: first".to_string())
        );
    }

    #[tokio::test]
    async fn test_concurrent_records_keep_exactly_one() {
        let errors = Arc::new(FirstError::new());
        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..32 {
            let errors = Arc::clone(&errors);
            tasks.spawn(async move {
                errors.record(ReplicationError::Config(format!("error {i}")));
            });
        }
        while tasks.join_next().await.is_some() {}

        assert_eq!(errors.suppressed(), 31);
        assert!(errors.take().is_some());
        assert!(errors.take().is_none());
    }
}
