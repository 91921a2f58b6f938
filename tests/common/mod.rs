//! Common test utilities for integration tests
//!
//! Provides rustls provider setup for the Pact tests, a recording
//! [`Reporter`], and helpers for building in-memory vault fixtures.

#![allow(dead_code, reason = "Each test crate uses a different subset of helpers")]

use secret_replicator::prelude::*;
use std::sync::{Arc, Mutex, Once, PoisonError};

static RUSTLS_INIT: Once = Once::new();

/// Initialize rustls crypto provider for tests
///
/// This must be called before any async operations that use rustls.
/// Uses a `Once` to ensure it's only called once across all tests.
pub fn init_rustls() {
    RUSTLS_INIT.call_once(|| {
        // We use ring as the crypto provider (matches main application)
        rustls::crypto::ring::default_provider()
            .install_default()
            .expect("Failed to install rustls crypto provider");
    });
}

/// Reporter that keeps every notice for assertions
#[derive(Debug, Default)]
pub struct RecordingReporter {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingReporter {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn dry_run_lines(&self) -> Vec<String> {
        self.notices()
            .into_iter()
            .filter(|notice| matches!(notice, Notice::DryRun { .. }))
            .map(|notice| notice.to_string())
            .collect()
    }

    pub fn skipped_disabled(&self) -> usize {
        self.notices()
            .iter()
            .filter(|notice| matches!(notice, Notice::SkippedDisabled { .. }))
            .count()
    }
}

impl Reporter for RecordingReporter {
    fn notice(&self, notice: &Notice) {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notice.clone());
    }
}

/// A source vault and target vaults registered with one connector
pub struct Vaults {
    pub source: Arc<MemoryStore>,
    pub targets: Vec<Arc<MemoryStore>>,
    pub connector: Arc<MemoryConnector>,
}

impl Vaults {
    /// `src` plus targets `t1..=tN`
    pub fn new(target_count: usize) -> Self {
        Self::with_stores(
            MemoryStore::new("src"),
            (1..=target_count)
                .map(|i| MemoryStore::new(format!("t{i}")))
                .collect(),
        )
    }

    pub fn with_stores(source: MemoryStore, targets: Vec<MemoryStore>) -> Self {
        let source = Arc::new(source);
        let targets: Vec<Arc<MemoryStore>> = targets.into_iter().map(Arc::new).collect();
        let connector = targets.iter().fold(
            MemoryConnector::new().with_store(Arc::clone(&source)),
            |connector, target| connector.with_store(Arc::clone(target)),
        );
        Self {
            source,
            targets,
            connector: Arc::new(connector),
        }
    }

    pub fn target(&self, identity: &str) -> &MemoryStore {
        self.targets
            .iter()
            .find(|target| target.identity() == identity)
            .expect("unknown target")
    }

    /// Job from `src` to every target
    pub fn job(&self) -> ReplicationJob {
        ReplicationJob::new(
            "src",
            self.targets.iter().map(|target| target.identity().to_string()),
        )
    }

    pub async fn run(
        &self,
        job: ReplicationJob,
        reporter: &Arc<RecordingReporter>,
    ) -> Result<(), ReplicationError> {
        let connector: Arc<dyn StoreConnector> = Arc::<MemoryConnector>::clone(&self.connector);
        let reporter: Arc<dyn Reporter> = Arc::<RecordingReporter>::clone(reporter);
        Replicator::new(job, connector, reporter).run().await
    }
}

/// Current value of `name` in `store`, if any
pub fn value_of(store: &MemoryStore, name: &str) -> Option<String> {
    store.current(name).map(|record| record.value.to_string())
}
