//! # In-Memory Secret Store
//!
//! A versioned secret store kept in process memory.
//!
//! Behaves like a Key Vault from the engine's point of view: every `set`
//! appends a new version, listings are paged, and the current version is the
//! newest one. Faults can be injected per secret or per operation, and every
//! call is counted so tests can assert on in-flight concurrency.

use super::{Page, SecretRecord, SecretStore, StoreConnector, VersionRef};
use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::debug;

const DEFAULT_PAGE_SIZE: usize = 25;

/// Counts concurrent calls, optionally shared by several stores
#[derive(Debug, Default)]
pub struct InFlight {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlight {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Highest number of simultaneous calls observed
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn current(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    fn enter(self: &Arc<Self>) -> InFlightGuard {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        InFlightGuard(Arc::clone(self))
    }
}

struct InFlightGuard(Arc<InFlight>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.current.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Default)]
struct Faults {
    listing: bool,
    version_listing: HashSet<String>,
    reads: HashSet<String>,
    writes: HashSet<String>,
    malformed_ids: Vec<String>,
}

#[derive(Debug, Clone)]
struct StoredVersion {
    version: String,
    record: SecretRecord,
    created: i64,
}

#[derive(Debug, Default)]
struct State {
    secrets: BTreeMap<String, Vec<StoredVersion>>,
    clock: i64,
}

/// In-memory [`SecretStore`]
#[derive(Debug)]
pub struct MemoryStore {
    identity: String,
    page_size: usize,
    call_delay: Option<Duration>,
    disabled_reads_fail: bool,
    state: Mutex<State>,
    faults: Mutex<Faults>,
    in_flight: Arc<InFlight>,
    write_calls: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn not_found(name: &str) -> StoreError {
    StoreError::Http {
        status: 404,
        code: "SecretNotFound".to_string(),
        message: format!("A secret with (name/id) {name} was not found in this key vault"),
    }
}

fn parse_offset(next: Option<String>) -> Result<usize, StoreError> {
    next.map_or(Ok(0), |token| {
        token
            .parse()
            .map_err(|e| StoreError::InvalidId(format!("continuation {token}: {e}")))
    })
}

fn paginate<T: Clone>(all: &[T], offset: usize, page_size: usize) -> (Vec<T>, Option<String>) {
    let end = (offset + page_size).min(all.len());
    let items = all.get(offset..end).map(<[T]>::to_vec).unwrap_or_default();
    let next = (end < all.len()).then(|| end.to_string());
    (items, next)
}

impl MemoryStore {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            page_size: DEFAULT_PAGE_SIZE,
            call_delay: None,
            disabled_reads_fail: false,
            state: Mutex::new(State::default()),
            faults: Mutex::new(Faults::default()),
            in_flight: InFlight::shared(),
            write_calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Make every call sleep, widening the window in which calls overlap
    #[must_use]
    pub fn with_call_delay(mut self, delay: Duration) -> Self {
        self.call_delay = Some(delay);
        self
    }

    /// Share an in-flight counter with other stores
    #[must_use]
    pub fn with_in_flight(mut self, in_flight: Arc<InFlight>) -> Self {
        self.in_flight = in_flight;
        self
    }

    /// Reads of disabled versions fail the way Key Vault does instead of
    /// returning the record with `enabled = false`
    #[must_use]
    pub fn with_disabled_reads_failing(mut self) -> Self {
        self.disabled_reads_fail = true;
        self
    }

    /// Append a version; returns its version token
    ///
    /// `record.version` is used as the token when set, otherwise one is generated.
    pub fn put(&self, record: SecretRecord) -> String {
        let mut state = lock(&self.state);
        state.clock += 1;
        let created = state.clock;
        let version = record
            .version
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());
        let mut stored = record;
        stored.version = Some(version.clone());
        state
            .secrets
            .entry(stored.name.clone())
            .or_default()
            .push(StoredVersion {
                version: version.clone(),
                record: stored,
                created,
            });
        version
    }

    /// Append an enabled version with no metadata
    pub fn insert(&self, name: &str, value: &str) -> String {
        self.put(SecretRecord::new(name, value))
    }

    /// Current (newest) version of `name`
    pub fn current(&self, name: &str) -> Option<SecretRecord> {
        lock(&self.state)
            .secrets
            .get(name)
            .and_then(|versions| versions.last())
            .map(|v| v.record.clone())
    }

    /// Every version of `name`, oldest first
    pub fn versions(&self, name: &str) -> Vec<SecretRecord> {
        lock(&self.state)
            .secrets
            .get(name)
            .map(|versions| versions.iter().map(|v| v.record.clone()).collect())
            .unwrap_or_default()
    }

    pub fn names(&self) -> Vec<String> {
        lock(&self.state).secrets.keys().cloned().collect()
    }

    /// Number of `set_secret` calls received, failed ones included
    pub fn write_calls(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> Arc<InFlight> {
        Arc::clone(&self.in_flight)
    }

    pub fn fail_listing(&self) {
        lock(&self.faults).listing = true;
    }

    pub fn fail_version_listing(&self, name: &str) {
        lock(&self.faults).version_listing.insert(name.to_string());
    }

    pub fn fail_reads(&self, name: &str) {
        lock(&self.faults).reads.insert(name.to_string());
    }

    pub fn fail_writes(&self, name: &str) {
        lock(&self.faults).writes.insert(name.to_string());
    }

    /// Append an identifier that cannot be parsed to the name listing
    pub fn inject_malformed_id(&self, raw: &str) {
        lock(&self.faults).malformed_ids.push(raw.to_string());
    }

    async fn call(&self) -> InFlightGuard {
        let guard = self.in_flight.enter();
        if let Some(delay) = self.call_delay {
            tokio::time::sleep(delay).await;
        }
        guard
    }
}

#[async_trait]
impl SecretStore for MemoryStore {
    fn identity(&self) -> &str {
        &self.identity
    }

    async fn list_secret_names(&self, next: Option<String>) -> Result<Page<String>, StoreError> {
        let _guard = self.call().await;
        let faults = lock(&self.faults);
        if faults.listing {
            return Err(StoreError::Unavailable(format!(
                "listing {} failed",
                self.identity
            )));
        }
        let mut all: Vec<Result<String, StoreError>> =
            self.names().into_iter().map(Ok).collect();
        all.extend(
            faults
                .malformed_ids
                .iter()
                .map(|raw| Err(StoreError::InvalidId(raw.clone()))),
        );
        drop(faults);

        let offset = parse_offset(next)?;
        let end = (offset + self.page_size).min(all.len());
        let next = (end < all.len()).then(|| end.to_string());
        let items = all.drain(offset.min(end)..end).collect();
        Ok(Page { items, next })
    }

    async fn list_secret_versions(
        &self,
        name: &str,
        next: Option<String>,
    ) -> Result<Page<VersionRef>, StoreError> {
        let _guard = self.call().await;
        if lock(&self.faults).version_listing.contains(name) {
            return Err(StoreError::Unavailable(format!(
                "listing versions of {name} failed"
            )));
        }
        let refs: Vec<VersionRef> = {
            let state = lock(&self.state);
            let versions = state.secrets.get(name).ok_or_else(|| not_found(name))?;
            versions
                .iter()
                .map(|v| VersionRef {
                    version: v.version.clone(),
                    created: Some(v.created),
                })
                .collect()
        };
        let (items, next) = paginate(&refs, parse_offset(next)?, self.page_size);
        Ok(Page {
            items: items.into_iter().map(Ok).collect(),
            next,
        })
    }

    async fn get_secret(
        &self,
        name: &str,
        version: Option<&str>,
    ) -> Result<SecretRecord, StoreError> {
        let _guard = self.call().await;
        if lock(&self.faults).reads.contains(name) {
            return Err(StoreError::Unavailable(format!("reading {name} failed")));
        }
        let state = lock(&self.state);
        let versions = state.secrets.get(name).ok_or_else(|| not_found(name))?;
        let stored = match version {
            None => versions.last(),
            Some(wanted) => versions.iter().find(|v| v.version == wanted),
        }
        .ok_or_else(|| not_found(name))?;

        if self.disabled_reads_fail && stored.record.enabled == Some(false) {
            return Err(StoreError::Disabled {
                name: name.to_string(),
            });
        }
        Ok(stored.record.clone())
    }

    async fn set_secret(&self, record: &SecretRecord) -> Result<(), StoreError> {
        let _guard = self.call().await;
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        if lock(&self.faults).writes.contains(&record.name) {
            return Err(StoreError::Unavailable(format!(
                "writing {} to {} failed",
                record.name, self.identity
            )));
        }
        let mut copy = record.clone();
        copy.version = None;
        let version = self.put(copy);
        debug!(
            vault_name = %self.identity,
            secret_name = %record.name,
            version = %version,
            "Stored new version in memory store"
        );
        Ok(())
    }
}

/// Maps vault identities to in-memory stores
#[derive(Debug, Default)]
pub struct MemoryConnector {
    stores: HashMap<String, Arc<MemoryStore>>,
    unreachable: HashSet<String>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a store under its identity
    #[must_use]
    pub fn with_store(mut self, store: Arc<MemoryStore>) -> Self {
        self.stores.insert(store.identity().to_string(), store);
        self
    }

    /// Connecting to `identity` fails even if a store is registered for it
    #[must_use]
    pub fn with_unreachable(mut self, identity: &str) -> Self {
        self.unreachable.insert(identity.to_string());
        self
    }
}

#[async_trait]
impl StoreConnector for MemoryConnector {
    async fn connect(&self, identity: &str) -> Result<Arc<dyn SecretStore>, StoreError> {
        if self.unreachable.contains(identity) {
            return Err(StoreError::Unavailable(format!("{identity} is unreachable")));
        }
        let store = self
            .stores
            .get(identity)
            .ok_or_else(|| StoreError::InvalidVault {
                identity: identity.to_string(),
                reason: "no such vault".to_string(),
            })?;
        Ok(Arc::clone(store) as Arc<dyn SecretStore>)
    }
}
