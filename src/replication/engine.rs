//! # Replication Engine
//!
//! Lists the source vault, filters names, and fans accepted names out as
//! concurrent units under a semaphore. Each unit reads its version(s) from the
//! source, applies the disabled-secret policy and writes every target.
//!
//! ## Flow
//!
//! 1. Validate the job and normalise the concurrency limit
//! 2. Connect to the source and every target; any failure aborts the run
//! 3. Page through source names; a slot is acquired before each unit is spawned
//! 4. Wait for all units, then surface the first recorded error

use super::aggregator::FirstError;
use super::deadline::Deadline;
use super::filter::NameFilter;
use super::policy::should_propagate;
use super::reporter::{Notice, Reporter};
use super::versions::{oldest_first, VersionCursor, VersionMode, VersionOrder};
use crate::config::ReplicationJob;
use crate::error::{secret_ref, ReplicationError};
use crate::observability::metrics;
use crate::store::{SecretStore, StoreConnector, VersionRef};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::{Id, JoinError, JoinSet};
use tracing::{debug, info, info_span, Instrument};

/// Runs one [`ReplicationJob`] to completion
pub struct Replicator {
    job: ReplicationJob,
    connector: Arc<dyn StoreConnector>,
    reporter: Arc<dyn Reporter>,
}

impl std::fmt::Debug for Replicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Replicator")
            .field("job", &self.job)
            .field("connector", &self.connector)
            .finish_non_exhaustive()
    }
}

/// State shared read-only by every unit, apart from the error slot
struct UnitContext {
    source: Arc<dyn SecretStore>,
    targets: Vec<Arc<dyn SecretStore>>,
    mode: VersionMode,
    order: VersionOrder,
    dry_run: bool,
    override_disabled: bool,
    deadline: Deadline,
    errors: Arc<FirstError>,
    reporter: Arc<dyn Reporter>,
}

impl Replicator {
    pub fn new(
        job: ReplicationJob,
        connector: Arc<dyn StoreConnector>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            job,
            connector,
            reporter,
        }
    }

    /// Run the job, returning the first error any step recorded
    ///
    /// # Errors
    /// Configuration and connection errors abort before listing. Every other
    /// error is recorded while the rest of the job runs on; the first one
    /// recorded is returned once all units have finished.
    pub async fn run(self) -> Result<(), ReplicationError> {
        let Self {
            job,
            connector,
            reporter,
        } = self;
        let job = job.validated()?;
        let concurrency = job.effective_concurrency();
        let deadline = Deadline::after(job.timeout);
        let start = Instant::now();

        let span = info_span!(
            "replication.run",
            source = %job.source,
            targets = job.targets.len(),
            concurrency,
            dry_run = job.dry_run
        );

        let result = async {
            let source = connect(connector.as_ref(), &job.source, &deadline).await?;
            let mut targets = Vec::with_capacity(job.targets.len());
            for target in &job.targets {
                targets.push(connect(connector.as_ref(), target, &deadline).await?);
            }

            info!(
                mode = ?job.mode,
                order = %job.order,
                "Starting replication"
            );

            let errors = Arc::new(FirstError::new());
            let context = Arc::new(UnitContext {
                source,
                targets,
                mode: job.mode,
                order: job.order,
                dry_run: job.dry_run,
                override_disabled: job.override_disabled,
                deadline,
                errors: Arc::clone(&errors),
                reporter,
            });
            let filter = NameFilter::new(&job.include, &job.exclude);

            dispatch(&context, &filter, concurrency).await;

            if errors.suppressed() > 0 {
                debug!(suppressed = errors.suppressed(), "Dropped errors after the first");
            }
            errors.take().map_or(Ok(()), Err)
        }
        .instrument(span)
        .await;

        metrics::observe_run_duration(start.elapsed().as_secs_f64());
        match &result {
            Ok(()) => info!("Replication completed"),
            Err(e) => info!(error = %e, "Replication completed with errors"),
        }
        result
    }
}

async fn connect(
    connector: &dyn StoreConnector,
    identity: &str,
    deadline: &Deadline,
) -> Result<Arc<dyn SecretStore>, ReplicationError> {
    match deadline.bound(connector.connect(identity)).await {
        Ok(Ok(store)) => Ok(store),
        Ok(Err(source)) => Err(ReplicationError::Connection {
            vault: identity.to_string(),
            source,
        }),
        Err(_) => Err(ReplicationError::Deadline {
            operation: format!("connect to {identity}"),
        }),
    }
}

/// Page through source names and spawn a unit per accepted name
async fn dispatch(context: &Arc<UnitContext>, filter: &NameFilter, concurrency: usize) {
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut units: JoinSet<()> = JoinSet::new();
    let mut unit_names: HashMap<Id, String> = HashMap::new();
    let errors = &context.errors;
    let source = &context.source;
    let mut next = None;

    'listing: loop {
        let page = match context.deadline.bound(source.list_secret_names(next)).await {
            Ok(Ok(page)) => page,
            Ok(Err(e)) => {
                errors.record(ReplicationError::ListSecrets {
                    vault: source.identity().to_string(),
                    source: e,
                });
                break;
            }
            Err(_) => {
                errors.record(ReplicationError::Deadline {
                    operation: format!("list secrets in {}", source.identity()),
                });
                break;
            }
        };

        for item in page.items {
            let name = match item {
                Ok(name) => name,
                Err(e) => {
                    errors.record(ReplicationError::Parse { source: e });
                    continue;
                }
            };
            metrics::increment_secrets_listed();

            if !filter.allows(&name) {
                metrics::increment_secrets_filtered();
                debug!(secret_name = %name, "Filtered out");
                continue;
            }

            let permit = match context
                .deadline
                .bound(Arc::clone(&semaphore).acquire_owned())
                .await
            {
                Ok(Ok(permit)) => permit,
                Ok(Err(e)) => {
                    errors.record(ReplicationError::Unit {
                        name,
                        message: e.to_string(),
                    });
                    break 'listing;
                }
                Err(_) => {
                    errors.record(ReplicationError::Deadline {
                        operation: format!("dispatch {name}"),
                    });
                    break 'listing;
                }
            };

            while let Some(finished) = units.try_join_next_with_id() {
                reap(finished, &mut unit_names, errors);
            }

            let unit = Arc::clone(context);
            let unit_name = name.clone();
            let handle = units.spawn(async move {
                let _permit = permit;
                unit.replicate(&unit_name).await;
            });
            unit_names.insert(handle.id(), name);
            metrics::increment_units_dispatched();
        }

        match page.next {
            Some(token) => next = Some(token),
            None => break,
        }
    }

    while let Some(finished) = units.join_next_with_id().await {
        reap(finished, &mut unit_names, errors);
    }
}

fn reap(
    finished: Result<(Id, ()), JoinError>,
    unit_names: &mut HashMap<Id, String>,
    errors: &FirstError,
) {
    match finished {
        Ok((id, ())) => {
            unit_names.remove(&id);
        }
        Err(e) => {
            let name = unit_names.remove(&e.id()).unwrap_or_default();
            errors.record(ReplicationError::Unit {
                name,
                message: e.to_string(),
            });
        }
    }
}

impl UnitContext {
    async fn replicate(&self, name: &str) {
        let span = info_span!("replication.unit", secret_name = name);
        async {
            match self.mode {
                VersionMode::Latest => self.replicate_version(name, None).await,
                VersionMode::AllVersions => self.replicate_all_versions(name).await,
            }
        }
        .instrument(span)
        .await;
    }

    /// Next page of `name`'s versions, recording any failure
    async fn next_versions(
        &self,
        cursor: &mut VersionCursor,
        name: &str,
    ) -> Option<Vec<VersionRef>> {
        let items = match self
            .deadline
            .bound(cursor.next_page(self.source.as_ref()))
            .await
        {
            Ok(Ok(items)) => items?,
            Ok(Err(e)) => {
                self.errors.record(ReplicationError::ListVersions {
                    name: name.to_string(),
                    source: e,
                });
                return None;
            }
            Err(_) => {
                self.errors.record(ReplicationError::Deadline {
                    operation: format!("list versions {name}"),
                });
                return None;
            }
        };

        Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Ok(version) => Some(version),
                    Err(e) => {
                        self.errors.record(ReplicationError::Parse { source: e });
                        None
                    }
                })
                .collect(),
        )
    }

    async fn replicate_all_versions(&self, name: &str) {
        let mut cursor = VersionCursor::new(name);
        match self.order {
            VersionOrder::Listing => {
                while let Some(versions) = self.next_versions(&mut cursor, name).await {
                    for version in versions {
                        self.replicate_version(name, Some(&version.version)).await;
                    }
                }
            }
            VersionOrder::OldestFirst => {
                let mut history = Vec::new();
                while let Some(versions) = self.next_versions(&mut cursor, name).await {
                    history.extend(versions);
                }
                for version in oldest_first(history) {
                    self.replicate_version(name, Some(&version.version)).await;
                }
            }
        }
    }

    /// Fetch one version (or the current one) and write it to every target
    async fn replicate_version(&self, name: &str, version: Option<&str>) {
        let wanted = version.map(str::to_string);

        let record = match self.deadline.bound(self.source.get_secret(name, version)).await {
            Ok(Ok(record)) => record,
            Ok(Err(e)) if e.is_disabled() && !self.override_disabled => {
                self.reporter.notice(&Notice::SkippedDisabled {
                    name: name.to_string(),
                    version: wanted,
                });
                return;
            }
            Ok(Err(e)) => {
                self.errors.record(ReplicationError::Fetch {
                    name: name.to_string(),
                    version: wanted,
                    source: e,
                });
                return;
            }
            Err(_) => {
                self.errors.record(ReplicationError::Deadline {
                    operation: format!("get {}", secret_ref(name, &wanted)),
                });
                return;
            }
        };

        // Notices name the version as requested, so the current one reads as
        // the bare name
        if !should_propagate(&record, self.override_disabled) {
            self.reporter.notice(&Notice::SkippedDisabled {
                name: name.to_string(),
                version: wanted,
            });
            return;
        }

        for target in &self.targets {
            let target_name = target.identity().to_string();
            if self.dry_run {
                self.reporter.notice(&Notice::DryRun {
                    name: name.to_string(),
                    version: wanted.clone(),
                    target: target_name,
                });
                continue;
            }

            match self.deadline.bound(target.set_secret(&record)).await {
                Ok(Ok(())) => self.reporter.notice(&Notice::Copied {
                    name: name.to_string(),
                    version: wanted.clone(),
                    target: target_name,
                }),
                Ok(Err(e)) => self.errors.record(ReplicationError::Write {
                    name: name.to_string(),
                    version: wanted.clone(),
                    target: target_name,
                    source: e,
                }),
                Err(_) => self.errors.record(ReplicationError::Deadline {
                    operation: format!(
                        "set {} in {target_name}",
                        secret_ref(name, &wanted)
                    ),
                }),
            }
        }
    }
}
