//! # Metrics
//!
//! Prometheus metrics for a replication run.
//!
//! ## Metrics Exposed
//!
//! - `secret_replicator_secrets_listed_total` - Secret names read from the source listing
//! - `secret_replicator_secrets_filtered_total` - Names rejected by the name filter
//! - `secret_replicator_units_dispatched_total` - Replication units started
//! - `secret_replicator_records_copied_total` - Records written to a target
//! - `secret_replicator_records_skipped_disabled_total` - Records not propagated because they are disabled
//! - `secret_replicator_dry_run_writes_total` - Writes suppressed by dry-run mode
//! - `secret_replicator_errors_total` - Recorded errors by kind
//! - `secret_replicator_store_operations_total` - Store calls by operation
//! - `secret_replicator_store_operation_errors_total` - Failed store calls by operation
//! - `secret_replicator_store_operation_duration_seconds` - Duration of store calls by operation
//! - `secret_replicator_run_duration_seconds` - Duration of the whole run
//!
//! The binary writes the registry in text exposition format to
//! `--metrics-file` at the end of a run, for node-exporter's textfile collector.

use anyhow::{Context, Result};
use prometheus::{Encoder, Histogram, HistogramVec, IntCounter, IntCounterVec, Registry, TextEncoder};
use std::path::Path;
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static SECRETS_LISTED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "secret_replicator_secrets_listed_total",
        "Total number of secret names read from the source listing",
    )
    .expect("Failed to create SECRETS_LISTED_TOTAL metric - this should never happen")
});

static SECRETS_FILTERED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "secret_replicator_secrets_filtered_total",
        "Total number of secret names rejected by the name filter",
    )
    .expect("Failed to create SECRETS_FILTERED_TOTAL metric - this should never happen")
});

static UNITS_DISPATCHED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "secret_replicator_units_dispatched_total",
        "Total number of replication units started",
    )
    .expect("Failed to create UNITS_DISPATCHED_TOTAL metric - this should never happen")
});

static RECORDS_COPIED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "secret_replicator_records_copied_total",
        "Total number of records written to a target vault",
    )
    .expect("Failed to create RECORDS_COPIED_TOTAL metric - this should never happen")
});

static RECORDS_SKIPPED_DISABLED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "secret_replicator_records_skipped_disabled_total",
        "Total number of records not propagated because they are disabled at the source",
    )
    .expect("Failed to create RECORDS_SKIPPED_DISABLED_TOTAL metric - this should never happen")
});

static DRY_RUN_WRITES_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "secret_replicator_dry_run_writes_total",
        "Total number of target writes suppressed by dry-run mode",
    )
    .expect("Failed to create DRY_RUN_WRITES_TOTAL metric - this should never happen")
});

static ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "secret_replicator_errors_total",
            "Total number of recorded replication errors by kind",
        ),
        &["kind"],
    )
    .expect("Failed to create ERRORS_TOTAL metric - this should never happen")
});

static STORE_OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "secret_replicator_store_operations_total",
            "Total number of successful secret store calls by operation",
        ),
        &["operation"],
    )
    .expect("Failed to create STORE_OPERATIONS_TOTAL metric - this should never happen")
});

static STORE_OPERATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "secret_replicator_store_operation_errors_total",
            "Total number of failed secret store calls by operation",
        ),
        &["operation"],
    )
    .expect("Failed to create STORE_OPERATION_ERRORS_TOTAL metric - this should never happen")
});

static STORE_OPERATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "secret_replicator_store_operation_duration_seconds",
            "Duration of secret store calls in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0]),
        &["operation"],
    )
    .expect("Failed to create STORE_OPERATION_DURATION metric - this should never happen")
});

static RUN_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "secret_replicator_run_duration_seconds",
            "Duration of a replication run in seconds",
        )
        .buckets(vec![1.0, 5.0, 15.0, 60.0, 300.0, 900.0, 3600.0]),
    )
    .expect("Failed to create RUN_DURATION metric - this should never happen")
});

/// Register all metrics with the registry
///
/// # Errors
/// Returns an error if a metric is already registered
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(SECRETS_LISTED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SECRETS_FILTERED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(UNITS_DISPATCHED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECORDS_COPIED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECORDS_SKIPPED_DISABLED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(DRY_RUN_WRITES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(STORE_OPERATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(STORE_OPERATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(STORE_OPERATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(RUN_DURATION.clone()))?;
    Ok(())
}

pub fn increment_secrets_listed() {
    SECRETS_LISTED_TOTAL.inc();
}

pub fn increment_secrets_filtered() {
    SECRETS_FILTERED_TOTAL.inc();
}

pub fn increment_units_dispatched() {
    UNITS_DISPATCHED_TOTAL.inc();
}

pub fn increment_records_copied() {
    RECORDS_COPIED_TOTAL.inc();
}

pub fn increment_records_skipped_disabled() {
    RECORDS_SKIPPED_DISABLED_TOTAL.inc();
}

pub fn increment_dry_run_writes() {
    DRY_RUN_WRITES_TOTAL.inc();
}

pub fn increment_replication_errors(kind: &str) {
    ERRORS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn record_store_operation(operation: &str, duration: f64) {
    STORE_OPERATIONS_TOTAL.with_label_values(&[operation]).inc();
    STORE_OPERATION_DURATION
        .with_label_values(&[operation])
        .observe(duration);
}

pub fn increment_store_operation_errors(operation: &str) {
    STORE_OPERATION_ERRORS_TOTAL
        .with_label_values(&[operation])
        .inc();
}

pub fn observe_run_duration(duration: f64) {
    RUN_DURATION.observe(duration);
}

/// Registry contents in the Prometheus text exposition format
///
/// # Errors
/// Returns an error if encoding fails
pub fn render_text() -> Result<String> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&REGISTRY.gather(), &mut buffer)
        .context("Failed to encode metrics")?;
    String::from_utf8(buffer).context("Metrics output is not UTF-8")
}

/// Write the registry to `path`, replacing it atomically
///
/// # Errors
/// Returns an error if the file cannot be written
pub fn write_textfile(path: &Path) -> Result<()> {
    let text = render_text()?;
    let tmp = path.with_extension("prom.tmp");
    std::fs::write(&tmp, text)
        .with_context(|| format!("Failed to write metrics to {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("Failed to move metrics file into {}", path.display()))?;
    Ok(())
}
