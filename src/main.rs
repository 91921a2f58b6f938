//! # Secret Replicator
//!
//! Copies Azure Key Vault secrets from a source vault to one or more target vaults.
//!
//! ## Overview
//!
//! 1. **Configuration** - `.env`, then environment variables, then CLI flags
//! 2. **Authentication** - the first Azure credential that yields a Key Vault token
//! 3. **Replication** - list, filter, and copy secrets under a concurrency limit
//! 4. **Reporting** - a single error on failure, Prometheus textfile on request
//!
//! Exits 0 on success and 1 on any error.

use anyhow::{Context, Result};
use clap::Parser;
use secret_replicator::auth::{resolve_credential, CredentialSettings};
use secret_replicator::cli::Cli;
use secret_replicator::config::{load_dotenv, ReplicatorConfig};
use secret_replicator::error::ReplicationError;
use secret_replicator::observability::{init_logging, metrics};
use secret_replicator::replication::{Replicator, TracingReporter};
use secret_replicator::store::key_vault::KeyVaultConnector;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Replication errors already render their cause
            match e.downcast_ref::<ReplicationError>() {
                Some(e) => eprintln!("secret-replicator error: {e}"),
                None => eprintln!("secret-replicator error: {e:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let dotenv = load_dotenv();
    let cli = Cli::parse();
    let config = cli.merge(ReplicatorConfig::from_env());

    init_logging(config.log_level.as_deref(), config.log_format);
    if let Some(path) = dotenv {
        debug!(path = %path.display(), "Loaded .env file");
    }

    // Configure rustls crypto provider FIRST, before any other operations
    // Must be called before any TLS connections are made (including Azure clients)
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        // Already installed, which is fine
        debug!("Rustls crypto provider already installed");
    }

    metrics::register_metrics().context("Failed to register metrics")?;

    // Fail on a bad job before touching credentials
    let job = config.job().validated()?;
    info!(
        source = %job.source,
        targets = ?job.targets,
        dry_run = job.dry_run,
        "Starting secret-replicator {}",
        env!("CARGO_PKG_VERSION")
    );

    let credential = resolve_credential(&CredentialSettings::from_env())
        .await
        .context("Failed to resolve Azure credentials")?;
    let connector = KeyVaultConnector::new(credential).with_dns_suffix(config.dns_suffix.clone());

    let result = Replicator::new(job, Arc::new(connector), Arc::new(TracingReporter))
        .run()
        .await;

    if let Some(path) = &config.metrics_file {
        if let Err(e) = metrics::write_textfile(path) {
            warn!(error = %e, "Failed to write metrics file");
        }
    }

    result.map_err(Into::into)
}
