//! Progress notices emitted by the engine.

use crate::error::secret_ref;
use crate::observability::metrics;
use std::fmt;
use tracing::{debug, info};

/// Something worth telling the operator; never feeds back into control flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A write that dry-run mode suppressed
    DryRun {
        name: String,
        version: Option<String>,
        target: String,
    },
    Copied {
        name: String,
        version: Option<String>,
        target: String,
    },
    /// Disabled at the source and not propagated
    SkippedDisabled {
        name: String,
        version: Option<String>,
    },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DryRun {
                name,
                version,
                target,
            } => write!(f, "would copy `{}` to `{target}`", secret_ref(name, version)),
            Self::Copied {
                name,
                version,
                target,
            } => write!(f, "copied `{}` to `{target}`", secret_ref(name, version)),
            Self::SkippedDisabled { name, version } => {
                write!(f, "skipped disabled `{}`", secret_ref(name, version))
            }
        }
    }
}

/// Sink for [`Notice`]s
pub trait Reporter: Send + Sync {
    fn notice(&self, notice: &Notice);
}

/// Logs notices through `tracing` and counts them
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn notice(&self, notice: &Notice) {
        match notice {
            Notice::DryRun { .. } => {
                metrics::increment_dry_run_writes();
                info!("DRY-RUN {notice}");
            }
            Notice::Copied { name, target, .. } => {
                metrics::increment_records_copied();
                info!(secret_name = %name, vault_name = %target, "{notice}");
            }
            Notice::SkippedDisabled { name, .. } => {
                metrics::increment_records_skipped_disabled();
                debug!(secret_name = %name, "{notice}");
            }
        }
    }
}
