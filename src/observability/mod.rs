//! # Observability
//!
//! - `metrics`: Prometheus metrics collection and textfile output
//! - `logging`: tracing subscriber initialisation

pub mod logging;
pub mod metrics;

// Re-export for convenience
pub use logging::{init_logging, LogFormat};
