//! # Configuration
//!
//! - `replicator`: process settings from environment variables
//! - `job`: the resolved job handed to the replication engine

pub mod job;
pub mod replicator;

pub use job::ReplicationJob;
pub use replicator::{split_list, ReplicatorConfig};

/// Load `.env` from the working directory into the process environment
///
/// Variables already set in the environment win. Returns the loaded path.
pub fn load_dotenv() -> Option<std::path::PathBuf> {
    dotenvy::dotenv().ok()
}
