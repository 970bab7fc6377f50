//! Configuration for parallel sweep execution.

use serde::{Deserialize, Serialize};

/// Configuration for parallel sweep execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Maximum number of threads to use (0 = rayon's global pool).
    pub max_threads: usize,

    /// Jobs below this count run sequentially.
    pub min_parallel_jobs: usize,

    /// Whether to log progress after each job.
    pub track_progress: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            max_threads: 0,
            min_parallel_jobs: 4,
            track_progress: true,
        }
    }
}
