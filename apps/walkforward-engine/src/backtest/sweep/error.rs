//! Error types for parameter sweeps.

use thiserror::Error;

/// Errors from parameter sweeps.
///
/// Failures of individual runs are not errors here; they are reported in
/// the job's result so the rest of the sweep still completes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SweepError {
    /// Thread pool initialization failed.
    #[error("Failed to initialize thread pool: {message}")]
    ThreadPoolError {
        /// Error message.
        message: String,
    },

    /// A parameter axis or job list is invalid.
    #[error("Invalid sweep parameters: {message}")]
    InvalidParameters {
        /// Error message.
        message: String,
    },

    /// No jobs to execute.
    #[error("No sweep jobs provided")]
    NoJobs,
}
