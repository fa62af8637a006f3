//! Error types for pipeline orchestration.

use loadtest_generator::QuotaError;
use loadtest_populate_amqp::PublisherError;
use thiserror::Error;

/// Errors that stop a run before any event is generated.
///
/// Failures of individual workers once the run is underway are not errors;
/// they are collected into the [`RunSummary`](crate::RunSummary).
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    InvalidConfig(String),

    /// Quota partitioning error.
    #[error("Quota error: {0}")]
    Quota(#[from] QuotaError),

    /// A publisher could not open its connection and channel.
    #[error("Failed to initialize publisher {worker_id}: {source}")]
    PublisherInit {
        worker_id: usize,
        #[source]
        source: PublisherError,
    },
}
