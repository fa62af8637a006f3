//! Error types for the AMQP populator.

use thiserror::Error;

/// Errors reported by a broker connection or channel.
#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("AMQP error: {0}")]
    Amqp(String),

    #[error("Channel is not open")]
    NotConnected,

    #[error("Broker task failed: {0}")]
    Task(String),

    #[error("Broker rejected the request: {0}")]
    Rejected(String),
}

impl From<amiquip::Error> for BrokerError {
    fn from(err: amiquip::Error) -> Self {
        BrokerError::Amqp(err.to_string())
    }
}

/// Errors surfaced by a [`crate::Publisher`].
///
/// Individual publish failures are retried inside the publisher; only
/// exhaustion reaches the caller.
#[derive(Error, Debug)]
pub enum PublisherError {
    #[error("Failed to connect to broker at {uri}: {source}")]
    Connection { uri: String, source: BrokerError },

    #[error("Failed to open channel on {uri}: {source}")]
    Channel { uri: String, source: BrokerError },

    #[error("Failed to encode payload as JSON: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error(
        "Publish to exchange '{exchange}' (routing key '{routing_key}') failed after {attempts} attempts, last error: {source}"
    )]
    PublishExhausted {
        exchange: String,
        routing_key: String,
        attempts: u32,
        source: BrokerError,
    },

    #[error("Reconnect failed after {attempts} attempts, last error: {source}")]
    ReconnectExhausted {
        attempts: u32,
        source: Box<PublisherError>,
    },
}

/// A batch publisher worker stopped because its publisher gave up.
#[derive(Error, Debug)]
#[error(
    "Publish worker {worker_id} failed to flush {batch_len} events to exchange '{exchange}' (routing key '{routing_key}'): {source}"
)]
pub struct BatchWorkerError {
    pub worker_id: usize,
    pub exchange: String,
    pub routing_key: String,
    pub batch_len: usize,
    pub source: PublisherError,
}
