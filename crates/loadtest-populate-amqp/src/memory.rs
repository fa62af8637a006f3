//! In-process broker used by `--dry-run` and by tests.
//!
//! Every handle shares one [`InMemoryBroker`] state, so a test can script
//! failures and then inspect what reached the "broker".

use crate::broker::{BrokerChannel, BrokerConnection, BrokerConnector, OutboundMessage};
use crate::error::BrokerError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicI64, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Sentinel failure budget meaning "fail every call".
const ALWAYS: u32 = u32::MAX;

/// A message accepted by the in-memory broker.
#[derive(Debug, Clone)]
pub struct PublishedMessage {
    pub exchange: String,
    pub routing_key: String,
    pub content_type: String,
    pub persistent: bool,
    pub body: Vec<u8>,
}

impl PublishedMessage {
    /// Decode the JSON body.
    pub fn decode<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }
}

#[derive(Debug, Default)]
struct BrokerState {
    record_payloads: bool,
    messages: Mutex<Vec<PublishedMessage>>,
    messages_accepted: AtomicU64,
    bytes_accepted: AtomicU64,
    connect_attempts: AtomicU32,
    publish_attempts: AtomicU32,
    open_connections: AtomicI64,
    open_channels: AtomicI64,
    failing_connects: AtomicU32,
    failing_channels: AtomicU32,
    failing_publishes: AtomicU32,
}

/// Consume one unit of a failure budget. Returns true if the call should fail.
fn take_failure(budget: &AtomicU32) -> bool {
    budget
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| match remaining {
            0 => None,
            ALWAYS => Some(ALWAYS),
            n => Some(n - 1),
        })
        .is_ok()
}

/// A broker that lives in process memory.
#[derive(Debug, Clone)]
pub struct InMemoryBroker {
    state: Arc<BrokerState>,
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBroker {
    /// A broker that keeps every published message for inspection.
    pub fn new() -> Self {
        Self {
            state: Arc::new(BrokerState {
                record_payloads: true,
                ..Default::default()
            }),
        }
    }

    /// A broker that only counts messages and bytes. Used for dry runs.
    pub fn discarding() -> Self {
        Self {
            state: Arc::new(BrokerState::default()),
        }
    }

    /// Fail the next `n` connection attempts.
    pub fn fail_next_connects(&self, n: u32) {
        self.state.failing_connects.store(n, Ordering::SeqCst);
    }

    pub fn fail_all_connects(&self) {
        self.fail_next_connects(ALWAYS);
    }

    /// Fail the next `n` channel opens.
    pub fn fail_next_channels(&self, n: u32) {
        self.state.failing_channels.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` publishes.
    pub fn fail_next_publishes(&self, n: u32) {
        self.state.failing_publishes.store(n, Ordering::SeqCst);
    }

    pub fn fail_all_publishes(&self) {
        self.fail_next_publishes(ALWAYS);
    }

    /// Messages kept so far (empty for a discarding broker).
    pub fn published(&self) -> Vec<PublishedMessage> {
        self.state
            .messages
            .lock()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }

    pub fn messages_accepted(&self) -> u64 {
        self.state.messages_accepted.load(Ordering::SeqCst)
    }

    pub fn bytes_accepted(&self) -> u64 {
        self.state.bytes_accepted.load(Ordering::SeqCst)
    }

    pub fn connect_attempts(&self) -> u32 {
        self.state.connect_attempts.load(Ordering::SeqCst)
    }

    pub fn publish_attempts(&self) -> u32 {
        self.state.publish_attempts.load(Ordering::SeqCst)
    }

    pub fn open_connections(&self) -> i64 {
        self.state.open_connections.load(Ordering::SeqCst)
    }

    pub fn open_channels(&self) -> i64 {
        self.state.open_channels.load(Ordering::SeqCst)
    }
}

pub struct InMemoryConnection {
    state: Arc<BrokerState>,
}

pub struct InMemoryChannel {
    state: Arc<BrokerState>,
}

#[async_trait]
impl BrokerConnector for InMemoryBroker {
    type Connection = InMemoryConnection;

    async fn connect(&self, uri: &str) -> Result<InMemoryConnection, BrokerError> {
        self.state.connect_attempts.fetch_add(1, Ordering::SeqCst);
        if take_failure(&self.state.failing_connects) {
            return Err(BrokerError::Rejected(format!(
                "connection to {} refused",
                crate::broker::redact_uri(uri)
            )));
        }

        self.state.open_connections.fetch_add(1, Ordering::SeqCst);
        Ok(InMemoryConnection {
            state: Arc::clone(&self.state),
        })
    }
}

#[async_trait]
impl BrokerConnection for InMemoryConnection {
    type Channel = InMemoryChannel;

    async fn open_channel(&mut self) -> Result<InMemoryChannel, BrokerError> {
        if take_failure(&self.state.failing_channels) {
            return Err(BrokerError::Rejected("channel limit reached".to_string()));
        }

        self.state.open_channels.fetch_add(1, Ordering::SeqCst);
        Ok(InMemoryChannel {
            state: Arc::clone(&self.state),
        })
    }

    async fn close(self) -> Result<(), BrokerError> {
        self.state.open_connections.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl BrokerChannel for InMemoryChannel {
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        message: &OutboundMessage,
    ) -> Result<(), BrokerError> {
        self.state.publish_attempts.fetch_add(1, Ordering::SeqCst);
        if take_failure(&self.state.failing_publishes) {
            return Err(BrokerError::Rejected(format!(
                "exchange '{exchange}' unavailable"
            )));
        }

        self.state.messages_accepted.fetch_add(1, Ordering::SeqCst);
        self.state
            .bytes_accepted
            .fetch_add(message.body.len() as u64, Ordering::SeqCst);

        if self.state.record_payloads {
            let mut messages = self
                .state
                .messages
                .lock()
                .map_err(|_| BrokerError::Task("message log lock poisoned".to_string()))?;
            messages.push(PublishedMessage {
                exchange: exchange.to_string(),
                routing_key: routing_key.to_string(),
                content_type: message.content_type.clone(),
                persistent: message.persistent,
                body: message.body.to_vec(),
            });
        }

        Ok(())
    }

    async fn close(self) -> Result<(), BrokerError> {
        self.state.open_channels.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_budget() {
        let budget = AtomicU32::new(2);
        assert!(take_failure(&budget));
        assert!(take_failure(&budget));
        assert!(!take_failure(&budget));
        assert!(!take_failure(&budget));

        let always = AtomicU32::new(ALWAYS);
        for _ in 0..5 {
            assert!(take_failure(&always));
        }
    }

    #[tokio::test]
    async fn test_records_published_messages() {
        let broker = InMemoryBroker::new();
        let mut connection = broker.connect("memory://").await.unwrap();
        let channel = connection.open_channel().await.unwrap();

        channel
            .publish("actions", "key", &OutboundMessage::json(b"[1,2]".to_vec()))
            .await
            .unwrap();

        let published = broker.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].exchange, "actions");
        assert_eq!(published[0].routing_key, "key");
        assert_eq!(published[0].decode::<Vec<u8>>().unwrap(), vec![1, 2]);
        assert_eq!(broker.bytes_accepted(), 5);

        channel.close().await.unwrap();
        connection.close().await.unwrap();
        assert_eq!(broker.open_channels(), 0);
        assert_eq!(broker.open_connections(), 0);
    }

    #[tokio::test]
    async fn test_discarding_broker_only_counts() {
        let broker = InMemoryBroker::discarding();
        let mut connection = broker.connect("memory://").await.unwrap();
        let channel = connection.open_channel().await.unwrap();

        for _ in 0..3 {
            channel
                .publish("actions", "key", &OutboundMessage::json(b"[]".to_vec()))
                .await
                .unwrap();
        }

        assert!(broker.published().is_empty());
        assert_eq!(broker.messages_accepted(), 3);
    }

    #[tokio::test]
    async fn test_scripted_connect_failures() {
        let broker = InMemoryBroker::new();
        broker.fail_next_connects(1);

        assert!(broker.connect("memory://").await.is_err());
        assert!(broker.connect("memory://").await.is_ok());
        assert_eq!(broker.connect_attempts(), 2);
    }
}
