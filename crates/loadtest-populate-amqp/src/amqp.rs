//! RabbitMQ broker access through `amiquip`.
//!
//! amiquip is a blocking client, so every call is moved onto tokio's
//! blocking pool. Handles are wrapped in `Arc<Mutex<_>>` so they can be
//! lent to the blocking closures.

use crate::broker::{BrokerChannel, BrokerConnection, BrokerConnector, OutboundMessage};
use crate::error::BrokerError;
use amiquip::{AmqpProperties, Channel, Connection, Publish};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

const DELIVERY_MODE_TRANSIENT: u8 = 1;
const DELIVERY_MODE_PERSISTENT: u8 = 2;

/// Connector for `amqp://` and `amqps://` URIs.
#[derive(Debug, Clone, Copy, Default)]
pub struct AmqpConnector;

pub struct AmqpConnection {
    inner: Arc<Mutex<Connection>>,
}

pub struct AmqpChannel {
    inner: Arc<Mutex<Channel>>,
}

/// Run a blocking amiquip call off the async runtime.
///
/// A panic inside the call is reported as [`BrokerError::Task`].
async fn blocking<T, F>(f: F) -> Result<T, BrokerError>
where
    F: FnOnce() -> Result<T, BrokerError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| BrokerError::Task(e.to_string()))?
}

fn lock<T>(handle: &Mutex<T>) -> Result<std::sync::MutexGuard<'_, T>, BrokerError> {
    handle
        .lock()
        .map_err(|_| BrokerError::Task("broker handle lock poisoned".to_string()))
}

fn into_owned<T>(handle: Arc<Mutex<T>>) -> Result<T, BrokerError> {
    Arc::try_unwrap(handle)
        .map_err(|_| BrokerError::Task("broker handle is still shared".to_string()))?
        .into_inner()
        .map_err(|_| BrokerError::Task("broker handle lock poisoned".to_string()))
}

#[async_trait]
impl BrokerConnector for AmqpConnector {
    type Connection = AmqpConnection;

    async fn connect(&self, uri: &str) -> Result<AmqpConnection, BrokerError> {
        let uri = uri.to_string();
        let connection = blocking(move || {
            let connection = if uri.starts_with("amqps://") {
                Connection::open(&uri)?
            } else {
                Connection::insecure_open(&uri)?
            };
            Ok(connection)
        })
        .await?;

        Ok(AmqpConnection {
            inner: Arc::new(Mutex::new(connection)),
        })
    }
}

#[async_trait]
impl BrokerConnection for AmqpConnection {
    type Channel = AmqpChannel;

    async fn open_channel(&mut self) -> Result<AmqpChannel, BrokerError> {
        let inner = Arc::clone(&self.inner);
        let channel = blocking(move || {
            let mut connection = lock(&inner)?;
            let channel = connection.open_channel(None)?;
            Ok(channel)
        })
        .await?;

        Ok(AmqpChannel {
            inner: Arc::new(Mutex::new(channel)),
        })
    }

    async fn close(self) -> Result<(), BrokerError> {
        let connection = into_owned(self.inner)?;
        blocking(move || Ok(connection.close()?)).await
    }
}

#[async_trait]
impl BrokerChannel for AmqpChannel {
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        message: &OutboundMessage,
    ) -> Result<(), BrokerError> {
        let inner = Arc::clone(&self.inner);
        let exchange = exchange.to_string();
        let routing_key = routing_key.to_string();
        let message = message.clone();

        blocking(move || {
            let delivery_mode = if message.persistent {
                DELIVERY_MODE_PERSISTENT
            } else {
                DELIVERY_MODE_TRANSIENT
            };
            let properties = AmqpProperties::default()
                .with_content_type(message.content_type.clone())
                .with_delivery_mode(delivery_mode);

            lock(&inner)?.basic_publish(
                exchange,
                Publish::with_properties(&message.body, routing_key, properties),
            )?;
            Ok(())
        })
        .await
    }

    async fn close(self) -> Result<(), BrokerError> {
        let channel = into_owned(self.inner)?;
        blocking(move || Ok(channel.close()?)).await
    }
}
