//! Batch publisher worker.
//!
//! Drains the shared event queue into batches and hands each full batch to
//! the worker's own [`Publisher`]. When the queue is closed the remaining
//! partial batch is flushed once.

use crate::broker::BrokerConnector;
use crate::error::BatchWorkerError;
use crate::publisher::{Publisher, PublisherStats};
use async_channel::Receiver;
use loadtest_generator::Event;
use std::time::{Duration, Instant};
use tracing::{debug, error};

/// Exchange and routing key every batch is published to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishTarget {
    pub exchange: String,
    pub routing_key: String,
}

impl PublishTarget {
    pub fn new(exchange: impl Into<String>, routing_key: impl Into<String>) -> Self {
        Self {
            exchange: exchange.into(),
            routing_key: routing_key.into(),
        }
    }
}

/// Outcome of a batch worker run.
#[derive(Debug, Clone, Default)]
pub struct BatchWorkerReport {
    pub worker_id: usize,
    pub batches_published: u64,
    pub events_published: u64,
    /// Size of each flushed batch, in flush order.
    pub batch_sizes: Vec<usize>,
    pub publisher_stats: PublisherStats,
    pub duration: Duration,
}

/// Worker that turns queued events into published batches.
pub struct BatchPublishWorker<C: BrokerConnector> {
    worker_id: usize,
    publisher: Publisher<C>,
    queue: Receiver<Event>,
    target: PublishTarget,
    batch_size: usize,
    close_queue_on_failure: bool,
}

impl<C: BrokerConnector> BatchPublishWorker<C> {
    pub fn new(
        worker_id: usize,
        publisher: Publisher<C>,
        queue: Receiver<Event>,
        target: PublishTarget,
        batch_size: usize,
    ) -> Self {
        Self {
            worker_id,
            publisher,
            queue,
            target,
            batch_size: batch_size.max(1),
            close_queue_on_failure: false,
        }
    }

    /// Close the shared queue if this worker fails, stopping every generator.
    pub fn with_close_queue_on_failure(mut self, close: bool) -> Self {
        self.close_queue_on_failure = close;
        self
    }

    /// Publish until the queue is closed and drained.
    ///
    /// The publisher is closed before returning, whatever the outcome.
    pub async fn run(mut self) -> Result<BatchWorkerReport, BatchWorkerError> {
        let start_time = Instant::now();
        let mut report = BatchWorkerReport {
            worker_id: self.worker_id,
            ..Default::default()
        };

        let result = self.drain(&mut report).await;

        self.publisher.close_channel().await;
        report.publisher_stats = self.publisher.stats();
        report.duration = start_time.elapsed();

        if let Err(e) = &result {
            error!(
                worker_id = self.worker_id,
                exchange = %self.target.exchange,
                batch_len = e.batch_len,
                "Publish worker stopped: {}",
                e
            );
            if self.close_queue_on_failure {
                self.queue.close();
            }
        } else {
            debug!(
                worker_id = self.worker_id,
                "Publish worker finished: {} events in {} batches ({:?})",
                report.events_published,
                report.batches_published,
                report.duration
            );
        }

        result.map(|()| report)
    }

    async fn drain(&mut self, report: &mut BatchWorkerReport) -> Result<(), BatchWorkerError> {
        let mut batch = Vec::with_capacity(self.batch_size);

        while let Ok(event) = self.queue.recv().await {
            batch.push(event);
            if batch.len() >= self.batch_size {
                self.flush(&mut batch, report).await?;
            }
        }

        if !batch.is_empty() {
            self.flush(&mut batch, report).await?;
        }

        Ok(())
    }

    async fn flush(
        &mut self,
        batch: &mut Vec<Event>,
        report: &mut BatchWorkerReport,
    ) -> Result<(), BatchWorkerError> {
        self.publisher
            .publish_message(
                &self.target.exchange,
                &self.target.routing_key,
                batch.as_slice(),
            )
            .await
            .map_err(|source| BatchWorkerError {
                worker_id: self.worker_id,
                exchange: self.target.exchange.clone(),
                routing_key: self.target.routing_key.clone(),
                batch_len: batch.len(),
                source,
            })?;

        report.batches_published += 1;
        report.events_published += batch.len() as u64;
        report.batch_sizes.push(batch.len());
        batch.clear();
        Ok(())
    }
}
