//! Load generation pipeline orchestration.
//!
//! A run wires N generators and M publish workers to one bounded queue:
//!
//! 1. Validate the configuration and partition the event total into quotas
//! 2. Open every publisher up front; any failure aborts before work starts
//! 3. Spawn the publish workers, then the generators
//! 4. Wait for the generators, close the queue, wait for the publish workers
//!
//! The orchestrator keeps only a sender. Once every publish worker is gone the
//! queue closes and blocked generators fail instead of waiting forever.

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::metrics::{RunSummary, WorkerFailure};
use loadtest_generator::{partition, worker_seed, Event, EventCounter, EventGenerator};
use loadtest_populate_amqp::{redact_uri, BatchPublishWorker, BrokerConnector, Publisher};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Run a complete load generation pass against `connector`.
///
/// Returns `Err` only when the run could not start. Worker failures once
/// the run is underway are reported in the returned [`RunSummary`].
pub async fn run_pipeline<C>(
    config: &PipelineConfig,
    connector: C,
) -> Result<RunSummary, PipelineError>
where
    C: BrokerConnector + Clone + 'static,
{
    config.validate()?;
    let start_time = Instant::now();

    let quotas = partition(
        config.total_events,
        config.generate_workers,
        config.quota_policy,
    )?;
    let planned: u64 = quotas.iter().sum();
    if planned < config.total_events {
        warn!(
            "Quota policy drops {} of {} events for {} generators",
            config.total_events - planned,
            config.total_events,
            config.generate_workers
        );
    }

    info!(
        "Starting load generation: {} events, {} generators, {} publish workers, batch size {}, exchange '{}'",
        planned,
        config.generate_workers,
        config.publish_workers,
        config.batch_size,
        config.target.exchange
    );

    let publishers = init_publishers(config, connector).await?;

    let (tx, rx) = async_channel::bounded::<Event>(config.queue_capacity);
    let counter = Arc::new(EventCounter::new());

    let publish_handles: Vec<_> = publishers
        .into_iter()
        .enumerate()
        .map(|(worker_id, publisher)| {
            let worker = BatchPublishWorker::new(
                worker_id,
                publisher,
                rx.clone(),
                config.target.clone(),
                config.batch_size,
            )
            .with_close_queue_on_failure(config.fail_fast);
            tokio::spawn(worker.run())
        })
        .collect();
    drop(rx);

    let generator_handles: Vec<_> = quotas
        .into_iter()
        .enumerate()
        .map(|(worker_id, quota)| {
            let mut generator = EventGenerator::new(worker_id, quota, Arc::clone(&counter))
                .with_progress_interval(config.progress_interval);
            if let Some(seed) = config.seed {
                generator = generator.with_seed(worker_seed(seed, worker_id));
            }
            tokio::spawn(generator.run(tx.clone()))
        })
        .collect();

    let mut summary = RunSummary {
        events_planned: planned,
        ..Default::default()
    };

    for (worker_id, handle) in generator_handles.into_iter().enumerate() {
        match handle.await {
            Ok(Ok(report)) => {
                debug!(
                    worker_id,
                    "Generator finished: {} events in {:?}", report.generated, report.duration
                );
            }
            Ok(Err(e)) => {
                warn!(worker_id, "Generator stopped early: {}", e);
                summary
                    .generator_failures
                    .push(WorkerFailure::new(worker_id, e.to_string()));
            }
            Err(e) => {
                error!(worker_id, "Generator task failed: {}", e);
                summary
                    .generator_failures
                    .push(WorkerFailure::new(worker_id, format!("task failed: {e}")));
            }
        }
    }

    // Publish workers drain what is left and flush their partial batches
    tx.close();

    for (worker_id, handle) in publish_handles.into_iter().enumerate() {
        match handle.await {
            Ok(Ok(report)) => summary.record_publisher(&report),
            Ok(Err(e)) => summary
                .publisher_failures
                .push(WorkerFailure::new(worker_id, e.to_string())),
            Err(e) => {
                error!(worker_id, "Publish worker task failed: {}", e);
                summary
                    .publisher_failures
                    .push(WorkerFailure::new(worker_id, format!("task failed: {e}")));
            }
        }
    }

    summary.events_generated = counter.snapshot();
    summary.elapsed = start_time.elapsed();

    info!(
        "Load generation finished: {} events generated, {} published in {} batches ({:.2} events/sec)",
        summary.events_generated,
        summary.events_published,
        summary.batches_published,
        summary.events_per_second()
    );

    Ok(summary)
}

/// Open one publisher per publish worker.
///
/// On failure every publisher opened so far is closed again.
async fn init_publishers<C>(
    config: &PipelineConfig,
    connector: C,
) -> Result<Vec<Publisher<C>>, PipelineError>
where
    C: BrokerConnector + Clone,
{
    let mut publishers: Vec<Publisher<C>> = Vec::with_capacity(config.publish_workers);

    for worker_id in 0..config.publish_workers {
        let mut publisher = Publisher::new(config.broker_uri.clone(), connector.clone())
            .with_retry_policy(config.retry);

        if let Err(source) = publisher.init_channel().await {
            error!(
                worker_id,
                "Failed to initialize publisher for {}: {}",
                redact_uri(&config.broker_uri),
                source
            );
            for mut opened in publishers {
                opened.close_channel().await;
            }
            return Err(PipelineError::PublisherInit { worker_id, source });
        }

        publishers.push(publisher);
    }

    debug!("Initialized {} publishers", publishers.len());
    Ok(publishers)
}
