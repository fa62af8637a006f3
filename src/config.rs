//! Run configuration.

use crate::error::PipelineError;
use loadtest_generator::{QuotaPolicy, DEFAULT_PROGRESS_INTERVAL};
use loadtest_populate_amqp::{AmqpPopulateArgs, PublishTarget, RetryPolicy};

/// Configuration for one load generation run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Total number of events to generate.
    pub total_events: u64,
    /// Number of generator tasks.
    pub generate_workers: usize,
    /// Number of publish workers, each with its own publisher.
    pub publish_workers: usize,
    /// Events per published message.
    pub batch_size: usize,
    /// Capacity of the shared event queue.
    pub queue_capacity: usize,
    pub quota_policy: QuotaPolicy,
    /// Base seed; generator `i` uses `seed + i`. Entropy when unset.
    pub seed: Option<u64>,
    /// Log progress every this many generated events; zero disables it.
    pub progress_interval: u64,
    pub broker_uri: String,
    pub target: PublishTarget,
    pub retry: RetryPolicy,
    /// Stop generation after the first publish worker failure.
    pub fail_fast: bool,
}

impl PipelineConfig {
    /// Create a configuration with default worker counts and limits.
    pub fn new(broker_uri: impl Into<String>, total_events: u64) -> Self {
        Self {
            total_events,
            generate_workers: 2,
            publish_workers: 2,
            batch_size: 10_000,
            queue_capacity: 100,
            quota_policy: QuotaPolicy::default(),
            seed: None,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            broker_uri: broker_uri.into(),
            target: PublishTarget::new("actions", "actions"),
            retry: RetryPolicy::default(),
            fail_fast: false,
        }
    }

    /// Build a configuration from parsed command-line arguments.
    pub fn from_args(args: &AmqpPopulateArgs) -> Self {
        Self {
            total_events: args.common.event_limit,
            generate_workers: args.common.generate_workers,
            publish_workers: args.publish_workers,
            batch_size: args.common.batch_size,
            queue_capacity: args.common.queue_capacity,
            quota_policy: args.common.quota_policy.into(),
            seed: args.common.seed,
            progress_interval: args.common.progress_interval,
            broker_uri: args.amqp_uri.clone(),
            target: PublishTarget::new(&args.exchange, &args.routing_key),
            retry: args.retry_policy(),
            fail_fast: args.common.fail_fast,
        }
    }

    pub fn with_workers(mut self, generate_workers: usize, publish_workers: usize) -> Self {
        self.generate_workers = generate_workers;
        self.publish_workers = publish_workers;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_quota_policy(mut self, policy: QuotaPolicy) -> Self {
        self.quota_policy = policy;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_target(mut self, target: PublishTarget) -> Self {
        self.target = target;
        self
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Check limits that must hold before any task is started.
    ///
    /// A zero generator count is left to quota partitioning, which reports
    /// it as [`PipelineError::Quota`].
    pub fn validate(&self) -> Result<(), PipelineError> {
        let checks = [
            (self.batch_size, "batch size"),
            (self.publish_workers, "publish worker count"),
            (self.queue_capacity, "queue capacity"),
            (self.retry.max_publish_attempts as usize, "max publish attempts"),
            (
                self.retry.max_reconnect_attempts as usize,
                "max reconnect attempts",
            ),
        ];

        for (value, name) in checks {
            if value == 0 {
                return Err(PipelineError::InvalidConfig(format!(
                    "{name} must be at least 1"
                )));
            }
        }

        Ok(())
    }
}
