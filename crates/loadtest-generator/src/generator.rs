//! Event generator worker.

use crate::counter::EventCounter;
use crate::event::Event;
use crate::profile::random_profile_id;
use async_channel::Sender;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Default number of generated events between progress log lines.
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 1_000_000;

/// Error type for generator operations.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    /// The shared queue was closed before the quota was reached
    #[error("Event queue closed under generator {worker_id} after {generated} events")]
    QueueClosed { worker_id: usize, generated: u64 },
}

/// Outcome of a generator run.
#[derive(Debug, Clone, Default)]
pub struct GeneratorReport {
    pub worker_id: usize,
    /// Number of events pushed onto the queue.
    pub generated: u64,
    /// Progress lines logged by this generator.
    pub milestones: u64,
    pub duration: Duration,
}

/// Seed for a generator worker derived from a base seed.
///
/// Each worker gets its own stream so workers never produce identical ids.
pub fn worker_seed(base_seed: u64, worker_id: usize) -> u64 {
    base_seed.wrapping_add(worker_id as u64)
}

/// Worker that synthesizes events until its quota is exhausted.
///
/// Events go onto the shared bounded queue. A full queue suspends the
/// generator, which is the only backpressure between generation and
/// publishing. The generator never closes the queue.
pub struct EventGenerator {
    worker_id: usize,
    quota: u64,
    rng: StdRng,
    counter: Arc<EventCounter>,
    progress_interval: u64,
}

impl EventGenerator {
    /// Create a generator seeded from OS entropy.
    pub fn new(worker_id: usize, quota: u64, counter: Arc<EventCounter>) -> Self {
        Self {
            worker_id,
            quota,
            rng: StdRng::from_entropy(),
            counter,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }

    /// Re-seed the generator for reproducible profile ids.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Set how often (in shared counter ticks) progress is logged. Zero disables it.
    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Build the next event stamped with the current time.
    pub fn next_event(&mut self) -> Event {
        let timestamp = chrono::Utc::now().timestamp();
        Event::new(timestamp, random_profile_id(&mut self.rng))
    }

    /// Produce exactly `quota` events onto `queue`.
    pub async fn run(mut self, queue: Sender<Event>) -> Result<GeneratorReport, GeneratorError> {
        let start_time = Instant::now();
        debug!(worker_id = self.worker_id, quota = self.quota, "Generator started");

        let mut generated = 0u64;
        let mut milestones = 0u64;
        while generated < self.quota {
            let event = self.next_event();

            if queue.send(event).await.is_err() {
                warn!(
                    worker_id = self.worker_id,
                    generated, "Event queue closed, generator stopping early"
                );
                return Err(GeneratorError::QueueClosed {
                    worker_id: self.worker_id,
                    generated,
                });
            }

            generated += 1;
            let total = self.counter.increment();
            if self.progress_interval > 0 && total % self.progress_interval == 0 {
                milestones += 1;
                info!("Generated {} events", total);
            }
        }

        let duration = start_time.elapsed();
        debug!(
            worker_id = self.worker_id,
            "Generator finished: {} events in {:?}", generated, duration
        );

        Ok(GeneratorReport {
            worker_id: self.worker_id,
            generated,
            milestones,
            duration,
        })
    }
}
