//! Event generation for the event-loadgen broker load tester.
//!
//! This crate provides the producing half of the pipeline: the event record,
//! quota partitioning across generator workers, and the `EventGenerator`
//! worker that pushes events onto the shared bounded queue.
//!
//! # Architecture
//!
//! ```text
//!   partition(total, workers)
//!            │
//!            ▼
//! ┌───────────────────┐   ┌───────────────────┐
//! │ EventGenerator 0  │...│ EventGenerator N  │──► EventCounter (shared)
//! │  quota, rng       │   │  quota, rng       │
//! └─────────┬─────────┘   └─────────┬─────────┘
//!           │                       │
//!           ▼                       ▼
//!     async_channel::bounded::<Event>(capacity)
//! ```
//!
//! # Example
//!
//! ```rust
//! use loadtest_generator::{partition, EventCounter, EventGenerator, QuotaPolicy};
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let counter = Arc::new(EventCounter::new());
//! let quotas = partition(1000, 4, QuotaPolicy::RemainderToLast).unwrap();
//! let (tx, rx) = async_channel::bounded(100);
//!
//! for (worker_id, quota) in quotas.into_iter().enumerate() {
//!     let generator = EventGenerator::new(worker_id, quota, Arc::clone(&counter));
//!     tokio::spawn(generator.run(tx.clone()));
//! }
//! # drop(rx);
//! # }
//! ```

pub mod counter;
pub mod event;
pub mod generator;
pub mod profile;
pub mod quota;

// Re-exports for convenience
pub use counter::EventCounter;
pub use event::Event;
pub use generator::{
    worker_seed, EventGenerator, GeneratorError, GeneratorReport, DEFAULT_PROGRESS_INTERVAL,
};
pub use profile::{profile_id, random_profile_id, random_profile_key};
pub use quota::{partition, QuotaError, QuotaPolicy};
