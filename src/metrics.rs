//! Run summary collected by the orchestrator.

use loadtest_populate_amqp::{BatchWorkerReport, PublisherStats};
use std::time::Duration;

/// A worker that did not finish its share of the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerFailure {
    pub worker_id: usize,
    pub error: String,
}

impl WorkerFailure {
    pub fn new(worker_id: usize, error: impl Into<String>) -> Self {
        Self {
            worker_id,
            error: error.into(),
        }
    }
}

/// Outcome of a load generation run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Sum of generator quotas. Lower than the requested total when the
    /// quota policy drops a remainder.
    pub events_planned: u64,
    /// Events generated across every generator.
    pub events_generated: u64,
    /// Events acknowledged by the broker.
    pub events_published: u64,
    pub batches_published: u64,
    /// Size of every published batch, grouped by worker in worker order.
    pub batch_sizes: Vec<usize>,
    /// Publisher counters of the workers that finished.
    pub publisher_stats: PublisherStats,
    pub generator_failures: Vec<WorkerFailure>,
    pub publisher_failures: Vec<WorkerFailure>,
    /// Wall time from start to the last worker finishing.
    pub elapsed: Duration,
}

impl RunSummary {
    /// Fold a finished publish worker into the summary.
    pub fn record_publisher(&mut self, report: &BatchWorkerReport) {
        self.events_published += report.events_published;
        self.batches_published += report.batches_published;
        self.batch_sizes.extend_from_slice(&report.batch_sizes);
        self.publisher_stats.merge(&report.publisher_stats);
    }

    /// True when no generator or publish worker failed.
    pub fn is_success(&self) -> bool {
        self.generator_failures.is_empty() && self.publisher_failures.is_empty()
    }

    /// Published events per second of wall time.
    pub fn events_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.events_published as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Get a summary of the run.
    pub fn summary(&self) -> String {
        format!(
            "Run completed in {:?}\n\
             Generated: {} of {} planned events\n\
             Published: {} events in {} batches ({:.2} events/sec)\n\
             Publish attempts: {} ({} failed, {} reconnects)\n\
             Failures: {} generators, {} publish workers",
            self.elapsed,
            self.events_generated,
            self.events_planned,
            self.events_published,
            self.batches_published,
            self.events_per_second(),
            self.publisher_stats.publish_attempts,
            self.publisher_stats.publish_failures,
            self.publisher_stats.reconnects,
            self.generator_failures.len(),
            self.publisher_failures.len(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_per_second() {
        let summary = RunSummary {
            events_published: 1000,
            elapsed: Duration::from_secs(10),
            ..Default::default()
        };

        assert_eq!(summary.events_per_second(), 100.0);
    }

    #[test]
    fn test_events_per_second_zero_elapsed() {
        let summary = RunSummary {
            events_published: 1000,
            ..Default::default()
        };

        assert_eq!(summary.events_per_second(), 0.0);
    }

    #[test]
    fn test_record_publisher_accumulates() {
        let mut summary = RunSummary::default();
        let report = BatchWorkerReport {
            worker_id: 0,
            batches_published: 2,
            events_published: 15,
            batch_sizes: vec![10, 5],
            publisher_stats: PublisherStats {
                publish_attempts: 3,
                publish_failures: 1,
                messages_published: 2,
                reconnects: 1,
            },
            duration: Duration::from_millis(5),
        };

        summary.record_publisher(&report);
        summary.record_publisher(&report);

        assert_eq!(summary.events_published, 30);
        assert_eq!(summary.batches_published, 4);
        assert_eq!(summary.batch_sizes, vec![10, 5, 10, 5]);
        assert_eq!(summary.publisher_stats.publish_attempts, 6);
        assert_eq!(summary.publisher_stats.reconnects, 2);
    }

    #[test]
    fn test_any_failure_is_not_success() {
        let mut summary = RunSummary::default();
        assert!(summary.is_success());

        summary
            .publisher_failures
            .push(WorkerFailure::new(1, "publish exhausted"));
        assert!(!summary.is_success());

        let summary = RunSummary {
            generator_failures: vec![WorkerFailure::new(0, "queue closed")],
            ..Default::default()
        };
        assert!(!summary.is_success());
    }

    #[test]
    fn test_summary_mentions_counts() {
        let summary = RunSummary {
            events_planned: 100,
            events_generated: 100,
            events_published: 100,
            batches_published: 4,
            ..Default::default()
        };

        let text = summary.summary();
        assert!(text.contains("Generated: 100 of 100 planned events"));
        assert!(text.contains("Published: 100 events in 4 batches"));
    }
}
