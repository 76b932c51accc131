// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Running totals across batch jobs and direct single-file operations.

use std::time::Duration;

use docwerk_core::{JobOutcome, elapsed_ms, mean_duration};
use serde::Serialize;

/// Live view of the scheduler's queues.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStatus {
    pub pending: usize,
    pub running: usize,
    pub active_batches: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingStats {
    pub total_processed: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// Percentage, 0-100.
    pub success_rate: f64,
    #[serde(with = "elapsed_ms")]
    pub average_processing_time: Duration,
    pub queue_status: QueueStatus,
}

/// Accumulates terminal job outcomes and single-file operation results.
#[derive(Debug, Default)]
pub(crate) struct StatsCollector {
    succeeded: u64,
    failed: u64,
    total_time: Duration,
}

impl StatsCollector {
    pub fn record(&mut self, outcome: &JobOutcome) {
        self.record_operation(outcome.is_success(), outcome.processing_time);
    }

    pub fn record_operation(&mut self, success: bool, elapsed: Duration) {
        if success {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.total_time += elapsed;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn snapshot(&self, queue_status: QueueStatus) -> ProcessingStats {
        let total = self.succeeded + self.failed;
        let success_rate = if total == 0 {
            0.0
        } else {
            self.succeeded as f64 * 100.0 / total as f64
        };
        ProcessingStats {
            total_processed: total,
            succeeded: self.succeeded,
            failed: self.failed,
            success_rate,
            average_processing_time: mean_duration(self.total_time, total),
            queue_status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docwerk_core::JobStatus;

    fn outcome(status: JobStatus, millis: u64) -> JobOutcome {
        JobOutcome {
            job_id: "j".into(),
            status,
            attempts: 1,
            processing_time: Duration::from_millis(millis),
            output: None,
            error: None,
        }
    }

    #[test]
    fn empty_stats_are_zero() {
        let stats = StatsCollector::default().snapshot(QueueStatus::default());
        assert_eq!(stats.total_processed, 0);
        assert_eq!(stats.success_rate, 0.0);
        assert_eq!(stats.average_processing_time, Duration::ZERO);
    }

    #[test]
    fn rates_and_averages() {
        let mut collector = StatsCollector::default();
        collector.record(&outcome(JobStatus::Completed, 10));
        collector.record(&outcome(JobStatus::Completed, 20));
        collector.record(&outcome(JobStatus::Failed, 30));
        collector.record(&outcome(JobStatus::Completed, 40));

        let stats = collector.snapshot(QueueStatus::default());
        assert_eq!(stats.total_processed, 4);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.success_rate, 75.0);
        assert_eq!(stats.average_processing_time, Duration::from_millis(25));

        collector.reset();
        assert_eq!(collector.snapshot(QueueStatus::default()).total_processed, 0);
    }

    #[test]
    fn operations_and_outcomes_share_counters() {
        let mut collector = StatsCollector::default();
        collector.record(&outcome(JobStatus::Completed, 10));
        collector.record_operation(false, Duration::from_millis(50));

        let stats = collector.snapshot(QueueStatus::default());
        assert_eq!((stats.succeeded, stats.failed), (1, 1));
        assert_eq!(stats.average_processing_time, Duration::from_millis(30));
    }
}
