// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scheduler behaviour with scripted executors.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use docwerk_batch::{BatchScheduler, JobExecutor};
use docwerk_core::error::{DocwerkError, Result};
use docwerk_core::{
    Backoff, BatchJob, BatchOperation, BatchOptions, ErrorKind, JobOutput, JobStatus,
    PipelineConfig, Priority,
};

fn jobs(count: usize) -> Vec<BatchJob> {
    (0..count)
        .map(|i| BatchJob::new(format!("job-{i}"), format!("/in/{i}.txt"), BatchOperation::Extract))
        .collect()
}

fn options(concurrency: usize) -> BatchOptions {
    BatchOptions::default()
        .with_concurrency(concurrency)
        .with_retries(0, Duration::from_millis(1))
}

fn scheduler(executor: Arc<dyn JobExecutor>) -> BatchScheduler {
    BatchScheduler::new(executor, PipelineConfig::default())
}

fn text(chars: usize) -> JobOutput {
    JobOutput::Text {
        chars,
        output_path: None,
    }
}

// -- Executors ----------------------------------------------------------------

/// Records execution order and peak parallelism.
#[derive(Default)]
struct Recorder {
    order: Mutex<Vec<String>>,
    current: AtomicUsize,
    peak: AtomicUsize,
    pause: Duration,
}

impl JobExecutor for Recorder {
    fn execute(&self, job: &BatchJob) -> Result<JobOutput> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if let Ok(mut order) = self.order.lock() {
            order.push(job.id.clone());
        }
        std::thread::sleep(self.pause);
        self.current.fetch_sub(1, Ordering::SeqCst);
        Ok(text(job.id.len()))
    }
}

/// Fails transiently `failures` times per job, then succeeds.
struct Flaky {
    failures: u32,
    seen: Mutex<HashMap<String, u32>>,
}

impl Flaky {
    fn new(failures: u32) -> Self {
        Self {
            failures,
            seen: Mutex::new(HashMap::new()),
        }
    }
}

impl JobExecutor for Flaky {
    fn execute(&self, job: &BatchJob) -> Result<JobOutput> {
        let mut seen = self.seen.lock().unwrap();
        let calls = seen.entry(job.id.clone()).or_default();
        *calls += 1;
        if *calls <= self.failures {
            return Err(DocwerkError::TransientProcessing(format!("busy ({calls})")));
        }
        Ok(text(1))
    }
}

/// Fails transiently `failures` times, noting when each call arrived.
struct Stamped {
    failures: usize,
    calls: Mutex<Vec<Instant>>,
}

impl Stamped {
    fn new(failures: usize) -> Self {
        Self {
            failures,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn gaps(&self) -> Vec<Duration> {
        let calls = self.calls.lock().unwrap();
        calls.windows(2).map(|pair| pair[1] - pair[0]).collect()
    }
}

impl JobExecutor for Stamped {
    fn execute(&self, _job: &BatchJob) -> Result<JobOutput> {
        let mut calls = self.calls.lock().unwrap();
        calls.push(Instant::now());
        if calls.len() <= self.failures {
            return Err(DocwerkError::TransientProcessing("not yet".into()));
        }
        Ok(text(1))
    }
}

struct Broken;

impl JobExecutor for Broken {
    fn execute(&self, job: &BatchJob) -> Result<JobOutput> {
        Err(DocwerkError::Malformed(format!("{} is corrupt", job.id)))
    }
}

/// Blocks for `pause`, flagging that work has begun.
struct Slow {
    started: Arc<AtomicBool>,
    pause: Duration,
}

impl JobExecutor for Slow {
    fn execute(&self, _job: &BatchJob) -> Result<JobOutput> {
        self.started.store(true, Ordering::SeqCst);
        std::thread::sleep(self.pause);
        Ok(text(0))
    }
}

// -- Accounting ---------------------------------------------------------------

#[tokio::test]
async fn results_follow_submission_order() {
    let recorder = Arc::new(Recorder::default());
    let result = scheduler(recorder.clone())
        .process_batch(jobs(8), options(3))
        .await
        .unwrap();

    assert_eq!(result.total_jobs, 8);
    assert_eq!(result.completed_jobs + result.failed_jobs, result.total_jobs);
    let ids: Vec<&str> = result.results.iter().map(|r| r.job_id.as_str()).collect();
    let expected: Vec<String> = (0..8).map(|i| format!("job-{i}")).collect();
    assert_eq!(ids, expected);
    assert_eq!(result.summary.success_rate, 100.0);
}

#[tokio::test]
async fn concurrency_is_bounded() {
    let recorder = Arc::new(Recorder {
        pause: Duration::from_millis(20),
        ..Recorder::default()
    });
    scheduler(recorder.clone())
        .process_batch(jobs(6), options(2))
        .await
        .unwrap();
    let peak = recorder.peak.load(Ordering::SeqCst);
    assert!(peak >= 1 && peak <= 2, "peak {peak}");
}

#[tokio::test]
async fn high_priority_runs_first() {
    let recorder = Arc::new(Recorder::default());
    let mut batch = jobs(4);
    batch[0].priority = Some(Priority::Low);
    batch[3] = batch[3].clone().with_priority(Priority::High);

    let result = scheduler(recorder.clone())
        .process_batch(batch, options(1))
        .await
        .unwrap();

    let order = recorder.order.lock().unwrap().clone();
    assert_eq!(order, vec!["job-3", "job-1", "job-2", "job-0"]);
    assert_eq!(result.results[0].job_id, "job-0");
}

#[tokio::test]
async fn progress_is_monotonic() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let options = options(4).on_progress(move |current, total| {
        sink.lock().unwrap().push((current, total));
    });

    scheduler(Arc::new(Recorder::default()))
        .process_batch(jobs(10), options)
        .await
        .unwrap();

    let seen = seen.lock().unwrap();
    let expected: Vec<(usize, usize)> = (1..=10).map(|i| (i, 10)).collect();
    assert_eq!(*seen, expected);
}

#[tokio::test]
async fn empty_batch_returns_immediately() {
    let result = scheduler(Arc::new(Broken)).process_batch(Vec::new(), options(2)).await.unwrap();
    assert_eq!(result.total_jobs, 0);
    assert_eq!(result.completed_jobs, 0);
    assert_eq!(result.failed_jobs, 0);
    assert!(result.results.is_empty());
}

// -- Rejections ---------------------------------------------------------------

#[tokio::test]
async fn duplicate_ids_are_rejected() {
    let mut batch = jobs(3);
    batch[2].id = "job-0".into();
    let err = scheduler(Arc::new(Broken)).process_batch(batch, options(1)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn zero_concurrency_is_rejected() {
    let err = scheduler(Arc::new(Broken)).process_batch(jobs(1), options(0)).await.unwrap_err();
    assert!(matches!(err, DocwerkError::Validation(_)));
}

#[tokio::test]
async fn oversized_batch_is_rejected() {
    let config = PipelineConfig {
        max_batch_size: 2,
        ..PipelineConfig::default()
    };
    let err = BatchScheduler::new(Arc::new(Broken), config)
        .process_batch(jobs(3), options(1))
        .await
        .unwrap_err();
    assert!(matches!(err, DocwerkError::Validation(_)));
}

// -- Retries ------------------------------------------------------------------

#[tokio::test]
async fn transient_failures_are_retried() {
    let options = options(2).with_retries(2, Duration::from_millis(1));
    let result = scheduler(Arc::new(Flaky::new(2))).process_batch(jobs(3), options).await.unwrap();

    assert_eq!(result.completed_jobs, 3);
    assert!(result.results.iter().all(|r| r.attempts == 3));
    assert_eq!(result.summary.total_retries, 6);
}

#[tokio::test]
async fn exhausted_retries_record_the_last_error() {
    let options = options(1)
        .with_retries(1, Duration::from_millis(2))
        .with_backoff(Backoff::Exponential);
    let result = scheduler(Arc::new(Flaky::new(5))).process_batch(jobs(1), options).await.unwrap();

    let outcome = &result.results[0];
    assert_eq!(outcome.status, JobStatus::Failed);
    assert_eq!(outcome.attempts, 2);
    let error = outcome.error.as_ref().unwrap();
    assert_eq!(error.kind, ErrorKind::TransientProcessing);
    assert!(error.message.contains("busy (2)"));
}

#[tokio::test]
async fn fixed_backoff_waits_the_retry_delay() {
    let delay = Duration::from_millis(80);
    let stamped = Arc::new(Stamped::new(1));
    let options = options(1)
        .with_retries(2, delay)
        .with_backoff(Backoff::Fixed);
    let result = scheduler(stamped.clone())
        .process_batch(jobs(1), options)
        .await
        .unwrap();

    let outcome = &result.results[0];
    assert_eq!(outcome.status, JobStatus::Completed);
    assert_eq!(outcome.attempts, 2);
    assert!(outcome.processing_time >= delay, "{:?}", outcome.processing_time);
    assert!(stamped.gaps()[0] >= delay);
}

#[tokio::test]
async fn exponential_backoff_grows_between_retries() {
    let stamped = Arc::new(Stamped::new(2));
    let options = options(1)
        .with_retries(2, Duration::from_millis(40))
        .with_backoff(Backoff::Exponential);
    let result = scheduler(stamped.clone())
        .process_batch(jobs(1), options)
        .await
        .unwrap();

    assert_eq!(result.results[0].attempts, 3);
    let gaps = stamped.gaps();
    assert_eq!(gaps.len(), 2);
    assert!(gaps[0] >= Duration::from_millis(40), "{gaps:?}");
    assert!(gaps[1] >= Duration::from_millis(80), "{gaps:?}");
    assert!(gaps[1] > gaps[0], "{gaps:?}");
}

#[tokio::test]
async fn permanent_failures_are_not_retried() {
    let options = options(2).with_retries(3, Duration::from_millis(1));
    let result = scheduler(Arc::new(Broken)).process_batch(jobs(2), options).await.unwrap();

    assert_eq!(result.failed_jobs, 2);
    assert!(result.results.iter().all(|r| r.attempts == 1));
    let error = result.results[0].error.as_ref().unwrap();
    assert_eq!(error.kind, ErrorKind::Processing);
    assert!(error.hint.is_some());
}

#[tokio::test]
async fn timeouts_are_transient_failures() {
    let config = PipelineConfig {
        operation_timeout: Duration::from_millis(20),
        ..PipelineConfig::default()
    };
    let slow = Slow {
        started: Arc::new(AtomicBool::new(false)),
        pause: Duration::from_millis(200),
    };
    let result = BatchScheduler::new(Arc::new(slow), config)
        .process_batch(jobs(1), options(1))
        .await
        .unwrap();

    let error = result.results[0].error.as_ref().unwrap();
    assert_eq!(error.kind, ErrorKind::TransientProcessing);
}

#[tokio::test]
async fn timed_out_attempts_keep_their_slot() {
    let config = PipelineConfig {
        operation_timeout: Duration::from_millis(50),
        ..PipelineConfig::default()
    };
    let recorder = Arc::new(Recorder {
        pause: Duration::from_millis(200),
        ..Recorder::default()
    });
    let options = options(1).with_retries(3, Duration::from_millis(1));
    let result = BatchScheduler::new(recorder.clone(), config)
        .process_batch(jobs(1), options)
        .await
        .unwrap();

    let outcome = &result.results[0];
    assert_eq!(outcome.attempts, 4);
    assert_eq!(
        outcome.error.as_ref().unwrap().kind,
        ErrorKind::TransientProcessing
    );
    assert_eq!(recorder.peak.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.order.lock().unwrap().len(), 4);
}

// -- Cancellation and stats ---------------------------------------------------

#[tokio::test]
async fn clear_queue_cancels_in_flight_jobs() {
    let started = Arc::new(AtomicBool::new(false));
    let scheduler = scheduler(Arc::new(Slow {
        started: Arc::clone(&started),
        pause: Duration::from_millis(300),
    }));

    let runner = scheduler.clone();
    let batch = tokio::spawn(async move { runner.process_batch(jobs(4), options(1)).await });

    while !started.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(scheduler.queue_status().active_batches, 1);
    assert_eq!(scheduler.clear_queue(), 4);

    let result = batch.await.unwrap().unwrap();
    assert_eq!(result.total_jobs, 4);
    assert_eq!(result.failed_jobs, 4);
    assert_eq!(result.results.len(), 4);
    for outcome in &result.results {
        assert_eq!(outcome.error.as_ref().unwrap().kind, ErrorKind::Cancelled);
    }
    assert_eq!(scheduler.queue_status().active_batches, 0);
}

#[tokio::test]
async fn stats_accumulate_and_reset() {
    let scheduler = scheduler(Arc::new(Broken));
    scheduler.process_batch(jobs(3), options(2)).await.unwrap();

    let stats = scheduler.processing_stats();
    assert_eq!(stats.total_processed, 3);
    assert_eq!(stats.failed, 3);
    assert_eq!(stats.success_rate, 0.0);
    assert_eq!(stats.queue_status.pending, 0);
    assert_eq!(stats.queue_status.running, 0);

    scheduler.reset_stats();
    assert_eq!(scheduler.processing_stats().total_processed, 0);
}
