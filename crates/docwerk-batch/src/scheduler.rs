// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Batch scheduler — runs jobs on a bounded worker pool.
//
// Each batch gets its own `JobQueue`. `concurrency` worker tasks pull ready
// jobs from it and run every attempt on the blocking pool under the
// configured operation timeout. Transient failures go back into the queue
// with a backoff delay; everything else is terminal. Outcomes are stored by
// submission index so the result keeps the caller's order.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use docwerk_core::error::{DocwerkError, Result};
use docwerk_core::human_errors::humanize_error;
use docwerk_core::{
    BatchId, BatchJob, BatchOperation, BatchOptions, BatchResult, JobError, JobOutcome, JobOutput,
    JobStatus, PipelineConfig, ProgressCallback,
};
use docwerk_document::DocumentPipeline;
use tokio::sync::{Notify, watch};
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use crate::queue::{JobQueue, Next, QueuedJob};
use crate::retry::{self, RetryDecision, RetryPolicy};
use crate::stats::{ProcessingStats, QueueStatus, StatsCollector};

/// Runs one attempt of a batch job. Called on the blocking pool.
pub trait JobExecutor: Send + Sync {
    fn execute(&self, job: &BatchJob) -> Result<JobOutput>;
}

impl JobExecutor for DocumentPipeline {
    fn execute(&self, job: &BatchJob) -> Result<JobOutput> {
        let input = job.input_path.as_path();
        match &job.operation {
            BatchOperation::Convert(options) => {
                let output = job
                    .output_path
                    .clone()
                    .unwrap_or_else(|| input.with_extension(options.target_format.extension()));
                self.try_convert(input, &output, options)
                    .map(JobOutput::Conversion)
            }
            BatchOperation::Extract => match &job.output_path {
                Some(output) => Ok(JobOutput::Text {
                    chars: self.extract_text_to_file(input, output)?,
                    output_path: Some(output.clone()),
                }),
                None => Ok(JobOutput::Text {
                    chars: self.extract_text(input)?.chars().count(),
                    output_path: None,
                }),
            },
            BatchOperation::Ocr(options) => match &job.output_path {
                Some(output) => self.try_ocr_to_file(input, output, options),
                None => self.try_ocr(input, options),
            }
            .map(JobOutput::Ocr),
            BatchOperation::Optimize { quality } => {
                let output = job
                    .output_path
                    .clone()
                    .unwrap_or_else(|| optimized_path(input));
                self.try_optimize(input, &output, *quality)
                    .map(JobOutput::Conversion)
            }
        }
    }
}

/// `photo.png` becomes `photo.optimized.png` next to the input.
fn optimized_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".into());
    let name = match input.extension() {
        Some(ext) => format!("{stem}.optimized.{}", ext.to_string_lossy()),
        None => format!("{stem}.optimized"),
    };
    input.with_file_name(name)
}

// -- Scheduler ----------------------------------------------------------------

/// Cheaply cloneable handle; clones share queues and stats.
#[derive(Clone)]
pub struct BatchScheduler {
    executor: Arc<dyn JobExecutor>,
    config: PipelineConfig,
    active: Arc<Mutex<HashMap<BatchId, Arc<BatchRun>>>>,
    stats: Arc<Mutex<StatsCollector>>,
    shut_down: Arc<AtomicBool>,
}

impl BatchScheduler {
    pub fn new(executor: Arc<dyn JobExecutor>, config: PipelineConfig) -> Self {
        Self {
            executor,
            config,
            active: Arc::new(Mutex::new(HashMap::new())),
            stats: Arc::new(Mutex::new(StatsCollector::default())),
            shut_down: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Scheduler that dispatches to the single-file operations of `pipeline`.
    pub fn for_pipeline(pipeline: DocumentPipeline) -> Self {
        let config = pipeline.config().clone();
        Self::new(Arc::new(pipeline), config)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run `jobs` to completion.
    ///
    /// Only batch-level problems are returned as `Err`: zero concurrency,
    /// duplicate job ids, too many jobs, or a shut-down scheduler. Every job
    /// failure is reported in its outcome.
    #[instrument(skip_all, fields(jobs = jobs.len(), concurrency = options.concurrency))]
    pub async fn process_batch(
        &self,
        jobs: Vec<BatchJob>,
        options: BatchOptions,
    ) -> Result<BatchResult> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(DocwerkError::ShutDown);
        }
        self.check_batch(&jobs, &options)?;

        let batch_id = BatchId::new();
        let started = Instant::now();
        if jobs.is_empty() {
            info!(%batch_id, "empty batch");
            return Ok(BatchResult::from_outcomes(batch_id, Vec::new(), started.elapsed()));
        }

        let run = Arc::new(BatchRun::new(batch_id, jobs, &options, &self.config));
        let _registration = self.register(&run);

        let workers = options.concurrency.min(run.jobs.len());
        info!(%batch_id, total = run.jobs.len(), workers, "batch started");

        let mut pool = JoinSet::new();
        for _ in 0..workers {
            pool.spawn(worker(
                Arc::clone(&run),
                Arc::clone(&self.executor),
                Arc::clone(&self.stats),
                self.config.operation_timeout,
            ));
        }
        while let Some(joined) = pool.join_next().await {
            if let Err(err) = joined {
                warn!(%err, "batch worker stopped abnormally");
            }
        }

        let outcomes = run.take_outcomes(&self.stats);
        let result = BatchResult::from_outcomes(batch_id, outcomes, started.elapsed());
        info!(
            %batch_id,
            completed = result.completed_jobs,
            failed = result.failed_jobs,
            retries = result.summary.total_retries,
            elapsed_ms = result.processing_time.as_millis(),
            "batch finished"
        );
        Ok(result)
    }

    fn check_batch(&self, jobs: &[BatchJob], options: &BatchOptions) -> Result<()> {
        if options.concurrency == 0 {
            return Err(DocwerkError::Validation("concurrency must be at least 1".into()));
        }
        if jobs.len() > self.config.max_batch_size {
            return Err(DocwerkError::Validation(format!(
                "batch of {} jobs exceeds the limit of {}",
                jobs.len(),
                self.config.max_batch_size
            )));
        }
        let mut seen = HashSet::with_capacity(jobs.len());
        for job in jobs {
            if !seen.insert(job.id.as_str()) {
                return Err(DocwerkError::Validation(format!(
                    "duplicate job id '{}'",
                    job.id
                )));
            }
        }
        Ok(())
    }

    fn register(&self, run: &Arc<BatchRun>) -> Registration<'_> {
        lock(&self.active).insert(run.id, Arc::clone(run));
        Registration {
            active: &self.active,
            id: run.id,
        }
    }

    /// Cancel every queued or running job of the in-flight batches.
    ///
    /// Affected jobs are reported as failed with kind `cancelled`. Returns how
    /// many jobs were cancelled.
    pub fn clear_queue(&self) -> usize {
        let runs: Vec<Arc<BatchRun>> = lock(&self.active).values().cloned().collect();
        let cleared: usize = runs.iter().map(|run| run.cancel(&self.stats)).sum();
        info!(cleared, batches = runs.len(), "job queue cleared");
        cleared
    }

    /// Cancel in-flight work and refuse further batches.
    pub fn shutdown(&self) -> usize {
        self.shut_down.store(true, Ordering::SeqCst);
        let cleared = self.clear_queue();
        info!("batch scheduler shut down");
        cleared
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    pub fn queue_status(&self) -> QueueStatus {
        let active = lock(&self.active);
        let mut status = QueueStatus {
            active_batches: active.len(),
            ..QueueStatus::default()
        };
        for run in active.values() {
            let queue = lock(&run.queue);
            status.pending += queue.pending_len();
            status.running += queue.running_len();
        }
        status
    }

    pub fn processing_stats(&self) -> ProcessingStats {
        let status = self.queue_status();
        lock(&self.stats).snapshot(status)
    }

    /// Count a direct single-file operation alongside batch jobs.
    pub(crate) fn record_operation(&self, success: bool, elapsed: Duration) {
        lock(&self.stats).record_operation(success, elapsed);
    }

    pub fn reset_stats(&self) {
        lock(&self.stats).reset();
        debug!("processing stats reset");
    }
}

impl std::fmt::Debug for BatchScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchScheduler")
            .field("config", &self.config)
            .field("queue_status", &self.queue_status())
            .field("shut_down", &self.is_shut_down())
            .finish_non_exhaustive()
    }
}

/// Removes a batch from the active set when `process_batch` returns or is
/// dropped.
struct Registration<'a> {
    active: &'a Mutex<HashMap<BatchId, Arc<BatchRun>>>,
    id: BatchId,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        lock(self.active).remove(&self.id);
    }
}

// -- Batch state --------------------------------------------------------------

struct BatchRun {
    id: BatchId,
    jobs: Vec<BatchJob>,
    policy: RetryPolicy,
    on_progress: Option<ProgressCallback>,
    queue: Mutex<JobQueue>,
    /// Wakes idle workers when the queue changes.
    changed: Notify,
    cancel: watch::Sender<bool>,
    progress: Mutex<Progress>,
}

/// Per-job bookkeeping, indexed by submission order. The lock also orders
/// progress callbacks.
struct Progress {
    outcomes: Vec<Option<JobOutcome>>,
    first_started: Vec<Option<Instant>>,
    attempts: Vec<u32>,
    finished: usize,
}

impl BatchRun {
    fn new(id: BatchId, jobs: Vec<BatchJob>, options: &BatchOptions, config: &PipelineConfig) -> Self {
        let mut queue = JobQueue::new();
        for (index, job) in jobs.iter().enumerate() {
            queue.push(QueuedJob::new(index, job.priority.unwrap_or(options.priority)));
        }
        let total = jobs.len();
        Self {
            id,
            jobs,
            policy: RetryPolicy::from_options(options, config),
            on_progress: options.on_progress.clone(),
            queue: Mutex::new(queue),
            changed: Notify::new(),
            cancel: watch::Sender::new(false),
            progress: Mutex::new(Progress {
                outcomes: vec![None; total],
                first_started: vec![None; total],
                attempts: vec![0; total],
                finished: 0,
            }),
        }
    }

    fn attempt_started(&self, index: usize) -> u32 {
        let mut progress = lock(&self.progress);
        progress.first_started[index].get_or_insert_with(Instant::now);
        progress.attempts[index] += 1;
        progress.attempts[index]
    }

    /// Store the terminal outcome of job `index` unless one already exists.
    fn record(&self, index: usize, result: Result<JobOutput>, stats: &Mutex<StatsCollector>) -> bool {
        let mut progress = lock(&self.progress);
        if progress.outcomes[index].is_some() {
            return false;
        }

        let elapsed = progress.first_started[index]
            .map(|at| at.elapsed())
            .unwrap_or_default();
        let outcome = build_outcome(&self.jobs[index], progress.attempts[index], elapsed, result);
        match &outcome.error {
            None => info!(job_id = %outcome.job_id, attempts = outcome.attempts, "job completed"),
            Some(error) => warn!(
                job_id = %outcome.job_id,
                attempts = outcome.attempts,
                kind = ?error.kind,
                error = %error.message,
                "job failed"
            ),
        }

        lock(stats).record(&outcome);
        progress.outcomes[index] = Some(outcome);
        progress.finished += 1;
        if let Some(callback) = &self.on_progress {
            callback(progress.finished, self.jobs.len());
        }
        true
    }

    fn cancel(&self, stats: &Mutex<StatsCollector>) -> usize {
        let (pending, running) = lock(&self.queue).cancel();
        self.cancel.send_replace(true);
        self.changed.notify_waiters();

        let mut cancelled = 0;
        for index in pending.iter().map(|job| job.index).chain(running) {
            let err = DocwerkError::Cancelled(format!("batch {} was cleared", self.id));
            if self.record(index, Err(err), stats) {
                cancelled += 1;
            }
        }
        cancelled
    }

    /// Resolves once the batch has been cancelled.
    fn cancelled(&self) -> impl std::future::Future<Output = ()> + Send + 'static {
        let mut receiver = self.cancel.subscribe();
        async move {
            let _ = receiver.wait_for(|cancelled| *cancelled).await;
        }
    }

    /// Outcomes in submission order. Jobs that never reached a terminal state
    /// are reported as internal failures.
    fn take_outcomes(&self, stats: &Mutex<StatsCollector>) -> Vec<JobOutcome> {
        for index in 0..self.jobs.len() {
            let err = DocwerkError::Internal("job never reached a terminal state".into());
            self.record(index, Err(err), stats);
        }
        lock(&self.progress)
            .outcomes
            .iter_mut()
            .filter_map(Option::take)
            .collect()
    }
}

fn build_outcome(
    job: &BatchJob,
    attempts: u32,
    processing_time: Duration,
    result: Result<JobOutput>,
) -> JobOutcome {
    match result {
        Ok(output) => JobOutcome {
            job_id: job.id.clone(),
            status: JobStatus::Completed,
            attempts,
            processing_time,
            output: Some(output),
            error: None,
        },
        Err(err) => JobOutcome {
            job_id: job.id.clone(),
            status: JobStatus::Failed,
            attempts,
            processing_time,
            output: None,
            error: Some(JobError {
                kind: err.kind(),
                message: err.to_string(),
                hint: Some(humanize_error(&err).suggestion),
            }),
        },
    }
}

// -- Workers ------------------------------------------------------------------

async fn worker(
    run: Arc<BatchRun>,
    executor: Arc<dyn JobExecutor>,
    stats: Arc<Mutex<StatsCollector>>,
    timeout: Duration,
) {
    loop {
        // Registered before inspecting the queue so no wake-up is missed.
        let changed = run.changed.notified();
        let next = lock(&run.queue).next(Instant::now());
        match next {
            Next::Drained => break,
            Next::Idle => changed.await,
            Next::Wait(at) => {
                tokio::select! {
                    _ = tokio::time::sleep_until(tokio::time::Instant::from_std(at)) => {}
                    _ = changed => {}
                }
            }
            Next::Ready(job) => run_job(&run, &executor, &stats, timeout, job).await,
        }
    }
}

async fn run_job(
    run: &Arc<BatchRun>,
    executor: &Arc<dyn JobExecutor>,
    stats: &Mutex<StatsCollector>,
    timeout: Duration,
    mut job: QueuedJob,
) {
    let index = job.index;
    job.attempts = run.attempt_started(index);
    let batch_job = run.jobs[index].clone();
    debug!(job_id = %batch_job.id, attempt = job.attempts, operation = batch_job.operation.name(), "attempt started");

    let result = tokio::select! {
        result = run_attempt(Arc::clone(executor), batch_job, timeout) => result,
        // `clear_queue` has already recorded this job as cancelled.
        _ = run.cancelled() => return,
    };

    let result = match result {
        Ok(output) => Ok(output),
        Err(err) => match retry::should_retry(&err, job.attempts - 1, &run.policy) {
            RetryDecision::RetryAfter(delay) => {
                warn!(
                    job_id = %run.jobs[index].id,
                    attempt = job.attempts,
                    delay_ms = delay.as_millis(),
                    %err,
                    "transient failure, retrying"
                );
                let requeued = lock(&run.queue).requeue(job, Instant::now() + delay);
                if requeued {
                    run.changed.notify_waiters();
                }
                return;
            }
            RetryDecision::GiveUp(_) | RetryDecision::Exhausted => Err(err),
        },
    };

    lock(&run.queue).finish(index);
    run.record(index, result, stats);
    run.changed.notify_waiters();
}

/// One attempt on the blocking pool. Blocking work cannot be aborted, so an
/// attempt that overruns `timeout` keeps its worker slot until the executor
/// returns; its result is then discarded and the attempt counts as a
/// transient failure.
async fn run_attempt(
    executor: Arc<dyn JobExecutor>,
    job: BatchJob,
    timeout: Duration,
) -> Result<JobOutput> {
    let mut handle = tokio::task::spawn_blocking(move || executor.execute(&job));
    let joined = match tokio::time::timeout(timeout, &mut handle).await {
        Ok(joined) => joined,
        Err(_) => {
            warn!(timeout_ms = timeout.as_millis(), "attempt timed out, waiting for it to stop");
            if let Err(join_err) = handle.await {
                warn!(%join_err, "timed-out attempt panicked");
            }
            return Err(DocwerkError::TransientProcessing(format!(
                "attempt exceeded the {} ms operation timeout",
                timeout.as_millis()
            )));
        }
    };
    joined.unwrap_or_else(|join_err| {
        Err(DocwerkError::Internal(format!("job attempt panicked: {join_err}")))
    })
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
