// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory job queue for one batch.
//
// Entries are identified by their submission index. Ready entries are handed
// out highest priority first, then in submission order. Retried entries carry
// a `not_before` instant and stay invisible until it passes.

use std::collections::HashSet;
use std::time::Instant;

use docwerk_core::Priority;
use tracing::debug;

/// A job waiting for a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedJob {
    /// Position of the job in the submitted batch.
    pub index: usize,
    pub priority: Priority,
    /// Attempts already made.
    pub attempts: u32,
    pub not_before: Option<Instant>,
}

impl QueuedJob {
    pub fn new(index: usize, priority: Priority) -> Self {
        Self {
            index,
            priority,
            attempts: 0,
            not_before: None,
        }
    }

    fn is_ready(&self, now: Instant) -> bool {
        self.not_before.is_none_or(|at| at <= now)
    }
}

/// What a worker should do next.
#[derive(Debug, PartialEq, Eq)]
pub enum Next {
    /// Run this job. It now counts as running.
    Ready(QueuedJob),
    /// Nothing is ready before this instant.
    Wait(Instant),
    /// Nothing queued, but running jobs may still be requeued.
    Idle,
    /// Nothing queued or running, or the queue was cancelled.
    Drained,
}

#[derive(Debug, Default)]
pub struct JobQueue {
    pending: Vec<QueuedJob>,
    running: HashSet<usize>,
    cancelled: bool,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, job: QueuedJob) {
        self.pending.push(job);
    }

    /// Take the next ready job, marking it running.
    pub fn next(&mut self, now: Instant) -> Next {
        if self.cancelled {
            return Next::Drained;
        }

        let best = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, job)| job.is_ready(now))
            .max_by_key(|(_, job)| (job.priority, std::cmp::Reverse(job.index)))
            .map(|(pos, _)| pos);

        if let Some(pos) = best {
            let job = self.pending.swap_remove(pos);
            self.running.insert(job.index);
            return Next::Ready(job);
        }

        if let Some(at) = self.pending.iter().filter_map(|job| job.not_before).min() {
            return Next::Wait(at);
        }

        if self.running.is_empty() {
            Next::Drained
        } else {
            Next::Idle
        }
    }

    /// Put a running job back with one more attempt recorded.
    ///
    /// Returns `false` when the queue has been cancelled; the caller then owns
    /// the job's terminal outcome.
    pub fn requeue(&mut self, mut job: QueuedJob, not_before: Instant) -> bool {
        self.running.remove(&job.index);
        if self.cancelled {
            return false;
        }
        job.not_before = Some(not_before);
        debug!(index = job.index, attempts = job.attempts, "job requeued");
        self.pending.push(job);
        true
    }

    /// A running job reached a terminal state.
    pub fn finish(&mut self, index: usize) {
        self.running.remove(&index);
    }

    /// Drop all bookkeeping and refuse further work.
    ///
    /// Returns the jobs that were still queued and the indices that were
    /// running.
    pub fn cancel(&mut self) -> (Vec<QueuedJob>, Vec<usize>) {
        self.cancelled = true;
        let pending = std::mem::take(&mut self.pending);
        let running = self.running.drain().collect();
        (pending, running)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn running_len(&self) -> usize {
        self.running.len()
    }
}
