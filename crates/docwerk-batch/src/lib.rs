// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docwerk-batch — Batch scheduling and the service facade for Docwerk.
//
// `BatchScheduler` runs jobs on a bounded worker pool with priorities,
// retries and progress callbacks. `FileProcessor` puts every single-file
// operation and the scheduler behind one handle.

pub mod capabilities;
pub mod queue;
pub mod retry;
pub mod scheduler;
pub mod service;
pub mod stats;

pub use capabilities::{ProcessingCapabilities, processing_capabilities};
pub use scheduler::{BatchScheduler, JobExecutor};
pub use service::FileProcessor;
pub use stats::{ProcessingStats, QueueStatus};
