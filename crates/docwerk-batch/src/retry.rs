// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Retry policy with fixed or exponential backoff.
//
// Only transient failures (I/O hiccups, timeouts) are retried. Bad requests
// and malformed content fail the same way every time and give up at once.

use std::time::Duration;

use docwerk_core::error::DocwerkError;
use docwerk_core::{Backoff, BatchOptions, ErrorClass, ErrorKind, PipelineConfig};
use tracing::{debug, info, warn};

/// Retry configuration for one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt.
    pub max_retries: u32,
    pub base_delay: Duration,
    /// Cap on exponential delays.
    pub max_delay: Duration,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn from_options(options: &BatchOptions, config: &PipelineConfig) -> Self {
        Self {
            max_retries: options.retry_attempts,
            base_delay: options.retry_delay,
            max_delay: config.max_retry_delay,
            backoff: options.backoff,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_options(&BatchOptions::default(), &PipelineConfig::default())
    }
}

/// Result of evaluating whether to retry.
#[derive(Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after this delay.
    RetryAfter(Duration),
    /// Do not retry; the error is permanent.
    GiveUp(ErrorClass),
    /// Maximum retries exhausted.
    Exhausted,
}

/// Classify a `DocwerkError` for retry decisions.
pub fn classify_error(err: &DocwerkError) -> ErrorClass {
    match err.kind() {
        ErrorKind::TransientProcessing => ErrorClass::Transient,
        _ => ErrorClass::Permanent,
    }
}

/// Decide whether to retry after `retries_done` retries have already run.
pub fn should_retry(err: &DocwerkError, retries_done: u32, policy: &RetryPolicy) -> RetryDecision {
    match classify_error(err) {
        ErrorClass::Permanent => {
            info!(kind = ?err.kind(), "permanent error, not retrying");
            RetryDecision::GiveUp(ErrorClass::Permanent)
        }
        ErrorClass::Transient => {
            if retries_done >= policy.max_retries {
                warn!(retries_done, max = policy.max_retries, "retry limit exhausted");
                RetryDecision::Exhausted
            } else {
                let delay = compute_delay(retries_done, policy);
                debug!(retries_done, delay_ms = delay.as_millis(), "scheduling retry");
                RetryDecision::RetryAfter(delay)
            }
        }
    }
}

/// Delay before retry number `retry` (0-based).
///
/// Fixed: `base`. Exponential: `min(base * 2^retry + jitter, max_delay)`
/// with jitter in `[0, base)`.
pub fn compute_delay(retry: u32, policy: &RetryPolicy) -> Duration {
    match policy.backoff {
        Backoff::Fixed => policy.base_delay,
        Backoff::Exponential => {
            let base_ms = policy.base_delay.as_millis() as u64;
            let exp_ms = base_ms.saturating_mul(1u64 << retry.min(20));
            let total_ms = exp_ms.saturating_add(jitter(base_ms, retry));
            Duration::from_millis(total_ms.min(policy.max_delay.as_millis() as u64))
        }
    }
}

/// Deterministic spread in `[0, base)`, keyed on the retry number.
fn jitter(base_ms: u64, retry: u32) -> u64 {
    let hash = (retry as u64).wrapping_mul(6364136223846793005);
    hash % base_ms.max(1)
}
