// ABOUTME: Bounded retry combinator with exponential backoff between attempts
// ABOUTME: Turns a fallible async step into a single call with a fixed attempt budget
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Retry
//!
//! [`retry_with_backoff`] runs an async step until it returns `Ok` or the
//! attempt budget of a [`RetryPolicy`] is spent. Every `Err` is treated as
//! retryable. Attempts are strictly sequential and separated by an
//! exponentially growing delay; no delay follows the final attempt.

use crate::errors::{AppError, ErrorCode};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one
    pub max_attempts: u32,
    /// Delay after the first failed attempt
    pub initial_backoff: Duration,
    /// Factor applied to the delay after each further failure
    pub multiplier: u32,
    /// Upper bound of any single delay
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Policy without any delay between attempts
    #[must_use]
    pub const fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff: Duration::ZERO,
            multiplier: 1,
            max_backoff: Duration::ZERO,
        }
    }

    /// Delay to wait after the given failed attempt (1-based)
    #[must_use]
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = self.multiplier.saturating_pow(exponent);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Run `step` until it succeeds or `policy.max_attempts` attempts have failed
///
/// The step receives the 1-based attempt number.
///
/// # Errors
///
/// Returns an `ExternalServiceUnavailable` error carrying the last step
/// failure as its source once the budget is exhausted.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut step: F,
) -> Result<T, AppError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match step(attempt).await {
            Ok(value) => {
                debug!(operation, attempt, "Step succeeded");
                return Ok(value);
            }
            Err(e) if attempt >= max_attempts => {
                warn!(operation, attempt, error = %e, "Retry budget exhausted");
                return Err(AppError::new(
                    ErrorCode::ExternalServiceUnavailable,
                    format!("{operation} did not succeed after {attempt} attempts"),
                )
                .with_source(e));
            }
            Err(e) => {
                let backoff = policy.backoff_after(attempt);
                debug!(
                    operation,
                    attempt,
                    max_attempts,
                    backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                    error = %e,
                    "Step not ready, retrying"
                );
                tokio::time::sleep(backoff).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_backoff_grows_exponentially_and_is_capped() {
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_backoff: Duration::from_millis(1000),
            multiplier: 2,
            max_backoff: Duration::from_millis(5000),
        };

        assert_eq!(policy.backoff_after(1), Duration::from_millis(1000));
        assert_eq!(policy.backoff_after(2), Duration::from_millis(2000));
        assert_eq!(policy.backoff_after(3), Duration::from_millis(4000));
        assert_eq!(policy.backoff_after(4), Duration::from_millis(5000));
        assert_eq!(policy.backoff_after(40), Duration::from_millis(5000));
    }

    #[tokio::test]
    async fn test_succeeds_on_kth_attempt_without_extra_calls() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(&RetryPolicy::immediate(10), "poll", |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 3 {
                    Ok(attempt)
                } else {
                    Err(AppError::internal("not yet"))
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(result, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_reports_terminal_failure() {
        let calls = AtomicU32::new(0);
        let result: Result<(), AppError> =
            retry_with_backoff(&RetryPolicy::immediate(4), "poll", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(AppError::internal("still running")) }
            })
            .await;

        let error = result.unwrap_err();
        assert_eq!(error.code, ErrorCode::ExternalServiceUnavailable);
        assert!(error.message.contains("4 attempts"));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_zero_budget_still_runs_once() {
        let calls = AtomicU32::new(0);
        let result: Result<(), AppError> =
            retry_with_backoff(&RetryPolicy::immediate(0), "poll", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(AppError::internal("failed")) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
