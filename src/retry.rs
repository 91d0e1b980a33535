//! Bounded retry policy for image probes.
//!
//! The policy decides *whether* and *how long* to wait; the caller's
//! [`Retryable`] value decides which outcomes are transient.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// Retry settings: attempt budget plus exponential backoff with jitter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Values below 1 act as 1.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_backoff_ms: u64,
    /// Growth factor applied to the delay after each retry.
    pub multiplier: f64,
    /// Upper bound on any single delay.
    pub max_backoff_ms: u64,
    /// Fraction of the delay added as random jitter (0.0 disables).
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 200,
            multiplier: 2.0,
            max_backoff_ms: 2_000,
            jitter: 0.2,
        }
    }
}

/// Whether an attempt's outcome should be retried.
pub trait Retryable {
    fn is_transient(&self) -> bool;
}

/// Final outcome of a retried operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Attempted<T> {
    pub value: T,
    /// Number of retries performed (attempts minus one).
    pub retries: u32,
}

impl RetryPolicy {
    /// A policy that retries up to `max_attempts` times without sleeping.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff_ms: 0,
            max_backoff_ms: 0,
            jitter: 0.0,
            ..Self::default()
        }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self::immediate(1)
    }

    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Backoff before retry number `retry` (1-based), without jitter.
    pub fn base_delay(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let factor = self.multiplier.max(1.0).powi(retry as i32 - 1);
        let ms = (self.initial_backoff_ms as f64 * factor).min(self.max_backoff_ms as f64);
        Duration::from_millis(ms.max(0.0) as u64)
    }

    /// Backoff before retry number `retry`, with random jitter applied.
    pub fn delay(&self, retry: u32) -> Duration {
        let base = self.base_delay(retry);
        if self.jitter <= 0.0 || base.is_zero() {
            return base;
        }
        let spread = base.as_millis() as f64 * self.jitter.min(1.0);
        let extra = rand::thread_rng().gen_range(0.0..=spread);
        base + Duration::from_millis(extra as u64)
    }

    /// Run `op` until it yields a non-transient value or the attempt
    /// budget is spent. The last value is returned either way.
    pub async fn run<F, Fut, T>(&self, mut op: F) -> Attempted<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = T>,
        T: Retryable,
    {
        let attempts = self.attempts();
        let mut attempt = 0;
        loop {
            let value = op(attempt).await;
            if !value.is_transient() || attempt + 1 >= attempts {
                return Attempted {
                    value,
                    retries: attempt,
                };
            }
            attempt += 1;
            let wait = self.delay(attempt);
            tracing::debug!(attempt, wait_ms = wait.as_millis() as u64, "Retrying after transient failure");
            if !wait.is_zero() {
                tokio::time::sleep(wait).await;
            }
        }
    }
}
