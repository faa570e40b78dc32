//! Per-call retry with exponential backoff and jitter.
//!
//! Sits above the client's own payload degradation: a transient error that
//! survived every frame budget, or a rate limit, lands here.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{GenerationError, GenerationResult};

const MAX_RETRY_AFTER: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackoffPolicy {
    /// Total calls, including the first.
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    /// Uniform random addition to every delay.
    #[serde(default = "default_max_jitter_ms")]
    pub max_jitter_ms: u64,
}

fn default_attempts() -> u32 {
    6
}

fn default_base_delay_ms() -> u64 {
    1500
}

fn default_multiplier() -> f64 {
    1.8
}

fn default_max_jitter_ms() -> u64 {
    1000
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            base_delay_ms: default_base_delay_ms(),
            multiplier: default_multiplier(),
            max_jitter_ms: default_max_jitter_ms(),
        }
    }
}

impl BackoffPolicy {
    /// Delay before retry number `retry` (0-based), without jitter.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(retry as i32);
        let ms = (self.base_delay_ms as f64 * factor).round().min(u64::MAX as f64);
        Duration::from_millis(ms as u64)
    }

    fn jittered(&self, retry: u32, err: &GenerationError) -> Duration {
        let jitter_ms = if self.max_jitter_ms > 0 {
            rand::thread_rng().gen_range(0..=self.max_jitter_ms)
        } else {
            0
        };
        let backoff = self.delay_for(retry) + Duration::from_millis(jitter_ms);

        match err {
            GenerationError::RateLimited {
                retry_after: Some(after),
            } => backoff.max((*after).min(MAX_RETRY_AFTER)),
            _ => backoff,
        }
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// attempt budget is spent. Exhaustion returns the last retryable error.
pub async fn retry_with_backoff<F, Fut, T>(policy: &BackoffPolicy, mut op: F) -> GenerationResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = GenerationResult<T>>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 0;

    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) if attempt + 1 >= attempts => return Err(e),
            Err(e) => {
                let backoff = policy.jittered(attempt, &e);
                attempt += 1;

                warn!(
                    error = %e,
                    attempt = attempt,
                    max_attempts = attempts,
                    backoff_ms = backoff.as_millis() as u64,
                    "retrying generation"
                );

                tokio::time::sleep(backoff).await;
            }
        }
    }
}
