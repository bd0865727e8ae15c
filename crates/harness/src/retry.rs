use std::time::Duration;

use configs::RetryConfig;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::ProbeError;
use crate::observability::RETRIES_TOTAL;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff_base: Duration,
    backoff_max: Duration,
    enabled: bool,
}

impl RetryPolicy {
    pub fn new(
        max_attempts: u32,
        backoff_base: Duration,
        backoff_max: Duration,
        enabled: bool,
    ) -> Self {
        Self {
            max_attempts,
            backoff_base,
            backoff_max,
            enabled,
        }
    }

    pub fn from_config(cfg: &RetryConfig) -> Self {
        Self::new(
            cfg.max_attempts,
            cfg.backoff_base(),
            cfg.backoff_max(),
            cfg.enabled,
        )
    }

    pub fn max_attempts(&self) -> u32 {
        if self.enabled {
            self.max_attempts.max(1)
        } else {
            1
        }
    }

    /// Exponential backoff for the given retry number (1-based), capped at `backoff_max`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = 2_u32.saturating_pow(attempt - 1);
        self.backoff_base.saturating_mul(factor).min(self.backoff_max)
    }

    pub async fn wait_before_retry(&self, attempt: u32) {
        if !self.enabled || attempt == 0 {
            return;
        }
        let backoff = self.backoff(attempt);
        debug!(
            event = "retry_wait",
            attempt,
            backoff_ms = backoff.as_millis() as u64,
            "retrying after backoff"
        );
        sleep(backoff).await;
    }

    pub fn should_retry(&self, attempt: u32, error: &ProbeError) -> bool {
        if !self.enabled {
            return false;
        }
        if attempt >= self.max_attempts {
            debug!(max_attempts = self.max_attempts, "max retry attempts reached");
            return false;
        }
        if error.is_transient() {
            true
        } else {
            warn!(error = %error, "error is not retryable");
            false
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

pub async fn retry_with_policy<F, Fut, T>(
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, ProbeError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, ProbeError>>,
{
    let mut attempt = 0;
    loop {
        if attempt > 0 {
            RETRIES_TOTAL.inc();
            policy.wait_before_retry(attempt).await;
        }
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(retries = attempt, "operation succeeded after retries");
                }
                return Ok(value);
            }
            Err(error) => {
                warn!(attempt = attempt + 1, error = %error, "operation failed");
                if attempt + 1 < policy.max_attempts() && policy.should_retry(attempt + 1, &error) {
                    attempt += 1;
                    continue;
                }
                return Err(error);
            }
        }
    }
}
