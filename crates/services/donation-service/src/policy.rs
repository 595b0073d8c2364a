//! Store policy: timeout and retry bounds for calls into the store.
//!
//! Every engine entry point runs through [`StorePolicy`]. Reads may be
//! retried on transient failures; writes run exactly once.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use common::{AppError, AppResult, StorePolicyConfig};

/// Delay before the first retry; doubles on every further attempt
const RETRY_BASE_DELAY: Duration = Duration::from_millis(50);

/// Upper bound for a single backoff delay
const RETRY_MAX_DELAY: Duration = Duration::from_secs(5);

/// Exponential backoff before retry number `attempt` (1-based)
fn backoff(attempt: u32) -> Duration {
    RETRY_BASE_DELAY
        .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
        .min(RETRY_MAX_DELAY)
}

/// Timeout and retry bounds for store operations.
#[derive(Debug, Clone, Copy)]
pub struct StorePolicy {
    timeout: Duration,
    read_retries: u32,
}

impl StorePolicy {
    pub fn new(timeout: Duration, read_retries: u32) -> Self {
        Self {
            timeout,
            read_retries,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run a write once, bounded by the timeout.
    pub async fn write<T, Fut>(&self, operation: &str, fut: Fut) -> AppResult<T>
    where
        Fut: Future<Output = AppResult<T>>,
    {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| AppError::Timeout(operation.to_string()))?
    }

    /// Run a read, retrying transient failures up to `read_retries` times.
    pub async fn read<T, F, Fut>(&self, operation: &str, mut op: F) -> AppResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let mut attempts = 0;
        loop {
            match self.write(operation, op()).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempts < self.read_retries => {
                    attempts += 1;
                    warn!(operation, attempts, error = %e, "Transient store failure, retrying");
                    tokio::time::sleep(backoff(attempts)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl From<&StorePolicyConfig> for StorePolicy {
    fn from(config: &StorePolicyConfig) -> Self {
        Self::new(config.timeout(), config.read_retries)
    }
}

impl Default for StorePolicy {
    fn default() -> Self {
        Self::from(&StorePolicyConfig::default())
    }
}
