//! Retry policy with exponential backoff and full jitter.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{info_span, warn, Instrument};

use crate::error::CatalogResult;
use crate::metrics::record_retry;

/// Longest Retry-After honored.
const MAX_RETRY_AFTER_MS: u64 = 60_000;

// =============================================================================
// Configuration
// =============================================================================

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    /// Base delay for exponential backoff (ms)
    pub base_delay_ms: u64,
    /// Delay cap (ms)
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 100,
            max_delay_ms: 5000,
        }
    }
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

impl RetryConfig {
    /// Reads `FIRESTORE_MAX_RETRIES`, `FIRESTORE_RETRY_BASE_MS` and `FIRESTORE_RETRY_MAX_MS`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_retries: env_u64("FIRESTORE_MAX_RETRIES")
                .map(|v| v.min(10) as u32)
                .unwrap_or(defaults.max_retries),
            base_delay_ms: env_u64("FIRESTORE_RETRY_BASE_MS").unwrap_or(defaults.base_delay_ms),
            max_delay_ms: env_u64("FIRESTORE_RETRY_MAX_MS").unwrap_or(defaults.max_delay_ms),
        }
    }

    /// No retries, for tests and one-shot tools.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }
}

// =============================================================================
// Retry Loop
// =============================================================================

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// retry budget is spent. 429 responses wait for their Retry-After.
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, operation: &str, op: F) -> CatalogResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = CatalogResult<T>>,
{
    let mut attempt = 0u32;
    loop {
        let span = info_span!("catalog_attempt", operation = %operation, attempt = attempt + 1);
        match op().instrument(span).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < config.max_retries => {
                let delay = calculate_delay(config, attempt, e.retry_after_ms());
                warn!(
                    operation = %operation,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Catalog request failed, retrying"
                );
                record_retry(operation);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// `base * 2^attempt` capped at `max`, with full jitter and a floor of `base`.
pub(crate) fn calculate_delay(config: &RetryConfig, attempt: u32, retry_after_ms: Option<u64>) -> Duration {
    if let Some(after) = retry_after_ms {
        return Duration::from_millis(after.min(MAX_RETRY_AFTER_MS));
    }

    let exp = config
        .base_delay_ms
        .saturating_mul(2u64.saturating_pow(attempt))
        .min(config.max_delay_ms);
    let jittered = if exp > 0 { rand::rng().random_range(0..=exp) } else { 0 };

    Duration::from_millis(jittered.max(config.base_delay_ms.min(config.max_delay_ms)))
}
