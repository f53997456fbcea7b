//! Bounded retry for operations that lose a lock race.

use std::future::Future;
use std::time::Duration;

use kosh_core::ledger::LedgerError;
use kosh_shared::config::RetryConfig;
use tracing::warn;

/// Runs `op` until it succeeds, fails with a non-retryable error, or
/// `config.max_attempts` is reached.
///
/// Attempt `n` waits `n * backoff_ms` before running again. Each attempt
/// must open its own transaction.
pub async fn with_retry<T, F, Fut>(
    config: &RetryConfig,
    operation: &'static str,
    mut op: F,
) -> Result<T, LedgerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LedgerError>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Err(err) if err.is_retryable() && attempt < max_attempts => {
                warn!(
                    operation,
                    attempt,
                    max_attempts,
                    error = %err,
                    "Concurrent modification, retrying"
                );
                tokio::time::sleep(Duration::from_millis(
                    config.backoff_ms.saturating_mul(u64::from(attempt)),
                ))
                .await;
                attempt += 1;
            }
            result => return result,
        }
    }
}
