use std::{fmt::Display, future::Future};

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::models::retry::RetryConfig;

/// Calls `operation` up to `config.attempts()` times, pausing between tries
/// on the schedule from [`RetryConfig::scheduled_delay`] with jitter.
/// Returns the first success or the last error.
pub async fn retry_with_backoff<F, Fut, T, E>(config: &RetryConfig, operation: F) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let attempts = config.attempts();

    for attempt in 1..attempts {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    info!(attempt, attempts, "Operation succeeded after retrying");
                }
                return Ok(value);
            }
            Err(e) => {
                let pause = config.jittered_delay(attempt);
                debug!(
                    attempt,
                    attempts,
                    pause_ms = pause.as_millis() as u64,
                    error = %e,
                    "Attempt failed, retrying"
                );
                sleep(pause).await;
            }
        }
    }

    let result = operation().await;
    match &result {
        Ok(_) if attempts > 1 => {
            info!(
                attempt = attempts,
                attempts,
                "Operation succeeded after retrying"
            );
        }
        Ok(_) => {}
        Err(e) => warn!(attempts, error = %e, "Giving up after final attempt"),
    }
    result
}
