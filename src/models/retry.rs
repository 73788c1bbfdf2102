use std::time::Duration;

use crate::config::Config;

/// Jitter applied to each pause, as a fraction of the scheduled delay.
const JITTER_RATIO: f64 = 0.1;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: u64,
}

impl RetryConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.max_retry_attempts,
            initial_delay_ms: config.initial_retry_delay_ms,
            max_delay_ms: config.max_retry_delay_ms,
            backoff_multiplier: config.retry_backoff_multiplier,
        }
    }

    /// Attempts actually made; zero is treated as a single try.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Pause before retry number `retry` (1-based), before jitter:
    /// `initial * multiplier^(retry - 1)`, capped at `max_delay_ms`.
    pub fn scheduled_delay(&self, retry: u32) -> Duration {
        let growth = self
            .backoff_multiplier
            .max(1)
            .saturating_pow(retry.saturating_sub(1));
        let delay_ms = self
            .initial_delay_ms
            .saturating_mul(growth)
            .min(self.max_delay_ms);

        Duration::from_millis(delay_ms)
    }

    pub(crate) fn jittered_delay(&self, retry: u32) -> Duration {
        let factor = 1.0 + rand::random_range(-JITTER_RATIO..=JITTER_RATIO);
        self.scheduled_delay(retry).mul_f64(factor)
    }
}
