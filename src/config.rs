use std::time::Duration;

use anyhow::{Error, Result, anyhow};
use dotenvy::dotenv;
use serde::Deserialize;

use crate::models::retry::RetryConfig;

#[derive(Clone, Deserialize, Debug)]
pub struct Config {
    /// Unset means the in-memory queue is used.
    pub rabbitmq_url: Option<String>,
    #[serde(default = "default_queue_name")]
    pub notification_queue_name: String,
    #[serde(default = "default_prefetch_count")]
    pub prefetch_count: u16,
    #[serde(default = "default_publish_timeout_ms")]
    pub publish_timeout_ms: u64,

    /// Unset means the in-memory status store is used.
    pub redis_url: Option<String>,

    #[serde(default = "default_max_retry_attempts")]
    pub max_retry_attempts: u32,
    #[serde(default = "default_initial_retry_delay_ms")]
    pub initial_retry_delay_ms: u64,
    #[serde(default = "default_max_retry_delay_ms")]
    pub max_retry_delay_ms: u64,
    #[serde(default = "default_retry_backoff_multiplier")]
    pub retry_backoff_multiplier: u64,

    #[serde(default = "default_worker_concurrency")]
    pub worker_concurrency: usize,

    #[serde(default = "default_server_port")]
    pub server_port: u16,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,
}

fn default_queue_name() -> String {
    "notifications".to_string()
}

fn default_prefetch_count() -> u16 {
    10
}

fn default_publish_timeout_ms() -> u64 {
    5000
}

fn default_max_retry_attempts() -> u32 {
    5
}

fn default_initial_retry_delay_ms() -> u64 {
    200
}

fn default_max_retry_delay_ms() -> u64 {
    5000
}

fn default_retry_backoff_multiplier() -> u64 {
    2
}

fn default_worker_concurrency() -> usize {
    4
}

fn default_server_port() -> u16 {
    8080
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl Config {
    pub fn load() -> Result<Self, Error> {
        dotenv().ok();

        let config = envy::from_env::<Self>()
            .map_err(|e| anyhow!("Invalid or missing environmental variable: {}", e))?;

        if config.worker_concurrency == 0 {
            return Err(anyhow!("WORKER_CONCURRENCY must be at least 1"));
        }

        Ok(config)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::from_config(self)
    }

    pub fn publish_timeout(&self) -> Duration {
        Duration::from_millis(self.publish_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rabbitmq_url: None,
            notification_queue_name: default_queue_name(),
            prefetch_count: default_prefetch_count(),
            publish_timeout_ms: default_publish_timeout_ms(),
            redis_url: None,
            max_retry_attempts: default_max_retry_attempts(),
            initial_retry_delay_ms: default_initial_retry_delay_ms(),
            max_retry_delay_ms: default_max_retry_delay_ms(),
            retry_backoff_multiplier: default_retry_backoff_multiplier(),
            worker_concurrency: default_worker_concurrency(),
            server_port: default_server_port(),
            log_dir: default_log_dir(),
        }
    }
}
