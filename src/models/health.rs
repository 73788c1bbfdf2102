use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    pub checks: HashMap<String, ServiceHealth>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub status: HealthStatus,

    /// Backend kind serving this dependency, e.g. `redis` or `in_memory`.
    pub backend: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ServiceHealth {
    pub fn healthy(backend: &str, response_time_ms: u64) -> Self {
        Self {
            status: HealthStatus::Healthy,
            backend: backend.to_string(),
            response_time_ms: Some(response_time_ms),
            error: None,
        }
    }

    pub fn unhealthy(backend: &str, error: String) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            backend: backend.to_string(),
            response_time_ms: None,
            error: Some(error),
        }
    }

    /// Reachable, but slower than the threshold the checker tolerates.
    pub fn degraded_slow(backend: &str, response_time_ms: u64) -> Self {
        Self {
            status: HealthStatus::Degraded,
            backend: backend.to_string(),
            response_time_ms: Some(response_time_ms),
            error: Some("Response time above threshold".to_string()),
        }
    }
}
