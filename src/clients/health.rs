use std::{collections::HashMap, sync::Arc, time::Instant};

use chrono::Utc;
use tracing::{debug, warn};

use crate::{
    error::NotificationError,
    models::health::{HealthCheckResponse, HealthStatus, ServiceHealth},
    queue::NotificationQueue,
    store::StatusStore,
};

const SLOW_RESPONSE_MS: u64 = 1000;

pub struct HealthChecker {
    store: Arc<dyn StatusStore>,
    queue: Arc<dyn NotificationQueue>,
}

impl HealthChecker {
    pub fn new(store: Arc<dyn StatusStore>, queue: Arc<dyn NotificationQueue>) -> Self {
        Self { store, queue }
    }

    pub async fn check_all(&self) -> HealthCheckResponse {
        let mut checks = HashMap::new();

        let store_health = self.check_status_store().await;
        checks.insert("status_store".to_string(), store_health);

        let queue_health = self.check_message_broker().await;
        checks.insert("message_broker".to_string(), queue_health);

        let overall_status = self.determine_overall_status(&checks);

        HealthCheckResponse {
            status: overall_status,
            timestamp: Utc::now(),
            checks,
        }
    }

    async fn check_status_store(&self) -> ServiceHealth {
        let start = Instant::now();
        let result = self.store.health_check().await;
        Self::to_service_health("status_store", self.store.backend(), start, result)
    }

    async fn check_message_broker(&self) -> ServiceHealth {
        let start = Instant::now();
        let result = self.queue.health_check().await;
        Self::to_service_health("message_broker", self.queue.backend(), start, result)
    }

    fn to_service_health(
        name: &str,
        backend: &str,
        start: Instant,
        result: Result<(), NotificationError>,
    ) -> ServiceHealth {
        let elapsed = start.elapsed().as_millis() as u64;

        match result {
            Ok(()) if elapsed > SLOW_RESPONSE_MS => {
                warn!(check = name, response_time_ms = elapsed, "Health check slow");
                ServiceHealth::degraded_slow(backend, elapsed)
            }
            Ok(()) => {
                debug!(check = name, response_time_ms = elapsed, "Health check passed");
                ServiceHealth::healthy(backend, elapsed)
            }
            Err(e) => {
                warn!(check = name, error = %e, "Health check failed");
                ServiceHealth::unhealthy(backend, e.to_string())
            }
        }
    }

    fn determine_overall_status(&self, checks: &HashMap<String, ServiceHealth>) -> HealthStatus {
        let has_unhealthy = checks
            .values()
            .any(|health| health.status == HealthStatus::Unhealthy);

        let has_degraded = checks
            .values()
            .any(|health| health.status == HealthStatus::Degraded);

        if has_unhealthy {
            HealthStatus::Unhealthy
        } else if has_degraded {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }
}
