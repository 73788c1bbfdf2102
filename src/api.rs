use std::{future::Future, sync::Arc, time::Duration};

use anyhow::{Error, Result};
use axum::{
    Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{
    clients::health::HealthChecker,
    config::Config,
    error::NotificationError,
    models::{
        health::HealthStatus,
        message::{EnqueueResponse, NotificationRequest},
        metrics::MetricsSnapshot,
        response::ApiResponse,
        status::NotificationStatusRecord,
        webhook::{WebhookOutcome, WebhookPayload, WebhookResponse},
    },
    queue::NotificationQueue,
    services::{ingress::NotificationService, metrics::MetricsAggregator, webhook::WebhookReceiver},
    store::StatusStore,
};

pub struct AppState {
    notification_service: NotificationService,
    status_store: Arc<dyn StatusStore>,
    metrics: MetricsAggregator,
    webhook_receiver: WebhookReceiver,
    health_checker: HealthChecker,
}

impl AppState {
    pub fn new(
        store: Arc<dyn StatusStore>,
        queue: Arc<dyn NotificationQueue>,
        publish_timeout: Duration,
    ) -> Self {
        Self {
            notification_service: NotificationService::new(
                store.clone(),
                queue.clone(),
                publish_timeout,
            ),
            metrics: MetricsAggregator::new(store.clone()),
            webhook_receiver: WebhookReceiver::new(store.clone()),
            health_checker: HealthChecker::new(store.clone(), queue),
            status_store: store,
        }
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/notifications", post(enqueue_notification))
        .route("/status/{id}", get(get_status))
        .route("/metrics", get(get_metrics))
        .route("/webhook/callback", post(handle_webhook))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_api_server<F>(config: &Config, state: Arc<AppState>, shutdown: F) -> Result<(), Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = TcpListener::bind(&addr).await?;

    info!(address = %addr, "API server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

async fn enqueue_notification(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NotificationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<EnqueueResponse>>), NotificationError> {
    let Json(request) = payload.map_err(|e| NotificationError::Validation(e.body_text()))?;

    let notification_id = state.notification_service.enqueue(request).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse::success(
            EnqueueResponse::enqueued(notification_id),
            "Notification enqueued".to_string(),
        )),
    ))
}

async fn get_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<NotificationStatusRecord>, NotificationError> {
    state
        .status_store
        .get(&id)
        .await?
        .map(Json)
        .ok_or(NotificationError::UnknownNotification(id))
}

async fn get_metrics(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MetricsSnapshot>, NotificationError> {
    Ok(Json(state.metrics.snapshot().await?))
}

async fn handle_webhook(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<WebhookPayload>, JsonRejection>,
) -> Result<Json<WebhookResponse>, NotificationError> {
    let Json(payload) = payload.map_err(|e| NotificationError::Validation(e.body_text()))?;

    let status = match state.webhook_receiver.receive(&payload).await? {
        Some(_) => WebhookOutcome::Updated,
        None => WebhookOutcome::Ignored,
    };

    Ok(Json(WebhookResponse { status }))
}

async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_checker.check_all().await;

    let status_code = match health.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}
