use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Result;
use notification_service::{
    api::{AppState, create_router},
    queue::{InMemoryQueue, NotificationQueue},
    store::{InMemoryStatusStore, StatusStore},
};
use reqwest::StatusCode;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use crate::common::UnreachableQueue;

struct TestServer {
    addr: SocketAddr,
    client: reqwest::Client,
}

impl TestServer {
    async fn start(store: Arc<dyn StatusStore>, queue: Arc<dyn NotificationQueue>) -> Result<Self> {
        let state = Arc::new(AppState::new(store, queue, Duration::from_secs(1)));
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        tokio::spawn(async move {
            let _ = axum::serve(listener, create_router(state)).await;
        });

        Ok(Self {
            addr,
            client: reqwest::Client::new(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Test: POST /notifications accepts a request and the status is readable at once
#[tokio::test]
async fn test_enqueue_then_read_status() -> Result<()> {
    let store = Arc::new(InMemoryStatusStore::new());
    let queue = Arc::new(InMemoryQueue::new());
    let server = TestServer::start(store, queue.clone()).await?;

    let response = server
        .client
        .post(server.url("/notifications"))
        .json(&json!({
            "channels": ["email", "sms"],
            "recipientIds": ["u1"],
            "message": "hello"
        }))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body: Value = response.json().await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "enqueued");
    let notification_id = body["data"]["notificationId"]
        .as_str()
        .expect("notification id should be a string")
        .to_string();

    let response = server
        .client
        .get(server.url(&format!("/status/{}", notification_id)))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let record: Value = response.json().await?;
    assert_eq!(record["notification_id"], notification_id.as_str());
    assert_eq!(record["status"], "ENQUEUED");
    assert_eq!(record["channel_statuses"]["email"], "PENDING");
    assert_eq!(record["channel_statuses"]["sms"], "PENDING");

    assert_eq!(queue.ready_count(), 1);

    Ok(())
}

/// Test: Malformed and incomplete bodies are rejected with 400
#[tokio::test]
async fn test_enqueue_rejects_bad_bodies() -> Result<()> {
    let queue = Arc::new(InMemoryQueue::new());
    let server = TestServer::start(Arc::new(InMemoryStatusStore::new()), queue.clone()).await?;

    let response = server
        .client
        .post(server.url("/notifications"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = server
        .client
        .post(server.url("/notifications"))
        .json(&json!({ "channels": [], "recipientIds": ["u1"], "message": "hi" }))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await?;
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());

    assert_eq!(queue.ready_count(), 0);

    Ok(())
}

/// Test: Queue failures surface as 503
#[tokio::test]
async fn test_enqueue_reports_unavailable_queue() -> Result<()> {
    let server = TestServer::start(
        Arc::new(InMemoryStatusStore::new()),
        Arc::new(UnreachableQueue),
    )
    .await?;

    let response = server
        .client
        .post(server.url("/notifications"))
        .json(&json!({ "channels": ["push"], "recipientIds": ["u1"], "message": "hi" }))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    Ok(())
}

/// Test: Unknown identifiers return 404
#[tokio::test]
async fn test_status_of_unknown_notification() -> Result<()> {
    let server = TestServer::start(
        Arc::new(InMemoryStatusStore::new()),
        Arc::new(InMemoryQueue::new()),
    )
    .await?;

    let response = server
        .client
        .get(server.url("/status/does-not-exist"))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}

/// Test: Webhook callbacks update known notifications and ignore unknown ones
#[tokio::test]
async fn test_webhook_callback() -> Result<()> {
    let store = Arc::new(InMemoryStatusStore::new());
    store.create("n-1", &["email".to_string()]).await?;
    let server = TestServer::start(store.clone(), Arc::new(InMemoryQueue::new())).await?;

    let response = server
        .client
        .post(server.url("/webhook/callback"))
        .json(&json!({ "notification_id": "n-1", "channel": "email", "status": "COMPLETED" }))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await?;
    assert_eq!(body["status"], "updated");

    let record = store.get("n-1").await?.expect("record should exist");
    assert_eq!(record.aggregate_status.as_str(), "COMPLETED");

    let response = server
        .client
        .post(server.url("/webhook/callback"))
        .json(&json!({ "notification_id": "ghost", "channel": "email", "status": "COMPLETED" }))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await?;
    assert_eq!(body["status"], "ignored");

    let response = server
        .client
        .post(server.url("/webhook/callback"))
        .json(&json!({ "notification_id": "n-1", "channel": "email" }))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    Ok(())
}

/// Test: Metrics and health endpoints report current state
#[tokio::test]
async fn test_metrics_and_health() -> Result<()> {
    let store = Arc::new(InMemoryStatusStore::new());
    store.create("n-1", &["email".to_string()]).await?;
    let server = TestServer::start(store, Arc::new(InMemoryQueue::new())).await?;

    let response = server.client.get(server.url("/metrics")).send().await?;
    assert_eq!(response.status(), StatusCode::OK);
    let metrics: Value = response.json().await?;
    assert_eq!(metrics["total_sent"], 1);
    assert_eq!(metrics["by_status"]["ENQUEUED"], 1);

    let response = server.client.get(server.url("/health")).send().await?;
    assert_eq!(response.status(), StatusCode::OK);
    let health: Value = response.json().await?;
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["checks"]["status_store"]["backend"], "in_memory");
    assert_eq!(health["checks"]["message_broker"]["backend"], "in_memory");

    Ok(())
}

/// Test: Health reports unavailable when the broker is down
#[tokio::test]
async fn test_health_reports_unhealthy_broker() -> Result<()> {
    let server = TestServer::start(
        Arc::new(InMemoryStatusStore::new()),
        Arc::new(UnreachableQueue),
    )
    .await?;

    let response = server.client.get(server.url("/health")).send().await?;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let health: Value = response.json().await?;
    assert_eq!(health["status"], "unhealthy");
    assert_eq!(health["checks"]["message_broker"]["status"], "unhealthy");

    Ok(())
}
