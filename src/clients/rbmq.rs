use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use futures_util::StreamExt;
use lapin::{
    BasicProperties, Channel, Connection, ConnectionProperties, Consumer,
    options::{
        BasicAckOptions, BasicConsumeOptions, BasicPublishOptions, BasicQosOptions,
        BasicRejectOptions, QueueDeclareOptions,
    },
    types::FieldTable,
};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::{
    config::Config,
    error::NotificationError,
    models::{message::QueuedNotification, retry::RetryConfig},
    queue::{Delivery, NotificationQueue},
    utils::retry_with_backoff,
};

const CONSUMER_TAG: &str = "notification_worker";

struct BrokerSettings {
    url: String,
    queue_name: String,
    prefetch_count: u16,
    retry_config: RetryConfig,
}

/// One connection and its channel. Replaced wholesale on reconnect.
struct Session {
    _connection: Connection,
    channel: Channel,
    generation: u64,
}

pub struct RabbitMqClient {
    settings: BrokerSettings,
    session: RwLock<Arc<Session>>,
    reconnecting: tokio::sync::Mutex<()>,
    consumer: tokio::sync::Mutex<Option<Consumer>>,
    /// Local delivery tag -> (session generation, broker delivery tag).
    in_flight: Mutex<HashMap<u64, (u64, u64)>>,
    next_tag: AtomicU64,
}

async fn open_session(settings: &BrokerSettings, generation: u64) -> Result<Session, Error> {
    let connection = retry_with_backoff(&settings.retry_config, || {
        let url = settings.url.clone();
        async move { Connection::connect(&url, ConnectionProperties::default()).await }
    })
    .await
    .map_err(|e| anyhow!("Failed to connect to RabbitMQ: {}", e))?;

    let channel = connection
        .create_channel()
        .await
        .map_err(|e| anyhow!("RabbitMQ channel creation failed: {}", e))?;

    channel
        .basic_qos(settings.prefetch_count, BasicQosOptions::default())
        .await
        .map_err(|e| anyhow!("Failed to set up QoS: {}", e))?;

    channel
        .queue_declare(
            &settings.queue_name,
            QueueDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await
        .map_err(|e| anyhow!("Failed to declare notification queue: {}", e))?;

    Ok(Session {
        _connection: connection,
        channel,
        generation,
    })
}

impl RabbitMqClient {
    pub async fn connect(config: &Config) -> Result<Self, Error> {
        let url = config
            .rabbitmq_url
            .clone()
            .ok_or_else(|| anyhow!("RABBITMQ_URL is not set"))?;

        let settings = BrokerSettings {
            url,
            queue_name: config.notification_queue_name.clone(),
            prefetch_count: config.prefetch_count,
            retry_config: config.retry_config(),
        };

        info!("Connecting to RabbitMQ");
        let session = open_session(&settings, 0).await?;

        info!(
            queue = %settings.queue_name,
            prefetch_count = settings.prefetch_count,
            "RabbitMQ connection established"
        );

        Ok(Self {
            settings,
            session: RwLock::new(Arc::new(session)),
            reconnecting: tokio::sync::Mutex::new(()),
            consumer: tokio::sync::Mutex::new(None),
            in_flight: Mutex::new(HashMap::new()),
            next_tag: AtomicU64::new(1),
        })
    }

    fn current_session(&self) -> Arc<Session> {
        self.session.read().clone()
    }

    /// Opens a fresh session if the current channel is no longer usable.
    async fn ensure_connected(&self) -> Result<Arc<Session>, NotificationError> {
        let session = self.current_session();
        if session.channel.status().connected() {
            return Ok(session);
        }

        let _guard = self.reconnecting.lock().await;

        let session = self.current_session();
        if session.channel.status().connected() {
            return Ok(session);
        }

        warn!(generation = session.generation, "RabbitMQ channel closed, reconnecting");

        let fresh = open_session(&self.settings, session.generation + 1)
            .await
            .map_err(|e| NotificationError::DispatchQueue(e.to_string()))?;
        let fresh = Arc::new(fresh);
        *self.session.write() = fresh.clone();

        info!(generation = fresh.generation, "RabbitMQ connection re-established");

        Ok(fresh)
    }

    async fn create_consumer(&self, session: &Session) -> Result<Consumer, NotificationError> {
        let consumer = session
            .channel
            .basic_consume(
                &self.settings.queue_name,
                CONSUMER_TAG,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| {
                NotificationError::DispatchQueue(format!("Failed to create consumer: {}", e))
            })?;

        info!(queue = %self.settings.queue_name, "Consumer created for queue");

        Ok(consumer)
    }

    /// Resolves a local tag to the broker tag, if it still belongs to the
    /// live session. Deliveries from a dropped session were already returned
    /// to the queue by the broker.
    fn settle(&self, delivery_tag: u64) -> Result<Option<(Arc<Session>, u64)>, NotificationError> {
        let (generation, broker_tag) = self
            .in_flight
            .lock()
            .remove(&delivery_tag)
            .ok_or_else(|| {
                NotificationError::DispatchQueue(format!("Unknown delivery tag {}", delivery_tag))
            })?;

        let session = self.current_session();
        if session.generation != generation {
            debug!(delivery_tag, generation, "Delivery belongs to a closed session, skipping");
            return Ok(None);
        }

        Ok(Some((session, broker_tag)))
    }
}

#[async_trait]
impl NotificationQueue for RabbitMqClient {
    fn backend(&self) -> &'static str {
        "rabbitmq"
    }

    async fn publish(&self, message: &QueuedNotification) -> Result<(), NotificationError> {
        let session = self.ensure_connected().await?;
        let payload = serde_json::to_vec(message)?;

        let properties = BasicProperties::default()
            .with_delivery_mode(2)
            .with_content_type("application/json".into())
            .with_message_id(message.notification_id.clone().into());

        session
            .channel
            .basic_publish(
                "",
                &self.settings.queue_name,
                BasicPublishOptions::default(),
                &payload,
                properties,
            )
            .await
            .map_err(|e| NotificationError::DispatchQueue(format!("Failed to publish: {}", e)))?
            .await
            .map_err(|e| {
                NotificationError::DispatchQueue(format!("Publish was not confirmed: {}", e))
            })?;

        debug!(notification_id = %message.notification_id, "Message published to RabbitMQ");

        Ok(())
    }

    /// Never reports the queue as closed: a consumer stream that ends is an
    /// error, and the next call resubscribes, reconnecting first if needed.
    async fn receive(&self) -> Result<Option<Delivery>, NotificationError> {
        let mut consumer = self.consumer.lock().await;

        let session = self.ensure_connected().await?;

        if consumer.is_none() {
            *consumer = Some(self.create_consumer(&session).await?);
        }

        let Some(stream) = consumer.as_mut() else {
            return Err(NotificationError::DispatchQueue(
                "Consumer unavailable".to_string(),
            ));
        };

        match stream.next().await {
            Some(Ok(mut delivery)) => {
                let local_tag = self.next_tag.fetch_add(1, Ordering::Relaxed);
                self.in_flight
                    .lock()
                    .insert(local_tag, (session.generation, delivery.delivery_tag));

                Ok(Some(Delivery {
                    delivery_tag: local_tag,
                    key: delivery
                        .properties
                        .message_id()
                        .as_ref()
                        .map(|id| id.as_str().to_string()),
                    data: std::mem::take(&mut delivery.data),
                    redelivered: delivery.redelivered,
                }))
            }
            Some(Err(e)) => {
                *consumer = None;
                Err(NotificationError::DispatchQueue(format!(
                    "Failed to receive message: {}",
                    e
                )))
            }
            None => {
                *consumer = None;
                Err(NotificationError::DispatchQueue(
                    "Consumer stream ended".to_string(),
                ))
            }
        }
    }

    async fn acknowledge(&self, delivery_tag: u64) -> Result<(), NotificationError> {
        let Some((session, broker_tag)) = self.settle(delivery_tag)? else {
            return Ok(());
        };

        session
            .channel
            .basic_ack(broker_tag, BasicAckOptions::default())
            .await
            .map_err(|e| {
                NotificationError::DispatchQueue(format!("Failed to acknowledge message: {}", e))
            })?;

        Ok(())
    }

    async fn reject(&self, delivery_tag: u64, requeue: bool) -> Result<(), NotificationError> {
        let Some((session, broker_tag)) = self.settle(delivery_tag)? else {
            return Ok(());
        };

        session
            .channel
            .basic_reject(broker_tag, BasicRejectOptions { requeue })
            .await
            .map_err(|e| {
                NotificationError::DispatchQueue(format!("Failed to reject message: {}", e))
            })?;

        Ok(())
    }

    async fn health_check(&self) -> Result<(), NotificationError> {
        let session = self.current_session();

        if !session.channel.status().connected() {
            return Err(NotificationError::DispatchQueue(
                "RabbitMQ channel is closed".to_string(),
            ));
        }

        session
            .channel
            .queue_declare(
                &self.settings.queue_name,
                QueueDeclareOptions {
                    passive: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| {
                NotificationError::DispatchQueue(format!("Queue health check failed: {}", e))
            })?;

        Ok(())
    }
}
