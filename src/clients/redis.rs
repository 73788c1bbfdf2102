use std::collections::BTreeMap;

use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use redis::{AsyncCommands, Client, Script, aio::MultiplexedConnection};
use tracing::{debug, info, warn};

use crate::{
    error::NotificationError,
    models::{
        retry::RetryConfig,
        status::{AggregateStatus, ChannelStatus, NotificationStatusRecord},
    },
    store::StatusStore,
    utils::retry_with_backoff,
};

const INDEX_KEY: &str = "notifications:index";
const MAX_SWAP_ATTEMPTS: u32 = 32;

/// Swaps the record only if it still holds the value the caller read.
const COMPARE_AND_SWAP: &str = r#"
local current = redis.call('GET', KEYS[1])
if current == ARGV[1] then
    redis.call('SET', KEYS[1], ARGV[2], 'KEEPTTL')
    return 1
end
return 0
"#;

pub struct RedisStatusStore {
    connection: MultiplexedConnection,
    swap_script: Script,
}

fn record_key(notification_id: &str) -> String {
    format!("notification:{}", notification_id)
}

fn store_error(context: &str, e: redis::RedisError) -> NotificationError {
    NotificationError::Store(format!("{}: {}", context, e))
}

impl RedisStatusStore {
    pub async fn connect(redis_url: &str, retry_config: &RetryConfig) -> Result<Self, Error> {
        info!("Connecting to Redis");

        let client =
            Client::open(redis_url).map_err(|e| anyhow!("Failed to create redis client: {}", e))?;

        let connection = retry_with_backoff(retry_config, || {
            let client = client.clone();
            async move { client.get_multiplexed_async_connection().await }
        })
        .await
        .map_err(|e| anyhow!("Failed to connect to redis: {}", e))?;

        info!("Redis connection established");

        Ok(Self {
            connection,
            swap_script: Script::new(COMPARE_AND_SWAP),
        })
    }

    async fn load_raw(&self, key: &str) -> Result<Option<String>, NotificationError> {
        let mut conn = self.connection.clone();

        conn.get(key)
            .await
            .map_err(|e| store_error("Failed to read status record", e))
    }
}

#[async_trait]
impl StatusStore for RedisStatusStore {
    fn backend(&self) -> &'static str {
        "redis"
    }

    async fn create(
        &self,
        notification_id: &str,
        channels: &[String],
    ) -> Result<NotificationStatusRecord, NotificationError> {
        let record = NotificationStatusRecord::new(notification_id.to_string(), channels);
        let payload = serde_json::to_string(&record)?;
        let mut conn = self.connection.clone();

        let created: Option<String> = redis::cmd("SET")
            .arg(record_key(notification_id))
            .arg(&payload)
            .arg("NX")
            .query_async(&mut conn)
            .await
            .map_err(|e| store_error("Failed to create status record", e))?;

        if created.is_none() {
            return Err(NotificationError::DuplicateNotification(
                notification_id.to_string(),
            ));
        }

        conn.sadd::<_, _, ()>(INDEX_KEY, notification_id)
            .await
            .map_err(|e| store_error("Failed to index status record", e))?;

        debug!(notification_id, "Status record created");

        Ok(record)
    }

    async fn get(
        &self,
        notification_id: &str,
    ) -> Result<Option<NotificationStatusRecord>, NotificationError> {
        match self.load_raw(&record_key(notification_id)).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn update_channel(
        &self,
        notification_id: &str,
        channel: &str,
        status: ChannelStatus,
    ) -> Result<Option<NotificationStatusRecord>, NotificationError> {
        let key = record_key(notification_id);
        let mut conn = self.connection.clone();

        for attempt in 1..=MAX_SWAP_ATTEMPTS {
            let Some(current) = self.load_raw(&key).await? else {
                debug!(notification_id, channel, "Status update for unknown notification ignored");
                return Ok(None);
            };

            let mut record: NotificationStatusRecord = serde_json::from_str(&current)?;
            record.apply_channel_status(channel, status)?;
            let next = serde_json::to_string(&record)?;

            let swapped: i32 = self
                .swap_script
                .key(&key)
                .arg(&current)
                .arg(&next)
                .invoke_async(&mut conn)
                .await
                .map_err(|e| store_error("Failed to write status record", e))?;

            if swapped == 1 {
                return Ok(Some(record));
            }

            debug!(notification_id, channel, attempt, "Concurrent status write detected, retrying");
        }

        warn!(
            notification_id,
            channel,
            attempts = MAX_SWAP_ATTEMPTS,
            "Gave up on status update under contention"
        );

        Err(NotificationError::Store(format!(
            "Status update for {} did not converge after {} attempts",
            notification_id, MAX_SWAP_ATTEMPTS
        )))
    }

    async fn counts_by_aggregate_status(
        &self,
    ) -> Result<BTreeMap<AggregateStatus, u64>, NotificationError> {
        let mut conn = self.connection.clone();
        let mut counts = BTreeMap::new();

        let ids: Vec<String> = conn
            .smembers(INDEX_KEY)
            .await
            .map_err(|e| store_error("Failed to list status records", e))?;

        if ids.is_empty() {
            return Ok(counts);
        }

        let keys: Vec<String> = ids.iter().map(|id| record_key(id)).collect();

        let raws: Vec<Option<String>> = redis::cmd("MGET")
            .arg(&keys)
            .query_async(&mut conn)
            .await
            .map_err(|e| store_error("Failed to read status records", e))?;

        // Records expired by an external retention policy are simply skipped.
        for raw in raws.into_iter().flatten() {
            let record: NotificationStatusRecord = serde_json::from_str(&raw)?;
            *counts.entry(record.aggregate_status).or_insert(0) += 1;
        }

        Ok(counts)
    }

    async fn health_check(&self) -> Result<(), NotificationError> {
        let mut conn = self.connection.clone();

        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| store_error("Ping failed", e))?;

        Ok(())
    }
}
