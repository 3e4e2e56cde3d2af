//! Redis-backed store
//!
//! Job records are hashes under `job:<id>`, the index is the `jobs:index`
//! set, and dispatch entries live in a stream read through a consumer group.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::streams::{StreamReadOptions, StreamReadReply};
use redis::{AsyncCommands, Client};
use std::collections::HashMap;
use tracing::{debug, error, info, warn};

use super::{ReadGroup, Store, StreamMessage};
use crate::backoff::Backoff;
use crate::error::{Result, StoreError};
use crate::keys::{JOB_INDEX_KEY, job_key};

/// Store backed by a Redis server
///
/// Cloning is cheap; clones share one multiplexed connection that reconnects
/// on its own after failures.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connects to Redis
    ///
    /// # Arguments
    /// * `redis_url` - Connection URL (e.g., "redis://localhost:6379/0")
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)?;
        let conn = client.get_connection_manager().await?;

        Ok(Self { conn })
    }

    /// Connects to Redis, retrying with exponential backoff
    ///
    /// Redis may not be ready yet when the process starts (common in
    /// container environments). Gives up after `max_attempts`.
    pub async fn connect_with_retry(
        redis_url: &str,
        max_attempts: u32,
        mut backoff: Backoff,
    ) -> Result<Self> {
        let mut attempt = 0;

        loop {
            attempt += 1;

            let result = async {
                let store = Self::connect(redis_url).await?;
                store.ping().await?;
                Ok::<_, StoreError>(store)
            }
            .await;

            match result {
                Ok(store) => {
                    if attempt > 1 {
                        info!("Connected to Redis after {} attempt(s)", attempt);
                    }
                    return Ok(store);
                }
                Err(e) if attempt >= max_attempts => {
                    error!("Failed to connect to Redis after {} attempts", attempt);
                    return Err(e);
                }
                Err(e) => {
                    let delay = backoff.next_delay();
                    warn!(
                        "Failed to connect to Redis (attempt {}/{}): {}",
                        attempt, max_attempts, e
                    );
                    warn!("Retrying in {:?}...", delay);
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    fn connection(&self) -> ConnectionManager {
        self.conn.clone()
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn insert_job(&self, job_id: &str, fields: &[(&str, String)]) -> Result<()> {
        let mut conn = self.connection();

        let mut pipe = redis::pipe();
        pipe.atomic()
            .hset_multiple(job_key(job_id), fields)
            .ignore()
            .sadd(JOB_INDEX_KEY, job_id)
            .ignore();

        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    async fn update_job(&self, job_id: &str, fields: &[(&str, String)]) -> Result<()> {
        let mut conn = self.connection();
        let _: () = conn.hset_multiple(job_key(job_id), fields).await?;
        Ok(())
    }

    async fn job_fields(&self, job_id: &str) -> Result<HashMap<String, String>> {
        let mut conn = self.connection();
        let fields: HashMap<String, String> = conn.hgetall(job_key(job_id)).await?;
        Ok(fields)
    }

    async fn job_ids(&self) -> Result<Vec<String>> {
        let mut conn = self.connection();
        let ids: Vec<String> = conn.smembers(JOB_INDEX_KEY).await?;
        Ok(ids)
    }

    async fn jobs_fields(&self, job_ids: &[String]) -> Result<Vec<HashMap<String, String>>> {
        if job_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.connection();

        // One round trip for all records
        let mut pipe = redis::pipe();
        for id in job_ids {
            pipe.hgetall(job_key(id));
        }

        let records: Vec<HashMap<String, String>> = pipe.query_async(&mut conn).await?;
        Ok(records)
    }

    async fn create_group(&self, stream: &str, group: &str) -> Result<()> {
        let mut conn = self.connection();

        // Start at 0 so entries appended before the group existed are delivered
        let result: redis::RedisResult<()> = conn.xgroup_create_mkstream(stream, group, "0").await;

        match result {
            Ok(()) => {
                debug!("Created consumer group {} on stream {}", group, stream);
                Ok(())
            }
            Err(e) if e.code() == Some("BUSYGROUP") => {
                debug!("Consumer group {} already exists", group);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn append(&self, stream: &str, fields: &[(&str, String)]) -> Result<String> {
        let mut conn = self.connection();
        let id: String = conn.xadd(stream, "*", fields).await?;
        Ok(id)
    }

    async fn read_group(&self, read: ReadGroup<'_>) -> Result<Vec<StreamMessage>> {
        let mut conn = self.connection();

        let options = StreamReadOptions::default()
            .group(read.group, read.consumer)
            .count(read.count)
            .block(read.block.as_millis() as usize);

        // Nil reply means the block timeout elapsed without new entries
        let reply: Option<StreamReadReply> = conn
            .xread_options(&[read.stream], &[">"], &options)
            .await?;

        Ok(into_messages(reply))
    }

    async fn read_pending(&self, read: ReadGroup<'_>) -> Result<Vec<StreamMessage>> {
        let mut conn = self.connection();

        let options = StreamReadOptions::default()
            .group(read.group, read.consumer)
            .count(read.count);

        // ID 0 replays this consumer's own pending list instead of new entries
        let reply: Option<StreamReadReply> = conn
            .xread_options(&[read.stream], &["0"], &options)
            .await?;

        Ok(into_messages(reply))
    }

    async fn ack(&self, stream: &str, group: &str, entry_id: &str) -> Result<()> {
        let mut conn = self.connection();
        let _: i64 = conn.xack(stream, group, &[entry_id]).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.connection();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

fn into_messages(reply: Option<StreamReadReply>) -> Vec<StreamMessage> {
    reply
        .map(|r| r.keys)
        .unwrap_or_default()
        .into_iter()
        .flat_map(|key| key.ids)
        .map(|entry| StreamMessage {
            id: entry.id,
            fields: entry
                .map
                .into_iter()
                .filter_map(|(field, value)| {
                    redis::from_redis_value::<Vec<u8>>(&value)
                        .ok()
                        .map(|bytes| (field, bytes))
                })
                .collect(),
        })
        .collect()
}
