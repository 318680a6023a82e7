//! Redis Streams message source
//!
//! Reads one category's streams through a consumer group, reclaims entries
//! abandoned by dead consumers, and acknowledges entries on commit.

use crate::config::WorkerConfig;
use crate::error::StreamError;
use crate::message::{CommitToken, RawMessage};
use crate::registry::MessageSource;
use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::streams::{
    StreamAutoClaimOptions, StreamAutoClaimReply, StreamId, StreamReadOptions, StreamReadReply,
};
use redis::{AsyncCommands, RedisResult};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Entry field holding the JSON payload
pub const PAYLOAD_FIELD: &str = "payload";

/// Slack on top of the BLOCK timeout before a read counts as hung
const RESPONSE_TIMEOUT_MARGIN: Duration = Duration::from_secs(2);

/// Redis Streams implementation of `MessageSource`
pub struct RedisStreamConsumer {
    redis: Option<ConnectionManager>,
    config: WorkerConfig,
    buffered: VecDeque<RawMessage>,
    last_claim: Option<Instant>,
}

impl RedisStreamConsumer {
    /// Create a new consumer. The connection should not be shared with other
    /// loops, since XREADGROUP BLOCK holds it for the whole wait.
    pub fn new(redis: ConnectionManager, config: WorkerConfig) -> Self {
        Self {
            redis: Some(redis),
            config,
            buffered: VecDeque::new(),
            last_claim: None,
        }
    }

    /// Open a dedicated connection whose response timeout outlasts the blocking read.
    pub async fn connect(client: redis::Client, config: WorkerConfig) -> Result<Self, StreamError> {
        let response_timeout = Duration::from_millis(config.block_timeout_ms) + RESPONSE_TIMEOUT_MARGIN;
        let manager_config = ConnectionManagerConfig::new().set_response_timeout(Some(response_timeout));
        let redis = ConnectionManager::new_with_config(client, manager_config).await?;
        Ok(Self::new(redis, config))
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    fn connection(&mut self) -> Result<&mut ConnectionManager, StreamError> {
        self.redis.as_mut().ok_or(StreamError::Closed)
    }

    /// Create the consumer group on every stream if it doesn't exist
    pub async fn ensure_consumer_groups(&mut self) -> Result<(), StreamError> {
        let streams = self.config.streams.clone();
        let group = self.config.consumer_group.clone();
        let conn = self.connection()?;

        for stream in &streams {
            // Start from the beginning so nothing published before the first start is lost
            let result: RedisResult<()> = conn.xgroup_create_mkstream(stream, &group, "0").await;

            match result {
                Ok(()) => {
                    info!(stream = %stream, group = %group, "Created consumer group");
                }
                Err(e) if e.to_string().contains("BUSYGROUP") => {
                    debug!(stream = %stream, group = %group, "Consumer group already exists");
                }
                Err(e) => return Err(StreamError::Redis(e)),
            }
        }

        Ok(())
    }

    fn claim_due(&self) -> bool {
        self.last_claim
            .is_none_or(|last| last.elapsed() >= self.config.claim_interval())
    }

    /// Take over entries that sat unacknowledged longer than `claim_idle_ms`
    async fn claim_abandoned(&mut self) -> Result<(), StreamError> {
        self.last_claim = Some(Instant::now());

        let streams = self.config.streams.clone();
        let group = self.config.consumer_group.clone();
        let consumer = self.config.consumer_id.clone();
        let min_idle = self.config.claim_idle_ms;
        let batch_size = self.config.claim_batch_size;

        let mut claimed = Vec::new();
        {
            let conn = self.connection()?;
            for stream in &streams {
                let options = StreamAutoClaimOptions::default().count(batch_size);
                let reply: StreamAutoClaimReply = conn
                    .xautoclaim_options(stream, &group, &consumer, min_idle, "0-0", options)
                    .await?;

                for entry in reply.claimed {
                    claimed.push(to_raw_message(stream, entry).redelivered());
                }
            }
        }

        if !claimed.is_empty() {
            warn!(count = claimed.len(), group = %group, "Claimed abandoned messages");
            self.buffered.extend(claimed);
        }
        Ok(())
    }

    /// XREADGROUP over all streams; a block timeout leaves the buffer empty
    async fn read_new(&mut self) -> Result<(), StreamError> {
        let streams = self.config.streams.clone();
        let ids = vec![">"; streams.len()];
        let group = self.config.consumer_group.clone();
        let consumer = self.config.consumer_id.clone();
        let options = StreamReadOptions::default()
            .group(group, consumer)
            .count(1)
            .block(self.config.block_timeout_ms as usize);

        let conn = self.connection()?;
        let reply: Option<StreamReadReply> = conn.xread_options(&streams, &ids, &options).await?;

        if let Some(reply) = reply {
            for key in reply.keys {
                for entry in key.ids {
                    self.buffered.push_back(to_raw_message(&key.key, entry));
                }
            }
        }
        Ok(())
    }
}

fn to_raw_message(stream: &str, entry: StreamId) -> RawMessage {
    let payload = entry.get::<Vec<u8>>(PAYLOAD_FIELD).unwrap_or_default();
    RawMessage::from_entry(stream, entry.id, payload)
}

#[async_trait]
impl MessageSource for RedisStreamConsumer {
    async fn prepare(&mut self) -> Result<(), StreamError> {
        self.ensure_consumer_groups().await
    }

    async fn fetch(&mut self) -> Result<Option<RawMessage>, StreamError> {
        if let Some(message) = self.buffered.pop_front() {
            return Ok(Some(message));
        }

        if self.claim_due() {
            if let Err(e) = self.claim_abandoned().await {
                debug!(error = %e, "Error claiming abandoned messages");
            }
            if let Some(message) = self.buffered.pop_front() {
                return Ok(Some(message));
            }
        }

        match self.read_new().await {
            Ok(()) => Ok(self.buffered.pop_front()),
            Err(e) if e.is_nogroup_error() => {
                warn!("Consumer group missing, recreating");
                self.ensure_consumer_groups().await?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn commit(&mut self, token: CommitToken) -> Result<(), StreamError> {
        let group = self.config.consumer_group.clone();
        let conn = self.connection()?;

        let acked: i64 = conn.xack(token.stream(), &group, &[token.id()]).await?;
        if acked == 0 {
            debug!(stream = %token.stream(), id = %token.id(), "Message was already acknowledged");
        } else {
            debug!(stream = %token.stream(), id = %token.id(), "Acknowledged message");
        }
        Ok(())
    }

    async fn close(&mut self) {
        if self.redis.take().is_some() {
            info!(
                group = %self.config.consumer_group,
                consumer_id = %self.config.consumer_id,
                "Released stream connection"
            );
        }
        // Buffered entries stay pending in the group and will be reclaimed
        self.buffered.clear();
    }
}
