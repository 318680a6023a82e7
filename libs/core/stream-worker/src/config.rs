//! Worker configuration
//!
//! This module provides `WorkerConfig` for configuring a consumer loop.

use crate::registry::StreamDef;
use std::time::Duration;
use uuid::Uuid;

/// Configuration for one consumer loop
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Redis stream keys read by this loop
    pub streams: Vec<String>,

    /// Consumer group name
    pub consumer_group: String,

    /// Unique consumer ID (auto-generated if not provided)
    pub consumer_id: String,

    /// Blocking read timeout in milliseconds
    pub block_timeout_ms: u64,

    /// Minimum idle time before another consumer's pending entry is reclaimed
    pub claim_idle_ms: u64,

    /// How often pending entries are scanned for reclaiming
    pub claim_interval_ms: u64,

    /// Maximum entries reclaimed per stream and scan
    pub claim_batch_size: usize,

    /// Pause after a failed fetch before trying again
    pub error_pause_ms: u64,
}

impl WorkerConfig {
    /// Create a new WorkerConfig from a StreamDef
    pub fn from_stream_def<S: StreamDef>() -> Self {
        Self::new(S::STREAMS.iter().copied(), S::CONSUMER_GROUP)
            .with_block_timeout_ms(S::BLOCK_TIMEOUT_MS)
            .with_claim_idle_ms(S::CLAIM_IDLE_MS)
    }

    /// Create a new WorkerConfig with explicit values
    pub fn new<I, T>(streams: I, consumer_group: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            streams: streams.into_iter().map(Into::into).collect(),
            consumer_group: consumer_group.into(),
            consumer_id: format!("worker-{}", Uuid::new_v4()),
            block_timeout_ms: 5_000,
            claim_idle_ms: 30_000,
            claim_interval_ms: 60_000,
            claim_batch_size: 10,
            error_pause_ms: 1_000,
        }
    }

    /// Set the consumer group (e.g. from the environment)
    pub fn with_consumer_group(mut self, group: impl Into<String>) -> Self {
        self.consumer_group = group.into();
        self
    }

    /// Set the consumer ID
    pub fn with_consumer_id(mut self, id: impl Into<String>) -> Self {
        self.consumer_id = id.into();
        self
    }

    pub fn with_block_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.block_timeout_ms = timeout_ms;
        self
    }

    /// Set the idle time after which abandoned entries are reclaimed
    pub fn with_claim_idle_ms(mut self, idle_ms: u64) -> Self {
        self.claim_idle_ms = idle_ms;
        // scan at least twice per idle window
        self.claim_interval_ms = self.claim_interval_ms.min(idle_ms.max(1_000) * 2);
        self
    }

    pub fn with_claim_interval_ms(mut self, interval_ms: u64) -> Self {
        self.claim_interval_ms = interval_ms;
        self
    }

    pub fn with_claim_batch_size(mut self, size: usize) -> Self {
        self.claim_batch_size = size.max(1);
        self
    }

    pub fn with_error_pause_ms(mut self, pause_ms: u64) -> Self {
        self.error_pause_ms = pause_ms;
        self
    }

    pub fn claim_interval(&self) -> Duration {
        Duration::from_millis(self.claim_interval_ms)
    }

    pub fn error_pause(&self) -> Duration {
        Duration::from_millis(self.error_pause_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestStream;

    impl StreamDef for TestStream {
        const STREAMS: &'static [&'static str] = &["test:a", "test:b"];
        const CONSUMER_GROUP: &'static str = "test:group";
        const BLOCK_TIMEOUT_MS: u64 = 2_000;
    }

    #[test]
    fn test_from_stream_def() {
        let config = WorkerConfig::from_stream_def::<TestStream>();

        assert_eq!(config.streams, vec!["test:a", "test:b"]);
        assert_eq!(config.consumer_group, "test:group");
        assert_eq!(config.block_timeout_ms, 2_000);
        assert_eq!(config.claim_idle_ms, 30_000);
        assert!(config.consumer_id.starts_with("worker-"));
    }

    #[test]
    fn test_builder_pattern() {
        let config = WorkerConfig::new(["order_created"], "orders")
            .with_consumer_group("email_service_orders")
            .with_consumer_id("worker-1")
            .with_claim_idle_ms(5_000)
            .with_claim_batch_size(0)
            .with_error_pause_ms(250);

        assert_eq!(config.consumer_group, "email_service_orders");
        assert_eq!(config.consumer_id, "worker-1");
        assert_eq!(config.claim_interval_ms, 10_000);
        assert_eq!(config.claim_batch_size, 1);
        assert_eq!(config.error_pause(), Duration::from_millis(250));
    }

    #[test]
    fn test_unique_consumer_ids() {
        let a = WorkerConfig::new(["s"], "g");
        let b = WorkerConfig::new(["s"], "g");
        assert_ne!(a.consumer_id, b.consumer_id);
    }
}
