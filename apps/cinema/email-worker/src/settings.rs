use core_config::{ConfigError, FromEnv, env_or_default, env_parse};
use domain_notifications::{OrderEventsStream, TokenDeliveryStream};
use std::time::Duration;
use stream_worker::{StreamDef, WorkerConfig};

/// Process-level settings of the email worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSettings {
    pub orders_group: String,
    pub tokens_group: String,
    pub orders_block_ms: u64,
    pub tokens_block_ms: u64,
    pub claim_idle_ms: u64,
    pub error_pause_ms: u64,
    pub health_port: u16,
    pub drain_timeout: Duration,
}

impl WorkerSettings {
    pub fn orders_worker_config(&self) -> WorkerConfig {
        WorkerConfig::from_stream_def::<OrderEventsStream>()
            .with_consumer_group(self.orders_group.clone())
            .with_block_timeout_ms(self.orders_block_ms)
            .with_claim_idle_ms(self.claim_idle_ms)
            .with_error_pause_ms(self.error_pause_ms)
    }

    pub fn tokens_worker_config(&self) -> WorkerConfig {
        WorkerConfig::from_stream_def::<TokenDeliveryStream>()
            .with_consumer_group(self.tokens_group.clone())
            .with_block_timeout_ms(self.tokens_block_ms)
            .with_claim_idle_ms(self.claim_idle_ms)
            .with_error_pause_ms(self.error_pause_ms)
    }
}

impl FromEnv for WorkerSettings {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            orders_group: env_or_default("ORDERS_EVENTS_GROUP", OrderEventsStream::CONSUMER_GROUP),
            tokens_group: env_or_default("TOKENS_DELIVERY_GROUP", TokenDeliveryStream::CONSUMER_GROUP),
            orders_block_ms: env_parse("ORDERS_EVENTS_BLOCK_MS", OrderEventsStream::BLOCK_TIMEOUT_MS)?,
            tokens_block_ms: env_parse("TOKENS_DELIVERY_BLOCK_MS", TokenDeliveryStream::BLOCK_TIMEOUT_MS)?,
            claim_idle_ms: env_parse("STREAM_CLAIM_IDLE_MS", OrderEventsStream::CLAIM_IDLE_MS)?,
            error_pause_ms: env_parse("STREAM_ERROR_PAUSE_MS", 1_000)?,
            health_port: env_parse("EMAIL_WORKER_HEALTH_PORT", 8081)?,
            drain_timeout: Duration::from_secs(env_parse("SHUTDOWN_DRAIN_TIMEOUT_SECS", 10)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEYS: [&str; 8] = [
        "ORDERS_EVENTS_GROUP",
        "TOKENS_DELIVERY_GROUP",
        "ORDERS_EVENTS_BLOCK_MS",
        "TOKENS_DELIVERY_BLOCK_MS",
        "STREAM_CLAIM_IDLE_MS",
        "STREAM_ERROR_PAUSE_MS",
        "EMAIL_WORKER_HEALTH_PORT",
        "SHUTDOWN_DRAIN_TIMEOUT_SECS",
    ];

    #[test]
    fn test_defaults() {
        temp_env::with_vars_unset(KEYS, || {
            let settings = WorkerSettings::from_env().unwrap();
            assert_eq!(settings.orders_group, "email_service_orders");
            assert_eq!(settings.tokens_group, "email_service_tokens");
            assert_eq!(settings.health_port, 8081);
            assert_eq!(settings.drain_timeout, Duration::from_secs(10));

            let tokens = settings.tokens_worker_config();
            assert_eq!(tokens.streams.len(), 2);
            assert_eq!(tokens.block_timeout_ms, 5_000);
            assert_eq!(tokens.error_pause(), Duration::from_secs(1));
        });
    }

    #[test]
    fn test_overrides() {
        temp_env::with_vars(
            [
                ("ORDERS_EVENTS_GROUP", Some("mail_orders_v2")),
                ("ORDERS_EVENTS_BLOCK_MS", Some("1000")),
                ("TOKENS_DELIVERY_BLOCK_MS", None),
                ("SHUTDOWN_DRAIN_TIMEOUT_SECS", Some("3")),
                ("STREAM_ERROR_PAUSE_MS", Some("250")),
            ],
            || {
                let settings = WorkerSettings::from_env().unwrap();
                let orders = settings.orders_worker_config();
                assert_eq!(orders.consumer_group, "mail_orders_v2");
                assert_eq!(orders.block_timeout_ms, 1_000);
                assert_eq!(settings.tokens_worker_config().block_timeout_ms, 5_000);
                assert_eq!(settings.drain_timeout, Duration::from_secs(3));
                assert_eq!(orders.error_pause(), Duration::from_millis(250));
                assert_eq!(settings.tokens_worker_config().error_pause(), Duration::from_millis(250));
            },
        );
    }

    #[test]
    fn test_invalid_port() {
        temp_env::with_var("EMAIL_WORKER_HEALTH_PORT", Some("http"), || {
            let err = WorkerSettings::from_env().unwrap_err();
            assert!(matches!(err, ConfigError::ParseError { ref key, .. } if key == "EMAIL_WORKER_HEALTH_PORT"));
        });
    }
}
