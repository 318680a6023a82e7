use crate::{ConfigError, FromEnv};

/// Redis configuration
///
/// `REDIS_URL` is preferred; `REDIS_HOST` is accepted for compatibility with
/// older deployment manifests.
#[derive(Clone, Debug)]
pub struct RedisConfig {
    pub url: String,
    pub database: Option<u8>,
}

impl RedisConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            database: None,
        }
    }

    /// Connection URL with the database number appended when one is configured.
    pub fn connection_url(&self) -> String {
        match self.database {
            Some(db) => format!("{}/{}", self.url.trim_end_matches('/'), db),
            None => self.url.clone(),
        }
    }
}

impl FromEnv for RedisConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let url = std::env::var("REDIS_URL")
            .or_else(|_| std::env::var("REDIS_HOST"))
            .map_err(|_| ConfigError::MissingEnvVar("REDIS_URL or REDIS_HOST".to_string()))?;

        let database = match std::env::var("REDIS_DATABASE") {
            Ok(db) => Some(db.parse().map_err(|e| ConfigError::ParseError {
                key: "REDIS_DATABASE".to_string(),
                details: format!("{}", e),
            })?),
            Err(_) => None,
        };

        Ok(Self { url, database })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redis_config_prefers_url() {
        temp_env::with_vars(
            [
                ("REDIS_URL", Some("redis://primary:6379")),
                ("REDIS_HOST", Some("redis://legacy:6379")),
                ("REDIS_DATABASE", None),
            ],
            || {
                let config = RedisConfig::from_env().unwrap();
                assert_eq!(config.url, "redis://primary:6379");
                assert_eq!(config.database, None);
            },
        );
    }

    #[test]
    fn test_redis_config_falls_back_to_host() {
        temp_env::with_vars(
            [("REDIS_URL", None), ("REDIS_HOST", Some("redis://legacy:6379"))],
            || {
                let config = RedisConfig::from_env().unwrap();
                assert_eq!(config.url, "redis://legacy:6379");
            },
        );
    }

    #[test]
    fn test_redis_config_missing() {
        temp_env::with_vars_unset(["REDIS_URL", "REDIS_HOST"], || {
            let err = RedisConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("REDIS_URL or REDIS_HOST"));
        });
    }

    #[test]
    fn test_redis_config_invalid_database() {
        temp_env::with_vars(
            [
                ("REDIS_URL", Some("redis://localhost:6379")),
                ("REDIS_DATABASE", Some("sixteen")),
            ],
            || {
                let err = RedisConfig::from_env().unwrap_err();
                assert!(matches!(err, ConfigError::ParseError { .. }));
            },
        );
    }

    #[test]
    fn test_connection_url_applies_database() {
        let mut config = RedisConfig::new("redis://localhost:6379/");
        assert_eq!(config.connection_url(), "redis://localhost:6379/");
        config.database = Some(3);
        assert_eq!(config.connection_url(), "redis://localhost:6379/3");
    }
}
