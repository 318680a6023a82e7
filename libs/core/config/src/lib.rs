pub mod redis;
pub mod tracing;

use std::env;
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

/// Configuration error type
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable '{0}' is required but not set")]
    MissingEnvVar(String),

    #[error("Failed to parse environment variable '{key}': {details}")]
    ParseError { key: String, details: String },
}

/// Application environment (dev = local/compose, prod = cluster deployment)
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn from_env() -> Self {
        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        if app_env.eq_ignore_ascii_case("production") {
            Environment::Production
        } else {
            Environment::Development
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

/// Trait for configuration that can be loaded from environment variables
pub trait FromEnv: Sized {
    fn from_env() -> Result<Self, ConfigError>;
}

/// Helper to load an environment variable with a default value
pub fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Helper to load an environment variable or return error
pub fn env_required(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Helper to load an optional environment variable; empty values count as unset
pub fn env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.is_empty())
}

/// Parse an environment variable, falling back to `default` when unset.
///
/// A value that is set but does not parse is an error rather than a silent default.
pub fn env_parse<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::ParseError {
            key: key.to_string(),
            details: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

/// Parse a boolean flag (`true`/`1`/`yes`, case-insensitive), falling back to `default`.
pub fn env_flag(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_defaults_to_development() {
        temp_env::with_var_unset("APP_ENV", || {
            let env = Environment::from_env();
            assert_eq!(env, Environment::Development);
            assert!(env.is_development());
            assert!(!env.is_production());
        });
    }

    #[test]
    fn test_environment_production_case_insensitive() {
        temp_env::with_var("APP_ENV", Some("PRODUCTION"), || {
            assert_eq!(Environment::from_env(), Environment::Production);
        });
        temp_env::with_var("APP_ENV", Some("staging"), || {
            assert_eq!(Environment::from_env(), Environment::Development);
        });
    }

    #[test]
    fn test_env_or_default() {
        temp_env::with_var("ORDER_CREATED_SUBJECT", Some("Your tickets"), || {
            assert_eq!(env_or_default("ORDER_CREATED_SUBJECT", "x"), "Your tickets");
        });
        temp_env::with_var_unset("ORDER_CREATED_SUBJECT", || {
            assert_eq!(env_or_default("ORDER_CREATED_SUBJECT", "x"), "x");
        });
    }

    #[test]
    fn test_env_required_missing() {
        temp_env::with_var_unset("CINEMA_SERVICE_ADDRESS", || {
            let err = env_required("CINEMA_SERVICE_ADDRESS").unwrap_err();
            assert!(err.to_string().contains("CINEMA_SERVICE_ADDRESS"));
            assert!(err.to_string().contains("required"));
        });
    }

    #[test]
    fn test_env_optional_treats_empty_as_unset() {
        temp_env::with_var("SMTP_USERNAME", Some(""), || {
            assert_eq!(env_optional("SMTP_USERNAME"), None);
        });
        temp_env::with_var("SMTP_USERNAME", Some("mailer"), || {
            assert_eq!(env_optional("SMTP_USERNAME").as_deref(), Some("mailer"));
        });
    }

    #[test]
    fn test_env_parse() {
        temp_env::with_var("ORDERS_EVENTS_BLOCK_MS", Some("2500"), || {
            assert_eq!(env_parse("ORDERS_EVENTS_BLOCK_MS", 1000u64).unwrap(), 2500);
        });
        temp_env::with_var_unset("ORDERS_EVENTS_BLOCK_MS", || {
            assert_eq!(env_parse("ORDERS_EVENTS_BLOCK_MS", 1000u64).unwrap(), 1000);
        });
        temp_env::with_var("ORDERS_EVENTS_BLOCK_MS", Some("soon"), || {
            let err = env_parse("ORDERS_EVENTS_BLOCK_MS", 1000u64).unwrap_err();
            assert!(matches!(err, ConfigError::ParseError { ref key, .. } if key == "ORDERS_EVENTS_BLOCK_MS"));
        });
    }

    #[test]
    fn test_env_flag() {
        temp_env::with_var("SMTP_USE_TLS", Some("TRUE"), || assert!(env_flag("SMTP_USE_TLS", false)));
        temp_env::with_var("SMTP_USE_TLS", Some("0"), || assert!(!env_flag("SMTP_USE_TLS", true)));
        temp_env::with_var_unset("SMTP_USE_TLS", || assert!(env_flag("SMTP_USE_TLS", true)));
    }
}
