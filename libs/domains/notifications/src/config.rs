//! Mail and upstream settings, loaded once at startup.

use crate::models::MailKind;
use core_config::{ConfigError, FromEnv, env_optional, env_or_default};
use grpc_client::ChannelSecurity;
use std::collections::HashMap;

/// Subject and template key for one mail kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailTemplate {
    pub subject: String,
    pub template: String,
}

/// Subjects and template keys per mail kind.
#[derive(Debug, Clone)]
pub struct MailSettings {
    templates: HashMap<MailKind, MailTemplate>,
}

impl MailSettings {
    pub fn new() -> Self {
        let mut templates = HashMap::new();
        templates.insert(
            MailKind::OrderCreated,
            MailTemplate {
                subject: "Your tickets".to_string(),
                template: "order_created".to_string(),
            },
        );
        templates.insert(
            MailKind::EmailVerification,
            MailTemplate {
                subject: "Confirm your email address".to_string(),
                template: "email_verification".to_string(),
            },
        );
        templates.insert(
            MailKind::ChangingPassword,
            MailTemplate {
                subject: "Password change".to_string(),
                template: "change_password".to_string(),
            },
        );
        Self { templates }
    }

    pub fn with_template(mut self, kind: MailKind, subject: impl Into<String>, template: impl Into<String>) -> Self {
        self.templates.insert(
            kind,
            MailTemplate {
                subject: subject.into(),
                template: template.into(),
            },
        );
        self
    }

    pub fn get(&self, kind: MailKind) -> Option<&MailTemplate> {
        self.templates.get(&kind)
    }
}

impl Default for MailSettings {
    fn default() -> Self {
        Self::new()
    }
}

impl FromEnv for MailSettings {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::new();
        let mut settings = Self::new();

        let keys = [
            (MailKind::OrderCreated, "ORDER_CREATED_SUBJECT", "ORDER_CREATED_TEMPLATE"),
            (MailKind::EmailVerification, "EMAIL_VERIFICATION_SUBJECT", "EMAIL_VERIFICATION_TEMPLATE"),
            (MailKind::ChangingPassword, "CHANGE_PASSWORD_SUBJECT", "CHANGE_PASSWORD_TEMPLATE"),
        ];
        for (kind, subject_key, template_key) in keys {
            let Some(default) = defaults.get(kind) else {
                continue;
            };
            settings = settings.with_template(
                kind,
                env_or_default(subject_key, &default.subject),
                env_or_default(template_key, &default.template),
            );
        }

        Ok(settings)
    }
}

/// Address and transport security of one upstream gRPC service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamConfig {
    pub addr: String,
    pub security: ChannelSecurity,
}

impl UpstreamConfig {
    pub fn insecure(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            security: ChannelSecurity::Insecure,
        }
    }

    /// Read `<PREFIX>_ADDR`, `<PREFIX>_SECURITY` and `<PREFIX>_SERVER_NAME`.
    pub fn from_env_prefixed(prefix: &str, default_addr: &str) -> Result<Self, ConfigError> {
        let addr = env_or_default(&format!("{prefix}_ADDR"), default_addr);
        let security_key = format!("{prefix}_SECURITY");
        let method = env_or_default(&security_key, "INSECURE");
        let server_name = env_optional(&format!("{prefix}_SERVER_NAME"));

        let security =
            ChannelSecurity::from_method(&method, server_name).map_err(|e| ConfigError::ParseError {
                key: security_key,
                details: e.to_string(),
            })?;

        Ok(Self { addr, security })
    }

    pub fn cinema_service_from_env() -> Result<Self, ConfigError> {
        Self::from_env_prefixed("CINEMA_SERVICE", "localhost:9090")
    }

    pub fn movies_service_from_env() -> Result<Self, ConfigError> {
        Self::from_env_prefixed("MOVIES_SERVICE", "localhost:9091")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mail_settings_defaults() {
        temp_env::with_vars_unset(["ORDER_CREATED_SUBJECT", "ORDER_CREATED_TEMPLATE"], || {
            let settings = MailSettings::from_env().unwrap();
            let order = settings.get(MailKind::OrderCreated).unwrap();
            assert_eq!(order.template, "order_created");
        });
    }

    #[test]
    fn test_mail_settings_from_env() {
        temp_env::with_vars(
            [
                ("EMAIL_VERIFICATION_SUBJECT", Some("Подтверждение почты")),
                ("EMAIL_VERIFICATION_TEMPLATE", Some("verify_v2")),
            ],
            || {
                let settings = MailSettings::from_env().unwrap();
                let verification = settings.get(MailKind::EmailVerification).unwrap();
                assert_eq!(verification.subject, "Подтверждение почты");
                assert_eq!(verification.template, "verify_v2");
            },
        );
    }

    #[test]
    fn test_upstream_config_from_env() {
        temp_env::with_vars(
            [
                ("CINEMA_SERVICE_ADDR", Some("cinema:443")),
                ("CINEMA_SERVICE_SECURITY", Some("CLIENT_WITH_SYSTEM_CERT_POOL")),
                ("CINEMA_SERVICE_SERVER_NAME", Some("cinema.internal")),
            ],
            || {
                let config = UpstreamConfig::cinema_service_from_env().unwrap();
                assert_eq!(config.addr, "cinema:443");
                assert_eq!(
                    config.security,
                    ChannelSecurity::SystemRoots {
                        server_name: "cinema.internal".to_string()
                    }
                );
            },
        );
    }

    #[test]
    fn test_upstream_config_rejects_unknown_security() {
        temp_env::with_vars(
            [("MOVIES_SERVICE_SECURITY", Some("MTLS")), ("MOVIES_SERVICE_ADDR", None)],
            || {
                let err = UpstreamConfig::movies_service_from_env().unwrap_err();
                assert!(matches!(err, ConfigError::ParseError { key, .. } if key == "MOVIES_SERVICE_SECURITY"));
            },
        );
    }
}
