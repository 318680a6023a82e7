//! Error types for the notifications domain.

use stream_worker::ServiceError;
use thiserror::Error;

/// Result type for notification operations.
pub type NotificationResult<T> = Result<T, NotificationError>;

/// Errors raised while building or delivering a notification.
///
/// None of these carry a kind of their own; at the handler boundary they all
/// become `Internal` service errors.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// Email provider error.
    #[error("Email provider error: {0}")]
    ProviderError(String),

    /// Template rendering error.
    #[error("Template rendering error: {0}")]
    TemplateError(String),

    /// QR code generation error.
    #[error("Artifact generation error: {0}")]
    ArtifactError(String),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<handlebars::RenderError> for NotificationError {
    fn from(err: handlebars::RenderError) -> Self {
        NotificationError::TemplateError(err.to_string())
    }
}

impl From<serde_json::Error> for NotificationError {
    fn from(err: serde_json::Error) -> Self {
        NotificationError::Internal(format!("JSON serialization error: {}", err))
    }
}

impl From<NotificationError> for ServiceError {
    fn from(err: NotificationError) -> Self {
        ServiceError::internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stream_worker::ErrorKind;

    #[test]
    fn test_notification_errors_are_internal() {
        let err: ServiceError = NotificationError::ProviderError("SMTP send failed".to_string()).into();
        assert_eq!(err.kind, ErrorKind::Internal);
        assert_eq!(err.message, "Email provider error: SMTP send failed");
    }
}
