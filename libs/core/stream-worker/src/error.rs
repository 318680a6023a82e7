//! Error types and the service error taxonomy.
//!
//! Every failure a handler can produce is coerced into [`ServiceError`] before
//! the consumer loop looks at it. The kind only drives logging and metrics;
//! the commit decision is binary (handler succeeded or not).

use crate::context::{Context, ContextError};
use strum::{AsRefStr, Display};
use thiserror::Error;

/// Closed set of failure kinds the pipeline reasons about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    Canceled,
    DeadlineExceeded,
    NotFound,
    Internal,
    Unknown,
}

/// Classified failure of a handler or one of its upstream calls.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct ServiceError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ServiceError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn canceled(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Canceled, message)
    }

    pub fn deadline_exceeded(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DeadlineExceeded, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unknown, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }
}

impl From<ContextError> for ServiceError {
    fn from(err: ContextError) -> Self {
        let kind = match err {
            ContextError::Canceled => ErrorKind::Canceled,
            ContextError::DeadlineExceeded => ErrorKind::DeadlineExceeded,
        };
        Self::new(kind, err.to_string())
    }
}

#[cfg(feature = "tonic")]
impl From<tonic::Status> for ServiceError {
    fn from(status: tonic::Status) -> Self {
        use tonic::Code;

        let kind = match status.code() {
            Code::Cancelled => ErrorKind::Canceled,
            Code::DeadlineExceeded => ErrorKind::DeadlineExceeded,
            Code::NotFound => ErrorKind::NotFound,
            Code::Internal => ErrorKind::Internal,
            _ => ErrorKind::Unknown,
        };
        Self::new(kind, status.message())
    }
}

/// Normalize `err` against the context that governed the failing call.
///
/// A cancelled context yields `Canceled`, an expired one `DeadlineExceeded`.
/// Otherwise the kind carried by the error is preserved.
pub fn classify<E>(ctx: &Context, err: E) -> ServiceError
where
    E: Into<ServiceError>,
{
    match ctx.err() {
        Some(ctx_err) => ServiceError::from(ctx_err),
        None => err.into(),
    }
}

/// Reasons a raw message cannot become a domain event. Always terminal.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("message has no payload")]
    EmptyPayload,

    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no event is bound to stream '{0}'")]
    UnknownStream(String),

    #[error("invalid field '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// Broker-side errors
#[derive(Error, Debug)]
pub enum StreamError {
    /// Redis connection or command error
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Source used after `close`
    #[error("Stream source is closed")]
    Closed,
}

impl StreamError {
    /// The consumer group (or the stream itself) vanished under us.
    pub fn is_nogroup_error(&self) -> bool {
        matches!(self, StreamError::Redis(e) if e.to_string().contains("NOGROUP"))
    }

    pub fn is_connection_error(&self) -> bool {
        matches!(self, StreamError::Redis(e) if e.is_connection_dropped() || e.is_io_error() || e.is_connection_refusal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_kind_display() {
        assert_eq!(ErrorKind::DeadlineExceeded.to_string(), "deadline_exceeded");
        assert_eq!(ErrorKind::NotFound.as_ref(), "not_found");
        assert_eq!(
            ServiceError::not_found("hall not found").to_string(),
            "not_found: hall not found"
        );
    }

    #[test]
    fn test_classify_preserves_kind_on_live_context() {
        let ctx = Context::background();
        let err = classify(&ctx, ServiceError::not_found("screening with specified id not found"));
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert!(err.is_not_found());
    }

    #[test]
    fn test_classify_cancelled_context_wins() {
        let ctx = Context::background();
        ctx.cancel();
        let err = classify(&ctx, ServiceError::internal("connection reset"));
        assert_eq!(err.kind, ErrorKind::Canceled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_classify_expired_context() {
        let ctx = Context::background().with_time_to_live(Duration::from_secs(1));
        tokio::time::advance(Duration::from_secs(2)).await;
        let err = classify(&ctx, ServiceError::unknown("transport closed"));
        assert_eq!(err.kind, ErrorKind::DeadlineExceeded);
    }

    #[cfg(feature = "tonic")]
    #[test]
    fn test_status_mapping() {
        let cases = [
            (tonic::Status::cancelled("x"), ErrorKind::Canceled),
            (tonic::Status::deadline_exceeded("x"), ErrorKind::DeadlineExceeded),
            (tonic::Status::not_found("x"), ErrorKind::NotFound),
            (tonic::Status::internal("x"), ErrorKind::Internal),
            (tonic::Status::unavailable("x"), ErrorKind::Unknown),
            (tonic::Status::invalid_argument("x"), ErrorKind::Unknown),
        ];
        for (status, kind) in cases {
            assert_eq!(ServiceError::from(status).kind, kind);
        }
    }

    #[test]
    fn test_decode_error_from_json() {
        let err = serde_json::from_slice::<serde_json::Value>(b"{").unwrap_err();
        let err = DecodeError::from(err);
        assert!(err.to_string().starts_with("invalid JSON payload"));
    }
}
