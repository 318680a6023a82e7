//! Domain events and their decoding from raw stream entries.
//!
//! Each consumer loop decodes exactly one event type. A decode failure is
//! permanent: the entry is committed and never handed to a handler.

use crate::models::{MailKind, Order};
use crate::streams::{EMAIL_VERIFICATION_STREAM, PASSWORD_CHANGE_STREAM};
use lettre::Address;
use serde::Deserialize;
use std::time::Duration;
use stream_worker::{DecodeError, RawMessage};

fn payload(message: &RawMessage) -> Result<&[u8], DecodeError> {
    match message.payload() {
        [] => Err(DecodeError::EmptyPayload),
        bytes => Ok(bytes),
    }
}

/// A recipient that can never be mailed is as permanent as a broken payload.
fn check_recipient(email: &str) -> Result<(), DecodeError> {
    email
        .parse::<Address>()
        .map(|_| ())
        .map_err(|e| DecodeError::InvalidField {
            field: "email",
            reason: format!("'{email}': {e}"),
        })
}

/// An order was created and its tickets should be mailed.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OrderCreated {
    pub email: String,
    pub order: Order,
}

impl OrderCreated {
    pub fn decode(message: &RawMessage) -> Result<Self, DecodeError> {
        let event: Self = serde_json::from_slice(payload(message)?)?;
        check_recipient(&event.email)?;
        Ok(event)
    }
}

/// Which link a token delivery request carries. Only the stream tells them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    EmailVerification,
    PasswordChange,
}

impl TokenKind {
    pub fn from_stream(stream: &str) -> Option<Self> {
        match stream {
            EMAIL_VERIFICATION_STREAM => Some(Self::EmailVerification),
            PASSWORD_CHANGE_STREAM => Some(Self::PasswordChange),
            _ => None,
        }
    }

    pub fn mail_kind(self) -> MailKind {
        match self {
            Self::EmailVerification => MailKind::EmailVerification,
            Self::PasswordChange => MailKind::ChangingPassword,
        }
    }
}

#[derive(Deserialize)]
struct TokenDeliveryPayload {
    email: String,
    token: String,
    callback_url: String,
    /// Nanoseconds.
    callback_url_ttl: i64,
}

/// A callback link that must reach the user before it expires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenDeliveryRequest {
    pub email: String,
    pub token: String,
    pub callback_url: String,
    pub time_to_live: Duration,
    pub kind: TokenKind,
}

impl TokenDeliveryRequest {
    pub fn decode(message: &RawMessage) -> Result<Self, DecodeError> {
        let kind = TokenKind::from_stream(message.stream())
            .ok_or_else(|| DecodeError::UnknownStream(message.stream().to_string()))?;
        let raw: TokenDeliveryPayload = serde_json::from_slice(payload(message)?)?;
        check_recipient(&raw.email)?;
        let ttl_nanos = u64::try_from(raw.callback_url_ttl).map_err(|_| DecodeError::InvalidField {
            field: "callback_url_ttl",
            reason: format!("negative duration {}ns", raw.callback_url_ttl),
        })?;

        Ok(Self {
            email: raw.email,
            token: raw.token,
            callback_url: raw.callback_url,
            time_to_live: Duration::from_nanos(ttl_nanos),
            kind,
        })
    }

    /// The link mailed to the user.
    pub fn link(&self) -> String {
        format!("{}/{}", self.callback_url, self.token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streams::ORDER_CREATED_STREAM;

    fn message(stream: &str, payload: &str) -> RawMessage {
        RawMessage::from_entry(stream, "1700000000000-0", payload.as_bytes().to_vec())
    }

    #[test]
    fn test_decode_order_created() {
        let event = OrderCreated::decode(&message(
            ORDER_CREATED_STREAM,
            r#"{"email":"a@b.com","order":{"id":"O1","tickets":[{"id":"T1","place":{"row":3,"seat":5},"price":1050}],"screening_id":42,"order_date":"2024-03-01T18:00:00Z"}}"#,
        ))
        .unwrap();
        assert_eq!(event.email, "a@b.com");
        assert_eq!(event.order.id, "O1");
        assert_eq!(event.order.tickets[0].price, 1050);
    }

    #[test]
    fn test_malformed_payloads() {
        let cases = ["", "{", "[]", r#"{"email":"a@b.com"}"#, r#"{"email":1,"order":{}}"#];
        for payload in cases {
            assert!(
                OrderCreated::decode(&message(ORDER_CREATED_STREAM, payload)).is_err(),
                "payload {payload:?} should not decode"
            );
        }
        assert!(matches!(
            OrderCreated::decode(&message(ORDER_CREATED_STREAM, "")),
            Err(DecodeError::EmptyPayload)
        ));
    }

    #[test]
    fn test_decode_token_request_kind_from_stream() {
        let payload = r#"{"email":"a@b.com","token":"abc","callback_url":"https://cinema.example/verify","callback_url_ttl":300000000000}"#;

        let verification = TokenDeliveryRequest::decode(&message(EMAIL_VERIFICATION_STREAM, payload)).unwrap();
        assert_eq!(verification.kind, TokenKind::EmailVerification);
        assert_eq!(verification.time_to_live, Duration::from_secs(300));
        assert_eq!(verification.link(), "https://cinema.example/verify/abc");

        let password = TokenDeliveryRequest::decode(&message(PASSWORD_CHANGE_STREAM, payload)).unwrap();
        assert_eq!(password.kind, TokenKind::PasswordChange);
        assert_eq!(password.kind.mail_kind(), MailKind::ChangingPassword);

        let err = TokenDeliveryRequest::decode(&message("sms_delivery_request", payload)).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownStream(stream) if stream == "sms_delivery_request"));
    }

    #[test]
    fn test_negative_ttl_is_rejected() {
        let payload = r#"{"email":"a@b.com","token":"abc","callback_url":"u","callback_url_ttl":-1}"#;
        let err = TokenDeliveryRequest::decode(&message(EMAIL_VERIFICATION_STREAM, payload)).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidField { field: "callback_url_ttl", .. }));
    }

    #[test]
    fn test_unmailable_recipient_is_rejected() {
        let order = r#"{"email":"not an address","order":{"id":"O1","tickets":[],"screening_id":42,"order_date":"2024-03-01T18:00:00Z"}}"#;
        let err = OrderCreated::decode(&message(ORDER_CREATED_STREAM, order)).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidField { field: "email", .. }));

        let token = r#"{"email":"","token":"abc","callback_url":"u","callback_url_ttl":1000}"#;
        let err = TokenDeliveryRequest::decode(&message(PASSWORD_CHANGE_STREAM, token)).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidField { field: "email", .. }));
    }
}
