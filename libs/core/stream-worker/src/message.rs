//! Raw broker messages and their commit tokens.

use chrono::{DateTime, TimeZone, Utc};
use std::time::Duration;

/// Position of an entry in a stream, consumed by `MessageSource::commit`.
///
/// Not `Clone`: a token can be committed at most once.
#[derive(Debug, PartialEq, Eq)]
pub struct CommitToken {
    stream: String,
    id: String,
}

impl CommitToken {
    pub fn new(stream: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            stream: stream.into(),
            id: id.into(),
        }
    }

    pub fn stream(&self) -> &str {
        &self.stream
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// A message as delivered by the broker, before decoding.
#[derive(Debug)]
pub struct RawMessage {
    payload: Vec<u8>,
    timestamp: DateTime<Utc>,
    token: CommitToken,
    redelivered: bool,
}

impl RawMessage {
    /// Build a message whose timestamp is taken from the stream entry id.
    pub fn from_entry(stream: impl Into<String>, id: impl Into<String>, payload: Vec<u8>) -> Self {
        let id = id.into();
        let timestamp = parse_entry_timestamp(&id).unwrap_or_else(Utc::now);
        Self::new(stream, id, payload, timestamp)
    }

    pub fn new(
        stream: impl Into<String>,
        id: impl Into<String>,
        payload: Vec<u8>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            payload,
            timestamp,
            token: CommitToken::new(stream, id),
            redelivered: false,
        }
    }

    /// Mark the message as reclaimed from another consumer's pending list.
    pub fn redelivered(mut self) -> Self {
        self.redelivered = true;
        self
    }

    pub fn is_redelivered(&self) -> bool {
        self.redelivered
    }

    pub fn stream(&self) -> &str {
        self.token.stream()
    }

    pub fn id(&self) -> &str {
        self.token.id()
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Broker-assigned time the message was appended.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Time since the broker timestamp; zero if the timestamp lies in the future.
    pub fn elapsed(&self) -> Duration {
        (Utc::now() - self.timestamp)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    pub fn into_commit_token(self) -> CommitToken {
        self.token
    }
}

/// Stream entry ids are `<milliseconds>-<sequence>`.
pub fn parse_entry_timestamp(id: &str) -> Option<DateTime<Utc>> {
    let millis = id.split('-').next()?.parse::<i64>().ok()?;
    Utc.timestamp_millis_opt(millis).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entry_timestamp() {
        let ts = parse_entry_timestamp("1700000000123-4").unwrap();
        assert_eq!(ts.timestamp_millis(), 1_700_000_000_123);
        assert!(parse_entry_timestamp("not-an-id").is_none());
    }

    #[test]
    fn test_from_entry_uses_id_timestamp() {
        let message = RawMessage::from_entry("order_created", "1700000000000-0", b"{}".to_vec());
        assert_eq!(message.timestamp().timestamp_millis(), 1_700_000_000_000);
        assert_eq!(message.stream(), "order_created");
        assert_eq!(message.id(), "1700000000000-0");
        assert!(!message.is_redelivered());
    }

    #[test]
    fn test_future_timestamp_has_zero_elapsed() {
        let future = Utc::now() + chrono::Duration::minutes(5);
        let message = RawMessage::new("s", "1-0", Vec::new(), future);
        assert_eq!(message.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_into_commit_token() {
        let message = RawMessage::from_entry("s", "5-1", Vec::new()).redelivered();
        assert!(message.is_redelivered());
        let token = message.into_commit_token();
        assert_eq!(token, CommitToken::new("s", "5-1"));
    }
}
