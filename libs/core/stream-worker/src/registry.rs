//! Capability traits at the seams of a consumer loop.
//!
//! - `StreamDef` names the streams and consumer group of one event category
//! - `MessageSource` is the broker: fetch, commit, close
//! - `StreamProcessor` decodes a raw message and handles the resulting event

use crate::context::Context;
use crate::error::{DecodeError, ServiceError, StreamError};
use crate::message::{CommitToken, RawMessage};
use async_trait::async_trait;
use std::time::Duration;

/// Stream definition trait.
///
/// Each event category implements this trait to declare where its messages
/// live. One category may span several streams sharing one consumer group.
///
/// # Example
///
/// ```rust,ignore
/// use stream_worker::StreamDef;
///
/// pub struct OrderEventsStream;
///
/// impl StreamDef for OrderEventsStream {
///     const STREAMS: &'static [&'static str] = &["order_created"];
///     const CONSUMER_GROUP: &'static str = "email_service_orders";
/// }
/// ```
pub trait StreamDef: Send + Sync {
    /// The Redis stream keys read by this category.
    const STREAMS: &'static [&'static str];

    /// The consumer group name for this category.
    const CONSUMER_GROUP: &'static str;

    /// XREADGROUP BLOCK timeout in milliseconds.
    const BLOCK_TIMEOUT_MS: u64 = 5_000;

    /// Minimum idle time before a pending entry is reclaimed.
    const CLAIM_IDLE_MS: u64 = 30_000;

    fn streams() -> &'static [&'static str] {
        Self::STREAMS
    }

    fn consumer_group() -> &'static str {
        Self::CONSUMER_GROUP
    }
}

/// The broker side of a consumer loop.
#[async_trait]
pub trait MessageSource: Send {
    /// One-time setup before the first fetch (e.g. consumer group creation).
    async fn prepare(&mut self) -> Result<(), StreamError> {
        Ok(())
    }

    /// Wait for the next message. `Ok(None)` means the wait timed out empty.
    ///
    /// Must be cancel-safe: dropping the future must not lose a delivered message
    /// or commit anything.
    async fn fetch(&mut self) -> Result<Option<RawMessage>, StreamError>;

    /// Acknowledge a message so it is never redelivered to the group.
    async fn commit(&mut self, token: CommitToken) -> Result<(), StreamError>;

    /// Release the underlying connection.
    async fn close(&mut self);
}

/// Trait for message processors.
///
/// Domain handlers implement this trait to turn raw messages of one category
/// into typed events and act on them.
///
/// # Example
///
/// ```rust,ignore
/// #[async_trait]
/// impl StreamProcessor for OrderCreatedProcessor {
///     type Event = OrderCreated;
///
///     fn decode(&self, message: &RawMessage) -> Result<OrderCreated, DecodeError> {
///         Ok(serde_json::from_slice(message.payload())?)
///     }
///
///     async fn process(&self, ctx: &Context, event: OrderCreated) -> Result<(), ServiceError> {
///         self.mail.send_order_created(ctx, &event.email, &event.order).await
///     }
///
///     fn name(&self) -> &'static str {
///         "order_created"
///     }
/// }
/// ```
#[async_trait]
pub trait StreamProcessor: Send + Sync {
    type Event: Send;

    /// Parse the payload. A failure here is permanent: the message is committed and skipped.
    fn decode(&self, message: &RawMessage) -> Result<Self::Event, DecodeError>;

    /// Freshness window for time-bounded events. `None` means the event never expires.
    fn time_to_live(&self, _event: &Self::Event) -> Option<Duration> {
        None
    }

    /// Handle one event. Returning `Err` leaves the message uncommitted.
    async fn process(&self, ctx: &Context, event: Self::Event) -> Result<(), ServiceError>;

    /// Processor name for logs and metrics.
    fn name(&self) -> &'static str;
}
