//! Stream processors for the notification consumer loops.
//!
//! `OrderCreatedProcessor` reads [`OrderEventsStream`](crate::streams::OrderEventsStream),
//! `TokenDeliveryProcessor` reads [`TokenDeliveryStream`](crate::streams::TokenDeliveryStream).

use crate::events::{OrderCreated, TokenDeliveryRequest};
use crate::service::MailService;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use stream_worker::{Context, DecodeError, RawMessage, ServiceError, StreamProcessor};
use tracing::info;

/// Mails tickets for every created order.
pub struct OrderCreatedProcessor {
    mail: Arc<MailService>,
}

impl OrderCreatedProcessor {
    pub fn new(mail: Arc<MailService>) -> Self {
        Self { mail }
    }
}

#[async_trait]
impl StreamProcessor for OrderCreatedProcessor {
    type Event = OrderCreated;

    fn decode(&self, message: &RawMessage) -> Result<OrderCreated, DecodeError> {
        OrderCreated::decode(message)
    }

    async fn process(&self, ctx: &Context, event: OrderCreated) -> Result<(), ServiceError> {
        info!(
            order_id = %event.order.id,
            tickets = event.order.tickets.len(),
            "Processing created order"
        );
        self.mail
            .send_order_created(ctx, &event.email, &event.order)
            .await
    }

    fn name(&self) -> &'static str {
        "order_created"
    }
}

/// Mails verification and password change links while they are still valid.
pub struct TokenDeliveryProcessor {
    mail: Arc<MailService>,
}

impl TokenDeliveryProcessor {
    pub fn new(mail: Arc<MailService>) -> Self {
        Self { mail }
    }
}

#[async_trait]
impl StreamProcessor for TokenDeliveryProcessor {
    type Event = TokenDeliveryRequest;

    fn decode(&self, message: &RawMessage) -> Result<TokenDeliveryRequest, DecodeError> {
        TokenDeliveryRequest::decode(message)
    }

    fn time_to_live(&self, event: &TokenDeliveryRequest) -> Option<Duration> {
        Some(event.time_to_live)
    }

    async fn process(&self, ctx: &Context, event: TokenDeliveryRequest) -> Result<(), ServiceError> {
        // the mail states how long the link is still valid, not its full lifetime
        let remaining = ctx.remaining().unwrap_or(event.time_to_live);
        info!(kind = ?event.kind, remaining_secs = remaining.as_secs(), "Processing token delivery");

        self.mail
            .send_token(ctx, &event.email, &event.link(), event.kind.mail_kind(), remaining)
            .await
    }

    fn name(&self) -> &'static str {
        "token_delivery"
    }
}
