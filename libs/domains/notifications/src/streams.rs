//! Stream definitions for the notifications domain.

use stream_worker::StreamDef;

/// Orders service publishes one entry per created order here.
pub const ORDER_CREATED_STREAM: &str = "order_created";

/// Accounts service asks for verification links here.
pub const EMAIL_VERIFICATION_STREAM: &str = "email_verification_delivery_request";

/// Accounts service asks for password change links here.
pub const PASSWORD_CHANGE_STREAM: &str = "password_change_delivery_request";

/// Order events, read by the order mail loop.
pub struct OrderEventsStream;

impl StreamDef for OrderEventsStream {
    const STREAMS: &'static [&'static str] = &[ORDER_CREATED_STREAM];
    const CONSUMER_GROUP: &'static str = "email_service_orders";
}

/// Token delivery requests of both kinds, read by one loop.
pub struct TokenDeliveryStream;

impl StreamDef for TokenDeliveryStream {
    const STREAMS: &'static [&'static str] = &[EMAIL_VERIFICATION_STREAM, PASSWORD_CHANGE_STREAM];
    const CONSUMER_GROUP: &'static str = "email_service_tokens";
}
