//! Data models for the notifications domain.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Mail kinds
// ============================================================================

/// Kinds of mail the worker sends. Each has its own subject and template.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MailKind {
    /// Tickets for a freshly created order.
    OrderCreated,
    /// Link confirming ownership of an email address.
    EmailVerification,
    /// Link for changing the account password.
    ChangingPassword,
}

impl std::fmt::Display for MailKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MailKind::OrderCreated => write!(f, "ORDER_CREATED"),
            MailKind::EmailVerification => write!(f, "EMAIL_VERIFICATION"),
            MailKind::ChangingPassword => write!(f, "CHANGING_PASSWORD"),
        }
    }
}

// ============================================================================
// Orders (as published on `order_created`)
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Place {
    pub row: i32,
    pub seat: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ticket {
    pub id: String,
    pub place: Place,
    /// Price in minor currency units.
    pub price: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: String,
    pub tickets: Vec<Ticket>,
    pub screening_id: i64,
    #[serde(rename = "order_date")]
    pub date: DateTime<Utc>,
}

/// Render minor currency units as `major.minor`, e.g. `1050` -> `"10.50"`.
pub fn format_price(minor_units: u32) -> String {
    format!("{}.{:02}", minor_units / 100, minor_units % 100)
}

// ============================================================================
// Screening (enriched from the upstream services)
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Coordinates {
    pub longitude: f64,
    pub latitude: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Cinema {
    pub address: String,
    pub name: String,
    pub coordinates: Coordinates,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct MovieInfo {
    pub title: String,
    pub poster_url: String,
}

/// The identifiers a screening points at, plus its start instant as RFC 3339 text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreeningSlot {
    pub cinema_id: i32,
    pub hall_id: i32,
    pub movie_id: i32,
    pub start_time: String,
}

/// A fully enriched screening, ready for templates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Screening {
    /// Local start time, `HH:MM`.
    pub start_time: String,
    /// Local start date, `DD.MM`.
    pub start_date: String,
    pub movie_name: String,
    pub movie_poster_url: String,
    pub cinema: Cinema,
    pub hall_name: String,
}

// ============================================================================
// Template data
// ============================================================================

/// One ticket as shown in the order mail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketNotification {
    pub id: String,
    /// Base64 SVG QR code of the ticket id.
    pub id_qr: String,
    pub row: i32,
    pub seat: i32,
    pub price: String,
}

/// Template data for `ORDER_CREATED`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreatedNotification {
    pub order_id: String,
    /// Base64 QR code of the order id.
    pub order_id_qr: String,
    /// MIME type of every QR image in the mail.
    pub qr_mime_type: String,
    pub screening: Screening,
    pub tickets: Vec<TicketNotification>,
}

/// Template data for token links.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenNotification {
    pub url: String,
    /// Humanized remaining lifetime of the link.
    pub ttl: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(1050), "10.50");
        assert_eq!(format_price(5), "0.05");
        assert_eq!(format_price(0), "0.00");
        assert_eq!(format_price(120000), "1200.00");
    }

    #[test]
    fn test_mail_kind_display() {
        assert_eq!(MailKind::OrderCreated.to_string(), "ORDER_CREATED");
        assert_eq!(MailKind::ChangingPassword.to_string(), "CHANGING_PASSWORD");
    }

    #[test]
    fn test_order_wire_format() {
        let order: Order = serde_json::from_str(
            r#"{"id":"O1","tickets":[{"id":"T1","place":{"row":3,"seat":5},"price":1050}],
                "screening_id":42,"order_date":"2024-03-01T18:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(order.tickets[0].place, Place { row: 3, seat: 5 });
        assert_eq!(order.screening_id, 42);
        assert_eq!(order.date.to_rfc3339(), "2024-03-01T18:00:00+00:00");
    }
}
