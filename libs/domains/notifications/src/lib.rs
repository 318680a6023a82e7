//! Notifications Domain
//!
//! Turns cinema domain events read from Redis Streams into emails.
//!
//! # Features
//!
//! - Ticket emails for created orders, with QR codes for the order and each ticket
//! - Email verification and password change links, dropped once expired
//! - Screening details gathered concurrently from the cinema and movies services
//! - Start times rendered in the cinema's local timezone
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  Redis Streams  │  ← order_created, *_delivery_request
//! └────────┬────────┘
//!          │
//! ┌────────▼────────┐
//! │   Processors    │  ← decode, freshness, handle, commit
//! └────────┬────────┘
//!          │
//! ┌────────▼────────┐      ┌─────────────────────┐
//! │   MailService   │ ───► │ ScreeningAggregator │ ← cinema + movies gRPC
//! └────────┬────────┘      └─────────────────────┘
//!          │
//! ┌────────▼────────┐
//! │ Email Provider  │  ← SMTP
//! └─────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_notifications::{MailService, OrderCreatedProcessor, OrderEventsStream};
//! use stream_worker::{RedisStreamConsumer, StreamWorker, WorkerConfig};
//!
//! let mail = Arc::new(MailService::new(provider, renderer, artifacts, screenings, settings));
//! let source = RedisStreamConsumer::connect(client, WorkerConfig::from_stream_def::<OrderEventsStream>()).await?;
//! let worker = StreamWorker::new(source, OrderCreatedProcessor::new(mail));
//! ```

pub mod artifacts;
pub mod config;
pub mod error;
pub mod events;
pub mod humanize;
pub mod models;
pub mod processor;
pub mod providers;
pub mod screenings;
pub mod service;
pub mod streams;
pub mod templates;

// Re-export commonly used types
pub use artifacts::{ArtifactGenerator, QrCodeGenerator};
pub use config::{MailSettings, UpstreamConfig};
pub use error::{NotificationError, NotificationResult};
pub use events::{OrderCreated, TokenDeliveryRequest, TokenKind};
pub use models::{MailKind, Order, Screening};
pub use processor::{OrderCreatedProcessor, TokenDeliveryProcessor};
pub use providers::{EmailProvider, SmtpConfig, SmtpProvider};
pub use screenings::{GrpcScreeningUpstream, ScreeningAggregator, ScreeningLookup, TzfTimezoneLookup};
pub use service::MailService;
pub use streams::{OrderEventsStream, TokenDeliveryStream};
pub use templates::{ContentRenderer, TemplateEngine};
