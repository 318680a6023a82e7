//! # gRPC Client Library
//!
//! Lazy gRPC channel creation with HTTP/2 tuning and per-upstream transport
//! security (plain, TLS without verification, TLS with system roots).
//!
//! ## Quick Start
//! ```ignore
//! use grpc_client::{create_channel_lazy, ChannelConfig, ChannelSecurity};
//!
//! let security = ChannelSecurity::from_method("CLIENT_WITH_SYSTEM_CERT_POOL", Some("movies".into()))?;
//! let channel = create_channel_lazy("movies:443", &ChannelConfig::new().with_security(security))?;
//! ```

pub mod channel;
pub mod error;

pub use channel::{create_channel_lazy, ChannelConfig, ChannelSecurity};
pub use error::{GrpcError, GrpcResult};
