//! Stream Worker Framework
//!
//! Consumer loops over Redis Streams with explicit, per-message commit control.
//!
//! ## Features
//!
//! - **Consumer loop**: `StreamWorker<S, P>` decodes, checks freshness, handles, commits
//! - **Manual commit**: a message is acknowledged only once its outcome is terminal
//! - **Consumer groups**: redelivery of unacknowledged messages is left to Redis
//! - **Cancellation contexts**: `Context` carries shutdown and per-message deadlines
//! - **Error taxonomy**: `ServiceError` with `classify` for logging fidelity
//! - **Supervisor**: `PipelineSupervisor` fans out shutdown and bounds the drain
//! - **Prometheus metrics** and **health endpoints**
//!
//! ## Example
//!
//! ```ignore
//! use stream_worker::{PipelineSupervisor, RedisStreamConsumer, StreamWorker, WorkerConfig};
//!
//! let config = WorkerConfig::from_stream_def::<OrderEventsStream>();
//! let source = RedisStreamConsumer::new(redis, config);
//! let mut supervisor = PipelineSupervisor::new(Duration::from_secs(10));
//! supervisor.spawn(StreamWorker::new(source, processor));
//! let report = supervisor.run_until(shutdown_signal()).await;
//! ```

mod config;
mod consumer;
mod context;
mod error;
mod health;
mod message;
pub mod metrics;
mod registry;
mod supervisor;
mod worker;

// Re-export main types
pub use config::WorkerConfig;
pub use consumer::{RedisStreamConsumer, PAYLOAD_FIELD};
pub use context::{Context, ContextError};
pub use error::{classify, DecodeError, ErrorKind, ServiceError, StreamError};
pub use health::{health_router, HealthState, WatchedStream};
pub use message::{parse_entry_timestamp, CommitToken, RawMessage};
pub use metrics::{init_metrics, StreamMetrics};
pub use registry::{MessageSource, StreamDef, StreamProcessor};
pub use supervisor::{PipelineSupervisor, ShutdownReport};
pub use worker::{Disposition, Outcome, StreamWorker};

pub use tokio_util::sync::CancellationToken;
