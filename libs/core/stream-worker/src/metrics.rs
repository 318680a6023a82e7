//! Prometheus metrics for consumer loops
//!
//! Provides observability into loop throughput and failures.

use crate::error::ErrorKind;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use std::time::Duration;
use tracing::info;

static PROMETHEUS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Initialize Prometheus metrics
///
/// Call this once at startup. Subsequent calls are no-ops.
pub fn init_metrics() -> Result<(), BuildError> {
    PROMETHEUS_HANDLE.get_or_try_init(|| {
        let handle = PrometheusBuilder::new().install_recorder()?;
        info!("Prometheus metrics initialized");
        Ok::<_, BuildError>(handle)
    })?;
    Ok(())
}

/// Get the Prometheus handle for rendering metrics
pub fn prometheus_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

/// Render metrics in Prometheus format
pub fn render_metrics() -> String {
    prometheus_handle()
        .map(|h| h.render())
        .unwrap_or_default()
}

/// Per-loop metrics helper
#[derive(Clone)]
pub struct StreamMetrics {
    /// Processor name for labeling
    processor_name: String,
}

impl StreamMetrics {
    /// Create new StreamMetrics
    pub fn new(processor_name: impl Into<String>) -> Self {
        Self {
            processor_name: processor_name.into(),
        }
    }

    /// Record a message being received
    pub fn message_received(&self, stream: &str) {
        counter!(
            "stream_worker_messages_received_total",
            "stream" => stream.to_string(),
            "processor" => self.processor_name.clone()
        )
        .increment(1);
    }

    /// Record a message being acknowledged
    pub fn message_committed(&self, stream: &str, disposition: &str) {
        counter!(
            "stream_worker_messages_committed_total",
            "stream" => stream.to_string(),
            "processor" => self.processor_name.clone(),
            "disposition" => disposition.to_string()
        )
        .increment(1);
    }

    /// Record a handler failure (message left pending)
    pub fn message_failed(&self, stream: &str, kind: ErrorKind) {
        counter!(
            "stream_worker_messages_failed_total",
            "stream" => stream.to_string(),
            "processor" => self.processor_name.clone(),
            "kind" => kind.as_ref().to_string()
        )
        .increment(1);
    }

    /// Record a failed XACK
    pub fn commit_error(&self, stream: &str) {
        counter!(
            "stream_worker_commit_errors_total",
            "stream" => stream.to_string(),
            "processor" => self.processor_name.clone()
        )
        .increment(1);
    }

    pub fn handler_duration(&self, duration: Duration) {
        histogram!(
            "stream_worker_handler_duration_seconds",
            "processor" => self.processor_name.clone()
        )
        .record(duration.as_secs_f64());
    }
}
