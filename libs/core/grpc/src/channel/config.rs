use super::security::ChannelSecurity;
use std::time::Duration;
use tonic::transport::Endpoint;

/// Configuration for upstream channel creation
///
/// Per-call deadlines are set on each request from the caller's context, so
/// the channel-level request timeout is only a backstop.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
  pub security: ChannelSecurity,

  // HTTP/2 Keep-Alive
  pub http2_keep_alive_interval: Option<Duration>,
  pub keep_alive_timeout: Duration,
  pub keep_alive_while_idle: bool,

  // Connection settings
  pub connect_timeout: Duration,
  pub request_timeout: Option<Duration>,

  // HTTP/2 flow control
  pub http2_adaptive_window: bool,

  pub tcp_nodelay: bool,
}

impl Default for ChannelConfig {
  fn default() -> Self {
    Self {
      security: ChannelSecurity::Insecure,
      http2_keep_alive_interval: Some(Duration::from_secs(30)),
      keep_alive_timeout: Duration::from_secs(10),
      keep_alive_while_idle: true,
      connect_timeout: Duration::from_secs(5),
      request_timeout: Some(Duration::from_secs(30)),
      http2_adaptive_window: true,
      tcp_nodelay: true,
    }
  }
}

impl ChannelConfig {
  pub fn new() -> Self {
    Self::default()
  }

  /// Select the transport security for this upstream
  pub fn with_security(mut self, security: ChannelSecurity) -> Self {
    self.security = security;
    self
  }

  pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
    self.connect_timeout = timeout;
    self
  }

  /// Set the backstop timeout for RPCs that carry no deadline of their own
  pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
    self.request_timeout = timeout;
    self
  }

  /// Disable HTTP/2 keep-alive
  pub fn without_keep_alive(mut self) -> Self {
    self.http2_keep_alive_interval = None;
    self
  }

  pub(crate) fn apply_to_endpoint(&self, mut endpoint: Endpoint) -> Endpoint {
    if let Some(interval) = self.http2_keep_alive_interval {
      endpoint = endpoint
        .http2_keep_alive_interval(interval)
        .keep_alive_timeout(self.keep_alive_timeout)
        .keep_alive_while_idle(self.keep_alive_while_idle);
    }

    endpoint = endpoint.connect_timeout(self.connect_timeout);
    if let Some(timeout) = self.request_timeout {
      endpoint = endpoint.timeout(timeout);
    }

    endpoint
      .http2_adaptive_window(self.http2_adaptive_window)
      .tcp_nodelay(self.tcp_nodelay)
  }
}
