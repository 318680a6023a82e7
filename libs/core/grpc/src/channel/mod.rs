pub mod config;
pub mod security;

pub use config::ChannelConfig;
pub use security::ChannelSecurity;

use crate::error::{GrpcError, GrpcResult};
use tonic::transport::{Channel, ClientTlsConfig, Endpoint, Uri};

/// Creates a lazy gRPC channel that connects on first request
///
/// Returns immediately without establishing a connection, so the worker can
/// start while an upstream is still coming up. The transport security comes
/// from `config.security`.
///
/// ## Example
/// ```ignore
/// use grpc_client::{create_channel_lazy, ChannelConfig, ChannelSecurity};
/// use protos::cinema_service::cinema_service_v1_client::CinemaServiceV1Client;
///
/// let config = ChannelConfig::new().with_security(ChannelSecurity::InsecureSkipVerify);
/// let channel = create_channel_lazy("cinema-service:443", &config)?;
/// let client = CinemaServiceV1Client::new(channel);
/// ```
pub fn create_channel_lazy(addr: impl Into<String>, config: &ChannelConfig) -> GrpcResult<Channel> {
  let addr = addr.into();
  let uri = security::endpoint_uri(&addr, &config.security);

  let endpoint = Endpoint::from_shared(uri.clone()).map_err(|e| {
    tracing::error!(target: "grpc_client", addr = %uri, error = ?e, "Invalid URI");
    GrpcError::InvalidUri(e)
  })?;
  let endpoint = config.apply_to_endpoint(endpoint);

  tracing::debug!(
    target: "grpc_client",
    addr = %uri,
    security = ?config.security,
    "Creating lazy gRPC channel (connects on first request)"
  );

  match &config.security {
    ChannelSecurity::Insecure => Ok(endpoint.connect_lazy()),
    ChannelSecurity::SystemRoots { server_name } => {
      let tls = ClientTlsConfig::new()
        .with_native_roots()
        .domain_name(server_name.clone());
      let endpoint = endpoint.tls_config(tls).map_err(GrpcError::TlsConfig)?;
      Ok(endpoint.connect_lazy())
    }
    ChannelSecurity::InsecureSkipVerify => {
      tracing::warn!(
        target: "grpc_client",
        addr = %uri,
        "Server certificate verification is disabled for this upstream"
      );
      let connector = security::skip_verify_connector()?;
      let service = tower::service_fn(move |uri: Uri| {
        security::connect_skip_verify(connector.clone(), uri)
      });
      Ok(endpoint.connect_with_connector_lazy(service))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_invalid_uri() {
    let result = create_channel_lazy("http://not a valid uri", &ChannelConfig::default());
    assert!(matches!(result.unwrap_err(), GrpcError::InvalidUri(_)));
  }

  #[tokio::test]
  async fn test_lazy_channels_without_system_roots() {
    let modes = [ChannelSecurity::Insecure, ChannelSecurity::InsecureSkipVerify];
    for security in modes {
      let config = ChannelConfig::new().with_security(security);
      // nothing listens here; lazy channels don't care until the first call
      assert!(create_channel_lazy("127.0.0.1:9", &config).is_ok());
    }
  }
}
