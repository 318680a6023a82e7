//! Transport security for upstream channels.
//!
//! Three modes, selected per upstream by configuration:
//!
//! | Env value                      | Mode                                        |
//! |--------------------------------|---------------------------------------------|
//! | `INSECURE`                     | plain HTTP/2                                |
//! | `INSECURE_SKIP_VERIFY`         | TLS, server certificate is not verified     |
//! | `CLIENT_WITH_SYSTEM_CERT_POOL` | TLS with native roots and an expected name  |

use crate::error::{GrpcError, GrpcResult};
use hyper_util::rt::TokioIo;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, SignatureScheme};
use std::io;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tonic::transport::Uri;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelSecurity {
  Insecure,
  InsecureSkipVerify,
  SystemRoots { server_name: String },
}

impl ChannelSecurity {
  /// Build from a configured method name and optional expected server name.
  ///
  /// Method names are matched case-insensitively. `CLIENT_WITH_SYSTEM_CERT_POOL`
  /// requires a server name.
  pub fn from_method(method: &str, server_name: Option<String>) -> GrpcResult<Self> {
    match method.trim().to_ascii_uppercase().as_str() {
      "" | "INSECURE" => Ok(Self::Insecure),
      "INSECURE_SKIP_VERIFY" => Ok(Self::InsecureSkipVerify),
      "CLIENT_WITH_SYSTEM_CERT_POOL" => {
        let server_name = server_name.filter(|name| !name.is_empty()).ok_or_else(|| {
          GrpcError::InvalidConfig(
            "CLIENT_WITH_SYSTEM_CERT_POOL requires a server name".to_string(),
          )
        })?;
        Ok(Self::SystemRoots { server_name })
      }
      other => Err(GrpcError::InvalidConfig(format!(
        "unknown connection security method '{other}'"
      ))),
    }
  }

  pub fn is_tls(&self) -> bool {
    !matches!(self, Self::Insecure)
  }

  /// URI scheme tonic should see. Skip-verify does its own TLS in the connector,
  /// so the endpoint itself stays plain.
  pub(crate) fn scheme(&self) -> &'static str {
    match self {
      Self::SystemRoots { .. } => "https",
      Self::Insecure | Self::InsecureSkipVerify => "http",
    }
  }
}

/// Prefix `addr` with the scheme for `security` unless it already has one.
pub(crate) fn endpoint_uri(addr: &str, security: &ChannelSecurity) -> String {
  if addr.contains("://") {
    addr.to_string()
  } else {
    format!("{}://{}", security.scheme(), addr)
  }
}

/// Accepts any server certificate; handshake signatures are still checked.
#[derive(Debug)]
struct AcceptAnyServerCert(Arc<CryptoProvider>);

impl ServerCertVerifier for AcceptAnyServerCert {
  fn verify_server_cert(
    &self,
    _end_entity: &CertificateDer<'_>,
    _intermediates: &[CertificateDer<'_>],
    _server_name: &ServerName<'_>,
    _ocsp_response: &[u8],
    _now: UnixTime,
  ) -> Result<ServerCertVerified, rustls::Error> {
    Ok(ServerCertVerified::assertion())
  }

  fn verify_tls12_signature(
    &self,
    message: &[u8],
    cert: &CertificateDer<'_>,
    dss: &DigitallySignedStruct,
  ) -> Result<HandshakeSignatureValid, rustls::Error> {
    rustls::crypto::verify_tls12_signature(
      message,
      cert,
      dss,
      &self.0.signature_verification_algorithms,
    )
  }

  fn verify_tls13_signature(
    &self,
    message: &[u8],
    cert: &CertificateDer<'_>,
    dss: &DigitallySignedStruct,
  ) -> Result<HandshakeSignatureValid, rustls::Error> {
    rustls::crypto::verify_tls13_signature(
      message,
      cert,
      dss,
      &self.0.signature_verification_algorithms,
    )
  }

  fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
    self.0.signature_verification_algorithms.supported_schemes()
  }
}

pub(crate) fn skip_verify_connector() -> GrpcResult<TlsConnector> {
  let provider = Arc::new(rustls::crypto::ring::default_provider());
  let mut config = rustls::ClientConfig::builder_with_provider(provider.clone())
    .with_safe_default_protocol_versions()
    .map_err(GrpcError::Tls)?
    .dangerous()
    .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert(provider)))
    .with_no_client_auth();
  config.alpn_protocols = vec![b"h2".to_vec()];

  Ok(TlsConnector::from(Arc::new(config)))
}

/// Open a TCP connection to `uri` and run the TLS handshake over it.
pub(crate) async fn connect_skip_verify(
  connector: TlsConnector,
  uri: Uri,
) -> io::Result<TokioIo<tokio_rustls::client::TlsStream<TcpStream>>> {
  let host = uri
    .host()
    .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "upstream uri has no host"))?
    .trim_start_matches('[')
    .trim_end_matches(']')
    .to_string();
  let port = uri.port_u16().unwrap_or(443);

  let tcp = TcpStream::connect((host.as_str(), port)).await?;
  tcp.set_nodelay(true)?;

  let server_name = ServerName::try_from(host)
    .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
  let tls = connector.connect(server_name, tcp).await?;

  Ok(TokioIo::new(tls))
}
