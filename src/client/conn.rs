//! TLS stream setup.

use std::fmt::Display;
use std::io;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::{self, ClientConfig, RootCertStore, ServerName};
use tokio_rustls::TlsConnector;

pub type Stream = TlsStream<TcpStream>;

/// Build a connector which trusts the platform's native root certificates.
pub fn connector() -> Result<TlsConnector, TlsConfigError> {
  let mut roots = RootCertStore::empty();
  let certs = rustls_native_certs::load_native_certs()?;
  trace!(count = certs.len(), "loaded native certificates");
  for cert in certs {
    roots.add(&rustls::Certificate(cert.0))?;
  }
  let config = ClientConfig::builder()
    .with_safe_defaults()
    .with_root_certificates(roots)
    .with_no_client_auth();
  Ok(TlsConnector::from(Arc::new(config)))
}

pub async fn open(
  connector: &TlsConnector,
  server_name: ServerName,
  host: &str,
  port: u16,
) -> io::Result<Stream> {
  trace!(host, port, "opening tls stream");
  let tcp = TcpStream::connect((host, port)).await?;
  connector.connect(server_name, tcp).await
}

/// Failed to build the TLS client configuration.
#[derive(Debug)]
pub enum TlsConfigError {
  /// Failed to read the native certificate store.
  Io(io::Error),
  /// A native certificate was rejected.
  Tls(rustls::Error),
}

impl From<io::Error> for TlsConfigError {
  fn from(value: io::Error) -> Self {
    Self::Io(value)
  }
}

impl From<rustls::Error> for TlsConfigError {
  fn from(value: rustls::Error) -> Self {
    Self::Tls(value)
  }
}

impl Display for TlsConfigError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      TlsConfigError::Io(e) => write!(f, "failed to load certificates: {e}"),
      TlsConfigError::Tls(e) => write!(f, "invalid certificate: {e}"),
    }
  }
}

impl std::error::Error for TlsConfigError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      TlsConfigError::Io(e) => Some(e),
      TlsConfigError::Tls(e) => Some(e),
    }
  }
}
