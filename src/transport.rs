//! The connection a [`Session`][crate::Session] runs on.
//!
//! A [`Transport`] moves whole lines between the session and the server.
//! It reports what happens on the connection through [`TransportEvents`],
//! which the session hands to it in [`Transport::connect`].
//!
//! The crate ships a tokio-based TLS implementation in
//! [`client`][crate::client] behind the `client` feature.

use std::fmt::Display;
use std::io;
use std::sync::Arc;

/// Send priority of an outgoing line.
///
/// Lines with a higher priority are written before any queued lines
/// with a lower one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
  Low,
  #[default]
  Normal,
  High,
}

/// Receives what happens on a transport.
///
/// Implementations must be cheap: they are called from the transport's
/// read loop, and lines are handled one at a time.
pub trait TransportEvents: Send + Sync {
  /// The connection is open and lines may be sent.
  fn on_connected(&self);

  /// A line was received, without the trailing line terminator.
  fn on_line(&self, line: &str);

  /// The connection was closed, either by [`Transport::disconnect`] or by the peer.
  fn on_disconnected(&self, error: Option<&TransportError>);
}

/// A line-oriented connection.
pub trait Transport: Send + Sync {
  /// Start connecting to `host:port`.
  ///
  /// This must not block until the connection is open. Once it is,
  /// the transport calls [`TransportEvents::on_connected`].
  fn connect(
    &self,
    host: &str,
    port: u16,
    events: Arc<dyn TransportEvents>,
  ) -> Result<(), TransportError>;

  /// Close the connection.
  ///
  /// Valid in any state, and may be called from inside a
  /// [`TransportEvents`] callback. No lines are delivered after this returns.
  fn disconnect(&self);

  /// Queue `line` for sending. The line terminator is added by the transport.
  fn send_line(&self, line: &str, priority: Priority) -> Result<(), TransportError>;

  /// Start delivering received lines to [`TransportEvents::on_line`].
  fn listen(&self) -> Result<(), TransportError>;
}

/// Failure reported by a [`Transport`].
#[derive(Debug)]
pub enum TransportError {
  /// The underlying I/O operation failed.
  Io(io::Error),

  /// The connection is not open.
  NotConnected,

  /// The connection was closed by the peer.
  Closed,

  /// The connection could not be opened in time.
  Timeout,

  /// Failed to set up the connection, e.g. TLS or DNS failure.
  Connect(Box<dyn std::error::Error + Send + Sync>),
}

impl From<io::Error> for TransportError {
  fn from(value: io::Error) -> Self {
    Self::Io(value)
  }
}

impl Display for TransportError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      TransportError::Io(e) => write!(f, "transport error: {e}"),
      TransportError::NotConnected => write!(f, "transport error: not connected"),
      TransportError::Closed => write!(f, "transport error: connection closed"),
      TransportError::Timeout => write!(f, "transport error: connection timed out"),
      TransportError::Connect(e) => write!(f, "transport error: failed to connect: {e}"),
    }
  }
}

impl std::error::Error for TransportError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      TransportError::Io(e) => Some(e),
      TransportError::Connect(e) => Some(e.as_ref()),
      _ => None,
    }
  }
}

static_assert_send!(TransportError);
static_assert_sync!(TransportError);

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn priorities_are_ordered() {
    assert!(Priority::High > Priority::Normal);
    assert!(Priority::Normal > Priority::Low);
    assert_eq!(Priority::default(), Priority::Normal);
  }

  #[test]
  fn error_display() {
    let e = TransportError::from(io::Error::new(io::ErrorKind::BrokenPipe, "pipe"));
    assert_eq!(e.to_string(), "transport error: pipe");
    assert!(std::error::Error::source(&e).is_some());
    assert_eq!(
      TransportError::NotConnected.to_string(),
      "transport error: not connected"
    );
  }
}
