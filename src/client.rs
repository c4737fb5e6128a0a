//! ## TLS transport
//!
//! [`TlsTransport`] is a [`Transport`] which connects to Twitch IRC over TLS
//! using tokio.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tmi_session::client::TlsTransport;
//! use tmi_session::Session;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = TlsTransport::new()?;
//! let session = Session::builder()
//!   .room("pajlada")
//!   .build(Arc::new(transport));
//! session.connect()?;
//! # Ok(())
//! # }
//! ```
//!
//! The transport runs two tasks per connection:
//! - The connection task opens the stream, reports it, waits for
//!   [`Transport::listen`], then reads lines until the stream ends.
//! - The writer task drains the outgoing queues, highest [`Priority`] first.
//!
//! ⚠ Note: it does not reconnect. A lost connection is reported through
//! [`TransportEvents::on_disconnected`], and the owner decides what to do.

pub mod conn;
pub mod util;

use self::conn::TlsConfigError;
use crate::transport::{Priority, Transport, TransportError, TransportEvents};
use futures_util::stream::Fuse;
use futures_util::StreamExt;
use std::fmt::Display;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, ReadHalf, WriteHalf};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_rustls::rustls::client::InvalidDnsNameError;
use tokio_rustls::rustls::ServerName;
use tokio_stream::wrappers::LinesStream;
use util::Timeout;

/// The default timeout used when connecting to Twitch IRC.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

type ReadStream = Fuse<LinesStream<BufReader<ReadHalf<conn::Stream>>>>;
type WriteStream = WriteHalf<conn::Stream>;

/// A [`Transport`] over a tokio TLS stream.
pub struct TlsTransport {
  runtime: Handle,
  timeout: Duration,
  connection: Mutex<Option<Connection>>,
}

struct Connection {
  queues: Queues,
  listen: Option<oneshot::Sender<()>>,
  tasks: Vec<JoinHandle<()>>,
}

struct Queues {
  high: mpsc::UnboundedSender<String>,
  normal: mpsc::UnboundedSender<String>,
  low: mpsc::UnboundedSender<String>,
}

struct QueueReceivers {
  high: mpsc::UnboundedReceiver<String>,
  normal: mpsc::UnboundedReceiver<String>,
  low: mpsc::UnboundedReceiver<String>,
}

fn queues() -> (Queues, QueueReceivers) {
  let (high, high_rx) = mpsc::unbounded_channel();
  let (normal, normal_rx) = mpsc::unbounded_channel();
  let (low, low_rx) = mpsc::unbounded_channel();
  (
    Queues { high, normal, low },
    QueueReceivers {
      high: high_rx,
      normal: normal_rx,
      low: low_rx,
    },
  )
}

impl TlsTransport {
  /// Create a transport which spawns its tasks on the current tokio runtime.
  pub fn new() -> Result<Self, tokio::runtime::TryCurrentError> {
    Ok(Self::with_handle(Handle::try_current()?))
  }

  /// Create a transport which spawns its tasks on `runtime`.
  pub fn with_handle(runtime: Handle) -> Self {
    Self {
      runtime,
      timeout: DEFAULT_TIMEOUT,
      connection: Mutex::new(None),
    }
  }

  /// Set the timeout for opening the connection.
  pub fn timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  fn connection(&self) -> std::sync::MutexGuard<'_, Option<Connection>> {
    self
      .connection
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
  }
}

impl Transport for TlsTransport {
  fn connect(
    &self,
    host: &str,
    port: u16,
    events: Arc<dyn TransportEvents>,
  ) -> Result<(), TransportError> {
    self.disconnect();

    let server_name = ServerName::try_from(host).map_err(ConnectError::from)?;
    let (queues, receivers) = queues();
    let (listen_tx, listen_rx) = oneshot::channel();

    *self.connection() = Some(Connection {
      queues,
      listen: Some(listen_tx),
      tasks: Vec::new(),
    });

    let host = host.to_owned();
    let timeout = self.timeout;
    let runtime = self.runtime.clone();
    let task = self.runtime.spawn(async move {
      let stream = match open(server_name, &host, port).timeout(timeout).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => {
          warn!("{e}");
          events.on_disconnected(Some(&e.into()));
          return;
        }
        Err(_) => {
          warn!("connection timed out");
          events.on_disconnected(Some(&TransportError::Timeout));
          return;
        }
      };
      debug!(%host, port, "connected");

      let (reader, writer) = split(stream);
      let writer = runtime.spawn(write_loop(writer, receivers));

      events.on_connected();
      if listen_rx.await.is_err() {
        trace!("dropped before listening");
        writer.abort();
        return;
      }

      let error = read_loop(reader, events.as_ref()).await;
      writer.abort();
      events.on_disconnected(Some(&error));
    });

    match self.connection().as_mut() {
      Some(connection) => connection.tasks.push(task),
      None => task.abort(),
    }
    Ok(())
  }

  fn disconnect(&self) {
    if let Some(connection) = self.connection().take() {
      trace!("closing connection");
      for task in connection.tasks {
        task.abort();
      }
    }
  }

  fn send_line(&self, line: &str, priority: Priority) -> Result<(), TransportError> {
    let guard = self.connection();
    let connection = guard.as_ref().ok_or(TransportError::NotConnected)?;
    let queue = match priority {
      Priority::High => &connection.queues.high,
      Priority::Normal => &connection.queues.normal,
      Priority::Low => &connection.queues.low,
    };
    queue
      .send(line.to_owned())
      .map_err(|_| TransportError::Closed)
  }

  fn listen(&self) -> Result<(), TransportError> {
    let mut guard = self.connection();
    let connection = guard.as_mut().ok_or(TransportError::NotConnected)?;
    if let Some(listen) = connection.listen.take() {
      listen.send(()).map_err(|_| TransportError::Closed)?;
    }
    Ok(())
  }
}

impl Drop for TlsTransport {
  fn drop(&mut self) {
    self.disconnect();
  }
}

async fn open(
  server_name: ServerName,
  host: &str,
  port: u16,
) -> Result<conn::Stream, ConnectError> {
  let connector = conn::connector()?;
  Ok(conn::open(&connector, server_name, host, port).await?)
}

fn split(stream: conn::Stream) -> (ReadStream, WriteStream) {
  let (reader, writer) = tokio::io::split(stream);
  (LinesStream::new(BufReader::new(reader).lines()).fuse(), writer)
}

async fn read_loop(mut reader: ReadStream, events: &dyn TransportEvents) -> TransportError {
  while let Some(line) = reader.next().await {
    match line {
      Ok(line) => events.on_line(line.trim_end_matches('\r')),
      Err(e) => return TransportError::Io(e),
    }
  }
  TransportError::Closed
}

async fn write_loop(mut writer: WriteStream, mut queues: QueueReceivers) {
  loop {
    let line = tokio::select! {
      biased;
      Some(line) = queues.high.recv() => line,
      Some(line) = queues.normal.recv() => line,
      Some(line) = queues.low.recv() => line,
      else => break,
    };
    let result = async {
      writer.write_all(line.as_bytes()).await?;
      writer.write_all(b"\r\n").await?;
      writer.flush().await
    }
    .await;
    if let Err(e) = result {
      warn!("failed to write line: {e}");
      break;
    }
  }
}

/// Failed to set up a connection.
#[derive(Debug)]
pub enum ConnectError {
  /// The host is not a valid DNS name.
  Dns(InvalidDnsNameError),

  /// Failed to load the TLS configuration.
  Tls(TlsConfigError),

  /// Failed to open a connection.
  Open(std::io::Error),
}

impl From<InvalidDnsNameError> for ConnectError {
  fn from(value: InvalidDnsNameError) -> Self {
    Self::Dns(value)
  }
}

impl From<TlsConfigError> for ConnectError {
  fn from(value: TlsConfigError) -> Self {
    Self::Tls(value)
  }
}

impl From<std::io::Error> for ConnectError {
  fn from(value: std::io::Error) -> Self {
    Self::Open(value)
  }
}

impl Display for ConnectError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      ConnectError::Dns(e) => write!(f, "failed to connect: {e}"),
      ConnectError::Tls(e) => write!(f, "failed to connect: {e}"),
      ConnectError::Open(e) => write!(f, "failed to connect: {e}"),
    }
  }
}

impl std::error::Error for ConnectError {}

impl From<ConnectError> for TransportError {
  fn from(value: ConnectError) -> Self {
    match value {
      ConnectError::Open(e) => TransportError::Io(e),
      other => TransportError::Connect(Box::new(other)),
    }
  }
}

static_assert_send!(TlsTransport);
static_assert_sync!(TlsTransport);
