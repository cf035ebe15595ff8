//! WebSocket transport backed by `tokio-tungstenite`.
//!
//! [`WsConnector`] opens a client session per `connect` call. The resulting
//! [`WsHandle`] runs a background reader that forwards data frames to
//! [`WsHandle::recv`] and fires the close notifier as soon as the socket goes
//! away, whether the peer closed it, the network dropped, or
//! [`disconnect`](ConnectionHandle::disconnect) was called locally.
//!
//! # Example
//!
//! ```no_run
//! use rpc_supervisor::transport::{Connector, WsConnector};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let connector = WsConnector::new();
//! let handle = connector.connect("ws://localhost:8080/ws").await?;
//! handle.send_text(r#"{"jsonrpc":"2.0","method":"system_getNodeInfo","id":1}"#).await?;
//! if let Some(reply) = handle.recv().await {
//!     println!("reply: {reply}");
//! }
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace};

use super::{CloseNotifier, ConnectionHandle, Connector, TransportError};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Default handshake timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Connector for `ws://` and `wss://` endpoints.
#[derive(Debug, Clone)]
pub struct WsConnector {
    connect_timeout: Duration,
}

impl Default for WsConnector {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl WsConnector {
    /// Create a connector with the default handshake timeout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the handshake timeout.
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Get the handshake timeout.
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }
}

#[async_trait]
impl Connector for WsConnector {
    type Handle = WsHandle;

    async fn connect(&self, address: &str) -> Result<WsHandle, TransportError> {
        if !(address.starts_with("ws://") || address.starts_with("wss://")) {
            return Err(TransportError::InvalidAddress(address.to_string()));
        }

        let (stream, _response) = timeout(self.connect_timeout, connect_async(address))
            .await
            .map_err(|_| {
                TransportError::Io(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "WebSocket handshake timed out",
                ))
            })??;

        Ok(WsHandle::start(address, stream))
    }
}

struct WsState {
    address: String,
    alive: AtomicBool,
    sink: Mutex<SplitSink<WsStream, Message>>,
    incoming: Mutex<mpsc::UnboundedReceiver<Message>>,
    reader: parking_lot::Mutex<Option<JoinHandle<()>>>,
    notifier: CloseNotifier,
}

/// A client WebSocket session.
#[derive(Clone)]
pub struct WsHandle {
    inner: Arc<WsState>,
}

impl WsHandle {
    fn start(address: &str, stream: WsStream) -> Self {
        let (sink, source) = stream.split();
        let (tx, rx) = mpsc::unbounded_channel();

        let inner = Arc::new(WsState {
            address: address.to_string(),
            alive: AtomicBool::new(true),
            sink: Mutex::new(sink),
            incoming: Mutex::new(rx),
            reader: parking_lot::Mutex::new(None),
            notifier: CloseNotifier::new(),
        });

        let weak = Arc::downgrade(&inner);
        inner.notifier.subscribe(move || {
            if let Some(state) = weak.upgrade() {
                state.alive.store(false, Ordering::SeqCst);
                debug!(address = %state.address, "WebSocket session closed");
            }
        });

        let reader = tokio::spawn(read_loop(Arc::downgrade(&inner), source, tx));
        *inner.reader.lock() = Some(reader);

        Self { inner }
    }

    /// Address this session was opened for.
    pub fn address(&self) -> &str {
        &self.inner.address
    }

    /// Send a frame to the peer.
    pub async fn send(&self, message: Message) -> Result<(), TransportError> {
        if !self.is_alive() {
            return Err(TransportError::Closed);
        }
        self.inner.sink.lock().await.send(message).await?;
        Ok(())
    }

    /// Send a text frame to the peer.
    pub async fn send_text(&self, text: impl Into<String>) -> Result<(), TransportError> {
        self.send(Message::Text(text.into())).await
    }

    /// Receive the next text or binary frame.
    ///
    /// Returns `None` once the session is closed and every buffered frame has
    /// been drained.
    pub async fn recv(&self) -> Option<Message> {
        self.inner.incoming.lock().await.recv().await
    }
}

async fn read_loop(
    state: std::sync::Weak<WsState>,
    mut source: SplitStream<WsStream>,
    tx: mpsc::UnboundedSender<Message>,
) {
    while let Some(frame) = source.next().await {
        match frame {
            Ok(message @ (Message::Text(_) | Message::Binary(_))) => {
                // Nobody listening is fine; the session stays up.
                let _ = tx.send(message);
            }
            Ok(Message::Close(frame)) => {
                debug!(?frame, "peer sent close frame");
                break;
            }
            Ok(other) => trace!(?other, "control frame"),
            Err(err) => {
                debug!(error = %err, "WebSocket read failed");
                break;
            }
        }
    }

    if let Some(state) = state.upgrade() {
        state.notifier.notify();
    }
}

impl fmt::Debug for WsHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WsHandle")
            .field("address", &self.inner.address)
            .field("alive", &self.is_alive())
            .finish()
    }
}

#[async_trait]
impl ConnectionHandle for WsHandle {
    fn is_alive(&self) -> bool {
        self.inner.alive.load(Ordering::SeqCst)
    }

    fn can_invoke(&self) -> bool {
        self.is_alive()
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        if !self.inner.alive.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        let result = {
            let mut sink = self.inner.sink.lock().await;
            match sink.send(Message::Close(None)).await {
                Ok(()) => sink.close().await,
                Err(err) => Err(err),
            }
        };

        let reader = self.inner.reader.lock().take();
        if let Some(reader) = reader {
            reader.abort();
        }
        self.inner.notifier.notify();

        match result {
            Ok(()) => Ok(()),
            Err(tokio_tungstenite::tungstenite::Error::ConnectionClosed)
            | Err(tokio_tungstenite::tungstenite::Error::AlreadyClosed) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn close_notifier(&self) -> &CloseNotifier {
        &self.inner.notifier
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    async fn echo_server() -> (String, JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let task = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            while let Some(Ok(message)) = ws.next().await {
                match message {
                    Message::Text(text) if text == "bye" => {
                        let _ = ws.close(None).await;
                        break;
                    }
                    Message::Text(_) | Message::Binary(_) => {
                        if ws.send(message).await.is_err() {
                            break;
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        });

        (format!("ws://{addr}/ws"), task)
    }

    #[tokio::test]
    async fn test_rejects_non_ws_address() {
        let err = WsConnector::new()
            .connect("http://localhost:8080")
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::InvalidAddress(_)));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = WsConnector::new().connect(&format!("ws://{addr}/ws")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_echo_round_trip() {
        let (address, _server) = echo_server().await;
        let handle = WsConnector::new().connect(&address).await.unwrap();

        assert!(handle.is_alive());
        assert!(handle.can_invoke());
        assert_eq!(handle.address(), address);

        handle.send_text("ping").await.unwrap();
        let reply = handle.recv().await.unwrap();
        assert_eq!(reply, Message::Text("ping".into()));

        handle.disconnect().await.unwrap();
        assert!(!handle.is_alive());
        assert!(handle.close_notifier().is_closed());
        assert!(matches!(
            handle.send_text("late").await,
            Err(TransportError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_peer_close_fires_notifier() {
        let (address, _server) = echo_server().await;
        let handle = WsConnector::new().connect(&address).await.unwrap();

        let (tx, rx) = tokio::sync::oneshot::channel();
        handle.close_notifier().subscribe(move || {
            let _ = tx.send(());
        });

        handle.send_text("bye").await.unwrap();
        timeout(Duration::from_secs(5), rx).await.unwrap().unwrap();

        assert!(!handle.is_alive());
        assert!(handle.recv().await.is_none());
    }
}
