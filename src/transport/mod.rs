//! Transport abstraction consumed by the connection supervisor.
//!
//! The supervisor never opens sockets itself. It asks a [`Connector`] for a
//! fresh [`ConnectionHandle`] and watches that handle's [`CloseNotifier`] to
//! learn when the session goes away.
//!
//! Two implementations ship with the crate:
//!
//! - [`memory`]: a scriptable in-process transport, handy for tests
//! - `websocket` (feature `websocket`): a `tokio-tungstenite` client
//!
//! # Implementing a transport
//!
//! ```
//! use async_trait::async_trait;
//! use rpc_supervisor::transport::{CloseNotifier, ConnectionHandle, Connector, TransportError};
//!
//! struct Session {
//!     notifier: CloseNotifier,
//! }
//!
//! #[async_trait]
//! impl ConnectionHandle for Session {
//!     fn is_alive(&self) -> bool {
//!         !self.notifier.is_closed()
//!     }
//!
//!     fn can_invoke(&self) -> bool {
//!         self.is_alive()
//!     }
//!
//!     async fn disconnect(&self) -> Result<(), TransportError> {
//!         self.notifier.notify();
//!         Ok(())
//!     }
//!
//!     fn close_notifier(&self) -> &CloseNotifier {
//!         &self.notifier
//!     }
//! }
//!
//! struct Dialer;
//!
//! #[async_trait]
//! impl Connector for Dialer {
//!     type Handle = Session;
//!
//!     async fn connect(&self, _address: &str) -> Result<Session, TransportError> {
//!         Ok(Session { notifier: CloseNotifier::new() })
//!     }
//! }
//! ```

mod error;
pub mod memory;
mod notifier;
#[cfg(feature = "websocket")]
pub mod websocket;

use async_trait::async_trait;

pub use error::TransportError;
pub use memory::{MemoryConnector, MemoryHandle};
pub use notifier::CloseNotifier;
#[cfg(feature = "websocket")]
pub use websocket::{WsConnector, WsHandle};

/// Factory for connection handles.
///
/// One call produces one handle for the given address, or fails.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// The handle type this connector produces.
    type Handle: ConnectionHandle;

    /// Open a new session to `address`.
    async fn connect(&self, address: &str) -> Result<Self::Handle, TransportError>;
}

/// An established transport session.
#[async_trait]
pub trait ConnectionHandle: Send + Sync + 'static {
    /// Whether the underlying session is still open.
    fn is_alive(&self) -> bool;

    /// Whether remote calls can be issued on this session.
    ///
    /// A handle may be alive but not yet usable, e.g. while a protocol-level
    /// handshake is still pending.
    fn can_invoke(&self) -> bool;

    /// Tear the session down.
    ///
    /// Implementations must fire [`close_notifier`](Self::close_notifier) when
    /// the session actually closes. Calling this on a dead handle is a no-op.
    async fn disconnect(&self) -> Result<(), TransportError>;

    /// Registry of callbacks run when the session closes.
    fn close_notifier(&self) -> &CloseNotifier;
}
