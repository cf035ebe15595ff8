//! Supervisor for a single persistent RPC connection.
//!
//! This crate keeps one connection to a remote procedure-call endpoint alive
//! over a message-oriented transport such as WebSocket. It establishes the
//! connection, notices when the transport closes, and reconnects with a
//! bounded number of fixed-interval retries.
//!
//! # Features
//!
//! - Single-flight connection establishment
//! - Bounded retry loop with a fixed wait between attempts
//! - Reactive disconnect detection through the transport's close notification
//! - `on_connected`, `on_disconnected` and `on_closed` lifecycle hooks
//! - Pluggable transports, with in-memory and WebSocket implementations
//!
//! # Example
//!
//! ```no_run
//! use rpc_supervisor::{ConnectionSupervisor, SupervisorConfig};
//! use rpc_supervisor::transport::WsConnector;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // No endpoint given: ws://localhost:8080/ws is used.
//!     let supervisor =
//!         ConnectionSupervisor::with_tracing(SupervisorConfig::new(), WsConnector::new());
//!
//!     supervisor.set_on_connected(|handle| {
//!         let address = handle.address().to_string();
//!         async move { println!("connected to {address}") }
//!     });
//!     supervisor.set_on_disconnected(|| async { println!("connection lost") });
//!
//!     if let Some(handle) = supervisor.connect(false).await? {
//!         handle.send_text(r#"{"jsonrpc":"2.0","method":"system_getNodeInfo","id":1}"#).await?;
//!     }
//!
//!     supervisor.close(None).await;
//!     Ok(())
//! }
//! ```
//!
//! # Lifecycle
//!
//! ```text
//!   connect() ──► retry loop ──► instantiate ──► on_connected
//!                    ▲                              │
//!                    │ can_reconnect                ▼
//!                    └──── on_disconnected ◄── transport close
//!
//!   retries exhausted / close() ──► disconnect ──► on_closed
//! ```

pub mod connection;
pub mod error;
pub mod logging;
pub mod transport;

// Re-export commonly used types at the crate root
pub use connection::{
    ConnectionState, ConnectionStats, ConnectionSupervisor, DEFAULT_ENDPOINT, RetryPolicy,
    SupervisorConfig,
};
pub use error::{Result, SupervisorError};
pub use logging::{Logger, TracingLogger};
pub use transport::{ConnectionHandle, Connector, TransportError};
