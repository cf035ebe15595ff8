//! Connection supervision.
//!
//! This module provides:
//! - A supervisor that owns one connection and reconnects it when lost
//! - Configuration for the endpoint and the fixed-interval retry policy
//! - Lifecycle hooks, state and statistics
//!
//! # Example
//!
//! ```no_run
//! use rpc_supervisor::connection::{ConnectionSupervisor, RetryPolicy, SupervisorConfig};
//! use rpc_supervisor::transport::WsConnector;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SupervisorConfig::new()
//!     .with_endpoint("ws://localhost:8080/ws")
//!     .with_retry_policy(RetryPolicy::fixed(10, Duration::from_secs(10)));
//!
//! let supervisor = ConnectionSupervisor::with_tracing(config, WsConnector::new());
//! supervisor.set_on_closed(|error| async move {
//!     eprintln!("supervisor closed: {error:?}");
//! });
//!
//! // Fails only after every attempt is used up.
//! let _handle = supervisor.connect(true).await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod hooks;
mod state;
mod supervisor;

pub use config::{
    DEFAULT_ENDPOINT, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_INTERVAL, RetryPolicy, SupervisorConfig,
};
pub use hooks::{ClosedHook, ConnectedHook, DisconnectedHook};
pub use state::{ConnectionState, ConnectionStats};
pub use supervisor::ConnectionSupervisor;
