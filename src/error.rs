//! Error types for supervised connections.

use std::sync::Arc;

use thiserror::Error;

use crate::transport::TransportError;

/// Errors surfaced by the connection supervisor.
///
/// The type is `Clone` so the same failure can be handed to the `on_closed`
/// hook and returned to a caller that asked for strict failure.
#[derive(Error, Debug, Clone)]
pub enum SupervisorError {
    /// The transport failed to produce a connection handle.
    #[error("Connection to {host} failed: {source}")]
    Connection {
        host: String,
        source: Arc<TransportError>,
    },

    /// Every attempt ran out without the transport ever reporting an error.
    #[error("Gave up after {attempts} connection attempts")]
    RetryExhausted { attempts: u32 },
}

/// Result type alias for supervisor operations.
pub type Result<T> = std::result::Result<T, SupervisorError>;

impl SupervisorError {
    /// Wrap a transport failure for the given host.
    pub fn connection(host: impl Into<String>, source: TransportError) -> Self {
        Self::Connection {
            host: host.into(),
            source: Arc::new(source),
        }
    }

    /// The host the failure relates to, if any.
    pub fn host(&self) -> Option<&str> {
        match self {
            Self::Connection { host, .. } => Some(host),
            Self::RetryExhausted { .. } => None,
        }
    }

    /// The underlying transport error, if any.
    pub fn transport_error(&self) -> Option<&TransportError> {
        match self {
            Self::Connection { source, .. } => Some(source),
            Self::RetryExhausted { .. } => None,
        }
    }
}
