//! Errors reported by transport implementations.

use std::io;

use thiserror::Error;

/// Errors that can occur while opening or using a transport session.
#[derive(Error, Debug)]
pub enum TransportError {
    /// I/O error during network operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The protocol-level handshake did not complete.
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// The endpoint address could not be used.
    #[error("Invalid endpoint address: {0}")]
    InvalidAddress(String),

    /// The session is already closed.
    #[error("Connection closed")]
    Closed,

    /// WebSocket protocol error.
    #[cfg(feature = "websocket")]
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

impl TransportError {
    /// Create a new handshake error.
    pub fn handshake(msg: impl Into<String>) -> Self {
        Self::Handshake(msg.into())
    }

    /// Create a connection-refused error, as reported by the OS.
    pub fn refused(msg: impl Into<String>) -> Self {
        Self::Io(io::Error::new(io::ErrorKind::ConnectionRefused, msg.into()))
    }
}
