//! Connection state management.

use std::time::Instant;

/// Lifecycle state of the supervised connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No usable connection and no attempt in flight.
    #[default]
    Disconnected,
    /// An instantiation is in flight.
    Connecting,
    /// Connected and ready.
    Connected,
    /// Shut down; the disconnect monitor will not reconnect.
    Closed,
}

impl ConnectionState {
    /// Check if the connection is usable.
    pub fn is_connected(&self) -> bool {
        *self == ConnectionState::Connected
    }

    /// Check if an instantiation is in flight.
    pub fn is_connecting(&self) -> bool {
        *self == ConnectionState::Connecting
    }

    /// Check if the supervisor has shut down.
    pub fn is_closed(&self) -> bool {
        *self == ConnectionState::Closed
    }
}

/// Connection statistics.
#[derive(Debug, Clone, Default)]
pub struct ConnectionStats {
    /// Number of instantiation attempts that reached the transport.
    pub attempt_count: u64,
    /// Number of successful connections.
    pub connect_count: u64,
    /// Number of failed instantiations.
    pub failure_count: u64,
    /// Number of close notifications from the current handle.
    pub disconnect_count: u64,
    /// Number of retry loops started by the disconnect monitor.
    pub reconnect_count: u64,
    /// Time of last successful connection.
    pub last_connected: Option<Instant>,
    /// Time of last disconnect.
    pub last_disconnected: Option<Instant>,
    /// Time of last error.
    pub last_error: Option<Instant>,
}

impl ConnectionStats {
    /// Record an instantiation attempt.
    pub fn record_attempt(&mut self) {
        self.attempt_count += 1;
    }

    /// Record a successful connection.
    pub fn record_connect(&mut self) {
        self.connect_count += 1;
        self.last_connected = Some(Instant::now());
    }

    /// Record a disconnection.
    pub fn record_disconnect(&mut self) {
        self.disconnect_count += 1;
        self.last_disconnected = Some(Instant::now());
    }

    /// Record a connection failure.
    pub fn record_failure(&mut self) {
        self.failure_count += 1;
        self.last_error = Some(Instant::now());
    }

    /// Record a reconnection loop started by the disconnect monitor.
    pub fn record_reconnect(&mut self) {
        self.reconnect_count += 1;
    }

    /// Time since the last successful connection, if it is still current.
    pub fn uptime(&self) -> Option<std::time::Duration> {
        match (self.last_connected, self.last_disconnected) {
            (Some(up), Some(down)) if down >= up => None,
            (Some(up), _) => Some(up.elapsed()),
            _ => None,
        }
    }
}
