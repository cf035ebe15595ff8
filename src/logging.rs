//! Logging capability used for lifecycle messages.
//!
//! The supervisor reports attempts, failures, connects and disconnects through
//! a [`Logger`] so an embedding service can route them wherever it wants. The
//! default [`TracingLogger`] forwards everything to `tracing`.

use std::fmt;
use std::sync::Arc;

/// Sink for supervisor lifecycle messages.
pub trait Logger: Send + Sync + 'static {
    /// Informational message.
    fn info(&self, message: &str);

    /// Something went wrong but the supervisor will carry on.
    fn warn(&self, message: &str);

    /// A connection attempt failed.
    fn error(&self, message: &str);
}

/// Forwards messages to `tracing` under the `rpc_supervisor` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl TracingLogger {
    /// Create a shareable tracing logger.
    pub fn shared() -> Arc<dyn Logger> {
        Arc::new(Self)
    }
}

impl Logger for TracingLogger {
    fn info(&self, message: &str) {
        tracing::info!(target: "rpc_supervisor", "{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "rpc_supervisor", "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "rpc_supervisor", "{message}");
    }
}

impl<L: Logger> Logger for Arc<L> {
    fn info(&self, message: &str) {
        (**self).info(message);
    }

    fn warn(&self, message: &str) {
        (**self).warn(message);
    }

    fn error(&self, message: &str) {
        (**self).error(message);
    }
}

/// Severity of a recorded line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Info => f.write_str("INFO"),
            Level::Warn => f.write_str("WARN"),
            Level::Error => f.write_str("ERROR"),
        }
    }
}

/// Keeps every line in memory, also forwarding it to `tracing`.
///
/// Useful for asserting on the exact lifecycle a supervisor went through.
#[derive(Debug, Default)]
pub struct RecordingLogger {
    lines: parking_lot::Mutex<Vec<(Level, String)>>,
}

impl RecordingLogger {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every recorded line.
    pub fn lines(&self) -> Vec<(Level, String)> {
        self.lines.lock().clone()
    }

    /// Number of lines at `level` starting with `prefix`.
    pub fn count(&self, level: Level, prefix: &str) -> usize {
        self.lines
            .lock()
            .iter()
            .filter(|(l, line)| *l == level && line.starts_with(prefix))
            .count()
    }

    /// Number of lines at `level`.
    pub fn count_level(&self, level: Level) -> usize {
        self.lines.lock().iter().filter(|(l, _)| *l == level).count()
    }

    fn record(&self, level: Level, message: &str) {
        self.lines.lock().push((level, message.to_string()));
    }
}

impl Logger for RecordingLogger {
    fn info(&self, message: &str) {
        TracingLogger.info(message);
        self.record(Level::Info, message);
    }

    fn warn(&self, message: &str) {
        TracingLogger.warn(message);
        self.record(Level::Warn, message);
    }

    fn error(&self, message: &str) {
        TracingLogger.error(message);
        self.record(Level::Error, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_logger_counts() {
        let logger = RecordingLogger::new();
        logger.info("Trying host ws://a");
        logger.info("Trying host ws://a");
        logger.warn("Retry: 1, max retries: 10");
        logger.error("Error instantiating connection to ws://a: refused");

        assert_eq!(logger.count(Level::Info, "Trying host"), 2);
        assert_eq!(logger.count(Level::Warn, "Retry:"), 1);
        assert_eq!(logger.count_level(Level::Error), 1);
        assert_eq!(logger.lines().len(), 4);
    }

    #[test]
    fn test_arc_logger_delegates() {
        let recorder = Arc::new(RecordingLogger::new());
        let shared: Arc<dyn Logger> = Arc::new(recorder.clone());
        shared.warn("Disconnected from host ws://a");

        assert_eq!(recorder.count(Level::Warn, "Disconnected"), 1);
    }

    #[test]
    fn test_level_display() {
        assert_eq!(Level::Info.to_string(), "INFO");
        assert_eq!(Level::Error.to_string(), "ERROR");
    }
}
