//! In-memory transport with scriptable connection outcomes.
//!
//! [`MemoryConnector`] never touches the network. Each `connect` call pops the
//! next scripted outcome (accepting when the script is empty) and hands out a
//! [`MemoryHandle`] that tests can close "from the remote side".
//!
//! # Example
//!
//! ```
//! use rpc_supervisor::transport::{ConnectionHandle, Connector, MemoryConnector, TransportError};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let connector = MemoryConnector::new();
//! connector.push_failure(TransportError::refused("ECONNREFUSED"));
//!
//! assert!(connector.connect("mem://node").await.is_err());
//! let handle = connector.connect("mem://node").await.unwrap();
//! assert!(handle.can_invoke());
//!
//! handle.close_remote();
//! assert!(!handle.is_alive());
//! assert_eq!(connector.attempts(), 2);
//! # }
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::sleep;
use tracing::debug;

use super::{CloseNotifier, ConnectionHandle, Connector, TransportError};

/// Global counter for generating unique handle IDs.
static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// What the next `connect` call should do.
enum Outcome {
    Accept,
    Uninvokable,
    Fail(TransportError),
}

#[derive(Default)]
struct ConnectorState {
    script: Mutex<VecDeque<Outcome>>,
    latency: Mutex<Option<Duration>>,
    attempts: AtomicU32,
    handles: Mutex<Vec<MemoryHandle>>,
}

/// A scriptable connector for in-process sessions.
///
/// Clones share the same script and history, so a test can keep one clone
/// while the supervisor owns another.
#[derive(Clone, Default)]
pub struct MemoryConnector {
    inner: Arc<ConnectorState>,
}

impl MemoryConnector {
    /// Create a connector that accepts every connection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every `connect` call by `latency`.
    pub fn with_latency(self, latency: Duration) -> Self {
        *self.inner.latency.lock() = Some(latency);
        self
    }

    /// Make the next unscripted `connect` call fail with `error`.
    pub fn push_failure(&self, error: TransportError) {
        self.inner.script.lock().push_back(Outcome::Fail(error));
    }

    /// Make the next `count` unscripted calls fail as refused.
    pub fn push_refusals(&self, count: usize, message: &str) {
        let mut script = self.inner.script.lock();
        for _ in 0..count {
            script.push_back(Outcome::Fail(TransportError::refused(message)));
        }
    }

    /// Make the next unscripted call return a live handle that cannot invoke.
    pub fn push_uninvokable(&self) {
        self.inner.script.lock().push_back(Outcome::Uninvokable);
    }

    /// Make the next unscripted call succeed.
    pub fn push_accept(&self) {
        self.inner.script.lock().push_back(Outcome::Accept);
    }

    /// Number of `connect` calls made so far.
    pub fn attempts(&self) -> u32 {
        self.inner.attempts.load(Ordering::SeqCst)
    }

    /// Every handle handed out so far, oldest first.
    pub fn handles(&self) -> Vec<MemoryHandle> {
        self.inner.handles.lock().clone()
    }

    /// The most recently created handle.
    pub fn last_handle(&self) -> Option<MemoryHandle> {
        self.inner.handles.lock().last().cloned()
    }

    /// Number of handles currently alive.
    pub fn live_handles(&self) -> usize {
        self.inner
            .handles
            .lock()
            .iter()
            .filter(|h| h.is_alive())
            .count()
    }
}

impl fmt::Debug for MemoryConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryConnector")
            .field("attempts", &self.attempts())
            .field("scripted", &self.inner.script.lock().len())
            .finish()
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    type Handle = MemoryHandle;

    async fn connect(&self, address: &str) -> Result<MemoryHandle, TransportError> {
        self.inner.attempts.fetch_add(1, Ordering::SeqCst);

        let latency = *self.inner.latency.lock();
        if let Some(latency) = latency {
            sleep(latency).await;
        }

        let outcome = self
            .inner
            .script
            .lock()
            .pop_front()
            .unwrap_or(Outcome::Accept);

        let invokable = match outcome {
            Outcome::Accept => true,
            Outcome::Uninvokable => false,
            Outcome::Fail(err) => return Err(err),
        };

        let handle = MemoryHandle::open(address, invokable);
        self.inner.handles.lock().push(handle.clone());
        Ok(handle)
    }
}

struct HandleState {
    id: u64,
    address: String,
    alive: AtomicBool,
    invokable: AtomicBool,
    disconnects: AtomicU32,
    disconnect_error: Mutex<Option<String>>,
    notifier: CloseNotifier,
}

/// An in-process session produced by [`MemoryConnector`].
#[derive(Clone)]
pub struct MemoryHandle {
    inner: Arc<HandleState>,
}

impl MemoryHandle {
    fn open(address: &str, invokable: bool) -> Self {
        let inner = Arc::new(HandleState {
            id: NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed),
            address: address.to_string(),
            alive: AtomicBool::new(true),
            invokable: AtomicBool::new(invokable),
            disconnects: AtomicU32::new(0),
            disconnect_error: Mutex::new(None),
            notifier: CloseNotifier::new(),
        });

        // The transport's own close handling: the session is dead before
        // anyone else hears about it.
        let weak = Arc::downgrade(&inner);
        inner.notifier.subscribe(move || {
            if let Some(state) = weak.upgrade() {
                state.alive.store(false, Ordering::SeqCst);
                debug!(id = state.id, address = %state.address, "memory session closed");
            }
        });

        Self { inner }
    }

    /// Unique ID of this handle.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Address this handle was opened for.
    pub fn address(&self) -> &str {
        &self.inner.address
    }

    /// Number of times `disconnect` was called.
    pub fn disconnect_count(&self) -> u32 {
        self.inner.disconnects.load(Ordering::SeqCst)
    }

    /// Toggle whether remote calls can be issued.
    pub fn set_invokable(&self, invokable: bool) {
        self.inner.invokable.store(invokable, Ordering::SeqCst);
    }

    /// Make every later `disconnect` fail with `message`, leaving the
    /// session open. `None` restores normal behavior.
    pub fn fail_disconnects(&self, message: Option<&str>) {
        *self.inner.disconnect_error.lock() = message.map(str::to_string);
    }

    /// Simulate the remote end closing the session.
    pub fn close_remote(&self) -> bool {
        self.inner.notifier.notify()
    }

    /// Mark the session dead without firing the close notification.
    ///
    /// Models a session that silently stopped responding.
    pub fn kill_silently(&self) {
        self.inner.alive.store(false, Ordering::SeqCst);
    }
}

impl fmt::Debug for MemoryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryHandle")
            .field("id", &self.inner.id)
            .field("address", &self.inner.address)
            .field("alive", &self.is_alive())
            .finish()
    }
}

#[async_trait]
impl ConnectionHandle for MemoryHandle {
    fn is_alive(&self) -> bool {
        self.inner.alive.load(Ordering::SeqCst)
    }

    fn can_invoke(&self) -> bool {
        self.is_alive() && self.inner.invokable.load(Ordering::SeqCst)
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.inner.disconnects.fetch_add(1, Ordering::SeqCst);
        let failure = self.inner.disconnect_error.lock().clone();
        if let Some(message) = failure {
            return Err(TransportError::handshake(message));
        }
        self.inner.alive.store(false, Ordering::SeqCst);
        self.inner.notifier.notify();
        Ok(())
    }

    fn close_notifier(&self) -> &CloseNotifier {
        &self.inner.notifier
    }
}
