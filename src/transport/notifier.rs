//! Close-notification registry carried by every connection handle.

use std::fmt;

use parking_lot::Mutex;

type Subscriber = Box<dyn FnOnce() + Send + 'static>;

/// One-shot registry of callbacks run when a session closes.
///
/// Subscribers run in registration order, exactly once. A transport registers
/// its own close handling while building the handle, so it always runs before
/// anything the supervisor subscribes afterwards.
///
/// Subscribing to an already closed notifier runs the callback immediately.
#[derive(Default)]
pub struct CloseNotifier {
    inner: Mutex<NotifierState>,
}

#[derive(Default)]
struct NotifierState {
    subscribers: Vec<Subscriber>,
    closed: bool,
}

impl CloseNotifier {
    /// Create an open notifier with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for the close event.
    pub fn subscribe<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.inner.lock();
        if state.closed {
            drop(state);
            callback();
        } else {
            state.subscribers.push(Box::new(callback));
        }
    }

    /// Fire the close event.
    ///
    /// Returns `false` if the notifier had already fired. Callbacks are run
    /// without the internal lock held, so they may subscribe or query freely.
    pub fn notify(&self) -> bool {
        let subscribers = {
            let mut state = self.inner.lock();
            if state.closed {
                return false;
            }
            state.closed = true;
            std::mem::take(&mut state.subscribers)
        };

        for subscriber in subscribers {
            subscriber();
        }
        true
    }

    /// Whether the close event has fired.
    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Number of callbacks still waiting for the close event.
    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }
}

impl fmt::Debug for CloseNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("CloseNotifier")
            .field("closed", &state.closed)
            .field("subscribers", &state.subscribers.len())
            .finish()
    }
}
