//! Lifecycle callback registry.

use std::future::{Future, ready};
use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::error::SupervisorError;

/// Hook run after a new handle is connected. Receives a borrow of the handle.
pub type ConnectedHook<H> = Arc<dyn Fn(&H) -> BoxFuture<'static, ()> + Send + Sync>;

/// Hook run after the current handle reports a disconnect.
pub type DisconnectedHook = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Hook run on shutdown, with the error that caused it if any.
pub type ClosedHook = Arc<dyn Fn(Option<SupervisorError>) -> BoxFuture<'static, ()> + Send + Sync>;

pub(crate) struct Hooks<H> {
    pub(crate) on_connected: ConnectedHook<H>,
    pub(crate) on_disconnected: DisconnectedHook,
    pub(crate) on_closed: ClosedHook,
}

impl<H: 'static> Default for Hooks<H> {
    fn default() -> Self {
        Self {
            on_connected: Arc::new(|_: &H| -> BoxFuture<'static, ()> { Box::pin(ready(())) }),
            on_disconnected: Arc::new(|| -> BoxFuture<'static, ()> { Box::pin(ready(())) }),
            on_closed: Arc::new(|_: Option<SupervisorError>| -> BoxFuture<'static, ()> {
                Box::pin(ready(()))
            }),
        }
    }
}

impl<H: 'static> Hooks<H> {
    pub(crate) fn set_on_connected<F, Fut>(&mut self, hook: F)
    where
        F: Fn(&H) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_connected = Arc::new(move |handle: &H| -> BoxFuture<'static, ()> {
            Box::pin(hook(handle))
        });
    }

    pub(crate) fn set_on_disconnected<F, Fut>(&mut self, hook: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_disconnected = Arc::new(move || -> BoxFuture<'static, ()> { Box::pin(hook()) });
    }

    pub(crate) fn set_on_closed<F, Fut>(&mut self, hook: F)
    where
        F: Fn(Option<SupervisorError>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_closed = Arc::new(move |error| -> BoxFuture<'static, ()> { Box::pin(hook(error)) });
    }
}
