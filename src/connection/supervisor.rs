//! Supervised connection with bounded fixed-interval reconnection.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle as RuntimeHandle;
use tokio::time::sleep;
use tracing::debug;

use crate::error::{Result, SupervisorError};
use crate::logging::{Logger, TracingLogger};
use crate::transport::{ConnectionHandle, Connector, TransportError};

use super::config::SupervisorConfig;
use super::hooks::Hooks;
use super::state::{ConnectionState, ConnectionStats};

/// Owns one connection at a time and keeps it alive.
///
/// Cloning is cheap; clones share the same connection, hooks and state.
pub struct ConnectionSupervisor<C: Connector> {
    inner: Arc<Inner<C>>,
}

struct Inner<C: Connector> {
    config: SupervisorConfig,
    connector: C,
    logger: Arc<dyn Logger>,
    link: Mutex<Link<C::Handle>>,
    hooks: Mutex<Hooks<C::Handle>>,
    stats: Mutex<ConnectionStats>,
}

/// Everything the single-flight check must see atomically.
struct Link<H> {
    state: ConnectionState,
    handle: Option<Arc<H>>,
    /// Bumped whenever a handle is retired; close notifications carry the
    /// generation they were wired under.
    generation: u64,
    /// Whether the disconnect monitor is subscribed to the current handle.
    wired: bool,
    active_host: Option<String>,
    can_reconnect: bool,
}

impl<H> Link<H> {
    fn idle_state(&self) -> ConnectionState {
        if self.can_reconnect {
            ConnectionState::Disconnected
        } else {
            ConnectionState::Closed
        }
    }
}

/// Leaves `Connecting` if an instantiation fails or is dropped mid-flight.
struct ConnectingGuard<'a, H> {
    link: &'a Mutex<Link<H>>,
    armed: bool,
}

impl<'a, H> ConnectingGuard<'a, H> {
    fn new(link: &'a Mutex<Link<H>>) -> Self {
        Self { link, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl<H> Drop for ConnectingGuard<'_, H> {
    fn drop(&mut self) {
        if self.armed {
            let mut link = self.link.lock();
            if link.state.is_connecting() {
                link.state = link.idle_state();
            }
        }
    }
}

impl<C: Connector> ConnectionSupervisor<C> {
    /// Create a supervisor. A missing endpoint is resolved to the default.
    pub fn new(mut config: SupervisorConfig, connector: C, logger: Arc<dyn Logger>) -> Self {
        config.resolve();
        Self {
            inner: Arc::new(Inner {
                config,
                connector,
                logger,
                link: Mutex::new(Link {
                    state: ConnectionState::Disconnected,
                    handle: None,
                    generation: 0,
                    wired: false,
                    active_host: None,
                    can_reconnect: true,
                }),
                hooks: Mutex::new(Hooks::default()),
                stats: Mutex::new(ConnectionStats::default()),
            }),
        }
    }

    /// Create a supervisor that logs through `tracing`.
    pub fn with_tracing(config: SupervisorConfig, connector: C) -> Self {
        Self::new(config, connector, TracingLogger::shared())
    }

    /// The resolved configuration.
    pub fn config(&self) -> &SupervisorConfig {
        &self.inner.config
    }

    /// The endpoint this supervisor connects to.
    pub fn address(&self) -> &str {
        self.inner.config.endpoint()
    }

    /// Get the current connection state.
    pub fn state(&self) -> ConnectionState {
        self.inner.link.lock().state
    }

    /// Get connection statistics.
    pub fn stats(&self) -> ConnectionStats {
        self.inner.stats.lock().clone()
    }

    /// Address of the most recently connected endpoint.
    pub fn active_host(&self) -> Option<String> {
        self.inner.link.lock().active_host.clone()
    }

    /// Whether a transport disconnect will start a new retry loop.
    pub fn can_reconnect(&self) -> bool {
        self.inner.link.lock().can_reconnect
    }

    /// The handle currently held, alive or not.
    pub fn handle(&self) -> Option<Arc<C::Handle>> {
        self.inner.link.lock().handle.clone()
    }

    /// Check if the supervisor holds a usable connection.
    pub fn is_connected(&self) -> bool {
        let link = self.inner.link.lock();
        link.state.is_connected() && link.handle.as_ref().is_some_and(|h| h.can_invoke())
    }

    /// Set the hook run when a new handle connects.
    ///
    /// The hook receives a borrow of the handle and is not awaited.
    pub fn set_on_connected<F, Fut>(&self, hook: F)
    where
        F: Fn(&C::Handle) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.inner.hooks.lock().set_on_connected(hook);
    }

    /// Set the hook run when the current handle disconnects. Not awaited.
    pub fn set_on_disconnected<F, Fut>(&self, hook: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.inner.hooks.lock().set_on_disconnected(hook);
    }

    /// Set the hook run on shutdown. [`close`](Self::close) awaits it.
    pub fn set_on_closed<F, Fut>(&self, hook: F)
    where
        F: Fn(Option<SupervisorError>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.inner.hooks.lock().set_on_closed(hook);
    }

    /// Run the retry loop until a usable handle is obtained.
    ///
    /// Each attempt that does not produce a handle is followed by a fixed
    /// wait. When attempts run out, `throw_on_failure` picks between returning
    /// the last error and shutting down via [`close`](Self::close), in which
    /// case `Ok(None)` is returned and the error reaches the `on_closed` hook.
    pub async fn connect(&self, throw_on_failure: bool) -> Result<Option<Arc<C::Handle>>> {
        {
            let mut link = self.inner.link.lock();
            link.can_reconnect = true;
            if link.state.is_closed() {
                link.state = ConnectionState::Disconnected;
            }
        }

        let policy = &self.inner.config.retry_policy;
        let address = self.address();
        let mut last_error = None;
        let mut attempt = 0;

        while policy.should_retry(attempt) && self.can_reconnect() {
            self.inner.logger.info(&format!("Trying host {address}"));
            match self.instantiate(address).await {
                Ok(Some(handle)) => return Ok(Some(handle)),
                Ok(None) => {}
                Err(err) => {
                    self.inner
                        .logger
                        .warn(&format!("Host({address}) error: {}", reason(&err)));
                    last_error = Some(err);
                }
            }

            self.inner.logger.warn(&format!(
                "Retry: {}, max retries: {}",
                attempt + 1,
                policy.max_attempts
            ));
            sleep(policy.interval).await;
            attempt += 1;
        }

        if throw_on_failure {
            return Err(last_error.unwrap_or(SupervisorError::RetryExhausted { attempts: attempt }));
        }

        self.inner
            .logger
            .warn(&format!("Giving up on host {address} after {attempt} attempts"));
        self.close(last_error).await;
        Ok(None)
    }

    /// Create or reuse the connection handle for `host`.
    ///
    /// Returns `Ok(None)` without waiting when another instantiation is in
    /// flight, or when the handle is alive but cannot invoke yet. A live
    /// handle is never replaced.
    pub async fn instantiate(&self, host: &str) -> Result<Option<Arc<C::Handle>>> {
        let stale = {
            let mut link = self.inner.link.lock();
            if link.state.is_connecting() {
                debug!(host, "instantiation already in flight");
                return Ok(None);
            }
            match link.handle.clone() {
                Some(handle) if handle.is_alive() => {
                    if !handle.can_invoke() {
                        return Ok(None);
                    }
                    if !link.state.is_connected() {
                        // Opened by an earlier attempt, usable only now.
                        link.state = ConnectionState::Connected;
                        link.active_host = Some(host.to_string());
                        let generation = link.generation;
                        drop(link);
                        self.established(host, &handle, generation);
                    }
                    return Ok(Some(handle));
                }
                stale => {
                    link.state = ConnectionState::Connecting;
                    link.generation += 1;
                    link.wired = false;
                    link.handle = None;
                    stale
                }
            }
        };
        let mut guard = ConnectingGuard::new(&self.inner.link);

        let handle = match self.open(host, stale).await {
            Ok(handle) => handle,
            Err(err) => {
                self.inner.stats.lock().record_failure();
                self.inner
                    .logger
                    .error(&format!("Error instantiating connection to {host}: {err}"));
                return Err(SupervisorError::connection(host, err));
            }
        };

        let invokable = handle.can_invoke();
        let generation = {
            let mut link = self.inner.link.lock();
            link.handle = Some(handle.clone());
            if invokable {
                link.active_host = Some(host.to_string());
                link.state = ConnectionState::Connected;
            } else {
                link.state = link.idle_state();
            }
            link.generation
        };
        guard.disarm();

        if !invokable {
            debug!(host, "handle opened but cannot invoke yet");
            return Ok(None);
        }

        self.established(host, &handle, generation);
        Ok(Some(handle))
    }

    /// Shut down for good.
    ///
    /// Disables reconnection from the disconnect monitor, disconnects the
    /// current handle, then awaits the `on_closed` hook with `error`.
    pub async fn close(&self, error: Option<SupervisorError>) {
        let handle = {
            let mut link = self.inner.link.lock();
            link.can_reconnect = false;
            if !link.state.is_connecting() {
                link.state = ConnectionState::Closed;
            }
            link.handle.clone()
        };

        if let Some(handle) = handle {
            if let Err(err) = handle.disconnect().await {
                self.inner
                    .logger
                    .warn(&format!("Error disconnecting from host {}: {err}", self.address()));
            }
        }

        let on_closed = self.inner.hooks.lock().on_closed.clone();
        on_closed(error).await;
    }

    async fn open(
        &self,
        host: &str,
        stale: Option<Arc<C::Handle>>,
    ) -> std::result::Result<Arc<C::Handle>, TransportError> {
        if let Some(stale) = stale {
            // Already retired; a failure here must not block the new session.
            if let Err(err) = stale.disconnect().await {
                debug!(host, error = %err, "failed to disconnect retired handle");
            }
        }
        self.inner.stats.lock().record_attempt();
        let handle = self.inner.connector.connect(host).await?;
        Ok(Arc::new(handle))
    }

    fn established(&self, host: &str, handle: &C::Handle, generation: u64) {
        self.inner.stats.lock().record_connect();
        self.inner.logger.info(&format!("Connected to host {host}"));
        self.wire(handle, generation);
        let on_connected = self.inner.hooks.lock().on_connected.clone();
        tokio::spawn(on_connected(handle));
    }

    /// Subscribe the disconnect monitor to `handle`'s close notification.
    ///
    /// At most once per generation, so a handle that survived `close` and is
    /// reused later still reports each close once.
    fn wire(&self, handle: &C::Handle, generation: u64) {
        {
            let mut link = self.inner.link.lock();
            if link.generation != generation || link.wired {
                return;
            }
            link.wired = true;
        }
        let weak = Arc::downgrade(&self.inner);
        let runtime = RuntimeHandle::current();
        handle.close_notifier().subscribe(move || {
            if let Some(inner) = weak.upgrade() {
                ConnectionSupervisor { inner }.on_transport_close(generation, &runtime);
            }
        });
    }

    fn on_transport_close(&self, generation: u64, runtime: &RuntimeHandle) {
        let (host, reconnect) = {
            let mut link = self.inner.link.lock();
            if link.generation != generation {
                debug!(
                    generation,
                    current = link.generation,
                    "ignoring close of retired handle"
                );
                return;
            }
            if link.state.is_connected() {
                link.state = link.idle_state();
            }
            (link.active_host.clone().unwrap_or_default(), link.can_reconnect)
        };

        {
            let mut stats = self.inner.stats.lock();
            stats.record_disconnect();
            if reconnect {
                stats.record_reconnect();
            }
        }
        self.inner
            .logger
            .warn(&format!("Disconnected from host {host}"));

        let on_disconnected = self.inner.hooks.lock().on_disconnected.clone();
        runtime.spawn(on_disconnected());

        if reconnect {
            let supervisor = self.clone();
            runtime.spawn(async move {
                if let Err(err) = supervisor.connect(false).await {
                    supervisor
                        .inner
                        .logger
                        .error(&format!("Reconnect to host {host} failed: {err}"));
                }
            });
        }
    }
}

/// The transport's own message, without the host prefix.
fn reason(err: &SupervisorError) -> String {
    match err.transport_error() {
        Some(source) => source.to_string(),
        None => err.to_string(),
    }
}

impl<C: Connector> Clone for ConnectionSupervisor<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<C: Connector> fmt::Debug for ConnectionSupervisor<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let link = self.inner.link.lock();
        f.debug_struct("ConnectionSupervisor")
            .field("address", &self.address())
            .field("state", &link.state)
            .field("active_host", &link.active_host)
            .field("can_reconnect", &link.can_reconnect)
            .finish()
    }
}
