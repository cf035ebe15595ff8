//! Supervisor configuration types.

use std::time::Duration;

/// Endpoint used when the configuration does not name one.
pub const DEFAULT_ENDPOINT: &str = "ws://localhost:8080/ws";

/// Default number of attempts per retry loop.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Default wait between attempts.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(10);

/// Bounded retry policy with a fixed wait between attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts in one retry loop.
    pub max_attempts: u32,
    /// Wait after each unsuccessful attempt.
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            interval: DEFAULT_RETRY_INTERVAL,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with `max_attempts` attempts spaced `interval` apart.
    pub fn fixed(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    /// Check if attempt number `attempt` (0-indexed) may run.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

/// Connection supervisor configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupervisorConfig {
    /// Endpoint to connect to. Filled with [`DEFAULT_ENDPOINT`] by
    /// [`resolve`](Self::resolve) when unset.
    pub endpoint_address: Option<String>,
    /// Retry policy for each retry loop.
    pub retry_policy: RetryPolicy,
}

impl SupervisorConfig {
    /// Create a configuration with no endpoint and the default retry policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the endpoint address.
    pub fn with_endpoint(mut self, address: impl Into<String>) -> Self {
        self.endpoint_address = Some(address.into());
        self
    }

    /// Set the retry policy.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Fill in the default endpoint if none (or an empty one) was given.
    pub fn resolve(&mut self) {
        if self.endpoint_address.as_deref().is_none_or(str::is_empty) {
            self.endpoint_address = Some(DEFAULT_ENDPOINT.to_string());
        }
    }

    /// Consume the configuration and return it resolved.
    pub fn resolved(mut self) -> Self {
        self.resolve();
        self
    }

    /// The endpoint address, or the default if unresolved.
    pub fn endpoint(&self) -> &str {
        match self.endpoint_address.as_deref() {
            Some(address) if !address.is_empty() => address,
            _ => DEFAULT_ENDPOINT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_fills_default_endpoint() {
        let mut config = SupervisorConfig::new();
        config.resolve();
        assert_eq!(config.endpoint_address.as_deref(), Some(DEFAULT_ENDPOINT));

        let config = SupervisorConfig::new().with_endpoint("").resolved();
        assert_eq!(config.endpoint_address.as_deref(), Some(DEFAULT_ENDPOINT));
    }

    #[test]
    fn test_resolve_keeps_explicit_endpoint() {
        let config = SupervisorConfig::new()
            .with_endpoint("ws://node.example:7887/rpc-ws")
            .resolved();
        assert_eq!(config.endpoint(), "ws://node.example:7887/rpc-ws");

        let again = config.clone().resolved();
        assert_eq!(again, config);
    }

    #[test]
    fn test_retry_policy_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 10);
        assert_eq!(policy.interval, Duration::from_secs(10));
    }

    #[test]
    fn test_retry_policy_fixed() {
        let policy = RetryPolicy::fixed(3, Duration::from_millis(100));
        assert!(policy.should_retry(0));
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
        assert_eq!(policy.interval, Duration::from_millis(100));

        assert!(!RetryPolicy::fixed(0, Duration::ZERO).should_retry(0));
    }

    #[test]
    fn test_config_builder() {
        let config = SupervisorConfig::new()
            .with_endpoint("ws://a")
            .with_retry_policy(RetryPolicy::fixed(2, Duration::from_secs(1)));

        assert_eq!(config.endpoint(), "ws://a");
        assert_eq!(config.retry_policy.max_attempts, 2);
    }
}
