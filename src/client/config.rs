//! Per-API client configuration.

use crate::transport::DEFAULT_TRANSPORT;

/// Per-API settings, consumed at construction.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL prefix prepended to relative request paths.
    pub endpoint_root: String,
    /// Circuit-breaker service name; `None` disables gating.
    pub circuit_breaker: Option<String>,
    /// Transport identifier resolved through the registry.
    pub transport: String,
    /// Whether responses may be served from and stored to the cache.
    pub cache_enabled: bool,
}

impl ApiConfig {
    /// Settings for an API rooted at `endpoint_root`, with caching enabled
    /// and no circuit breaker.
    pub fn new(endpoint_root: impl Into<String>) -> Self {
        Self {
            endpoint_root: endpoint_root.into(),
            circuit_breaker: None,
            transport: DEFAULT_TRANSPORT.to_owned(),
            cache_enabled: true,
        }
    }

    /// Gate calls through the circuit breaker registered under `name`.
    pub fn with_circuit_breaker(mut self, name: impl Into<String>) -> Self {
        self.circuit_breaker = Some(name.into());
        self
    }

    /// Resolve transports under `name` instead of the default identifier.
    pub fn with_transport(mut self, name: impl Into<String>) -> Self {
        self.transport = name.into();
        self
    }

    /// Disable the response cache for this API.
    pub fn without_cache(mut self) -> Self {
        self.cache_enabled = false;
        self
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new("")
    }
}

/// Cache and path behavior for a single GET call.
#[derive(Debug, Clone, Copy, Default)]
pub struct GetOptions {
    /// Skip the response cache lookup for this call.
    pub no_cache: bool,
    /// Treat the path as a full URL instead of prefixing the endpoint
    /// root.
    pub absolute_path: bool,
}
