//! The stock execution strategy: resolve, gate, send, report.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use http::header::AUTHORIZATION;
use http::{HeaderMap, HeaderValue, Method};
use tracing::{debug, trace, warn};

use crate::auth::{AccessTokenProvider, TokenRefresher};
use crate::breaker::CircuitBreaker;
use crate::cache::ResponseCache;
use crate::response::Response;
use crate::transport::{TransportOptions, TransportRegistry};

use super::query::add_query_string;
use super::{ApiCall, ApiConfig, Error, Implementor};

/// Straightforward [`Implementor`].
///
/// Each call resolves a fresh transport from the registry, resolves
/// outbound headers (attaching a bearer token when a provider yields one),
/// consults the circuit breaker when the API configures a service name,
/// delegates to the transport, and reports the outcome back to the
/// breaker. Ungated authentication failures are retried once after a token
/// refresh, when a refresher is configured and accepts the failure.
pub struct BasicImplementor {
    registry: Arc<TransportRegistry>,
    config: ApiConfig,
    breaker: Option<Arc<dyn CircuitBreaker>>,
    cache: Option<Arc<dyn ResponseCache>>,
    tokens: Option<Arc<dyn AccessTokenProvider>>,
    refresher: Option<Arc<dyn TokenRefresher>>,
    log_enabled: bool,
}

impl BasicImplementor {
    /// An implementor resolving transports from `registry`.
    pub fn new(registry: Arc<TransportRegistry>) -> Self {
        Self {
            registry,
            config: ApiConfig::default(),
            breaker: None,
            cache: None,
            tokens: None,
            refresher: None,
            log_enabled: false,
        }
    }

    /// Gate calls through `breaker` for APIs configuring a breaker name.
    pub fn with_circuit_breaker(mut self, breaker: Arc<dyn CircuitBreaker>) -> Self {
        self.breaker = Some(breaker);
        self
    }

    /// Serve and fill `cache` for APIs with caching enabled.
    pub fn with_cache(mut self, cache: Arc<dyn ResponseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Attach bearer tokens from `tokens` to outbound calls.
    pub fn with_token_provider(mut self, tokens: Arc<dyn AccessTokenProvider>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Refresh and resend once when `refresher` accepts a failure.
    pub fn with_token_refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    /// Enable request/response logging by transports.
    pub fn with_logging(mut self, enabled: bool) -> Self {
        self.log_enabled = enabled;
        self
    }

    /// The gate applies only when the API names a service and a breaker
    /// was supplied.
    fn gate(&self) -> Option<(&str, &dyn CircuitBreaker)> {
        let service = self.config.circuit_breaker.as_deref()?;
        let breaker = self.breaker.as_deref()?;
        Some((service, breaker))
    }

    fn resolve_headers(&self, headers: &HeaderMap) -> HeaderMap {
        let mut resolved = headers.clone();
        if let Some(token) = self.tokens.as_ref().and_then(|tokens| tokens.access_token()) {
            match HeaderValue::from_str(&format!("Bearer {token}")) {
                Ok(value) => {
                    resolved.insert(AUTHORIZATION, value);
                }
                Err(_) => warn!("access token is not a valid header value"),
            }
        }
        resolved
    }

    fn transport_options(&self) -> TransportOptions {
        TransportOptions {
            cache: if self.config.cache_enabled {
                self.cache.clone()
            } else {
                None
            },
            log_enabled: self.log_enabled,
        }
    }
}

#[async_trait]
impl Implementor for BasicImplementor {
    fn configure(&mut self, config: ApiConfig) {
        if config.circuit_breaker.is_some() && self.breaker.is_none() {
            warn!(
                service = config.circuit_breaker.as_deref(),
                "circuit breaker name configured but no breaker supplied; calls will not be gated"
            );
        }
        self.config = config;
    }

    fn config(&self) -> &ApiConfig {
        &self.config
    }

    async fn call(&self, call: ApiCall) -> Result<Response, Error> {
        let ApiCall {
            method,
            path,
            headers: caller_headers,
            query,
            links,
            no_cache,
            absolute_path,
        } = call;

        let path = if absolute_path {
            path
        } else {
            format!("{}{}", self.config.endpoint_root, path)
        };

        // GET carries its query in the URL; every other method hands it to
        // the transport as payload.
        let (path, payload) = if method == Method::GET {
            (add_query_string(&path, query.as_ref()), None)
        } else {
            (path, query)
        };

        let mut transport = self
            .registry
            .build(&self.config.transport, self.transport_options())?;
        transport.set_method(method.clone());
        transport.set_path(&path);
        transport.set_headers(self.resolve_headers(&caller_headers));
        if let Some(payload) = payload.as_ref() {
            transport.set_query_string(payload);
        }
        if let Some(links) = links.as_ref() {
            transport.set_links(links);
        }

        if let Some((service, breaker)) = self.gate() {
            breaker.check_available(service).map_err(|open| {
                debug!(service, "circuit open, refusing call");
                Error::ServiceUnavailable {
                    service: open.service,
                    source: None,
                }
            })?;
        }

        trace!(%method, path = %path, "sending request");
        let error = match transport.send(no_cache).await {
            Ok(response) => {
                if let Some((service, breaker)) = self.gate() {
                    breaker.report_success(service);
                }
                return Ok(response);
            }
            Err(error) => error,
        };

        if let Some((service, breaker)) = self.gate() {
            breaker.report_failure(service);
            debug!(service, %error, "call failed under circuit supervision");
            return Err(Error::ServiceUnavailable {
                service: service.to_owned(),
                source: Some(error),
            });
        }

        let Some(refresher) = self
            .refresher
            .as_ref()
            .filter(|refresher| refresher.should_refresh(&error))
        else {
            return Err(Error::Transport(error));
        };

        debug!(%error, "refreshing access token and resending once");
        refresher.refresh().await.map_err(Error::Authentication)?;
        transport.set_headers(self.resolve_headers(&caller_headers));
        transport
            .send(no_cache)
            .await
            .map_err(|retry_error| Error::Authentication(retry_error.into()))
    }
}

impl fmt::Debug for BasicImplementor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicImplementor")
            .field("config", &self.config)
            .field("breaker", &self.breaker.is_some())
            .field("cache", &self.cache.is_some())
            .field("tokens", &self.tokens.is_some())
            .field("refresher", &self.refresher.is_some())
            .finish()
    }
}
