//! Resilient REST clients.
//!
//! A [`Client`] is the caller-facing half of a bridge: it owns a boxed
//! [`Implementor`] carrying the execution strategy, pushes the per-API
//! configuration into it at construction, and forwards every verb call as
//! an [`ApiCall`] record. Swapping the implementor changes how calls are
//! executed without changing callers.
//!
//! The stock strategy, [`BasicImplementor`], resolves a transport from a
//! registry, gates the call through a circuit breaker when one is
//! configured, and retries once after a token refresh when an
//! authentication failure warrants it.

mod config;
mod implementor;
mod query;

pub use self::config::{ApiConfig, GetOptions};
pub use self::implementor::BasicImplementor;
pub use self::query::{add_query_string, QueryString};

use std::fmt;

use async_trait::async_trait;
use http::{HeaderMap, Method};
use thiserror::Error;

use crate::response::Response;
use crate::transport::{RegistryError, TransportError};
use crate::BoxError;

/// Errors raised on the resilient call path.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The circuit breaker refused the call outright, or intercepted a
    /// failed one. The intercepted failure is chained as the source.
    #[error("service {service:?} unavailable")]
    ServiceUnavailable {
        /// Circuit-breaker service name.
        service: String,
        /// The transport failure the breaker intercepted, if any.
        #[source]
        source: Option<TransportError>,
    },

    /// The configured transport identifier could not be resolved.
    #[error(transparent)]
    UndefinedTransport(#[from] RegistryError),

    /// Upstream authentication failed and could not be refreshed.
    #[error("authentication failed")]
    Authentication(#[source] BoxError),

    /// The transport failed outside circuit-breaker supervision.
    #[error("transport: {0}")]
    Transport(#[from] TransportError),
}

/// One verb invocation, as handed to an [`Implementor`].
#[derive(Debug)]
pub struct ApiCall {
    /// HTTP method.
    pub method: Method,
    /// Path, relative to the endpoint root unless `absolute_path` is set.
    pub path: String,
    /// Caller-supplied headers.
    pub headers: HeaderMap,
    /// Query payload.
    pub query: Option<QueryString>,
    /// LINK/UNLINK resources.
    pub links: Option<Vec<String>>,
    /// Bypass the response cache for this call.
    pub no_cache: bool,
    /// Treat `path` as a full URL.
    pub absolute_path: bool,
}

impl ApiCall {
    fn verb(method: Method, path: &str, query: Option<QueryString>, headers: HeaderMap) -> Self {
        Self {
            method,
            path: path.to_owned(),
            headers,
            query,
            links: None,
            no_cache: false,
            absolute_path: false,
        }
    }

    fn linking(method: Method, path: &str, links: Vec<String>, headers: HeaderMap) -> Self {
        Self {
            method,
            path: path.to_owned(),
            headers,
            query: None,
            links: Some(links),
            no_cache: false,
            absolute_path: false,
        }
    }
}

/// Execution strategy behind a [`Client`].
#[async_trait]
pub trait Implementor: Send + Sync {
    /// Install the per-API configuration.
    fn configure(&mut self, config: ApiConfig);

    /// Currently installed configuration.
    fn config(&self) -> &ApiConfig;

    /// Execute one call.
    async fn call(&self, call: ApiCall) -> Result<Response, Error>;
}

fn link_method() -> Method {
    Method::from_bytes(b"LINK").expect("LINK is a valid method token")
}

fn unlink_method() -> Method {
    Method::from_bytes(b"UNLINK").expect("UNLINK is a valid method token")
}

/// REST API client.
///
/// See the [module documentation][self] for the bridge layout.
pub struct Client {
    implementor: Box<dyn Implementor>,
}

impl Client {
    /// Build a client over `implementor`, installing `config` into it.
    pub fn new(config: ApiConfig, mut implementor: impl Implementor + 'static) -> Self {
        implementor.configure(config);
        Self {
            implementor: Box::new(implementor),
        }
    }

    /// The configured endpoint root.
    pub fn endpoint_root(&self) -> &str {
        &self.implementor.config().endpoint_root
    }

    /// GET `path`.
    pub async fn get(
        &self,
        path: &str,
        query: Option<QueryString>,
        headers: HeaderMap,
    ) -> Result<Response, Error> {
        self.get_with(path, query, headers, GetOptions::default())
            .await
    }

    /// GET `path` with cache-bypass and absolute-path control.
    pub async fn get_with(
        &self,
        path: &str,
        query: Option<QueryString>,
        headers: HeaderMap,
        options: GetOptions,
    ) -> Result<Response, Error> {
        let mut call = ApiCall::verb(Method::GET, path, query, headers);
        call.no_cache = options.no_cache;
        call.absolute_path = options.absolute_path;
        self.implementor.call(call).await
    }

    /// POST `query` to `path`.
    pub async fn post(
        &self,
        path: &str,
        query: Option<QueryString>,
        headers: HeaderMap,
    ) -> Result<Response, Error> {
        self.implementor
            .call(ApiCall::verb(Method::POST, path, query, headers))
            .await
    }

    /// PUT `query` to `path`.
    pub async fn put(
        &self,
        path: &str,
        query: Option<QueryString>,
        headers: HeaderMap,
    ) -> Result<Response, Error> {
        self.implementor
            .call(ApiCall::verb(Method::PUT, path, query, headers))
            .await
    }

    /// PATCH `query` into `path`.
    pub async fn patch(
        &self,
        path: &str,
        query: Option<QueryString>,
        headers: HeaderMap,
    ) -> Result<Response, Error> {
        self.implementor
            .call(ApiCall::verb(Method::PATCH, path, query, headers))
            .await
    }

    /// DELETE `path`.
    pub async fn delete(
        &self,
        path: &str,
        query: Option<QueryString>,
        headers: HeaderMap,
    ) -> Result<Response, Error> {
        self.implementor
            .call(ApiCall::verb(Method::DELETE, path, query, headers))
            .await
    }

    /// LINK the resources in `links` to `path`.
    pub async fn link(
        &self,
        path: &str,
        links: Vec<String>,
        headers: HeaderMap,
    ) -> Result<Response, Error> {
        self.implementor
            .call(ApiCall::linking(link_method(), path, links, headers))
            .await
    }

    /// UNLINK the resources in `links` from `path`.
    pub async fn unlink(
        &self,
        path: &str,
        links: Vec<String>,
        headers: HeaderMap,
    ) -> Result<Response, Error> {
        self.implementor
            .call(ApiCall::linking(unlink_method(), path, links, headers))
            .await
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("endpoint_root", &self.endpoint_root())
            .finish_non_exhaustive()
    }
}
