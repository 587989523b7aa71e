//! Pluggable wire-level transports.
//!
//! A transport performs the actual HTTP call for one request. This crate
//! defines only the seam: a transport is configured through the `set_*`
//! methods, then driven exactly once through [`Transport::send`]. Concrete
//! engines live outside the crate and are resolved by identifier through
//! the [`TransportRegistry`].

pub mod mock;
mod registry;

pub use self::registry::{RegistryError, TransportOptions, TransportRegistry, DEFAULT_TRANSPORT};

use async_trait::async_trait;
use http::{HeaderMap, Method, StatusCode};
use thiserror::Error;

use crate::client::QueryString;
use crate::response::Response;
use crate::BoxError;

/// A transport-level failure.
///
/// Failures that originate in an upstream reply carry the status code, so
/// callers can distinguish authentication failures from wire trouble.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// The upstream replied with a status the engine treats as fatal.
    #[error("upstream returned {0}")]
    Upstream(StatusCode),

    /// The connection could not be established or broke mid-transfer.
    #[error("connection: {0}")]
    Connection(#[source] BoxError),

    /// The transfer did not finish in time.
    #[error("transfer timeout")]
    Timeout,
}

impl TransportError {
    /// Status code attached to this failure, if it carries one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            TransportError::Upstream(status) => Some(*status),
            _ => None,
        }
    }
}

/// Performs the wire-level HTTP call for one request.
///
/// Implementations receive their full call description through the
/// setters, then perform it in [`Transport::send`]. Upstream HTTP errors
/// are normally surfaced as a [`Response`] with
/// [`has_error`][Response::has_error] set; a [`TransportError`] is for
/// failures the engine cannot express as a response.
#[async_trait]
pub trait Transport: Send {
    /// HTTP method for the call.
    fn set_method(&mut self, method: Method);

    /// Target URL for the call.
    fn set_path(&mut self, path: &str);

    /// Outbound headers, replacing any previously configured set.
    fn set_headers(&mut self, headers: HeaderMap);

    /// Query payload, for methods that carry one in the body.
    fn set_query_string(&mut self, query: &QueryString);

    /// Resources referenced by LINK and UNLINK calls.
    fn set_links(&mut self, links: &[String]);

    /// Perform the call.
    ///
    /// `no_cache` forces the call onto the wire even when a configured
    /// response cache holds a usable entry.
    async fn send(&mut self, no_cache: bool) -> Result<Response, TransportError>;
}
