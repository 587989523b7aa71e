//! Response values shared by both request paths.

use bytes::Bytes;
use http::{HeaderMap, StatusCode};

/// The outcome of one HTTP exchange.
///
/// A `Response` is built once, by the transport that performed the call or
/// by an [`Operation`][crate::dispatch::Operation] translating a raw
/// transfer, and never mutated afterwards. Upstream failures are data here:
/// [`Response::has_error`] reports them without unwinding the call path.
#[derive(Debug, Clone)]
pub struct Response {
    url: String,
    error: Option<String>,
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    /// Assemble a response from the parts reported by a transport.
    pub fn new(
        url: impl Into<String>,
        error: Option<String>,
        status: StatusCode,
        headers: HeaderMap,
        body: Bytes,
    ) -> Self {
        Self {
            url: url.into(),
            error,
            status,
            headers,
            body,
        }
    }

    /// URL of the request this response answers.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Wire-level error reported by the transport, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// HTTP status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Response body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Whether the exchange failed, either at the wire level or with an
    /// HTTP status of 400 or above.
    pub fn has_error(&self) -> bool {
        self.error.is_some() || self.status.as_u16() >= 400
    }
}

/// Raw outcome of a driven transfer, before translation into a [`Response`].
///
/// The I/O driver reports these fields as-is; the operation that owns the
/// transfer decides how they become a `Response` through
/// [`Operation::create_response`][crate::dispatch::Operation::create_response].
#[derive(Debug, Clone)]
pub struct RawTransfer {
    /// Final URL of the transfer.
    pub url: String,
    /// Wire-level error reported by the driver, if any.
    pub error: Option<String>,
    /// Status of the HTTP exchange.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Raw response payload.
    pub body: Bytes,
}

impl RawTransfer {
    /// Field-for-field translation into a [`Response`].
    pub fn into_response(self) -> Response {
        Response {
            url: self.url,
            error: self.error,
            status: self.status,
            headers: self.headers,
            body: self.body,
        }
    }
}
