//! Mock transport implementation for testing purposes.
//!
//! A [`MockHandle`] scripts the outcomes of successive sends and records
//! every call a transport built from it observed, across transports: the
//! registry constructs a fresh transport per call, so inspection has to
//! outlive any single instance.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use parking_lot::Mutex;

use crate::client::QueryString;
use crate::response::Response;

use super::{Transport, TransportError, TransportOptions};

/// One request observed by a mock transport.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// Method configured before the send.
    pub method: Method,
    /// Target URL configured before the send.
    pub path: String,
    /// Headers configured before the send.
    pub headers: HeaderMap,
    /// Encoded query payload, when one was attached.
    pub query: Option<String>,
    /// LINK/UNLINK resources, when attached.
    pub links: Vec<String>,
    /// Cache-bypass flag passed to the send.
    pub no_cache: bool,
}

/// Shared scripting and inspection handle for mock transports.
#[derive(Debug, Clone, Default)]
pub struct MockHandle {
    outcomes: Arc<Mutex<VecDeque<Result<Response, TransportError>>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockHandle {
    /// Script the next send to succeed with `response`.
    pub fn push_response(&self, response: Response) {
        self.outcomes.lock().push_back(Ok(response));
    }

    /// Script the next send to fail with `error`.
    pub fn push_error(&self, error: TransportError) {
        self.outcomes.lock().push_back(Err(error));
    }

    /// Every call observed so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Number of sends observed so far.
    pub fn send_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// A transport sharing this handle's script and records.
    pub fn transport(&self, options: TransportOptions) -> MockTransport {
        MockTransport {
            handle: self.clone(),
            options,
            method: Method::GET,
            path: String::new(),
            headers: HeaderMap::new(),
            query: None,
            links: Vec::new(),
        }
    }
}

/// A scripted [`Transport`].
///
/// Sends pop the next scripted outcome from the owning [`MockHandle`];
/// with no script left, a send succeeds with an empty `200 OK` echoing the
/// configured URL. A configured response cache is consulted before the
/// script and filled from successful sends, so cache wiring is observable
/// in tests.
#[derive(Debug)]
pub struct MockTransport {
    handle: MockHandle,
    options: TransportOptions,
    method: Method,
    path: String,
    headers: HeaderMap,
    query: Option<String>,
    links: Vec<String>,
}

#[async_trait]
impl Transport for MockTransport {
    fn set_method(&mut self, method: Method) {
        self.method = method;
    }

    fn set_path(&mut self, path: &str) {
        self.path = path.to_owned();
    }

    fn set_headers(&mut self, headers: HeaderMap) {
        self.headers = headers;
    }

    fn set_query_string(&mut self, query: &QueryString) {
        self.query = Some(query.encode());
    }

    fn set_links(&mut self, links: &[String]) {
        self.links = links.to_vec();
    }

    async fn send(&mut self, no_cache: bool) -> Result<Response, TransportError> {
        self.handle.calls.lock().push(RecordedCall {
            method: self.method.clone(),
            path: self.path.clone(),
            headers: self.headers.clone(),
            query: self.query.clone(),
            links: self.links.clone(),
            no_cache,
        });

        if !no_cache {
            if let Some(cached) = self
                .options
                .cache
                .as_ref()
                .and_then(|cache| cache.fetch(&self.path))
            {
                return Ok(cached);
            }
        }

        let outcome = self.handle.outcomes.lock().pop_front();
        let response = match outcome {
            Some(Ok(response)) => response,
            Some(Err(error)) => return Err(error),
            None => Response::new(
                self.path.clone(),
                None,
                StatusCode::OK,
                HeaderMap::new(),
                Bytes::new(),
            ),
        };

        if let Some(cache) = self.options.cache.as_ref() {
            cache.store(&self.path, &response, None);
        }
        Ok(response)
    }
}
