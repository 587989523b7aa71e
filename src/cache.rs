//! Response cache seam.

use std::time::Duration;

use crate::response::Response;

/// External store for cached responses.
///
/// Transports consult the cache before going to the wire and may fill it
/// from successful exchanges; the per-call `no_cache` flag bypasses the
/// lookup but not the fill.
pub trait ResponseCache: Send + Sync {
    /// Look up a cached response for `key`.
    fn fetch(&self, key: &str) -> Option<Response>;

    /// Store `response` under `key`, optionally bounded by `ttl`.
    fn store(&self, key: &str, response: &Response, ttl: Option<Duration>);
}
