//! Circuit breaker seam.
//!
//! The open/closed/half-open machinery lives outside this crate; callers
//! hand the client an implementation and the client consults it around
//! every call gated by a configured service name. Implementations are
//! expected to be safe for concurrent use across clients sharing one
//! breaker.

use thiserror::Error;

/// Raised by [`CircuitBreaker::check_available`] when the named service is
/// deemed unavailable.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("circuit open for service {service:?}")]
pub struct CircuitOpen {
    /// Name of the unavailable service.
    pub service: String,
}

/// External resilience component that fails fast for unavailable services.
pub trait CircuitBreaker: Send + Sync {
    /// Fails fast when the named service is deemed unavailable.
    fn check_available(&self, service: &str) -> Result<(), CircuitOpen>;

    /// Record a successful call against the named service.
    fn report_success(&self, service: &str);

    /// Record a failed call against the named service.
    fn report_failure(&self, service: &str);
}
