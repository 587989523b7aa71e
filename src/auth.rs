//! Access-token capabilities for outbound calls.

use async_trait::async_trait;
use http::StatusCode;

use crate::transport::TransportError;
use crate::BoxError;

/// Source of bearer tokens for outbound calls.
///
/// This is an explicit capability: a client configured without a provider,
/// or a provider currently holding no token, simply adds no authorization
/// header. Neither case is an error.
pub trait AccessTokenProvider: Send + Sync {
    /// The current access token, when one is available.
    fn access_token(&self) -> Option<String>;
}

/// Refreshes an expired access token.
///
/// When an ungated call fails and [`TokenRefresher::should_refresh`]
/// accepts the failure, the client refreshes once and resends once.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Obtain a fresh token from the authority.
    ///
    /// A subsequent [`AccessTokenProvider::access_token`] lookup is
    /// expected to see the renewed token.
    async fn refresh(&self) -> Result<(), BoxError>;

    /// Whether `error` warrants a refresh-and-resend cycle.
    ///
    /// Defaults to upstream `401 Unauthorized`; override to widen or
    /// narrow the trigger.
    fn should_refresh(&self, error: &TransportError) -> bool {
        error.status() == Some(StatusCode::UNAUTHORIZED)
    }
}
