//! Operations driven by the [`Dispatcher`][super::Dispatcher].

use futures_core::future::BoxFuture;

use crate::response::{RawTransfer, Response};

/// Identity of one driven operation, unique within a dispatcher.
///
/// Assigned at enqueue time and used to key the dispatcher's pending set
/// until the operation completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationId(u64);

impl OperationId {
    pub(super) fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// One network operation the dispatcher can drive to completion.
///
/// [`Operation::begin`] starts the transfer; the returned future is the
/// handle the dispatcher's multiplexer polls for readiness. Once the
/// transfer finishes, [`Operation::create_response`] translates the raw
/// outcome into the [`Response`] handed to the completion callback, which
/// lets an operation parse a domain-specific payload.
pub trait Operation: Send + 'static {
    /// Start the transfer, yielding its raw outcome when it finishes.
    ///
    /// Called exactly once, at admission.
    fn begin(&mut self) -> BoxFuture<'static, RawTransfer>;

    /// Translate the finished transfer into a [`Response`].
    fn create_response(&self, raw: RawTransfer) -> Response {
        raw.into_response()
    }
}
