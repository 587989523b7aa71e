//! Bookkeeping for operations owned by the dispatcher.

use std::fmt;

use crate::response::Response;
use crate::BoxError;

use super::{Dispatcher, Operation, OperationId};

/// Completion callback for one operation.
///
/// Invoked with the translated response and the dispatcher itself, so a
/// callback can enqueue follow-up operations. The `Result` return is the
/// per-operation error channel: how a failure is handled depends on the
/// dispatcher's [`CallbackPolicy`][super::CallbackPolicy].
pub type Callback = Box<dyn FnOnce(Response, &mut Dispatcher) -> Result<(), BoxError> + Send>;

/// Pairs a pending operation with its optional completion callback.
///
/// Owned exclusively by the dispatcher from enqueue until completion, then
/// taken apart and discarded. A callback is a typed closure, so its
/// invocability is established at compile time and construction cannot
/// fail.
pub struct Binding {
    operation: Box<dyn Operation>,
    callback: Option<Callback>,
}

impl Binding {
    pub(super) fn new(operation: Box<dyn Operation>, callback: Option<Callback>) -> Self {
        Self {
            operation,
            callback,
        }
    }

    /// The wrapped operation.
    pub fn operation(&self) -> &dyn Operation {
        &*self.operation
    }

    /// Whether a completion callback was supplied.
    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    pub(super) fn operation_mut(&mut self) -> &mut dyn Operation {
        &mut *self.operation
    }

    pub(super) fn into_parts(self) -> (Box<dyn Operation>, Option<Callback>) {
        (self.operation, self.callback)
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("callback", &self.has_callback())
            .finish_non_exhaustive()
    }
}

/// A callback failure recorded under
/// [`CallbackPolicy::Isolate`][super::CallbackPolicy::Isolate].
#[derive(Debug)]
pub struct CallbackFailure {
    /// Operation whose callback failed.
    pub id: OperationId,
    /// The error the callback returned.
    pub error: BoxError,
}
