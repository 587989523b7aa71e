//! Priority-ordered dispatch of concurrent network operations.
//!
//! The [`Dispatcher`] owns a priority queue of pending operations, an
//! optional concurrency cap, and a multiplexer polling every admitted
//! transfer for readiness. Progress is caller-driven: [`Dispatcher::run`]
//! alternates [`Dispatcher::wait_for_data`], which blocks the task until a
//! transfer becomes ready (or a timeout elapses), with
//! [`Dispatcher::process_completed`], which drains every finished transfer
//! and refills the freed concurrency slots from the queue.
//!
//! A dispatcher is single-task cooperative: all bookkeeping happens on the
//! task driving it, and the only suspension point is `wait_for_data`.
//! Priority governs admission order; completion order is whatever order
//! the multiplexer reports readiness.

mod binding;
mod operation;

pub use self::binding::{Binding, Callback, CallbackFailure};
pub use self::operation::{Operation, OperationId};

use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::fmt;
use std::num::NonZeroUsize;
use std::time::Duration;

use futures_core::future::BoxFuture;
use futures_util::stream::FuturesUnordered;
use futures_util::{FutureExt, StreamExt};
use thiserror::Error;
use tracing::trace;

use crate::response::RawTransfer;
use crate::BoxError;

/// Priority assigned by [`Dispatcher::enqueue`].
pub const DEFAULT_PRIORITY: i32 = 1;

/// Errors surfaced by the dispatcher's drive loop.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The dispatcher was asked to wait while tracking no operations.
    #[error("no requests are running")]
    Idle,

    /// A completion callback failed and the drain loop was aborted.
    #[error("callback failed for operation {id:?}")]
    Callback {
        /// Identity of the operation whose callback failed.
        id: OperationId,
        /// The failure the callback returned.
        #[source]
        source: BoxError,
    },
}

/// How callback failures are handled while draining completions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CallbackPolicy {
    /// A failing callback aborts the drain and surfaces
    /// [`Error::Callback`] to the caller. Completions that were not yet
    /// drained stay pending until the next drive.
    #[default]
    Propagate,

    /// Failures are recorded per operation and the drain continues.
    /// Recorded failures are retrieved with
    /// [`Dispatcher::take_callback_failures`].
    Isolate,
}

/// Queue entry ordering: highest priority first, earliest insertion
/// breaking ties.
#[derive(Debug, Clone, Copy)]
struct QueueEntry {
    priority: i32,
    seq: u64,
    id: OperationId,
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other).is_eq()
    }
}

impl Eq for QueueEntry {}

/// Drives many concurrent network operations from one task.
///
/// Operations are enqueued with a priority and admitted against the
/// multiplexer whenever a concurrency slot is free, highest priority
/// first. Every completed operation frees its slot and immediately pulls
/// the next queued operation in, so a saturated dispatcher stays saturated
/// without waiting for the next external poll.
///
/// There is no cancellation: once enqueued, an operation runs to
/// completion or stays pending until the dispatcher is driven again.
pub struct Dispatcher {
    pending: HashMap<OperationId, Binding>,
    queue: BinaryHeap<QueueEntry>,
    multiplexer: FuturesUnordered<BoxFuture<'static, (OperationId, RawTransfer)>>,
    ready: VecDeque<(OperationId, RawTransfer)>,
    running: usize,
    parallel_limit: Option<NonZeroUsize>,
    policy: CallbackPolicy,
    failures: Vec<CallbackFailure>,
    next_id: u64,
    next_seq: u64,
}

impl Dispatcher {
    /// Wait used by drive loops that have no better timeout to hand to
    /// [`Dispatcher::run`].
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(50);

    /// A dispatcher with unbounded concurrency.
    pub fn new() -> Self {
        Self {
            pending: HashMap::new(),
            queue: BinaryHeap::new(),
            multiplexer: FuturesUnordered::new(),
            ready: VecDeque::new(),
            running: 0,
            parallel_limit: None,
            policy: CallbackPolicy::default(),
            failures: Vec::new(),
            next_id: 0,
            next_seq: 0,
        }
    }

    /// A dispatcher running at most `limit` operations in parallel.
    pub fn with_parallel_limit(limit: NonZeroUsize) -> Self {
        let mut dispatcher = Self::new();
        dispatcher.parallel_limit = Some(limit);
        dispatcher
    }

    /// Set the number of operations that may run in parallel.
    ///
    /// `None` means no limit. Lowering the limit does not interrupt
    /// operations already running; it takes effect at the next admission.
    pub fn set_parallel_limit(&mut self, limit: Option<NonZeroUsize>) {
        self.parallel_limit = limit;
    }

    /// The configured parallel limit.
    pub fn parallel_limit(&self) -> Option<NonZeroUsize> {
        self.parallel_limit
    }

    /// Set how callback failures are handled.
    pub fn set_callback_policy(&mut self, policy: CallbackPolicy) {
        self.policy = policy;
    }

    /// Number of operations tracked: running, queued, or finished but not
    /// yet drained.
    pub fn count(&self) -> usize {
        self.pending.len()
    }

    /// Number of operations currently admitted against the multiplexer.
    pub fn running(&self) -> usize {
        self.running
    }

    /// Number of operations still waiting for admission.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Callback failures recorded under [`CallbackPolicy::Isolate`],
    /// draining the record.
    pub fn take_callback_failures(&mut self) -> Vec<CallbackFailure> {
        std::mem::take(&mut self.failures)
    }

    /// Enqueue `operation` at [`DEFAULT_PRIORITY`].
    ///
    /// The operation is admitted immediately when a concurrency slot is
    /// free. Returns the identity tracking the operation until completion.
    pub fn enqueue(
        &mut self,
        operation: impl Operation,
        callback: Option<Callback>,
    ) -> OperationId {
        self.enqueue_with_priority(DEFAULT_PRIORITY, operation, callback)
    }

    /// Enqueue `operation` with an explicit priority.
    ///
    /// Higher priorities are admitted sooner; equal priorities are admitted
    /// in enqueue order.
    pub fn enqueue_with_priority(
        &mut self,
        priority: i32,
        operation: impl Operation,
        callback: Option<Callback>,
    ) -> OperationId {
        let id = OperationId::new(self.next_id);
        self.next_id += 1;
        let seq = self.next_seq;
        self.next_seq += 1;

        self.pending
            .insert(id, Binding::new(Box::new(operation), callback));
        self.queue.push(QueueEntry { priority, seq, id });
        trace!(?id, priority, "operation enqueued");

        self.start_from_queue();
        id
    }

    /// Block the task until at least one admitted operation becomes ready,
    /// or `timeout` elapses.
    ///
    /// Fails with [`Error::Idle`] when nothing is tracked. Returning
    /// without readiness is not an error; drive loops call this
    /// repeatedly.
    pub async fn wait_for_data(&mut self, timeout: Duration) -> Result<(), Error> {
        if self.pending.is_empty() {
            return Err(Error::Idle);
        }

        self.poll_progress();
        if self.ready.is_empty() {
            match tokio::time::timeout(timeout, self.multiplexer.next()).await {
                Ok(Some(done)) => self.ready.push_back(done),
                // Nothing in flight, or the wait timed out; the caller
                // decides whether to keep driving.
                Ok(None) | Err(_) => {}
            }
        }
        Ok(())
    }

    /// Drain every currently-finished operation.
    ///
    /// For each finished operation: its slot is freed, its binding leaves
    /// the pending set, its callback (if any) runs with the translated
    /// response, and one admission is attempted from the queue so the
    /// freed slot refills before control returns to the caller.
    pub fn process_completed(&mut self) -> Result<(), Error> {
        loop {
            self.poll_progress();
            let Some((id, raw)) = self.ready.pop_front() else {
                break;
            };
            self.complete(id, raw)?;
        }
        Ok(())
    }

    /// Drive every tracked operation to completion.
    ///
    /// Blocking call: alternates [`Dispatcher::wait_for_data`] and
    /// [`Dispatcher::process_completed`] until nothing is tracked, waiting
    /// up to `timeout` per poll.
    pub async fn run(&mut self, timeout: Duration) -> Result<(), Error> {
        while self.count() > 0 {
            self.wait_for_data(timeout).await?;
            self.process_completed()?;
        }
        Ok(())
    }

    /// Pull completions the multiplexer can report without waiting.
    fn poll_progress(&mut self) {
        while let Some(Some(done)) = self.multiplexer.next().now_or_never() {
            self.ready.push_back(done);
        }
    }

    fn complete(&mut self, id: OperationId, raw: RawTransfer) -> Result<(), Error> {
        self.running -= 1;
        let binding = self
            .pending
            .remove(&id)
            .expect("completed operation lost its binding; this is a bug");
        let (operation, callback) = binding.into_parts();

        let response = operation.create_response(raw);
        trace!(?id, status = %response.status(), running = self.running, "operation complete");

        if let Some(callback) = callback {
            if let Err(error) = callback(response, self) {
                match self.policy {
                    CallbackPolicy::Propagate => {
                        return Err(Error::Callback { id, source: error });
                    }
                    CallbackPolicy::Isolate => {
                        tracing::error!(?id, %error, "callback failed");
                        self.failures.push(CallbackFailure { id, error });
                    }
                }
            }
        }

        self.start_from_queue();
        Ok(())
    }

    /// Admit the highest-priority queued operation when a slot is free.
    fn start_from_queue(&mut self) {
        let free = self
            .parallel_limit
            .map_or(true, |limit| self.running < limit.get());
        if !free {
            return;
        }

        let Some(entry) = self.queue.pop() else {
            return;
        };
        let binding = self
            .pending
            .get_mut(&entry.id)
            .expect("queued operation lost its binding; this is a bug");

        let id = entry.id;
        let transfer = binding.operation_mut().begin();
        self.multiplexer
            .push(transfer.map(move |raw| (id, raw)).boxed());
        self.running += 1;
        trace!(?id, running = self.running, "operation admitted");
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("count", &self.count())
            .field("running", &self.running)
            .field("queued", &self.queue.len())
            .field("parallel_limit", &self.parallel_limit)
            .finish()
    }
}
