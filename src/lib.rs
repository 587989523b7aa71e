//! Courier
//!
//! Priority-ordered dispatch for concurrent network operations, and
//! resilient per-call API clients.
//!
//! There are two request paths in this library, sharing one data model:
//!
//! 1. The [`Dispatcher`] drives many network operations from a single task,
//!    admitting them from a priority queue under an optional concurrency cap
//!    and completing them through caller-supplied callbacks.
//! 2. The [`Client`] executes one call at a time through a pluggable
//!    [transport][crate::transport], gated by a circuit breaker and an
//!    optional response cache, with a one-shot token-refresh retry.

pub mod auth;
pub mod breaker;
pub mod cache;
pub mod client;
pub use client::Client;
pub mod dispatch;
pub use dispatch::Dispatcher;
pub mod response;
pub use response::Response;
pub mod transport;

/// A type-erased error.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
