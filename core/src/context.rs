//! Per-request context interface (spec.md §3, §6).
//!
//! The adapter (e.g. `breeze-hyper` through `breeze`'s router) constructs a `Context`
//! implementation that lives for the request only and is handed down through resolvers,
//! the dispatcher, and transforms.

use alloc::vec::Vec;
use core::time::Duration;

use http_kit::{Method, StatusCode};

use crate::operation::Operation;

/// A logical cancellation signal carried in the [`Context`], independent of whatever
/// transport-level disconnect mechanism the adapter uses.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: alloc::sync::Arc<core::sync::atomic::AtomicBool>,
}

impl CancelToken {
    /// A token that is never cancelled unless [`Self::cancel`] is called.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark this token (and every clone of it) as cancelled.
    pub fn cancel(&self) {
        self.cancelled.store(true, core::sync::atomic::Ordering::SeqCst);
    }

    /// Whether [`Self::cancel`] has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(core::sync::atomic::Ordering::SeqCst)
    }
}

/// Per-request capability bundle handed to resolvers, the dispatcher, and transforms.
///
/// Exactly one status is written per request; headers may only be set before the status
/// is written; middleware may wrap or replace the context (spec.md §3 invariant).
pub trait Context: Send {
    /// The operation currently being dispatched.
    fn operation(&self) -> &Operation;
    /// The request's full URL path plus query string.
    fn url(&self) -> &str;
    /// The `Host` the request was addressed to.
    fn host(&self) -> &str;
    /// The request method.
    fn method(&self) -> Method;
    /// A path parameter extracted by the router, by name.
    fn param(&self, name: &str) -> Option<&str>;
    /// A query parameter, by name (first occurrence if repeated).
    fn query(&self, name: &str) -> Option<&str>;
    /// A request header, by name (first occurrence if repeated).
    fn header(&self, name: &str) -> Option<&str>;
    /// The raw request body, already read up to the operation's `max_body_bytes` cap by
    /// the adapter before dispatch began. Empty when the operation has no body.
    fn body(&self) -> &[u8];
    /// Visit every value of a possibly-repeated header.
    fn each_header(&self, name: &str, visit: &mut dyn FnMut(&str));
    /// This request's logical cancellation token.
    fn cancel_token(&self) -> CancelToken;

    /// Set the response status. Must be called at most once per request.
    fn set_status(&mut self, status: StatusCode);
    /// Set a response header, replacing any existing value(s).
    fn set_header(&mut self, name: &str, value: &str);
    /// Append a response header without replacing existing values.
    fn append_header(&mut self, name: &str, value: &str);
    /// Write the complete response body. Called at most once per request, after the
    /// status and headers have been set.
    fn write_body(&mut self, body: Vec<u8>);
    /// Set how long the adapter should wait for the remainder of the request body.
    ///
    /// `None` clears any deadline; `Some(Duration::ZERO)` leaves the existing deadline
    /// untouched, matching spec.md's "positive: now + timeout; negative: clear; zero:
    /// leave" rule expressed over an unsigned duration plus this enum-free sentinel.
    fn set_read_deadline(&mut self, timeout: Option<Duration>);
}

/// The state of one request as it moves through the dispatcher (spec.md §4.6 "Operation
/// state machine").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    /// The request has been routed to an operation but nothing has run yet.
    Received,
    /// Parameter and body parsing is underway.
    Parsing,
    /// Parsed values are being validated against their schemas.
    Validating,
    /// Resolvers are running.
    Resolving,
    /// The user handler is running.
    Handling,
    /// The response is being serialized and written.
    Writing,
    /// The request lifecycle has completed.
    Done,
}
