#![deny(unsafe_code)]
#![cfg_attr(not(feature = "std"), no_std)]
//! Core types for typed, self-documenting HTTP APIs: the Operation data model, the
//! Schema Registry and Generator, the Validator, the content Negotiator, the request
//! Dispatcher, and the OpenAPI document builder that ties them together.
//!
//! A router adapter (e.g. `breeze-hyper`, or `breeze`'s own `matchit`-based router)
//! implements [`adapter::RouterAdapter`] and installs one [`dispatcher::Dispatcher`] per
//! registered [`operation::Operation`]. A transport backend implements
//! [`server::Server`] over an [`http_kit::Endpoint`] that resolves each request to its
//! operation and runs the dispatcher.

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

#[cfg(feature = "std")]
pub mod adapter;
pub mod context;
#[cfg(feature = "std")]
pub mod dispatcher;
pub mod error;
#[cfg(feature = "openapi")]
pub mod openapi;
pub mod operation;
#[cfg(feature = "std")]
pub mod pool;
pub mod problem;
pub mod schema;
#[cfg(feature = "std")]
pub mod server;
pub mod transform;
pub mod validate;

mod negotiate;
pub use negotiate::{problem_content_type, Format, Negotiator};

#[cfg(feature = "std")]
pub use adapter::{BoxDispatcher, RouterAdapter};
pub use context::{CancelToken, Context, DispatchState};
#[cfg(feature = "std")]
pub use dispatcher::{Dispatcher, DispatcherContext, OperationDispatcher};
pub use error::{Error, ErrorDetail, Result, ResultExt};
pub use operation::{
    BodySpec, ErrorSpec, InputBodySpec, Operation, OperationFlags, OperationInput,
    OperationOutput, ParamLocation, ParamSpec, Resolver, ResponseSpec,
};
pub use problem::{Problem, ProblemDetail};
pub use schema::{CompiledRule, Generate, Registry, Schema, SchemaObject, StringFormat};
#[cfg(feature = "std")]
pub use server::Server;
pub use transform::{SchemaLink, Transform};
pub use validate::{Mode, ValidateResult, ValidationError, Validator};

pub use http_kit::{Method, StatusCode};

/// Wraps a serializable value as a JSON response body, the canonical
/// [`OperationOutput`](operation::OperationOutput) for handlers that return one typed
/// value with the default status and no extra headers.
///
/// Grounded on the teacher's `utils/json.rs` `Json<T>` body wrapper.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    /// Unwrap the inner value.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> From<T> for Json<T> {
    fn from(value: T) -> Self {
        Self(value)
    }
}

impl<T> core::ops::Deref for Json<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> core::ops::DerefMut for Json<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}
