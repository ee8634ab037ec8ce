#![deny(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations)]

//! Typed, self-documenting HTTP APIs: declare an [`Operation`] per route with typed
//! input/output models, register it on an [`Api`], and get request parsing, validation,
//! content negotiation, RFC 9457 error responses, and an OpenAPI 3.1 document for free.
//!
//! Built on the same `http-kit`/`matchit`/hyper stack as the router this crate grew out
//! of; see [`breeze_core`] for the Operation/Schema/Dispatcher data model this crate's
//! router and runtime wire together.

pub mod api;
pub mod config;
pub mod context;
mod docs;
pub mod routing;
pub mod runtime;

pub use api::{Api, BuildError};
pub use config::{Config, DocsConfig};
pub use context::HttpKitContext;
pub use routing::{App, RouteBuildError, Router};

#[doc(inline)]
pub use http_kit::{header, Body, Endpoint, Method, Request, Response, StatusCode, Uri};

#[doc(inline)]
pub use breeze_core::{
    Error, ErrorDetail, Json, Operation, OperationInput, OperationOutput, Resolver, Result,
    ResultExt,
};

/// Derive macros for [`OperationInput`]/[`OperationOutput`]/schema generation.
pub use breeze_macros::{OperationInput, OperationOutput, Schema};
