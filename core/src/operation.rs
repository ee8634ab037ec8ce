//! Operation data model (spec.md §3) and Operation Registrar (spec.md §4.6).
//!
//! Real reflection-free registration happens through [`OperationInput`] and
//! [`OperationOutput`], implemented for application types by `#[derive(OperationInput)]`
//! / `#[derive(OperationOutput)]` in `breeze-macros`. Those derives emit, at compile
//! time, exactly the per-field plan spec.md describes Go building by runtime reflection
//! (SPEC_FULL.md §9): a `param_specs()` const table plus a `from_values`/`into_parts`
//! pair that assemble/disassemble the typed struct through one `serde_json::Value`
//! instead of per-field index-path pokes, since Rust has no runtime struct-field
//! reflection to poke through.

use alloc::{
    boxed::Box,
    collections::BTreeMap,
    string::{String, ToString},
    vec::Vec,
};
use core::time::Duration;

use http_kit::{Method, StatusCode};
use serde_json::Value;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::schema::{Generate, Registry, Schema};

/// Where a parameter's raw string value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamLocation {
    /// A `{name}` path template segment.
    Path,
    /// A query-string key.
    Query,
    /// A request header.
    Header,
    /// A cookie.
    Cookie,
}

/// One input parameter, precomputed at registration time (spec.md §4.6 step 1).
#[derive(Debug, Clone)]
pub struct ParamSpec {
    /// Parameter name as it appears on the wire.
    pub name: &'static str,
    /// Where to read the raw string from.
    pub location: ParamLocation,
    /// Whether the parameter must be present (path parameters are always required).
    pub required: bool,
    /// Default value string applied when the parameter is absent.
    pub default: Option<&'static str>,
    /// Whether this parameter should be omitted from the documented parameter list.
    pub hidden: bool,
    /// Build this parameter's schema in the registry.
    pub schema: fn(&mut Registry) -> Result<Schema>,
}

/// The request body's declared content type and schema (spec.md §4.6 step 2).
#[derive(Debug, Clone)]
pub struct BodySpec {
    /// Content type, e.g. `"application/json"`.
    pub content_type: &'static str,
    /// Whether an empty body is rejected with 400.
    pub required: bool,
    /// Build the body schema in the registry.
    pub schema: fn(&mut Registry) -> Result<Schema>,
}

/// One documented response (spec.md §4.6 step 3).
#[derive(Debug, Clone)]
pub struct ResponseSpec {
    /// `"200"`, `"404"`, or `"default"`.
    pub status: String,
    /// Content type of the body, when a body is present.
    pub content_type: Option<&'static str>,
    /// Body schema, when present.
    pub schema: Option<Schema>,
    /// Human-readable description.
    pub description: Option<String>,
}

/// A declared error status, contributing a response entry (spec.md §4.6 step 4).
#[derive(Debug, Clone, Copy)]
pub struct ErrorSpec {
    /// The status code this error response documents.
    pub status: u16,
}

/// Operation-level runtime flags and limits.
#[derive(Debug, Clone)]
pub struct OperationFlags {
    /// Omit this operation from the documented OpenAPI paths.
    pub hidden: bool,
    /// Skip parameter validation against their schemas.
    pub skip_validate_params: bool,
    /// Skip body validation against its schema.
    pub skip_validate_body: bool,
}

impl Default for OperationFlags {
    fn default() -> Self {
        Self {
            hidden: false,
            skip_validate_params: false,
            skip_validate_body: false,
        }
    }
}

/// One HTTP method + path template with a typed handler (spec.md §3 `Operation`).
///
/// Created by the caller, finalized by the registrar, immutable thereafter.
#[derive(Debug, Clone)]
pub struct Operation {
    /// The HTTP method this operation answers.
    pub method: Method,
    /// The path template, with `{name}` placeholders.
    pub path: String,
    /// Must be unique across the whole document.
    pub operation_id: String,
    /// Short summary shown in documentation.
    pub summary: Option<String>,
    /// Longer description shown in documentation.
    pub description: Option<String>,
    /// Declared error status codes, beyond the implicit 422/500.
    pub declared_errors: Vec<u16>,
    /// Maximum accepted request body size in bytes.
    pub max_body_bytes: u64,
    /// How long to wait for the body to finish arriving.
    pub body_read_timeout: Option<Duration>,
    /// Runtime behavior flags.
    pub flags: OperationFlags,
    /// Precomputed parameter plan, populated by [`Self::register`].
    pub params: Vec<ParamSpec>,
    /// Each parameter's schema, resolved once at registration time and reused for every
    /// request (parallel to `params`, same index) — this is what lets the dispatcher
    /// validate without ever touching the registry again.
    pub resolved_param_schemas: Vec<Schema>,
    /// Precomputed body plan, populated by [`Self::register`].
    pub body: Option<BodySpec>,
    /// The body's schema, resolved once at registration time.
    pub resolved_body_schema: Option<Schema>,
    /// Precomputed response plan, populated by [`Self::register`].
    pub responses: BTreeMap<String, ResponseSpec>,
    response_schema_name: Option<String>,
}

/// Default max body size: 8 MiB, matching the teacher workspace's general preference for
/// conservative built-in limits over unbounded reads.
pub const DEFAULT_MAX_BODY_BYTES: u64 = 8 * 1024 * 1024;

impl Operation {
    /// A bare operation with no parameters, body, or responses yet.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>, operation_id: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            operation_id: operation_id.into(),
            summary: None,
            description: None,
            declared_errors: Vec::new(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            body_read_timeout: None,
            flags: OperationFlags::default(),
            params: Vec::new(),
            resolved_param_schemas: Vec::new(),
            body: None,
            resolved_body_schema: None,
            responses: BTreeMap::new(),
            response_schema_name: None,
        }
    }

    /// Populate the parameter/body/response/error plan from the typed input/output
    /// models, registering every schema they need along the way (spec.md §4.6).
    ///
    /// # Errors
    ///
    /// Propagates any duplicate schema-name error raised while registering types.
    pub fn register<I: OperationInput, O: OperationOutput>(
        &mut self,
        registry: &mut Registry,
    ) -> Result<()> {
        self.params = I::param_specs().to_vec();
        self.resolved_param_schemas = self
            .params
            .iter()
            .map(|spec| (spec.schema)(registry))
            .collect::<Result<Vec<_>>>()?;

        if let Some(schema_fn) = I::body_spec() {
            let resolved = (schema_fn.schema)(registry)?;
            self.body = Some(BodySpec {
                content_type: schema_fn.content_type,
                required: schema_fn.required,
                schema: schema_fn.schema,
            });
            self.resolved_body_schema = Some(resolved);
        }

        let success_status = O::status();
        let body_schema = O::body_schema(registry)?;
        if let Some(Schema::Ref(name)) = &body_schema {
            self.response_schema_name = Some(name.clone());
        }
        let has_body = body_schema.is_some();
        let status_key = if has_body {
            success_status.as_u16().to_string()
        } else {
            StatusCode::NO_CONTENT.as_u16().to_string()
        };
        self.responses.insert(
            status_key,
            ResponseSpec {
                status: success_status.to_string(),
                content_type: has_body.then_some("application/json"),
                schema: body_schema,
                description: None,
            },
        );

        for &status in &self.declared_errors {
            self.responses.entry(status.to_string()).or_insert_with(|| ResponseSpec {
                status: status.to_string(),
                content_type: Some("application/problem+json"),
                schema: None,
                description: None,
            });
        }
        self.responses
            .entry("422".to_string())
            .or_insert_with(|| ResponseSpec {
                status: "422".into(),
                content_type: Some("application/problem+json"),
                schema: None,
                description: Some("Validation error".into()),
            });
        self.responses
            .entry("500".to_string())
            .or_insert_with(|| ResponseSpec {
                status: "500".into(),
                content_type: Some("application/problem+json"),
                schema: None,
                description: Some("Unexpected error".into()),
            });

        Ok(())
    }

    /// The registry name of this operation's success response schema, used by
    /// [`crate::transform::SchemaLink`].
    #[must_use]
    pub fn response_schema_name(&self) -> Option<&str> {
        self.response_schema_name.as_deref()
    }

    /// Set the success response schema name (used directly by tests and by
    /// hand-assembled operations that skip [`Self::register`]).
    pub fn set_response_schema_name(&mut self, name: impl Into<String>) {
        self.response_schema_name = Some(name.into());
    }

    /// Render this operation as an OpenAPI Path Item Object's operation entry, resolving
    /// parameter/body/response schemas against `registry`.
    #[must_use]
    pub fn to_json(&self, registry: &Registry) -> Value {
        use serde_json::{json, Map};

        let parameters: Vec<Value> = self
            .params
            .iter()
            .zip(&self.resolved_param_schemas)
            .filter(|(p, _)| !p.hidden)
            .map(|(p, schema)| {
                json!({
                    "name": p.name,
                    "in": match p.location {
                        ParamLocation::Path => "path",
                        ParamLocation::Query => "query",
                        ParamLocation::Header => "header",
                        ParamLocation::Cookie => "cookie",
                    },
                    "required": p.required,
                    "schema": schema.to_json(registry),
                })
            })
            .collect();

        let request_body = self.body.as_ref().map(|body| {
            let schema = self
                .resolved_body_schema
                .as_ref()
                .map(|s| s.to_json(registry))
                .unwrap_or(Value::Null);
            json!({
                "required": body.required,
                "content": { body.content_type: { "schema": schema } },
            })
        });

        let mut responses = Map::new();
        for (status, spec) in &self.responses {
            let mut entry = Map::new();
            entry.insert(
                "description".to_string(),
                Value::String(spec.description.clone().unwrap_or_default()),
            );
            if let (Some(content_type), Some(schema)) = (spec.content_type, &spec.schema) {
                entry.insert(
                    "content".to_string(),
                    json!({ content_type: { "schema": schema.to_json(registry) } }),
                );
            }
            responses.insert(status.clone(), Value::Object(entry));
        }

        json!({
            "operationId": self.operation_id,
            "summary": self.summary,
            "description": self.description,
            "parameters": parameters,
            "requestBody": request_body,
            "responses": responses,
        })
    }
}

/// Built by `#[derive(OperationInput)]`: precomputed parameter/body table plus the
/// assembly function used at dispatch time.
pub struct InputBodySpec {
    /// Content type, e.g. `"application/json"`.
    pub content_type: &'static str,
    /// Whether an empty body is rejected with 400.
    pub required: bool,
    /// Build the body schema in the registry.
    pub schema: fn(&mut Registry) -> Result<Schema>,
}

/// Typed request input model: path/query/header/cookie parameters plus an optional
/// body, assembled from a `serde_json::Value` built by the dispatcher out of the raw
/// wire values (spec.md §4.6's "input parameter plan" + "body plan", realized without
/// runtime field reflection).
pub trait OperationInput: Sized + Send + 'static {
    /// Per-field parameter table, empty for bodies with no parameters.
    fn param_specs() -> &'static [ParamSpec] {
        &[]
    }

    /// The request body plan, if this input type has a `body`/`raw_body` field.
    fn body_spec() -> Option<InputBodySpec> {
        None
    }

    /// Build `Self` out of the parsed parameter map (keyed by [`ParamSpec::name`]) and
    /// the decoded (and already-validated) body value, if any.
    ///
    /// # Errors
    ///
    /// Returns an error when the assembled value cannot be deserialized into `Self`.
    fn from_values(params: &BTreeMap<String, Value>, body: Option<Value>) -> Result<Self>;

    /// Run every field-level resolver in declaration order, returning every error
    /// produced (spec.md §4.6 step 5). The default implementation runs none.
    fn resolve(&mut self, _ctx: &mut dyn Context) -> Vec<Error> {
        Vec::new()
    }

    /// Apply precomputed default values to any field left at its zero value after body
    /// parsing (spec.md §4.6 step 6). The default implementation is a no-op.
    fn apply_defaults(&mut self) {}
}

/// Typed response output model: an optional body, an optional dynamic status override,
/// and response headers (spec.md §4.6's "response plan").
pub trait OperationOutput: Sized + Send + 'static {
    /// The default success status when the handler does not override it.
    fn status() -> StatusCode {
        StatusCode::OK
    }

    /// Build this output type's body schema in the registry, if it has a `body` field.
    ///
    /// # Errors
    ///
    /// Propagates duplicate schema-name errors.
    fn body_schema(_registry: &mut Registry) -> Result<Option<Schema>> {
        Ok(None)
    }

    /// Decompose a handler's return value into `(status override, headers, body
    /// value)`.
    fn into_parts(self) -> (Option<StatusCode>, Vec<(String, String)>, Option<Value>);
}

/// Marker implemented by fields a derive macro recognizes as post-parse resolvers
/// (spec.md's "resolver capability"). Implementors contribute to
/// [`OperationInput::resolve`] via macro-generated glue, not by this trait being called
/// directly from dispatch.
pub trait Resolver {
    /// Inspect/validate this field given the request context, returning any errors.
    fn resolve(&mut self, ctx: &mut dyn Context) -> Vec<Error>;
}

impl OperationInput for () {
    fn from_values(_params: &BTreeMap<String, Value>, _body: Option<Value>) -> Result<Self> {
        Ok(())
    }
}

impl OperationOutput for () {
    fn status() -> StatusCode {
        StatusCode::NO_CONTENT
    }

    fn into_parts(self) -> (Option<StatusCode>, Vec<(String, String)>, Option<Value>) {
        (None, Vec::new(), None)
    }
}

impl<T: Generate + serde::Serialize + Send + 'static> OperationOutput for crate::Json<T> {
    fn body_schema(registry: &mut Registry) -> Result<Option<Schema>> {
        Ok(Some(registry.schema_for::<T>(true)?))
    }

    fn into_parts(self) -> (Option<StatusCode>, Vec<(String, String)>, Option<Value>) {
        (
            None,
            Vec::new(),
            Some(serde_json::to_value(self.0).unwrap_or(Value::Null)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_response_is_422_and_500_even_with_no_body() {
        let mut operation = Operation::new(Method::GET, "/ping", "ping");
        let mut registry = Registry::new();
        operation.register::<(), ()>(&mut registry).unwrap();
        assert!(operation.responses.contains_key("422"));
        assert!(operation.responses.contains_key("500"));
        assert!(operation.responses.contains_key("204"));
    }
}
