//! Request Dispatcher (spec.md §4.6 "Dispatcher contract", §4.7).
//!
//! The per-operation closure produced once at registration and installed on the router
//! adapter. Runs the full per-request lifecycle: parameter extraction, body read with
//! limits, validation, resolver invocation, handler call, output serialization, and
//! error shaping.

use alloc::{
    boxed::Box,
    collections::BTreeMap,
    string::{String, ToString},
    sync::Arc,
    vec::Vec,
};
use core::future::Future;
use core::pin::Pin;

use http_kit::StatusCode;
use serde_json::Value;

use crate::context::Context;
use crate::error::{Error, ErrorDetail};
use crate::negotiate::{problem_content_type, Negotiator};
use crate::operation::{Operation, OperationInput, OperationOutput, ParamLocation};
use crate::pool::{BodyPool, ValidatePool};
use crate::problem::Problem;
use crate::schema::Registry;
use crate::transform::Transform;
use crate::validate::{Mode, Validator};

type BoxFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Type-erased per-operation dispatcher, installed on the router adapter.
pub trait Dispatcher: Send + Sync {
    /// Run the full request lifecycle against `ctx`, writing the response through it.
    fn dispatch<'a>(&'a self, ctx: &'a mut dyn Context) -> BoxFuture<'a>;
}

/// Shared, read-only state every dispatcher needs: the schema registry, negotiator, and
/// pools, all populated/created once before the first request (spec.md §5 "Registration
/// concurrency").
pub struct DispatcherContext {
    /// The schema registry backing every operation's validation.
    pub registry: Registry,
    /// The content negotiator used to pick request/response formats.
    pub negotiator: Negotiator,
    /// The validation scratch pool.
    pub validate_pool: ValidatePool,
    /// The body scratch pool.
    pub body_pool: BodyPool,
    /// Transforms applied, in order, to successful responses.
    pub transforms: Vec<Box<dyn Transform>>,
}

impl core::fmt::Debug for DispatcherContext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DispatcherContext")
            .field("registry_len", &self.registry.len())
            .field("transforms", &self.transforms.len())
            .finish()
    }
}

impl Default for DispatcherContext {
    fn default() -> Self {
        let mut negotiator = Negotiator::new();
        negotiator.register(crate::negotiate::json_format());
        Self {
            registry: Registry::new(),
            negotiator,
            validate_pool: ValidatePool::new(),
            body_pool: BodyPool::new(),
            transforms: Vec::new(),
        }
    }
}

/// The concrete per-`(Operation, handler)` dispatcher, generic over the typed
/// input/output models and the handler closure.
pub struct OperationDispatcher<I, O, H> {
    operation: Arc<Operation>,
    shared: Arc<DispatcherContext>,
    handler: H,
    _marker: core::marker::PhantomData<fn(I) -> O>,
}

impl<I, O, H, Fut> OperationDispatcher<I, O, H>
where
    I: OperationInput,
    O: OperationOutput,
    H: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = core::result::Result<O, Error>> + Send,
{
    /// Build a dispatcher for `operation`, calling `handler` once parsing, validation
    /// and resolvers have all succeeded.
    pub fn new(operation: Arc<Operation>, shared: Arc<DispatcherContext>, handler: H) -> Self {
        Self {
            operation,
            shared,
            handler,
            _marker: core::marker::PhantomData,
        }
    }

    async fn run(&self, ctx: &mut dyn Context) {
        let mut scratch = self.shared.validate_pool.checkout();
        let op = &*self.operation;

        // Step 1/2: parameters.
        let mut raw_params: BTreeMap<String, Value> = BTreeMap::new();
        let mut param_errors: Vec<ErrorDetail> = Vec::new();

        for (spec, schema) in op.params.iter().zip(&op.resolved_param_schemas) {
            let raw = read_param(ctx, spec.location, spec.name)
                .or(spec.default.map(str::to_string));

            let Some(raw) = raw else {
                if spec.required {
                    scratch.path.push_segment(spec.name);
                    param_errors.push(
                        ErrorDetail::new("required parameter is missing".into())
                            .at(scratch.path.as_str().to_string()),
                    );
                    scratch.path.pop();
                }
                continue;
            };

            let value = parse_param_value(&raw);
            if !op.flags.skip_validate_params {
                scratch.path.push_segment(spec.name);
                Validator.validate(
                    &value,
                    schema,
                    &self.shared.registry,
                    Mode::WriteToServer,
                    &mut scratch.path,
                    &mut scratch.result,
                );
                scratch.path.pop();
            }
            raw_params.insert(spec.name.to_string(), value);
        }

        // Step 3: body.
        let mut body_value: Option<Value> = None;
        if let Some(body_spec) = &op.body {
            let raw_body = ctx.body();
            if !raw_body.is_empty() {
                match serde_json::from_slice::<Value>(raw_body) {
                    Ok(decoded) => {
                        if !op.flags.skip_validate_body {
                            if let Some(schema) = &op.resolved_body_schema {
                                scratch.path.reset();
                                scratch.path.push_segment("body");
                                Validator.validate(
                                    &decoded,
                                    schema,
                                    &self.shared.registry,
                                    Mode::WriteToServer,
                                    &mut scratch.path,
                                    &mut scratch.result,
                                );
                            }
                        }
                        body_value = Some(decoded);
                    }
                    Err(e) => {
                        param_errors.push(ErrorDetail::new(e.to_string()).at("body"));
                    }
                }
            } else if body_spec.required {
                param_errors.push(ErrorDetail::new("request body is required".into()).at("body"));
            }
        }

        for error in scratch.result.errors() {
            param_errors.push(
                ErrorDetail::new(error.message.clone())
                    .at(error.location.clone())
                    .with_value(error.value.clone()),
            );
        }

        if !param_errors.is_empty() {
            let error = Error::msg("request failed validation")
                .set_status(StatusCode::UNPROCESSABLE_ENTITY)
                .with_details(param_errors);
            self.shared.validate_pool.release(scratch);
            write_error(ctx, &self.shared, &error);
            return;
        }

        let input = match I::from_values(&raw_params, body_value) {
            Ok(input) => input,
            Err(error) => {
                self.shared.validate_pool.release(scratch);
                write_error(ctx, &self.shared, &error.set_status(StatusCode::BAD_REQUEST));
                return;
            }
        };
        self.shared.validate_pool.release(scratch);
        let mut input = input;
        input.apply_defaults();

        // Step 4: resolvers.
        let resolver_errors = input.resolve(ctx);
        if !resolver_errors.is_empty() {
            let mut combined =
                Error::msg("one or more resolvers reported an error").set_status(422);
            for err in resolver_errors {
                combined = combined.with_details(err.details().iter().cloned());
            }
            write_error(ctx, &self.shared, &combined);
            return;
        }

        // Step 6: handler.
        let output = (self.handler)(input).await;
        let output = match output {
            Ok(output) => output,
            Err(error) => {
                write_error(ctx, &self.shared, &error);
                return;
            }
        };

        // Steps 8-12: serialize output.
        let (status_override, headers, body) = output.into_parts();
        for (name, value) in headers {
            ctx.set_header(&name, &value);
        }

        let status = status_override.unwrap_or(O::status());
        let wants_body =
            body.is_some() && status != StatusCode::NO_CONTENT && status != StatusCode::NOT_MODIFIED;

        // Negotiate before committing the success status: a 406 here must replace it,
        // not follow it, or the client sees 200 with an empty body.
        let format = wants_body
            .then(|| self.shared.negotiator.negotiate(ctx.header("accept")))
            .transpose();
        let format = match format {
            Ok(format) => format,
            Err(error) => {
                write_error(ctx, &self.shared, &error);
                return;
            }
        };
        ctx.set_status(status);

        if let Some(mut value) = body {
            for transform in &self.shared.transforms {
                value = transform
                    .apply(ctx, status.as_str(), value)
                    .unwrap_or(value);
            }
            if let Some(format) = format {
                if let Ok(bytes) = (format.marshal)(&value) {
                    ctx.set_header("content-type", format.media_type);
                    ctx.write_body(bytes);
                }
            }
        }
    }
}

fn read_param(ctx: &dyn Context, location: ParamLocation, name: &str) -> Option<String> {
    match location {
        ParamLocation::Path => ctx.param(name).map(str::to_string),
        ParamLocation::Query => ctx.query(name).map(str::to_string),
        ParamLocation::Header => ctx.header(name).map(str::to_string),
        ParamLocation::Cookie => ctx.header("cookie").and_then(|cookie_header| {
            cookie_header.split(';').find_map(|pair| {
                let (key, value) = pair.trim().split_once('=')?;
                (key == name).then(|| value.to_string())
            })
        }),
    }
}

fn parse_param_value(raw: &str) -> Value {
    if let Ok(n) = raw.parse::<i64>() {
        return Value::from(n);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return Value::from(f);
    }
    if let Ok(b) = raw.parse::<bool>() {
        return Value::from(b);
    }
    Value::String(raw.to_string())
}

fn write_error(ctx: &mut dyn Context, shared: &DispatcherContext, error: &Error) {
    ctx.set_status(error.status());
    let problem = Problem::from_error(error, Some(ctx.url().to_string()));
    if let Ok(format) = shared.negotiator.negotiate(ctx.header("accept")) {
        let content_type = problem_content_type(format.media_type);
        ctx.set_header("content-type", &content_type);
        if let Ok(value) = serde_json::to_value(&problem) {
            if let Ok(bytes) = (format.marshal)(&value) {
                ctx.write_body(bytes);
            }
        }
    }
    for (name, value) in error.headers() {
        ctx.set_header(name.as_str(), value.to_str().unwrap_or(""));
    }
}

impl<I, O, H, Fut> Dispatcher for OperationDispatcher<I, O, H>
where
    I: OperationInput,
    O: OperationOutput,
    H: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = core::result::Result<O, Error>> + Send,
{
    fn dispatch<'a>(&'a self, ctx: &'a mut dyn Context) -> BoxFuture<'a> {
        Box::pin(self.run(ctx))
    }
}
