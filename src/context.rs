//! The [`Context`] implementation that drives a dispatcher over an `http_kit` request.

use breeze_core::context::{CancelToken, Context};
use breeze_core::Operation;
use http_kit::{header::HeaderName, HeaderValue, Method, Request, Response, StatusCode};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Path parameters matched by the router, in insertion order.
#[derive(Debug, Clone, Default)]
pub(crate) struct PathParams(Vec<(String, String)>);

impl PathParams {
    pub(crate) fn new(params: Vec<(String, String)>) -> Self {
        Self(params)
    }

    fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find_map(|(k, v)| if k == name { Some(v.as_str()) } else { None })
    }
}

/// Query parameters parsed from the request URI, in declaration order.
#[derive(Debug, Clone, Default)]
struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    fn parse(query: &str) -> Self {
        match serde_urlencoded::from_str::<Vec<(String, String)>>(query) {
            Ok(pairs) => Self(pairs),
            Err(_) => Self::default(),
        }
    }

    fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find_map(|(k, v)| if k == name { Some(v.as_str()) } else { None })
    }
}

/// A [`Context`] over an in-flight `http_kit` request/response pair.
///
/// Grounded on the teacher's `routing/param.rs` `Params` extractor (path params stashed as
/// request extensions) and `routing/router.rs` (method/path/extensions access). The request body
/// is buffered into memory before the context is built, since [`Context::body`] is synchronous.
pub struct HttpKitContext<'req> {
    request: &'req Request,
    body: Vec<u8>,
    params: PathParams,
    query: QueryParams,
    operation: Arc<Operation>,
    cancel_token: CancelToken,
    response: Response,
}

impl<'req> HttpKitContext<'req> {
    /// Build a context for `request`, whose body has already been buffered into `body`.
    pub(crate) fn new(
        request: &'req Request,
        body: Vec<u8>,
        params: Vec<(String, String)>,
        operation: Arc<Operation>,
    ) -> Self {
        let query = request.uri().query().unwrap_or_default();
        Self {
            request,
            body,
            params: PathParams::new(params),
            query: QueryParams::parse(query),
            operation,
            cancel_token: CancelToken::new(),
            response: Response::new(http_kit::Body::empty()),
        }
    }

    /// Consume the context, returning the response accumulated so far.
    pub(crate) fn into_response(self) -> Response {
        self.response
    }
}

impl Context for HttpKitContext<'_> {
    fn operation(&self) -> &Operation {
        &self.operation
    }

    fn url(&self) -> &str {
        self.request.uri().path()
    }

    fn host(&self) -> &str {
        self.request
            .uri()
            .host()
            .or_else(|| {
                self.request
                    .headers()
                    .get(http_kit::header::HOST)
                    .and_then(|value| value.to_str().ok())
            })
            .unwrap_or_default()
    }

    fn method(&self) -> Method {
        self.request.method().clone()
    }

    fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name)
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.request
            .headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
    }

    fn body(&self) -> &[u8] {
        &self.body
    }

    fn each_header(&self, name: &str, visit: &mut dyn FnMut(&str)) {
        for value in self.request.headers().get_all(name) {
            if let Ok(value) = value.to_str() {
                visit(value);
            }
        }
    }

    fn cancel_token(&self) -> CancelToken {
        self.cancel_token.clone()
    }

    fn set_status(&mut self, status: StatusCode) {
        *self.response.status_mut() = status;
    }

    fn set_header(&mut self, name: &str, value: &str) {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_str(name),
            HeaderValue::from_str(value),
        ) {
            self.response.headers_mut().insert(name, value);
        }
    }

    fn append_header(&mut self, name: &str, value: &str) {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_str(name),
            HeaderValue::from_str(value),
        ) {
            self.response.headers_mut().append(name, value);
        }
    }

    fn write_body(&mut self, body: Vec<u8>) {
        *self.response.body_mut() = http_kit::Body::from_bytes(body);
    }

    fn set_read_deadline(&mut self, _timeout: Option<Duration>) {
        // `http_kit`'s body is already fully buffered by the time a context exists, so
        // there is no in-flight read left to bound.
    }
}
