//! The `matchit`-based router: an [`App`] builder that implements
//! [`breeze_core::RouterAdapter`], finalized into a servable [`Router`] that implements
//! [`http_kit::Endpoint`].
//!
//! Adapted from the teacher's `routing/router.rs`: same `matchit::Router<Vec<(Method,
//! _)>>` shape, the same method-then-path lookup, and the same "log, then convert any
//! error into a response" top-level `Endpoint` impl. What changed is the payload stored
//! per route: instead of a per-request endpoint factory, each route now holds the
//! `(Operation, BoxDispatcher)` pair installed once at registration time, since
//! [`breeze_core::Dispatcher::dispatch`] takes `&self` and is cheap to share across
//! concurrent requests.

use std::collections::{HashMap, HashSet};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use breeze_core::adapter::{BoxDispatcher, RouterAdapter};
use breeze_core::{Dispatcher as _, Operation};
use http_kit::error::BoxHttpError;
use http_kit::{
    header::{CONTENT_LENGTH, CONTENT_TYPE},
    http_error, Endpoint, Method, Request, Response, StatusCode,
};
use matchit::Match;
use tracing::{error, info};

use crate::context::HttpKitContext;

struct Route {
    operation: Arc<Operation>,
    dispatcher: BoxDispatcher,
}

impl Debug for Route {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("operation_id", &self.operation.operation_id)
            .finish_non_exhaustive()
    }
}

/// A pre-rendered response served for an exact method+path, bypassing the operation
/// dispatcher pipeline entirely. Used for documentation routes (`/openapi.json` and
/// friends), which are ambient and not part of the typed API surface.
#[derive(Debug, Clone)]
pub(crate) struct StaticAsset {
    pub(crate) content_type: &'static str,
    pub(crate) body: Vec<u8>,
}

/// Accumulates `(method, path) -> dispatcher` registrations before the router is sealed.
///
/// Mirrors the teacher's `Route` builder: a plain map keyed by path, finalized once into
/// an immutable `matchit::Router` by [`App::build`].
#[derive(Default)]
pub struct App {
    routes: HashMap<String, Vec<(Method, Route)>>,
    statics: HashMap<(Method, String), StaticAsset>,
}

impl Debug for App {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App").finish_non_exhaustive()
    }
}

impl App {
    /// An empty builder with no routes registered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pre-rendered response for an exact method+path, outside the typed
    /// operation pipeline.
    pub fn static_route(&mut self, method: Method, path: impl Into<String>, asset: StaticAsset) {
        self.statics.insert((method, path.into()), asset);
    }

    /// Seal the builder into an immutable, cheaply-cloneable [`Router`].
    ///
    /// # Errors
    ///
    /// Returns [`RouteBuildError`] if the same method was registered twice for the same
    /// path, or if `matchit` rejects a path template.
    pub fn build(self) -> Result<Router, RouteBuildError> {
        let mut router = matchit::Router::new();
        for (path, entries) in self.routes {
            let mut seen = HashSet::new();
            for (method, ..) in &entries {
                if !seen.insert(method.clone()) {
                    return Err(RouteBuildError::RepeatedMethod {
                        path,
                        method: method.clone(),
                    });
                }
            }
            router.insert(path, entries)?;
        }
        Ok(Router {
            inner: Arc::new(router),
            statics: Arc::new(self.statics),
        })
    }
}

impl RouterAdapter for App {
    fn handle(&mut self, operation: &Operation, dispatcher: BoxDispatcher) {
        let path = operation.path.clone();
        let method = operation.method.clone();
        let route = Route {
            operation: Arc::new(operation.clone()),
            dispatcher,
        };
        self.routes.entry(path).or_default().push((method, route));
    }
}

/// Errors produced while sealing an [`App`] into a [`Router`].
#[derive(Debug)]
#[non_exhaustive]
pub enum RouteBuildError {
    /// The same method has been registered twice for the same path.
    RepeatedMethod {
        /// Path that already has a handler registered.
        path: String,
        /// Conflicting HTTP method.
        method: Method,
    },
    /// The underlying `matchit` router rejected the provided path pattern.
    MatchitError(matchit::InsertError),
}

impl From<matchit::InsertError> for RouteBuildError {
    fn from(error: matchit::InsertError) -> Self {
        Self::MatchitError(error)
    }
}

impl std::fmt::Display for RouteBuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RepeatedMethod { path, method } => {
                write!(f, "method {method} registered twice for path `{path}`")
            }
            Self::MatchitError(error) => write!(f, "{error}"),
        }
    }
}

impl std::error::Error for RouteBuildError {}

http_error!(pub NotFound, StatusCode::NOT_FOUND, "Route not found.");

fn content_length(request: &Request) -> Option<u64> {
    request
        .headers()
        .get(CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

fn plain_text_response(status: StatusCode, body: &'static str) -> Response {
    let mut response = Response::new(http_kit::Body::from_bytes(body.as_bytes().to_vec()));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, "text/plain".parse().unwrap());
    response
}

/// The sealed, servable router produced by [`App::build`].
///
/// Stores its routing tree behind an [`Arc`], so it clones cheaply and can be shared
/// across the worker pool the transport backend spawns per connection.
#[derive(Clone)]
pub struct Router {
    inner: Arc<matchit::Router<Vec<(Method, Route)>>>,
    statics: Arc<HashMap<(Method, String), StaticAsset>>,
}

impl Debug for Router {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router").finish_non_exhaustive()
    }
}

impl Router {
    fn search<'r, 'p>(
        &'r self,
        path: &'p str,
        method: &Method,
    ) -> Option<Match<'r, 'p, &'r Route>> {
        let Match { value, params } = self.inner.at(path).ok()?;
        value
            .iter()
            .find(|(route_method, ..)| route_method == method)
            .map(|(.., route)| Match {
                value: route,
                params,
            })
    }

    /// Routes first, then reads the body under the matched operation's `max_body_bytes`
    /// and `body_read_timeout` limits — so a documentation route or an unmatched path
    /// never pays for a body read at all, and a matched one is bounded before the
    /// handler ever sees it.
    async fn call(&self, request: &mut Request) -> Result<Response, BoxHttpError> {
        let path = request.uri().path().to_string();
        let method = request.method().clone();

        if let Some(asset) = self.statics.get(&(method.clone(), path.clone())) {
            let mut response = Response::new(http_kit::Body::from_bytes(asset.body.clone()));
            response
                .headers_mut()
                .insert(CONTENT_TYPE, asset.content_type.parse().unwrap());
            return Ok(response);
        }

        let Some(Match { value: route, params }) = self.search(&path, &method) else {
            return Err(Box::new(NotFound::new()) as BoxHttpError);
        };

        let params: Vec<(String, String)> = params
            .iter()
            .map(|(key, value)| (key.to_owned(), value.to_owned()))
            .collect();

        let max_body_bytes = route.operation.max_body_bytes;
        if content_length(request).is_some_and(|declared| declared > max_body_bytes) {
            return Ok(plain_text_response(
                StatusCode::PAYLOAD_TOO_LARGE,
                "request body too large",
            ));
        }

        let pending_body = std::mem::replace(request.body_mut(), http_kit::Body::empty());
        let body = match route.operation.body_read_timeout {
            Some(timeout) => {
                let read = async { Some(into_bytes(pending_body).await) };
                let timed_out = async {
                    async_io::Timer::after(timeout).await;
                    None
                };
                match futures_lite::future::race(read, timed_out).await {
                    Some(bytes) => bytes,
                    None => {
                        return Ok(plain_text_response(
                            StatusCode::REQUEST_TIMEOUT,
                            "request body read timed out",
                        ))
                    }
                }
            }
            None => into_bytes(pending_body).await,
        };

        if body.len() as u64 > max_body_bytes {
            return Ok(plain_text_response(
                StatusCode::PAYLOAD_TOO_LARGE,
                "request body too large",
            ));
        }

        let mut ctx = HttpKitContext::new(request, body, params, route.operation.clone());
        route.dispatcher.dispatch(&mut ctx).await;
        Ok(ctx.into_response())
    }
}

async fn into_bytes(body: http_kit::Body) -> Vec<u8> {
    body.into_bytes().await.map(|bytes| bytes.to_vec()).unwrap_or_default()
}

impl Endpoint for Router {
    type Error = BoxHttpError;

    async fn respond(&mut self, request: &mut Request) -> Result<Response, Self::Error> {
        info!(
            method = request.method().as_str(),
            path = request.uri().path(),
            "request received"
        );

        Ok(self.call(request).await.unwrap_or_else(|error| {
            let mut response = Response::new(http_kit::Body::empty());
            let status = error.status();
            *response.status_mut() = status;
            error!(
                message = error.to_string().as_str(),
                status = status.as_str(),
                "request failed"
            );
            response
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use breeze_core::dispatcher::{DispatcherContext, OperationDispatcher};
    use breeze_core::{Json, Method as CoreMethod, Registry};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    struct Pong {
        message: String,
    }

    fn ping_operation() -> Operation {
        let mut operation = Operation::new(CoreMethod::GET, "/ping", "ping");
        let mut registry = Registry::new();
        operation
            .register::<(), Json<Pong>>(&mut registry)
            .expect("operation registers cleanly");
        operation
    }

    #[tokio::test]
    async fn routes_to_the_matching_operation() {
        let mut app = App::new();
        let operation = ping_operation();
        let shared = Arc::new(DispatcherContext::default());
        let dispatcher = Box::pin(OperationDispatcher::new(
            Arc::new(operation.clone()),
            shared,
            |_: ()| async { Ok(Json(Pong { message: "pong".into() })) },
        ));
        app.handle(&operation, dispatcher);
        let router = app.build().expect("no conflicting routes");

        let mut request = Request::new(http_kit::Body::empty());
        *request.uri_mut() = "/ping".parse().unwrap();
        let response = router.clone().respond(&mut request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unmatched_path_produces_404() {
        let router = App::new().build().expect("empty router builds");
        let mut request = Request::new(http_kit::Body::empty());
        *request.uri_mut() = "/missing".parse().unwrap();
        let response = router.clone().respond(&mut request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    fn router_for(operation: Operation) -> Router {
        let mut app = App::new();
        let shared = Arc::new(DispatcherContext::default());
        let dispatcher = Box::pin(OperationDispatcher::new(
            Arc::new(operation.clone()),
            shared,
            |_: ()| async { Ok(Json(Pong { message: "pong".into() })) },
        ));
        app.handle(&operation, dispatcher);
        app.build().expect("no conflicting routes")
    }

    #[tokio::test]
    async fn declared_content_length_over_the_cap_is_413() {
        let mut operation = ping_operation();
        operation.max_body_bytes = 5;
        let router = router_for(operation);

        let mut request = Request::new(http_kit::Body::empty());
        *request.uri_mut() = "/ping".parse().unwrap();
        request
            .headers_mut()
            .insert(CONTENT_LENGTH, "100".parse().unwrap());
        let response = router.clone().respond(&mut request).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn actual_body_over_the_cap_is_413_even_without_content_length() {
        let mut operation = ping_operation();
        operation.max_body_bytes = 5;
        let router = router_for(operation);

        let mut request = Request::new(http_kit::Body::from_bytes(vec![0u8; 10]));
        *request.uri_mut() = "/ping".parse().unwrap();
        let response = router.clone().respond(&mut request).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn body_read_timeout_does_not_interfere_with_a_body_that_arrives() {
        let mut operation = ping_operation();
        operation.body_read_timeout = Some(std::time::Duration::from_secs(5));
        let router = router_for(operation);

        let mut request = Request::new(http_kit::Body::from_bytes(b"ok".to_vec()));
        *request.uri_mut() = "/ping".parse().unwrap();
        let response = router.clone().respond(&mut request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn repeated_method_same_path_is_rejected() {
        let mut app = App::new();
        let get_operation = ping_operation();
        let shared = Arc::new(DispatcherContext::default());
        app.handle(
            &get_operation,
            Box::pin(OperationDispatcher::new(
                Arc::new(get_operation.clone()),
                shared.clone(),
                |_: ()| async { Ok(Json(Pong { message: "a".into() })) },
            )),
        );
        app.handle(
            &get_operation,
            Box::pin(OperationDispatcher::new(
                Arc::new(get_operation.clone()),
                shared,
                |_: ()| async { Ok(Json(Pong { message: "b".into() })) },
            )),
        );
        assert!(matches!(
            app.build(),
            Err(RouteBuildError::RepeatedMethod { .. })
        ));
    }
}
