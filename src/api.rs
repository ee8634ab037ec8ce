//! The top-level builder: registers typed operations, grows the OpenAPI document, and
//! seals everything into a servable [`crate::routing::Router`].

use std::future::Future;
use std::sync::Arc;

use breeze_core::adapter::RouterAdapter;
use breeze_core::dispatcher::{DispatcherContext, OperationDispatcher};
use breeze_core::openapi::OpenApiDocument;
use breeze_core::{Error, Method, Operation, OperationInput, OperationOutput};

use crate::config::Config;
use crate::routing::{App, RouteBuildError, Router};

/// Errors returned while assembling an [`Api`].
#[derive(Debug)]
pub enum BuildError {
    /// Registering the operation's typed schemas failed (e.g. a duplicate schema name).
    Operation(Error),
    /// Sealing the router failed (e.g. a duplicate method+path registration).
    Route(RouteBuildError),
}

impl std::fmt::Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Operation(error) => write!(f, "{error}"),
            Self::Route(error) => write!(f, "{error}"),
        }
    }
}

impl std::error::Error for BuildError {}

type DeferredInstall = Box<dyn FnOnce(Arc<DispatcherContext>, &mut App)>;

/// Builds an HTTP API out of typed operations, the way the teacher's `Route::new(...)`
/// builder accumulates endpoints before calling `.build()` — except each entry here is a
/// typed [`breeze_core::Operation`] plus handler rather than a raw `http_kit::Endpoint`.
pub struct Api {
    document: OpenApiDocument,
    deferred: Vec<DeferredInstall>,
    config: Config,
}

impl Api {
    /// An empty API with the given OpenAPI `info.title`/`info.version`.
    #[must_use]
    pub fn new(title: impl Into<String>, version: impl Into<String>, config: Config) -> Self {
        Self {
            document: OpenApiDocument::new(title, version),
            deferred: Vec::new(),
            config,
        }
    }

    /// Register one operation.
    ///
    /// `handler` runs after parameters and body have been parsed, validated, and
    /// resolved; it receives the already-typed `I` and must return `O` or a
    /// [`breeze_core::Error`] (shaped into an RFC 9457 problem response automatically).
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Operation`] if registering `I`/`O`'s schemas fails, e.g.
    /// because a different type already claims the same generated schema name.
    pub fn operation<I, O, H, Fut>(
        &mut self,
        method: Method,
        path: impl Into<String>,
        operation_id: impl Into<String>,
        handler: H,
    ) -> Result<&mut Self, BuildError>
    where
        I: OperationInput + 'static,
        O: OperationOutput + 'static,
        H: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, Error>> + Send + 'static,
    {
        let mut operation = Operation::new(method, path, operation_id);
        operation.max_body_bytes = self.config.max_body_bytes;
        if let Some(timeout_ms) = self.config.body_read_timeout_ms {
            operation.body_read_timeout = Some(std::time::Duration::from_millis(timeout_ms));
        }
        operation
            .register::<I, O>(&mut self.document.registry)
            .map_err(BuildError::Operation)?;

        self.document.add_operation(operation.clone());

        let operation = Arc::new(operation);
        self.deferred.push(Box::new(move |shared, app| {
            let dispatcher = Box::pin(OperationDispatcher::new(
                operation.clone(),
                shared,
                handler,
            ));
            app.handle(&operation, dispatcher);
        }));

        Ok(self)
    }

    /// Seal every registered operation into a servable [`Router`], wiring in the
    /// `/openapi.json`, `/openapi.yaml`, and `/schemas/{Name}.json` documentation routes
    /// alongside the application's own operations.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Route`] if two operations share the same method and path.
    pub fn build(self) -> Result<Router, BuildError> {
        let shared = Arc::new(DispatcherContext::default());
        let mut app = App::new();
        for install in self.deferred {
            install(shared.clone(), &mut app);
        }
        crate::docs::install(&mut app, &self.config.docs, &self.document);
        app.build().map_err(BuildError::Route)
    }
}
