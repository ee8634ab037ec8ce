//! OpenAPI Document (spec.md §4.5): a writable in-memory model of the OpenAPI 3.1
//! document being built as operations are registered.

use alloc::{
    boxed::Box,
    collections::BTreeMap,
    string::{String, ToString},
    vec::Vec,
};

use crate::operation::Operation;
use crate::schema::Registry;

/// A hook invoked by [`OpenApiDocument::add_operation`] right before an operation is
/// recorded, allowed to attach extra response headers / `$schema` links (spec.md's
/// "Registration hooks").
pub trait OnAddHook: core::fmt::Debug {
    /// Observe (and possibly mutate) a fully built operation before it is stored.
    fn on_add(&self, operation: &mut Operation);
}

/// In-memory OpenAPI 3.1 document, growing incrementally as operations register.
#[derive(Debug, Default)]
pub struct OpenApiDocument {
    /// Document-level info (title, version, description).
    pub info: Info,
    /// Server list, as in the OpenAPI `servers` array.
    pub servers: Vec<String>,
    /// The schema registry backing `components.schemas`.
    pub registry: Registry,
    /// path -> method -> Operation.
    paths: BTreeMap<String, BTreeMap<String, Operation>>,
    hooks: Vec<Box<dyn OnAddHook + Send + Sync>>,
}

/// OpenAPI `info` object essentials.
#[derive(Debug, Clone, Default)]
pub struct Info {
    /// API title.
    pub title: String,
    /// API version string (not the OpenAPI spec version).
    pub version: String,
    /// Optional longer description.
    pub description: Option<String>,
}

impl OpenApiDocument {
    /// An empty document with the given title/version.
    #[must_use]
    pub fn new(title: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            info: Info {
                title: title.into(),
                version: version.into(),
                description: None,
            },
            ..Self::default()
        }
    }

    /// Register an `on-add` hook, run for every operation added afterward.
    pub fn add_hook(&mut self, hook: impl OnAddHook + Send + Sync + 'static) {
        self.hooks.push(Box::new(hook));
    }

    /// Record `operation` in the document, running every registered hook first.
    ///
    /// # Panics
    ///
    /// Panics if another operation already claims the same method+path.
    pub fn add_operation(&mut self, mut operation: Operation) {
        for hook in &self.hooks {
            hook.on_add(&mut operation);
        }
        let method = operation.method.to_string();
        let path = operation.path.clone();
        let methods = self.paths.entry(path).or_default();
        assert!(
            !methods.contains_key(&method),
            "operation already registered for this method and path"
        );
        methods.insert(method, operation);
    }

    /// Iterate every registered operation, in path-then-method order.
    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.paths.values().flat_map(BTreeMap::values)
    }

    /// Serialize the document to a `serde_json::Value` following the OpenAPI 3.1 shape.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::{json, Map, Value};

        let mut paths = Map::new();
        for (path, methods) in &self.paths {
            let mut path_item = Map::new();
            for (method, operation) in methods {
                path_item.insert(method.to_lowercase(), operation.to_json(&self.registry));
            }
            paths.insert(path.clone(), Value::Object(path_item));
        }

        let mut schemas = Map::new();
        for (name, object) in self.registry.iter() {
            schemas.insert(name.to_string(), object.to_json(&self.registry));
        }

        json!({
            "openapi": "3.1.0",
            "info": {
                "title": self.info.title,
                "version": self.info.version,
                "description": self.info.description,
            },
            "servers": self.servers.iter().map(|s| json!({"url": s})).collect::<Vec<_>>(),
            "paths": paths,
            "components": { "schemas": schemas },
        })
    }

    /// Serialize the document as a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if YAML serialization fails.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self.to_json())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::Operation;
    use http_kit::Method;

    #[test]
    fn add_operation_groups_by_path_then_method() {
        let mut doc = OpenApiDocument::new("Test API", "1.0.0");
        doc.add_operation(Operation::new(Method::GET, "/items/{id}", "getItem"));
        doc.add_operation(Operation::new(Method::PUT, "/items/{id}", "putItem"));
        assert_eq!(doc.operations().count(), 2);
        let json = doc.to_json();
        assert!(json["paths"]["/items/{id}"]["get"].is_object());
        assert!(json["paths"]["/items/{id}"]["put"].is_object());
    }
}
