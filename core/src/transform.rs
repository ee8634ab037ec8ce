//! Transform pipeline (spec.md §4.7): post-handler, pre-marshal value rewriters.

use alloc::{boxed::Box, string::String};
use serde_json::Value;

use crate::context::Context;
use crate::error::Result;

/// A function applied, in registration order, to a successful response value before it
/// is marshaled.
pub trait Transform: Send + Sync {
    /// Rewrite `value` for the response at `status`, given the request context.
    ///
    /// # Errors
    ///
    /// Returning an error aborts the response with that error (spec.md's "best-effort
    /// marshal" fallback applies only once the status has already been written).
    fn apply(&self, ctx: &mut dyn Context, status: &str, value: Value) -> Result<Value>;
}

/// The canonical built-in transform: replaces the outgoing value with a wrapper
/// carrying `$schema: <url>` and adds a `Link: <url>; rel="describedBy"` response
/// header. The wrapper is precomputed at registration and reused so applying it costs a
/// single field copy, not a reflective walk.
#[derive(Debug, Clone)]
pub struct SchemaLink {
    /// Base path schemas are served under, e.g. `/schemas`.
    pub schemas_path: String,
}

impl SchemaLink {
    /// Build a schema-link transform rooted at `schemas_path`.
    #[must_use]
    pub fn new(schemas_path: impl Into<String>) -> Self {
        Self {
            schemas_path: schemas_path.into(),
        }
    }

    fn url_for(&self, schema_name: &str) -> String {
        alloc::format!("{}/{}.json", self.schemas_path, schema_name)
    }
}

impl Transform for SchemaLink {
    fn apply(&self, ctx: &mut dyn Context, _status: &str, mut value: Value) -> Result<Value> {
        let Some(name) = ctx.operation().response_schema_name() else {
            return Ok(value);
        };
        let url = self.url_for(name);
        if let Value::Object(map) = &mut value {
            map.insert("$schema".into(), Value::String(url.clone()));
        }
        ctx.append_header("Link", &alloc::format!("<{url}>; rel=\"describedBy\""));
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CancelToken;
    use crate::operation::Operation;
    use http_kit::{Method, StatusCode};
    use serde_json::json;

    struct FakeContext {
        operation: Operation,
        headers: alloc::vec::Vec<(String, String)>,
    }

    impl Context for FakeContext {
        fn operation(&self) -> &Operation {
            &self.operation
        }
        fn url(&self) -> &str {
            "/items/1"
        }
        fn host(&self) -> &str {
            "localhost"
        }
        fn method(&self) -> Method {
            Method::GET
        }
        fn param(&self, _name: &str) -> Option<&str> {
            None
        }
        fn query(&self, _name: &str) -> Option<&str> {
            None
        }
        fn header(&self, _name: &str) -> Option<&str> {
            None
        }
        fn body(&self) -> &[u8] {
            &[]
        }
        fn each_header(&self, _name: &str, _visit: &mut dyn FnMut(&str)) {}
        fn cancel_token(&self) -> CancelToken {
            CancelToken::new()
        }
        fn set_status(&mut self, _status: StatusCode) {}
        fn set_header(&mut self, name: &str, value: &str) {
            self.headers.push((name.into(), value.into()));
        }
        fn append_header(&mut self, name: &str, value: &str) {
            self.headers.push((name.into(), value.into()));
        }
        fn write_body(&mut self, _body: alloc::vec::Vec<u8>) {}
        fn set_read_deadline(&mut self, _timeout: Option<core::time::Duration>) {}
    }

    #[test]
    fn schema_link_adds_schema_field_and_header() {
        let mut operation = Operation::new(Method::GET, "/items/{id}", "getItem");
        operation.set_response_schema_name("Item");
        let mut ctx = FakeContext {
            operation,
            headers: alloc::vec::Vec::new(),
        };
        let transform = SchemaLink::new("/schemas");
        let out = transform.apply(&mut ctx, "200", json!({"id": 1})).unwrap();
        assert_eq!(out["$schema"], "/schemas/Item.json");
        assert!(ctx.headers.iter().any(|(k, _)| k == "Link"));
    }
}
