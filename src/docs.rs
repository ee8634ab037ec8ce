//! Wires the generated OpenAPI document onto its documentation routes.
//!
//! These are served as pre-rendered static assets ([`crate::routing::StaticAsset`])
//! rather than typed operations: they're ambient, not part of the application's own API
//! surface, matching the teacher's `StaticDir`/`static_files` treatment of content that
//! doesn't need parameter validation.

use breeze_core::openapi::OpenApiDocument;
use http_kit::Method;

use crate::config::DocsConfig;
use crate::routing::{App, StaticAsset};

/// Install `/openapi.json`, `/openapi.yaml`, and one `/schemas/{Name}.json` route per
/// named schema in `document`'s registry.
pub(crate) fn install(app: &mut App, docs: &DocsConfig, document: &OpenApiDocument) {
    let json = document.to_json();

    app.static_route(
        Method::GET,
        docs.openapi_json_path.clone(),
        StaticAsset {
            content_type: "application/json",
            body: serde_json::to_vec(&json).unwrap_or_default(),
        },
    );

    if let Ok(yaml) = document.to_yaml() {
        app.static_route(
            Method::GET,
            docs.openapi_yaml_path.clone(),
            StaticAsset {
                content_type: "application/yaml",
                body: yaml.into_bytes(),
            },
        );
    }

    if let Some(schemas) = json.get("components").and_then(|c| c.get("schemas")) {
        if let Some(schemas) = schemas.as_object() {
            for (name, schema) in schemas {
                let path = format!("{}/{name}.json", docs.schema_path_prefix);
                app.static_route(
                    Method::GET,
                    path,
                    StaticAsset {
                        content_type: "application/json",
                        body: serde_json::to_vec(schema).unwrap_or_default(),
                    },
                );
            }
        }
    }
}
