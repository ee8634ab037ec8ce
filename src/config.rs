//! Ambient server configuration, layered as CLI-ish defaults overridable by `BREEZE_*`
//! environment variables.
//!
//! Grounded on the teacher's `runtime/native.rs` (`server_addr`, `apply_cli_overrides`,
//! the `SKYZEN_ADDRESS` env var pattern), generalized into a small builder instead of a
//! single free function, since this crate has more than one knob to carry.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use breeze_core::operation::DEFAULT_MAX_BODY_BYTES;

/// Where the generated OpenAPI document and schema pages are served.
#[derive(Debug, Clone)]
pub struct DocsConfig {
    /// Path serving the OpenAPI document as JSON.
    pub openapi_json_path: String,
    /// Path serving the OpenAPI document as YAML.
    pub openapi_yaml_path: String,
    /// Path serving an (opaque, user-supplied) interactive documentation page.
    pub docs_path: String,
    /// Path prefix serving individual named schemas, e.g. `/schemas/{Name}.json`.
    pub schema_path_prefix: String,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            openapi_json_path: "/openapi.json".to_string(),
            openapi_yaml_path: "/openapi.yaml".to_string(),
            docs_path: "/docs".to_string(),
            schema_path_prefix: "/schemas".to_string(),
        }
    }
}

/// Process-wide settings for an [`crate::Api`].
///
/// Built with defaults, then overridden by `BREEZE_ADDRESS`, `BREEZE_MAX_BODY_BYTES`, and
/// `BREEZE_BODY_READ_TIMEOUT_MS` when [`Config::from_env`] is used.
#[derive(Debug, Clone)]
pub struct Config {
    /// Default maximum request body size for operations that don't override it.
    pub max_body_bytes: u64,
    /// Default body read timeout, in milliseconds, for operations that don't override it.
    pub body_read_timeout_ms: Option<u64>,
    /// Address the runtime binds its listener to.
    pub listen_addr: SocketAddr,
    /// Documentation/schema route configuration.
    pub docs: DocsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            body_read_timeout_ms: None,
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0),
            docs: DocsConfig::default(),
        }
    }
}

impl Config {
    /// Defaults layered with `BREEZE_ADDRESS` / `BREEZE_MAX_BODY_BYTES` /
    /// `BREEZE_BODY_READ_TIMEOUT_MS` overrides, mirroring the teacher's `SKYZEN_ADDRESS`
    /// convention.
    ///
    /// # Panics
    ///
    /// Panics if an env var is set but fails to parse, matching the teacher's
    /// `server_addr` behavior.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("BREEZE_ADDRESS") {
            config.listen_addr = addr
                .parse()
                .unwrap_or_else(|error| panic!("invalid BREEZE_ADDRESS value: {error}"));
        }

        if let Ok(value) = std::env::var("BREEZE_MAX_BODY_BYTES") {
            config.max_body_bytes = value
                .parse()
                .unwrap_or_else(|error| panic!("invalid BREEZE_MAX_BODY_BYTES value: {error}"));
        }

        if let Ok(value) = std::env::var("BREEZE_BODY_READ_TIMEOUT_MS") {
            config.body_read_timeout_ms = Some(
                value
                    .parse()
                    .unwrap_or_else(|error| {
                        panic!("invalid BREEZE_BODY_READ_TIMEOUT_MS value: {error}")
                    }),
            );
        }

        config
    }

    /// Override the listen address.
    #[must_use]
    pub const fn listen_on(mut self, addr: SocketAddr) -> Self {
        self.listen_addr = addr;
        self
    }
}
