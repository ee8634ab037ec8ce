//! Content Negotiator / Formatter (spec.md §4.4).
//!
//! Holds, per registered media type, a marshal/unmarshal callable pair and picks the
//! best match for a request's `Accept` header. Grounded on `http-kit`'s body/content
//! type handling (`Body`, already a teacher dependency); the q-value parser is
//! hand-rolled the way the teacher hand-rolls its multipart boundary parser in
//! `utils/multipart.rs` rather than pulling in a dedicated accept-header crate.

use alloc::{
    collections::BTreeMap,
    string::{String, ToString},
    vec::Vec,
};

use serde_json::Value;

use crate::error::{Error, Result};

/// Marshal/unmarshal callables for one media type.
pub struct Format {
    /// Canonical media type, e.g. `"application/json"`.
    pub media_type: &'static str,
    /// Serialize a decoded value to wire bytes.
    pub marshal: fn(&Value) -> Result<Vec<u8>>,
    /// Parse wire bytes into a decoded value.
    pub unmarshal: fn(&[u8]) -> Result<Value>,
}

impl core::fmt::Debug for Format {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Format").field("media_type", &self.media_type).finish()
    }
}

/// JSON formatter, registered by default — the one media type spec.md calls "canonical".
#[must_use]
pub fn json_format() -> Format {
    Format {
        media_type: "application/json",
        marshal: |value| serde_json::to_vec(value).map_err(|e| Error::new(e, 500)),
        unmarshal: |bytes| serde_json::from_slice(bytes).map_err(|e| Error::new(e, 400)),
    }
}

/// Maps media types to marshal/unmarshal routines and selects one per request.
#[derive(Debug, Default)]
pub struct Negotiator {
    formats: BTreeMap<&'static str, Format>,
}

impl Negotiator {
    /// An empty negotiator. Most applications will immediately call
    /// [`Self::register`] with [`json_format`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a format under its media type.
    pub fn register(&mut self, format: Format) {
        self.formats.insert(format.media_type, format);
    }

    /// Whether any format is registered for `media_type`, honoring structured-suffix
    /// fallback (`application/vnd.foo+json` resolves to `application/json`'s formatter).
    #[must_use]
    pub fn get(&self, media_type: &str) -> Option<&Format> {
        if let Some(format) = self.formats.get(media_type) {
            return Some(format);
        }
        let suffix = media_type.rsplit('+').next()?;
        self.formats
            .values()
            .find(|format| format.media_type.ends_with(suffix))
    }

    /// Select the best registered format for an `Accept` header value.
    ///
    /// # Errors
    ///
    /// Returns a 406 error when no registered format satisfies the header.
    pub fn negotiate(&self, accept_header: Option<&str>) -> Result<&Format> {
        let Some(header) = accept_header else {
            return self
                .formats
                .values()
                .next()
                .ok_or_else(|| Error::msg("no formats registered").set_status(406));
        };

        let mut candidates = parse_accept(header);
        candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(core::cmp::Ordering::Equal));

        for (media_type, _q) in &candidates {
            if media_type == "*/*" {
                if let Some(format) = self.formats.values().next() {
                    return Ok(format);
                }
            }
            if let Some(format) = self.get(media_type) {
                return Ok(format);
            }
        }

        Err(Error::msg("no acceptable format available").set_status(406))
    }
}

/// Parse an `Accept` header into `(media_type, q)` pairs, highest `q` first input order
/// preserved for stable ties.
fn parse_accept(header: &str) -> Vec<(String, f32)> {
    header
        .split(',')
        .filter_map(|part| {
            let part = part.trim();
            if part.is_empty() {
                return None;
            }
            let mut segments = part.split(';');
            let media_type = segments.next()?.trim().to_string();
            let mut q = 1.0_f32;
            for param in segments {
                let param = param.trim();
                if let Some(value) = param.strip_prefix("q=") {
                    q = value.trim().parse().unwrap_or(1.0);
                }
            }
            Some((media_type, q))
        })
        .collect()
}

/// Map a successful media type to its problem-details equivalent, e.g.
/// `application/json` → `application/problem+json`.
#[must_use]
pub fn problem_content_type(media_type: &str) -> String {
    if let Some(suffix) = media_type.strip_prefix("application/") {
        alloc::format!("application/problem+{suffix}")
    } else {
        "application/problem+json".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_highest_q_value() {
        let mut negotiator = Negotiator::new();
        negotiator.register(json_format());
        negotiator.register(Format {
            media_type: "application/cbor",
            marshal: |_| Ok(Vec::new()),
            unmarshal: |_| Ok(Value::Null),
        });

        let picked = negotiator
            .negotiate(Some("application/json;q=0.5, application/cbor;q=1.0"))
            .unwrap();
        assert_eq!(picked.media_type, "application/cbor");
    }

    #[test]
    fn unregistered_type_is_406() {
        let mut negotiator = Negotiator::new();
        negotiator.register(json_format());
        let err = negotiator.negotiate(Some("application/cbor")).unwrap_err();
        assert_eq!(err.status().as_u16(), 406);
    }

    #[test]
    fn problem_content_type_mapping() {
        assert_eq!(problem_content_type("application/json"), "application/problem+json");
    }
}
