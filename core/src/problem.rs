//! Problem-details error document format (spec.md §4.7).

use alloc::{
    string::{String, ToString},
    vec::Vec,
};
use serde::Serialize;

use crate::error::{Error, ErrorDetail};

/// One entry of a [`Problem`]'s `errors` array.
#[derive(Debug, Clone, Serialize)]
pub struct ProblemDetail {
    /// Human readable explanation of this particular violation.
    pub message: String,
    /// Dotted/JSON-pointer-like location, when applicable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// The offending value, rendered for display.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl From<&ErrorDetail> for ProblemDetail {
    fn from(detail: &ErrorDetail) -> Self {
        Self {
            message: detail.message.clone(),
            location: detail.location.clone(),
            value: detail.value.clone(),
        }
    }
}

/// `{type, title, status, detail, instance, errors}` — the document every failed
/// request is shaped into.
#[derive(Debug, Clone, Serialize)]
pub struct Problem {
    /// A URI identifying the problem type; `"about:blank"` when none is more specific.
    #[serde(rename = "type")]
    pub problem_type: String,
    /// Short, human-readable summary (typically the status's canonical reason phrase).
    pub title: String,
    /// The HTTP status code, repeated in the body for clients that don't read headers.
    pub status: u16,
    /// A human-readable explanation specific to this occurrence.
    pub detail: String,
    /// A URI identifying this specific occurrence, when available (e.g. the request
    /// path).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    /// Per-violation detail list.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ProblemDetail>,
}

impl Problem {
    /// Build a problem document from an [`Error`] and the request path it occurred on.
    #[must_use]
    pub fn from_error(error: &Error, instance: Option<String>) -> Self {
        let status = error.status();
        Self {
            problem_type: "about:blank".into(),
            title: status
                .canonical_reason()
                .unwrap_or("Error")
                .into(),
            status: status.as_u16(),
            detail: error.to_string(),
            instance,
            errors: error.details().iter().map(ProblemDetail::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorDetail;
    use http_kit::StatusCode;

    #[test]
    fn from_error_carries_status_and_details() {
        let error = Error::msg("invalid")
            .set_status(StatusCode::UNPROCESSABLE_ENTITY)
            .with_detail(ErrorDetail::new("required".into()).at("body.name"));
        let problem = Problem::from_error(&error, Some("/items".into()));
        assert_eq!(problem.status, 422);
        assert_eq!(problem.errors.len(), 1);
        assert_eq!(problem.errors[0].location.as_deref(), Some("body.name"));
    }
}
