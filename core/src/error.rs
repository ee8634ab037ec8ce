//! The main error type and related utilities for HTTP operations.

use core::ops::{Deref, DerefMut};

use alloc::{boxed::Box, string::String, vec::Vec};
use http_kit::{
    header::{HeaderName, HeaderValue},
    HttpError, StatusCode,
};

/// A specialized `Result` type for HTTP operations.
pub type Result<T> = core::result::Result<T, Error>;

/// One inner detail attached to an [`Error`], surfaced as an entry of a problem-details
/// `errors` array.
#[derive(Debug, Clone)]
pub struct ErrorDetail {
    /// Human readable explanation of this particular violation.
    pub message: String,
    /// Dotted/JSON-pointer-like location the violation applies to, e.g. `body.sub.num`.
    pub location: Option<String>,
    /// The offending value, rendered for display.
    pub value: Option<String>,
}

impl ErrorDetail {
    /// Create a detail with only a message.
    #[must_use]
    pub const fn new(message: String) -> Self {
        Self {
            message,
            location: None,
            value: None,
        }
    }

    /// Attach a location to this detail.
    #[must_use]
    pub fn at(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Attach the offending value to this detail.
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// The main error type for HTTP operations.
///
/// Wraps any error with an associated HTTP status code, an optional list of
/// [`ErrorDetail`]s (used to build problem-details documents) and headers the dispatcher
/// should set on the response.
pub struct Error {
    error: eyre::Error,
    status: StatusCode,
    details: Vec<ErrorDetail>,
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl Error {
    /// Creates a new `Error` from any error type with the given HTTP status code.
    ///
    /// # Panics
    ///
    /// Panics if the status code is invalid.
    pub fn new<E, S>(error: E, status: S) -> Self
    where
        E: Into<eyre::Error>,
        S: TryInto<StatusCode>,
        S::Error: core::fmt::Debug,
    {
        Self {
            error: error.into(),
            status: status.try_into().unwrap(),
            details: Vec::new(),
            headers: Vec::new(),
        }
    }

    /// Creates an `Error` from a message string with a default status code of 500.
    pub fn msg<S>(msg: S) -> Self
    where
        S: core::fmt::Display + core::fmt::Debug + Send + Sync + 'static,
    {
        Self {
            error: eyre::Error::msg(msg),
            status: StatusCode::INTERNAL_SERVER_ERROR,
            details: Vec::new(),
            headers: Vec::new(),
        }
    }

    /// Sets the HTTP status code of this error.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if the status code is not in the 400-599 range.
    #[must_use]
    pub fn set_status<S>(mut self, status: S) -> Self
    where
        S: TryInto<StatusCode>,
        S::Error: core::fmt::Debug,
    {
        let status = status.try_into().expect("Invalid status code");
        if cfg!(debug_assertions) {
            assert!(
                (400..=599).contains(&status.as_u16()),
                "Expected a status code within 400~599"
            );
        }
        self.status = status;
        self
    }

    /// Returns the HTTP status code associated with this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Append one [`ErrorDetail`] to this error's detail list.
    #[must_use]
    pub fn with_detail(mut self, detail: ErrorDetail) -> Self {
        self.details.push(detail);
        self
    }

    /// Extend this error's detail list.
    #[must_use]
    pub fn with_details(mut self, details: impl IntoIterator<Item = ErrorDetail>) -> Self {
        self.details.extend(details);
        self
    }

    /// The accumulated detail list, empty for errors with a single cause.
    #[must_use]
    pub fn details(&self) -> &[ErrorDetail] {
        &self.details
    }

    /// Attach a response header the dispatcher should set alongside this error.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.push((name, value));
        self
    }

    /// Headers the dispatcher should set when writing this error response.
    #[must_use]
    pub fn headers(&self) -> &[(HeaderName, HeaderValue)] {
        &self.headers
    }

    /// Attempts to downcast the inner error to a concrete type.
    ///
    /// # Errors
    ///
    /// Returns `Err(Self)` when the inner error cannot be downcast into `E`.
    pub fn downcast<E>(self) -> core::result::Result<Box<E>, Self>
    where
        E: core::error::Error + Send + Sync + 'static,
    {
        let Self {
            status,
            error,
            details,
            headers,
        } = self;
        error.downcast().map_err(|error| Self {
            error,
            status,
            details,
            headers,
        })
    }

    /// Attempts to downcast the inner error to a reference of the concrete type.
    #[must_use]
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: core::error::Error + Send + Sync + 'static,
    {
        self.error.downcast_ref()
    }

    /// Converts this error into a boxed `HttpError` trait object understood by `http-kit`.
    #[must_use]
    pub fn into_boxed_http_error(self) -> Box<dyn HttpError> {
        struct Wrapper {
            inner: Error,
        }

        impl core::error::Error for Wrapper {}
        impl core::fmt::Display for Wrapper {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.inner)
            }
        }
        impl core::fmt::Debug for Wrapper {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Debug::fmt(&self.inner, f)
            }
        }
        impl HttpError for Wrapper {
            fn status(&self) -> StatusCode {
                self.inner.status()
            }
        }
        Box::new(Wrapper { inner: self })
    }
}

impl<E: core::error::Error + Send + Sync + 'static> From<E> for Error {
    fn from(error: E) -> Self {
        Self::new(error, StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl core::fmt::Debug for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Debug::fmt(&self.error, f)
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.error, f)
    }
}

impl Deref for Error {
    type Target = dyn core::error::Error + Send + 'static;

    fn deref(&self) -> &Self::Target {
        &*self.error
    }
}

impl DerefMut for Error {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.error
    }
}

/// Extension trait that adds HTTP status code handling to `Result` and `Option` types.
pub trait ResultExt<T>
where
    Self: Sized,
{
    /// Associates an HTTP status code with an error or a `None` value.
    ///
    /// # Errors
    ///
    /// Returns an `Error` when the result is `Err` or the option is `None`.
    fn status<S>(self, status: S) -> Result<T>
    where
        S: TryInto<StatusCode>,
        S::Error: core::fmt::Debug;
}

impl<T, E> ResultExt<T> for core::result::Result<T, E>
where
    E: core::error::Error + Send + Sync + 'static,
{
    fn status<S>(self, status: S) -> Result<T>
    where
        S: TryInto<StatusCode>,
        S::Error: core::fmt::Debug,
    {
        self.map_err(|error| Error::new(error, status))
    }
}

impl<T> ResultExt<T> for Option<T> {
    fn status<S>(self, status: S) -> Result<T>
    where
        S: TryInto<StatusCode>,
        S::Error: core::fmt::Debug,
    {
        self.ok_or_else(|| Error::msg("value was None").set_status(status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_status_is_server_error() {
        let err = Error::msg("boom");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn set_status_overrides_default() {
        let err = Error::msg("missing").set_status(StatusCode::NOT_FOUND);
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn details_accumulate_in_order() {
        let err = Error::msg("invalid")
            .set_status(StatusCode::UNPROCESSABLE_ENTITY)
            .with_detail(ErrorDetail::new("required".into()).at("body.name"))
            .with_detail(ErrorDetail::new("minimum".into()).at("body.sub.num"));
        assert_eq!(err.details().len(), 2);
        assert_eq!(err.details()[0].location.as_deref(), Some("body.name"));
        assert_eq!(err.details()[1].location.as_deref(), Some("body.sub.num"));
    }
}
