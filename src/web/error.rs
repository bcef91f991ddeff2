//! Error taxonomy for the request pipeline.
//!
//! Two kinds of failure reach the pipeline. A [`RequestError`] is *trusted*:
//! the client caused it, and its status and message are safe to send back.
//! Every other [`Error`] variant is *untrusted*: the detail is logged and the
//! client only ever sees a generic `500`.

use std::fmt;

use http::StatusCode;
use serde::Serialize;

use crate::database;

/// The error type returned by handlers and middleware.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A client-caused error; the only variant whose detail is disclosed.
    #[error(transparent)]
    Request(#[from] RequestError),

    /// The request context carries no [`Values`](crate::web::Values).
    #[error("web value missing from context")]
    MissingValues,

    /// A handler panicked and the fault was contained.
    #[error("PANIC [{message}] TRACE[{backtrace}]")]
    Panic { message: String, backtrace: String },

    #[error(transparent)]
    Database(#[from] database::Error),

    #[error("{0}")]
    Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Wraps any error as an untrusted internal fault.
    pub fn internal(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Internal(err.into())
    }

    /// `true` for client-caused errors.
    pub fn is_trusted(&self) -> bool {
        matches!(self, Self::Request(_))
    }

    /// `true` when the error signals a broken invariant rather than a
    /// transient fault, and the service should be shut down.
    pub fn is_shutdown(&self) -> bool {
        matches!(self, Self::MissingValues)
    }
}

/// A trusted, client-caused error with an explicit status.
#[derive(Debug, Clone)]
pub struct RequestError {
    status: StatusCode,
    message: String,
    fields: Vec<FieldError>,
}

impl RequestError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into(), fields: Vec::new() }
    }

    /// Attaches field-level validation detail.
    pub fn with_fields(mut self, fields: Vec<FieldError>) -> Self {
        self.fields = fields;
        self
    }

    pub fn status(&self) -> StatusCode { self.status }
    pub fn message(&self) -> &str { &self.message }
    pub fn fields(&self) -> &[FieldError] { &self.fields }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status.as_u16(), self.message)?;
        for field in &self.fields {
            write!(f, "; {}: {}", field.field, field.error)?;
        }
        Ok(())
    }
}

impl std::error::Error for RequestError {}

/// One failed field in a validation error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub error: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, error: impl Into<String>) -> Self {
        Self { field: field.into(), error: error.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_request_errors_are_trusted() {
        let trusted: Error = RequestError::new(StatusCode::BAD_REQUEST, "bad").into();
        assert!(trusted.is_trusted());
        assert!(!Error::internal("boom").is_trusted());
        assert!(!Error::MissingValues.is_trusted());
        assert!(!Error::from(database::Error::NotFound).is_trusted());
    }

    #[test]
    fn only_missing_values_requests_shutdown() {
        assert!(Error::MissingValues.is_shutdown());
        assert!(!Error::internal("boom").is_shutdown());
        let panic = Error::Panic { message: "x".into(), backtrace: String::new() };
        assert!(!panic.is_shutdown());
    }

    #[test]
    fn request_error_display_lists_fields() {
        let err = RequestError::new(StatusCode::BAD_REQUEST, "data validation error")
            .with_fields(vec![FieldError::new("email", "must contain @")]);
        assert_eq!(err.to_string(), "400 data validation error; email: must contain @");
    }
}
