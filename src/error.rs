//! # Error Handling
//!
//! Two error types live here:
//! - `RelayError`: domain errors inside the relay core (malformed containers,
//!   sink delivery failures). These are local and non-fatal; nothing in the
//!   relay core terminates the process.
//! - `AppError`: errors surfaced over the HTTP API, converted to JSON
//!   responses via actix-web's `ResponseError` trait.

use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use std::fmt;

/// Domain errors raised by the relay core and its sinks.
#[derive(Debug)]
pub enum RelayError {
    /// A byte sequence that should be a WAV container is not one.
    MalformedContainer(String),

    /// A sink failed to deliver a finalized recording.
    Sink(String),

    /// Underlying I/O failure (file writes, byte-level reads).
    Io(std::io::Error),
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayError::MalformedContainer(msg) => write!(f, "malformed container: {}", msg),
            RelayError::Sink(msg) => write!(f, "sink delivery failed: {}", msg),
            RelayError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for RelayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RelayError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for RelayError {
    fn from(err: std::io::Error) -> Self {
        RelayError::Io(err)
    }
}

/// Errors surfaced over the HTTP API.
///
/// ## HTTP Status Mapping:
/// - Internal/ConfigError → 500
/// - BadRequest/ValidationError → 400
/// - NotFound → 404
#[derive(Debug)]
pub enum AppError {
    /// Server-side failure.
    Internal(String),

    /// Client sent invalid or malformed data.
    BadRequest(String),

    /// Requested resource does not exist.
    NotFound(String),

    /// Configuration file or environment variable problem.
    ConfigError(String),

    /// Input failed validation rules.
    ValidationError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let (status, error_type, message) = match self {
            AppError::Internal(msg) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                msg.clone(),
            ),
            AppError::BadRequest(msg) => (
                actix_web::http::StatusCode::BAD_REQUEST,
                "bad_request",
                msg.clone(),
            ),
            AppError::NotFound(msg) => (
                actix_web::http::StatusCode::NOT_FOUND,
                "not_found",
                msg.clone(),
            ),
            AppError::ConfigError(msg) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "config_error",
                msg.clone(),
            ),
            AppError::ValidationError(msg) => (
                actix_web::http::StatusCode::BAD_REQUEST,
                "validation_error",
                msg.clone(),
            ),
        };

        HttpResponse::build(status).json(json!({
            "error": {
                "type": error_type,
                "message": message,
                "timestamp": chrono::Utc::now().to_rfc3339()
            }
        }))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(format!("JSON parsing error: {}", err))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

impl From<RelayError> for AppError {
    fn from(err: RelayError) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// Shorthand for results carrying an `AppError`.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_error_display() {
        let err = RelayError::Sink("disk full".to_string());
        assert_eq!(err.to_string(), "sink delivery failed: disk full");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = RelayError::from(io);
        assert!(matches!(err, RelayError::Io(_)));
    }

    #[test]
    fn test_app_error_from_relay_error() {
        let err: AppError = RelayError::MalformedContainer("short".to_string()).into();
        assert!(matches!(err, AppError::Internal(_)));
    }
}
