//! # Error Handling
//!
//! Defines the application error taxonomy and how each failure is converted
//! into an HTTP response.
//!
//! ## Error Categories:
//! - **UnsupportedFormat**: declared audio container is not an accepted one (400)
//! - **Decode**: payload is not valid audio of the claimed format (400)
//! - **DegenerateSignal**: feature extraction hit an undefined statistic (400)
//! - **Unauthorized**: missing or unrecognized API key (401)
//! - **BadRequest**: malformed request body or base64 payload (400)
//! - **Internal**: unexpected server-side failures (500)
//! - **Config**: configuration loading or validation problems (500)
//!
//! ## Propagation policy:
//! Every pipeline failure is caught at the handler boundary and rendered as
//! the `{"status": "error", "message": ...}` envelope, the same shape for
//! every failure path, so clients parse one contract. Failures are never
//! retried internally; each request is independent.

use actix_web::{HttpResponse, ResponseError};
use std::fmt;

/// Application error taxonomy.
///
/// Each variant carries a human-readable cause that ends up verbatim in the
/// error envelope's `message` field.
#[derive(Debug)]
pub enum AppError {
    /// Declared audio container/codec is not in the accepted set.
    UnsupportedFormat(String),

    /// Payload could not be decoded as audio of the claimed format.
    Decode(String),

    /// Waveform produced an undefined/NaN statistic during analysis.
    DegenerateSignal(String),

    /// Missing or unrecognized API key.
    Unauthorized(String),

    /// Client sent invalid or malformed data.
    BadRequest(String),

    /// Unexpected server-side failure.
    Internal(String),

    /// Configuration file or environment variable problems.
    Config(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::UnsupportedFormat(msg) => write!(f, "Unsupported audio format: {}", msg),
            AppError::Decode(msg) => write!(f, "Audio decoding failed: {}", msg),
            AppError::DegenerateSignal(msg) => write!(f, "Degenerate audio signal: {}", msg),
            AppError::Unauthorized(msg) => write!(f, "{}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

/// Converts application errors into HTTP responses.
///
/// ## HTTP Status Code Mapping:
/// - UnsupportedFormat / Decode / DegenerateSignal / BadRequest → 400
/// - Unauthorized → 401
/// - Internal / Config → 500
///
/// The body is always the error envelope produced by the response assembler,
/// so transport failures and pipeline failures are indistinguishable in
/// shape to the client.
impl ResponseError for AppError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;
        match self {
            AppError::UnsupportedFormat(_)
            | AppError::Decode(_)
            | AppError::DegenerateSignal(_)
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Internal(_) | AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .json(crate::detection::response::assemble_error(self.to_string()))
    }
}

/// Body deserialization failures must come back in the same error envelope
/// as every other failure; registered on the app's `JsonConfig`.
pub fn json_error_handler(
    err: actix_web::error::JsonPayloadError,
    _req: &actix_web::HttpRequest,
) -> actix_web::Error {
    AppError::BadRequest(format!("invalid request body: {}", err)).into()
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
        AppError::Config(err.to_string())
    }
}

/// The blocking pool only fails if the pool itself is gone; surfaced as an
/// internal error rather than a client-visible cause.
impl From<actix_web::error::BlockingError> for AppError {
    fn from(err: actix_web::error::BlockingError) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// Shorthand for results that use the application error type.
pub type AppResult<T> = Result<T, AppError>;
