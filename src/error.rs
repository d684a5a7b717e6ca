//!
//! # Custom Error Handling
//!
//! This module defines the custom error type `AppError` used throughout the application.
//! Every failure a request can end in is one of its variants, and each variant maps to
//! exactly one HTTP status and one machine-readable `code` in the JSON body:
//!
//! | variant               | status | code                |
//! |-----------------------|--------|---------------------|
//! | `ValidationError`     | 400    | `validation_error`  |
//! | `Unauthorized`        | 401    | `not_authenticated` |
//! | `Forbidden`           | 403    | `permission_denied` |
//! | `NotFound`            | 404    | `not_found`         |
//! | `DatabaseError`       | 500    | `server_error`      |
//! | `InternalServerError` | 500    | `server_error`      |
//!
//! `From` implementations for `sqlx::Error`, `validator::ValidationErrors`,
//! `jsonwebtoken::errors::Error` and `bcrypt::BcryptError` allow handlers to use `?`.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;
use validator::ValidationErrors;

/// Represents all possible errors that can occur within the application.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Malformed, missing or out-of-enum input (HTTP 400).
    #[error("Validation Error: {0}")]
    ValidationError(String),
    /// Missing, invalid or expired credentials (HTTP 401).
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    /// Authenticated, but not allowed to perform this action on this object (HTTP 403).
    #[error("Forbidden: {0}")]
    Forbidden(String),
    /// The requested resource does not exist (HTTP 404).
    #[error("Not Found: {0}")]
    NotFound(String),
    /// An error originating from the database that is not the client's fault (HTTP 500).
    #[error("Database Error: {0}")]
    DatabaseError(String),
    /// Any other unexpected server-side error (HTTP 500).
    #[error("Internal Server Error: {0}")]
    InternalServerError(String),
}

impl AppError {
    /// Machine-readable code included in every error body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "validation_error",
            AppError::Unauthorized(_) => "not_authenticated",
            AppError::Forbidden(_) => "permission_denied",
            AppError::NotFound(_) => "not_found",
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => "server_error",
        }
    }

    fn message(&self) -> &str {
        match self {
            AppError::ValidationError(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::InternalServerError(msg) => msg,
            // Database details stay in the server log.
            AppError::DatabaseError(_) => "A database error occurred",
        }
    }
}

/// Converts `AppError` variants into `HttpResponse` objects.
impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            log::error!("{}", self);
        }
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.message(),
            "code": self.code(),
        }))
    }
}

/// Converts `sqlx::Error` into `AppError`.
///
/// `RowNotFound` becomes `NotFound`. Constraint violations the client can cause
/// (duplicate unique keys, dangling foreign keys, failed checks, unparseable enum
/// text) become `ValidationError`; everything else is a `DatabaseError`.
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> AppError {
        if let sqlx::Error::RowNotFound = error {
            return AppError::NotFound("Record not found".into());
        }

        let code = error
            .as_database_error()
            .and_then(|db_error| db_error.code())
            .map(|code| code.into_owned());

        from_sqlstate(code.as_deref(), error.to_string())
    }
}

/// Maps a Postgres SQLSTATE to an `AppError`. Client-facing messages are fixed;
/// the driver's text, which names tables and constraints, is only logged.
fn from_sqlstate(code: Option<&str>, detail: String) -> AppError {
    let message = match code {
        Some("23505") => "A record with these values already exists",
        Some("23503") => "A referenced record does not exist",
        Some("23514") => "A value is outside the allowed range",
        Some("22P02") => "A value has an invalid format",
        _ => return AppError::DatabaseError(detail),
    };
    log::warn!("rejected write ({}): {}", code.unwrap_or_default(), detail);
    AppError::ValidationError(message.into())
}

impl From<ValidationErrors> for AppError {
    fn from(error: ValidationErrors) -> AppError {
        AppError::ValidationError(error.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(error: jsonwebtoken::errors::Error) -> AppError {
        AppError::Unauthorized(format!("Invalid token: {}", error))
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(error: bcrypt::BcryptError) -> AppError {
        AppError::InternalServerError(error.to_string())
    }
}
