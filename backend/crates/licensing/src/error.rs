//! Licensing Error Types
//!
//! This module provides licensing-specific error variants that integrate
//! with the unified `kernel::error::AppError` system.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

/// Licensing-specific result type alias
pub type LicenseResult<T> = Result<T, LicenseError>;

/// Licensing-specific error variants
#[derive(Debug, Error)]
pub enum LicenseError {
    /// A required request field is absent or empty
    #[error("{0} required")]
    MissingField(&'static str),

    /// expires_at could not be parsed as a timestamp
    #[error("expires_at must be RFC 3339")]
    InvalidExpiry,

    /// Update request carried nothing to update
    #[error("no updates requested")]
    NoUpdateFields,

    /// No license row matched the presented key
    #[error("license not found")]
    LicenseNotFound,

    /// Admin authentication failed
    ///
    /// Deliberately uniform: the caller never learns which check rejected.
    #[error("unauthorized")]
    Unauthorized,

    /// Admission denied by the rate limiter
    #[error("rate limit exceeded")]
    RateLimited { retry_after: Duration },

    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl LicenseError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            LicenseError::MissingField(_)
            | LicenseError::InvalidExpiry
            | LicenseError::NoUpdateFields => StatusCode::BAD_REQUEST,
            LicenseError::LicenseNotFound => StatusCode::NOT_FOUND,
            LicenseError::Unauthorized => StatusCode::UNAUTHORIZED,
            LicenseError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            LicenseError::Database(_) | LicenseError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            LicenseError::MissingField(_)
            | LicenseError::InvalidExpiry
            | LicenseError::NoUpdateFields => ErrorKind::BadRequest,
            LicenseError::LicenseNotFound => ErrorKind::NotFound,
            LicenseError::Unauthorized => ErrorKind::Unauthorized,
            LicenseError::RateLimited { .. } => ErrorKind::TooManyRequests,
            LicenseError::Database(_) | LicenseError::Internal(_) => {
                ErrorKind::InternalServerError
            }
        }
    }

    /// Convert to AppError
    pub fn to_app_error(&self) -> AppError {
        let err = AppError::new(self.kind(), self.to_string());
        match self {
            LicenseError::RateLimited { retry_after } => {
                err.with_retry_after(retry_after.as_secs_f64().ceil() as u64)
            }
            _ => err,
        }
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            LicenseError::Database(e) => {
                tracing::error!(error = %e, "Licensing database error");
            }
            LicenseError::Internal(msg) => {
                tracing::error!(message = %msg, "Licensing internal error");
            }
            LicenseError::Unauthorized => {
                tracing::warn!("Rejected admin credential");
            }
            _ => {
                tracing::debug!(error = %self, "Licensing error");
            }
        }
    }
}

impl IntoResponse for LicenseError {
    fn into_response(self) -> Response {
        self.log();
        self.to_app_error().into_response()
    }
}

impl From<AppError> for LicenseError {
    fn from(err: AppError) -> Self {
        LicenseError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            LicenseError::MissingField("customer").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            LicenseError::LicenseNotFound.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            LicenseError::Unauthorized.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            LicenseError::RateLimited {
                retry_after: Duration::from_millis(300)
            }
            .status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn test_rate_limited_carries_ceiled_retry_after() {
        let err = LicenseError::RateLimited {
            retry_after: Duration::from_millis(300),
        };
        assert_eq!(err.to_app_error().retry_after_secs(), Some(1));

        let err = LicenseError::RateLimited {
            retry_after: Duration::from_secs(2),
        };
        assert_eq!(err.to_app_error().retry_after_secs(), Some(2));
    }

    #[test]
    fn test_missing_field_names_the_field() {
        let err = LicenseError::MissingField("machine_id");
        assert_eq!(err.to_string(), "machine_id required");
    }
}
