use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;

use crate::types::ApiResponse;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Payment verification failed: {0}")]
    VerificationFailed(String),

    #[error("Payment amount mismatch: {0}")]
    AmountMismatch(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

// HTTP status code mapping
impl AppError {
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::Authentication(_) => 401,
            AppError::Forbidden(_) => 403,
            AppError::NotFound(_) => 404,
            AppError::Validation(_) => 400,
            AppError::InvalidState(_) => 400,
            AppError::Conflict(_) => 409,
            AppError::VerificationFailed(_) => 402,
            AppError::AmountMismatch(_) => 402,
            AppError::ExternalService(_) => 502,
            _ => 500,
        }
    }

    pub fn error_code(&self) -> &str {
        match self {
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Authentication(_) => "AUTHENTICATION_ERROR",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::InvalidState(_) => "INVALID_STATE",
            AppError::VerificationFailed(_) => "VERIFICATION_FAILED",
            AppError::AmountMismatch(_) => "AMOUNT_MISMATCH",
            AppError::ExternalService(_) => "EXTERNAL_SERVICE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    // Database and internal errors get a generic body; the detail stays in
    // the log only.
    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "A database error occurred".to_string(),
            AppError::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        }
    }

    /// True when the underlying sqlx error is a unique-constraint violation.
    /// Settlement and review creation surface these as domain conflicts.
    pub fn is_unique_violation(err: &sqlx::Error) -> bool {
        match err {
            sqlx::Error::Database(db_err) => db_err
                .code()
                .map(|code| code == "23505")
                .unwrap_or(false),
            _ => false,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status_code() >= 500 {
            tracing::error!("{}: {}", self.error_code(), self);
        } else {
            tracing::warn!("{}: {}", self.error_code(), self);
        }

        let status = StatusCode::from_u16(self.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        (status, Json(ApiResponse::<()>::error(self.client_message()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_taxonomy() {
        assert_eq!(AppError::Validation("bad".into()).status_code(), 400);
        assert_eq!(AppError::InvalidState("no".into()).status_code(), 400);
        assert_eq!(AppError::Authentication("no".into()).status_code(), 401);
        assert_eq!(AppError::VerificationFailed("no".into()).status_code(), 402);
        assert_eq!(AppError::AmountMismatch("no".into()).status_code(), 402);
        assert_eq!(AppError::Forbidden("no".into()).status_code(), 403);
        assert_eq!(AppError::NotFound("gone".into()).status_code(), 404);
        assert_eq!(AppError::Conflict("dup".into()).status_code(), 409);
        assert_eq!(AppError::ExternalService("down".into()).status_code(), 502);
        assert_eq!(AppError::Internal("boom".into()).status_code(), 500);
    }

    #[test]
    fn internal_detail_does_not_reach_clients() {
        let err = AppError::Internal("connection pool exhausted".to_string());
        assert_eq!(err.client_message(), "An internal error occurred");

        let err = AppError::NotFound("Payment not found".to_string());
        assert_eq!(err.client_message(), "Not found: Payment not found");
    }

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(AppError::Conflict("dup".into()).error_code(), "CONFLICT");
        assert_eq!(
            AppError::AmountMismatch("no".into()).error_code(),
            "AMOUNT_MISMATCH"
        );
        assert_eq!(
            AppError::VerificationFailed("no".into()).error_code(),
            "VERIFICATION_FAILED"
        );
    }
}
