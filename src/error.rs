//! Unified error handling for the HTTP surface.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// AppError
///
/// Every failure a handler, extractor, repository or gateway can produce. The
/// `Display` text of the client-facing variants is sent verbatim as `message`.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("unauthorized access")]
    Unauthorized,

    #[error("forbidden access")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    PaymentRequired(String),

    #[error("payment provider error: {0}")]
    Payment(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Error response body.
#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::PaymentRequired(_) => StatusCode::PAYMENT_REQUIRED,
            AppError::Payment(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (error, message) = match &self {
            AppError::Unauthorized => ("unauthorized", self.to_string()),
            AppError::Forbidden => ("forbidden", self.to_string()),
            AppError::NotFound(msg) => ("not_found", msg.clone()),
            AppError::BadRequest(msg) => ("bad_request", msg.clone()),
            AppError::Conflict(msg) => ("conflict", msg.clone()),
            AppError::PaymentRequired(msg) => ("payment_required", msg.clone()),
            AppError::Payment(detail) => {
                tracing::error!("Payment provider error: {}", detail);
                (
                    "payment_provider_error",
                    "The payment provider could not process the request".to_string(),
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                ("database_error", "A database error occurred".to_string())
            }
        };

        (self.status(), Json(ErrorResponse { error, message })).into_response()
    }
}
