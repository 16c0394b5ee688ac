use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Machine-readable error codes returned alongside every error body.
pub mod codes {
    pub const SERVER_ERROR: u32 = 10000000;
    pub const INVALID_PARAMS: u32 = 10000001;
    pub const NOT_FOUND: u32 = 10000002;
    pub const NO_PERMISSION: u32 = 10000009;
    pub const CARD_NOT_AVAILABLE: u32 = 20010001;
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("No permission: {0}")]
    NoPermission(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Numeric code for the taxonomy bucket this error belongs to.
    pub fn code(&self) -> u32 {
        match self {
            AppError::InvalidParams(_) | AppError::Json(_) => codes::INVALID_PARAMS,
            AppError::NotFound(_) => codes::NOT_FOUND,
            AppError::InvalidState(_) => codes::CARD_NOT_AVAILABLE,
            AppError::NoPermission(_) => codes::NO_PERMISSION,
            AppError::Database(_) | AppError::Pool(_) | AppError::Internal(_) => {
                codes::SERVER_ERROR
            }
        }
    }

    /// Short message recorded in the attempt ledger.
    ///
    /// Storage failures collapse to a generic message so driver details never
    /// end up in persisted request history.
    pub fn ledger_message(&self) -> String {
        match self {
            AppError::Database(_) | AppError::Pool(_) | AppError::Internal(_) => {
                "internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<axum::extract::rejection::JsonRejection> for AppError {
    fn from(rejection: axum::extract::rejection::JsonRejection) -> Self {
        AppError::InvalidParams(rejection.body_text())
    }
}

impl From<axum::extract::rejection::PathRejection> for AppError {
    fn from(rejection: axum::extract::rejection::PathRejection) -> Self {
        AppError::InvalidParams(rejection.body_text())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    code: u32,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, error, details) = match &self {
            AppError::InvalidParams(msg) => {
                (StatusCode::BAD_REQUEST, "Invalid params", Some(msg.clone()))
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "Not found", Some(msg.clone())),
            AppError::InvalidState(msg) => {
                (StatusCode::CONFLICT, "Card not available", Some(msg.clone()))
            }
            AppError::NoPermission(msg) => {
                (StatusCode::FORBIDDEN, "No permission", Some(msg.clone()))
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", None)
            }
            AppError::Pool(e) => {
                tracing::error!("Pool error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", None)
            }
            AppError::Json(e) => {
                tracing::debug!("JSON error: {}", e);
                (StatusCode::BAD_REQUEST, "Invalid JSON", Some(e.to_string()))
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", None)
            }
        };

        let body = ErrorResponse {
            code,
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
