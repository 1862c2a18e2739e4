//! API error handling

use crate::auth::jwt::JwtError;
use crate::auth::models::describe_validation_errors;
use authgate_store::StoreError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use validator::ValidationErrors;

/// API error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Error code
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Application error type
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Email already exists")]
    DuplicateEmail,

    #[error("{0}")]
    NotFound(String),

    #[error("Incorrect password")]
    WrongCredentials,

    #[error("Access Denied!")]
    AccessDenied,

    #[error("Invalid token signature")]
    InvalidSignature(#[source] JwtError),

    #[error("Invalid auth-token!")]
    InvalidToken(#[source] JwtError),

    #[error("Access token not valid.")]
    NotRecognized,

    #[error("User in token does not match supplied user_id")]
    UserMismatch,

    #[error("Couldn't get the user out of the token")]
    Corrupt(#[source] JwtError),

    #[error("Could not find any refresh or access tokens for this user.")]
    NothingToRevoke,

    #[error("Store operation failed")]
    Store(#[source] StoreError),

    #[error("Internal server error")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::DuplicateEmail
            | AppError::WrongCredentials
            | AppError::UserMismatch
            | AppError::Corrupt(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidToken(e) if e.is_expired() => StatusCode::UNAUTHORIZED,
            AppError::InvalidToken(_) => StatusCode::BAD_REQUEST,
            AppError::AccessDenied | AppError::InvalidSignature(_) | AppError::NotRecognized => {
                StatusCode::UNAUTHORIZED
            }
            AppError::NotFound(_) | AppError::NothingToRevoke => StatusCode::NOT_FOUND,
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::DuplicateEmail => "DUPLICATE_EMAIL",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::WrongCredentials => "WRONG_CREDENTIALS",
            AppError::AccessDenied => "ACCESS_DENIED",
            AppError::InvalidSignature(_) => "INVALID_SIGNATURE",
            AppError::InvalidToken(_) => "INVALID_TOKEN",
            AppError::NotRecognized => "NOT_RECOGNIZED",
            AppError::UserMismatch => "USER_MISMATCH",
            AppError::Corrupt(_) => "CORRUPT_TOKEN",
            AppError::NothingToRevoke => "NOTHING_TO_REVOKE",
            AppError::Store(_) => "STORE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error = ApiError::new(self.code(), self.to_string());

        let error = match &self {
            AppError::InvalidSignature(e) | AppError::InvalidToken(e) | AppError::Corrupt(e) => {
                error.with_details(e.to_string())
            }
            AppError::Store(e) => {
                tracing::error!(error = %e, "store operation failed");
                error.with_details(e.to_string())
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                error.with_details(msg.clone())
            }
            _ => error,
        };

        (status, Json(error)).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => AppError::DuplicateEmail,
            other => AppError::Store(other),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation(describe_validation_errors(&errors))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("blocking task failed: {err}"))
    }
}
