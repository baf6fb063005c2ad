use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Every failure a handler can report to the caller.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Unauthenticated(&'static str),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("{0}")]
    Forbidden(String),
    #[error("Not found")]
    NotFound,
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Validation(String),
    #[error("User {0} is not one of your coached users")]
    InvalidAssignment(Uuid),
    #[error("Internal server error")]
    Persistence(#[from] anyhow::Error),
}

impl AppError {
    pub fn forbidden(notice: impl Into<String>) -> Self {
        AppError::Forbidden(notice.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated(_) | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidAssignment(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::Unauthenticated(_) => "unauthenticated",
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::Forbidden(_) => "forbidden",
            AppError::NotFound => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::Validation(_) => "validation_failed",
            AppError::InvalidAssignment(_) => "invalid_assignment",
            AppError::Persistence(_) => "internal",
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let AppError::Persistence(e) = &self {
            tracing::error!(error = %format!("{e:#}"), "store failure");
        }

        let body = Json(json!({
            "error": self.code(),
            "message": self.to_string(),
        }));

        (status, body).into_response()
    }
}
