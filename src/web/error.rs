use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

use super::views;
use crate::services::{AuthError, StockError, UserError};

/// Errors that end a request with an HTML error page.
///
/// Form validation problems are not errors: handlers re-render the form with
/// inline messages instead.
#[derive(Debug)]
pub enum WebError {
    NotFound(String),

    Forbidden(String),

    Conflict(String),

    Unprocessable(String),

    Internal(String),
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(msg) => write!(f, "Not found: {msg}"),
            Self::Forbidden(msg) => write!(f, "Forbidden: {msg}"),
            Self::Conflict(msg) => write!(f, "Conflict: {msg}"),
            Self::Unprocessable(msg) => write!(f, "Unprocessable: {msg}"),
            Self::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for WebError {}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg),
            Self::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            Self::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong. Please try again.".to_string(),
                )
            }
        };

        (status, views::error_page(status, &message)).into_response()
    }
}

impl WebError {
    pub fn forbidden() -> Self {
        Self::Forbidden("You do not have permission to view this page.".to_string())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<anyhow::Error> for WebError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{err:#}"))
    }
}

impl From<tower_sessions::session::Error> for WebError {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self::Internal(format!("Session error: {err}"))
    }
}

impl From<StockError> for WebError {
    fn from(err: StockError) -> Self {
        match err {
            StockError::NotFound => Self::NotFound(err.to_string()),
            StockError::Forbidden => Self::Forbidden(err.to_string()),
            StockError::Internal(msg) => Self::Internal(msg),
        }
    }
}

impl From<UserError> for WebError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound => Self::NotFound(err.to_string()),
            UserError::UsernameTaken(_) => Self::Conflict(err.to_string()),
            UserError::SelfAction(_) => Self::Forbidden(err.to_string()),
            UserError::Validation(msg) => Self::Unprocessable(msg),
            UserError::Internal(msg) => Self::Internal(msg),
        }
    }
}

impl From<AuthError> for WebError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Internal(msg) => Self::Internal(msg),
            other => Self::Forbidden(other.to_string()),
        }
    }
}
