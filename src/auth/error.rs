use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::error;

pub type AuthResult<T> = Result<T, AuthError>;

/// Failures of the account lifecycle. Messages are stable and user-facing.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("email already registered")]
    Conflict,

    #[error("user not found")]
    NotFound,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid token")]
    InvalidToken,

    #[error("invalid or expired token")]
    InvalidOrExpiredToken,

    #[error("account disabled")]
    AccountDisabled,

    #[error("account locked")]
    AccountLocked { until: OffsetDateTime },

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InvalidInput(_) | AuthError::Conflict => StatusCode::BAD_REQUEST,
            AuthError::NotFound => StatusCode::NOT_FOUND,
            AuthError::InvalidToken | AuthError::InvalidOrExpiredToken => StatusCode::BAD_REQUEST,
            AuthError::InvalidCredentials
            | AuthError::AccountDisabled
            | AuthError::AccountLocked { .. } => StatusCode::UNAUTHORIZED,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            AuthError::AccountLocked { until } => json!({
                "error": self.to_string(),
                "unlock_at": until.format(&Rfc3339).ok(),
            }),
            AuthError::Internal(e) => {
                error!(error = ?e, "auth internal error");
                json!({ "error": self.to_string() })
            }
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
