use axum::http::StatusCode;
use thiserror::Error;

pub type PaymentResult<T> = Result<T, PaymentError>;

/// Failures talking to the payment provider.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Network or transport failure
    #[error("payment provider unreachable: {0}")]
    Network(String),

    /// Non-success answer from the provider API
    #[error("payment provider error [{status}]: {message}")]
    Provider { status: u16, message: String },

    /// Response missing the fields we rely on
    #[error("invalid payment provider response: {0}")]
    InvalidResponse(String),
}

impl PaymentError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PaymentError::Network(_) => StatusCode::SERVICE_UNAVAILABLE,
            PaymentError::Provider { .. } | PaymentError::InvalidResponse(_) => {
                StatusCode::BAD_GATEWAY
            }
        }
    }
}

impl From<reqwest::Error> for PaymentError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            PaymentError::InvalidResponse(e.to_string())
        } else {
            PaymentError::Network(e.to_string())
        }
    }
}
