/// Unified error types for the Mahakim proxy
use crate::{
    crypto::{CryptoError, InvalidKeyError},
    upstream::UpstreamError,
};
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the proxy
#[derive(Error, Debug)]
pub enum ProxyError {
    /// Rejected key rotation (bad base64 or wrong byte length)
    #[error("Invalid keys: {0}")]
    InvalidKey(#[from] InvalidKeyError),

    /// Cipher failures outside of the envelope probe
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Transport, timeout or non-2xx answer from the middleware
    #[error("Mahakim API error: {0}")]
    Upstream(#[from] UpstreamError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ProxyError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::InvalidKey(_) | ProxyError::Validation(_) => StatusCode::BAD_REQUEST,
            ProxyError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ProxyError::Crypto(_) | ProxyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            ProxyError::InvalidKey(_) => "InvalidKeys",
            ProxyError::Validation(_) => "InvalidRequest",
            ProxyError::Upstream(_) => "UpstreamError",
            ProxyError::Crypto(_) | ProxyError::Internal(_) => "InternalServerError",
        }
    }
}

/// Convert ProxyError to HTTP response
impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = Json(ErrorResponse {
            error: self.error_code().to_string(),
            message: self.to_string(),
        });

        (status, body).into_response()
    }
}

/// Malformed or incomplete request bodies are client errors
impl From<JsonRejection> for ProxyError {
    fn from(rejection: JsonRejection) -> Self {
        ProxyError::Validation(rejection.body_text())
    }
}

/// Result type alias for proxy operations
pub type ProxyResult<T> = Result<T, ProxyError>;
