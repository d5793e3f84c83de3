use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Categorizes errors for retry logic and handling
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rate limiting - should retry with backoff
    RateLimit,
    /// Authentication/authorization issues - should not retry
    Auth,
    /// Invalid request format - should not retry
    InvalidRequest,
    /// Network/connection issues - may retry
    Network,
    /// Backend temporarily unavailable - may retry
    ServiceUnavailable,
    /// Unknown/other errors
    Other,
}

/// Error payload carried inside a wire-level error event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorInfo {
    pub r#type: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    pub message: String,
    #[serde(default)]
    pub r#type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Error)]
pub enum ChatStreamError {
    /// Errors from the HTTP client
    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),

    /// UTF-8 decoding failure on a completed line
    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Authentication error
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Invalid request rejected by the backend
    #[error("Invalid request error: {0}")]
    InvalidRequest(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimit,

    /// The transport failed or terminated abruptly mid-read
    #[error("Stream read error: {0}")]
    StreamRead(String),

    /// Error event delivered by the backend inside the stream
    #[error("Stream error event: {0}")]
    ErrorEvent(String),

    /// Unexpected response from the backend
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl ChatStreamError {
    /// Returns the error kind for categorizing errors in retry logic
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RateLimit => ErrorKind::RateLimit,
            Self::Authentication(_) => ErrorKind::Auth,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::ReqwestError(e) => {
                if e.is_timeout() || e.is_connect() || e.is_request() {
                    ErrorKind::Network
                } else {
                    ErrorKind::Other
                }
            }
            Self::StreamRead(_) => ErrorKind::Network,
            Self::UnexpectedResponse(_) => ErrorKind::ServiceUnavailable,
            Self::SerdeError(_) | Self::Utf8(_) | Self::ErrorEvent(_) => ErrorKind::Other,
        }
    }

    /// Returns true if this error should be retried
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::RateLimit | ErrorKind::Network | ErrorKind::ServiceUnavailable
        )
    }
}

impl From<ErrorInfo> for ChatStreamError {
    fn from(error: ErrorInfo) -> Self {
        match error.r#type.as_str() {
            "invalid_request_error" => ChatStreamError::InvalidRequest(error.message),
            "authentication_error" => ChatStreamError::Authentication(error.message),
            "rate_limit_error" => ChatStreamError::RateLimit,
            _ => ChatStreamError::ErrorEvent(error.message),
        }
    }
}

/// Parse an error response from the backend.
/// Handles both JSON format errors and plain text bodies.
pub fn parse_error_response(status: reqwest::StatusCode, bytes: bytes::Bytes) -> ChatStreamError {
    if let Ok(payload) = serde_json::from_slice::<ApiErrorResponse>(&bytes) {
        match payload.error.r#type.as_deref() {
            Some("invalid_request_error") => ChatStreamError::InvalidRequest(payload.error.message),
            Some("authentication_error") => ChatStreamError::Authentication(payload.error.message),
            Some("rate_limit_error") => ChatStreamError::RateLimit,
            _ => ChatStreamError::UnexpectedResponse(payload.error.message),
        }
    } else {
        // Fall back to text
        let error_text = String::from_utf8_lossy(&bytes).to_string();
        match status.as_u16() {
            429 => ChatStreamError::RateLimit,
            401 => ChatStreamError::Authentication(error_text),
            _ => ChatStreamError::UnexpectedResponse(format!(
                "HTTP status {}: {}",
                status.as_u16(),
                error_text
            )),
        }
    }
}
