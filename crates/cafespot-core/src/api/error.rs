use serde::Deserialize;
use thiserror::Error;

use crate::auth::AuthError;

#[derive(Error, Debug)]
pub enum RequestError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Unauthorized - session is no longer valid")]
    Unauthorized,

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Session expired: {0}")]
    SessionExpired(#[source] Box<AuthError>),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Error body shape returned by the backend (`{"detail": "..."}`).
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

impl RequestError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Extract the human readable message from an error body.
    ///
    /// The backend reports failures as `{"detail": "..."}`; validation errors
    /// carry a list under `detail` instead, which is kept as JSON text.
    pub fn detail_message(body: &str) -> String {
        match serde_json::from_str::<ErrorBody>(body) {
            Ok(ErrorBody {
                detail: serde_json::Value::String(message),
            }) => message,
            Ok(ErrorBody { detail }) => Self::truncate_body(&detail.to_string()),
            Err(_) => Self::truncate_body(body.trim()),
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let detail = Self::detail_message(body);
        match status.as_u16() {
            401 => RequestError::Unauthorized,
            403 => RequestError::AccessDenied(detail),
            404 => RequestError::NotFound(detail),
            429 => RequestError::RateLimited,
            500..=599 => RequestError::ServerError(detail),
            _ => RequestError::InvalidResponse(format!("Status {}: {}", status, detail)),
        }
    }

    /// True for failures that never reached the server or never came back.
    pub fn is_transport_failure(&self) -> bool {
        matches!(self, RequestError::Network(_) | RequestError::Timeout)
    }
}

impl From<reqwest::Error> for RequestError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RequestError::Timeout
        } else if err.is_decode() {
            RequestError::InvalidResponse(err.to_string())
        } else {
            RequestError::Network(err.to_string())
        }
    }
}
