use std::time::Duration;

use reqwest::{header, StatusCode};
use serde::Deserialize;
use thiserror::Error;

use crate::utils::truncate;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(ErrorBody),

    #[error("Access denied: {0}")]
    AccessDenied(ErrorBody),

    #[error("Resource not found: {0}")]
    NotFound(ErrorBody),

    #[error("Rate limited - please wait before retrying")]
    RateLimited(ErrorBody),

    #[error("Server error ({status}): {body}")]
    ServerError { status: u16, body: ErrorBody },

    #[error("Request failed ({status}): {body}")]
    Status { status: u16, body: ErrorBody },

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Could not connect: {0}")]
    ConnectionFailed(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] header::InvalidHeaderValue),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Backend failure body: `{ "message": "..." }`
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    message: Option<String>,
}

/// Body of a failed response.
///
/// `message` is only set when the body was a JSON envelope carrying one;
/// `text` is the raw body, truncated, for everything else.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorBody {
    pub message: Option<String>,
    pub text: String,
}

impl ErrorBody {
    pub fn parse(body: &[u8]) -> Self {
        let message = serde_json::from_slice::<ErrorEnvelope>(body)
            .ok()
            .and_then(|envelope| envelope.message);
        let raw = String::from_utf8_lossy(body);
        let text = if raw.len() <= MAX_ERROR_BODY_LENGTH {
            raw.into_owned()
        } else {
            format!("{} (truncated, {} total bytes)", truncate(&raw, MAX_ERROR_BODY_LENGTH), raw.len())
        };
        Self { message, text }
    }
}

impl std::fmt::Display for ErrorBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message.as_deref().unwrap_or(&self.text))
    }
}

impl ApiError {
    /// Build an error from a failed response, preferring the backend's `message` field.
    pub fn from_status(status: StatusCode, body: &[u8]) -> Self {
        let body = ErrorBody::parse(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized(body),
            403 => ApiError::AccessDenied(body),
            404 => ApiError::NotFound(body),
            429 => ApiError::RateLimited(body),
            code @ 500..=599 => ApiError::ServerError { status: code, body },
            code => ApiError::Status { status: code, body },
        }
    }

    /// Classify a reqwest failure. Timeouts and refused connections get their own variants.
    pub fn from_transport(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            ApiError::Timeout(timeout)
        } else if err.is_connect() {
            ApiError::ConnectionFailed(err.to_string())
        } else {
            ApiError::NetworkError(err)
        }
    }

    /// HTTP status for errors that came from a backend response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized(_) => Some(401),
            ApiError::AccessDenied(_) => Some(403),
            ApiError::NotFound(_) => Some(404),
            ApiError::RateLimited(_) => Some(429),
            ApiError::ServerError { status, .. } | ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    fn body(&self) -> Option<&ErrorBody> {
        match self {
            ApiError::Unauthorized(body)
            | ApiError::AccessDenied(body)
            | ApiError::NotFound(body)
            | ApiError::RateLimited(body)
            | ApiError::ServerError { body, .. }
            | ApiError::Status { body, .. } => Some(body),
            _ => None,
        }
    }

    /// The `message` field the backend sent, if its failure body carried one.
    pub fn backend_message(&self) -> Option<&str> {
        self.body().and_then(|body| body.message.as_deref())
    }

    /// Human-readable message suitable for display.
    pub fn message(&self) -> String {
        match self {
            ApiError::RateLimited(body) => match body.message {
                Some(ref message) => message.clone(),
                None => self.to_string(),
            },
            other => match other.body() {
                Some(body) => body.to_string(),
                None => other.to_string(),
            },
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }

    /// Connection-level failure with no backend response.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            ApiError::Timeout(_) | ApiError::ConnectionFailed(_) | ApiError::NetworkError(_)
        )
    }
}
