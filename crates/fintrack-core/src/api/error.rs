use serde::Deserialize;
use thiserror::Error;

/// Message shown when the backend rejects an attached credential.
pub const SESSION_REJECTED_MESSAGE: &str = "Your session has expired. Please log in again.";

/// Message shown when the backend rejects a username/password pair.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid username or password";

/// Maximum length for error response bodies kept for diagnostics
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Coarse classification of an [`ApiError`], for callers that only branch on the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Authentication,
    Network,
    Server,
}

/// The single error contract returned by the gateway and the session manager.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Bad input detected locally. Never reaches the network.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Credentials rejected at login, or an attached credential is no longer valid.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// No response was received (connect failure, timeout).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Any other non-2xx status, or a success response that could not be decoded.
    #[error("Server error: {message}")]
    Server { status: Option<u16>, message: String },
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    pub(crate) fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let head: String = body.chars().take(MAX_ERROR_BODY_LENGTH).collect();
            format!("{}... (truncated, {} total bytes)", head, body.len())
        }
    }

    /// Classify a non-success response.
    ///
    /// Authentication failures get a fixed message so backend text is never echoed.
    /// Other 4xx responses surface the backend's `message` field when it has one.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        match status.as_u16() {
            401 | 403 => ApiError::Authentication(SESSION_REJECTED_MESSAGE.to_string()),
            500..=599 => ApiError::Server {
                status: Some(status.as_u16()),
                message: "The server encountered an error. Please try again later.".to_string(),
            },
            code => {
                let message = serde_json::from_str::<ErrorBody>(body)
                    .ok()
                    .and_then(|b| b.message)
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| format!("Request failed with status {}", code));
                ApiError::Server {
                    status: Some(code),
                    message,
                }
            }
        }
    }

    /// A success status whose body could not be decoded.
    pub fn malformed_response() -> Self {
        ApiError::Server {
            status: None,
            message: "Received an unexpected response from the server".to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Validation(_) => ErrorKind::Validation,
            ApiError::Authentication(_) => ErrorKind::Authentication,
            ApiError::Network(_) => ErrorKind::Network,
            ApiError::Server { .. } => ErrorKind::Server,
        }
    }

    /// HTTP status of the failed response, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Server { status, .. } => *status,
            ApiError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Only network failures are worth retrying, and only by the user.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Network
    }

    /// Text suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Validation(message) | ApiError::Authentication(message) => message.clone(),
            ApiError::Network(e) if e.is_timeout() => {
                "Connection timed out. Please try again.".to_string()
            }
            ApiError::Network(_) => {
                "Unable to connect to server. Check your internet connection.".to_string()
            }
            ApiError::Server { message, .. } => message.clone(),
        }
    }
}
