use reqwest::StatusCode;
use thiserror::Error;

/// Failures surfaced by the API layer.
///
/// Only a single 401 on a request that has not yet been retried is recovered
/// internally; everything else reaches the caller through one of these.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Request rejected ({status}): {body}")]
    Validation { status: StatusCode, body: String },

    #[error("Server error ({status}): {body}")]
    Server { status: StatusCode, body: String },

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// The 401 could not be resolved.
///
/// `Clone` so that one refresh failure can be delivered to every queued caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("session refresh failed: {message}")]
    RefreshFailed {
        status: Option<StatusCode>,
        message: String,
    },

    #[error("request was rejected again after a session refresh")]
    RetryRejected,

    #[error("credentials rejected: {0}")]
    Rejected(String),

    #[error("identity lookup did not return a user")]
    IdentityUnavailable,
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    pub(crate) fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    /// Classify a non-success status. A 401 only reaches this point from a
    /// credential exchange, where it means the service refused the request.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let body = Self::truncate_body(body);
        match status.as_u16() {
            401 => ApiError::Auth(AuthError::Rejected(body)),
            400..=499 => ApiError::Validation { status, body },
            _ => ApiError::Server { status, body },
        }
    }

    /// True for errors that mean the session could not be recovered.
    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Auth(_))
    }
}
