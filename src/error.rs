//! Error types for the client layer
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

/// Message used when the server does not supply one.
pub const GENERIC_FAILURE: &str = "request failed";

// == Client Error Enum ==
/// Unified error type for the authenticated transport and upload path.
///
/// Cache operations never produce one of these; a miss is not an error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    /// No response was received (connection refused, reset, DNS, ...)
    #[error("Network error: {0}")]
    Network(String),

    /// The session could not be recovered; credentials have been torn down
    #[error("session expired, please log in again")]
    SessionExpired,

    /// The server answered with a non-success status
    #[error("{message} (status {status})")]
    Api { status: u16, message: String },

    /// A success response whose body was not the expected JSON shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// The upload path failed
    #[error("Upload failed: {0}")]
    Upload(String),

    /// A pattern passed to pattern invalidation did not compile
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
}

impl ClientError {
    /// Builds an application-level failure, falling back to the generic message.
    pub fn api(status: u16, message: Option<String>) -> Self {
        let message = message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| GENERIC_FAILURE.to_string());
        ClientError::Api { status, message }
    }

    /// Returns true for the terminal authentication failure.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, ClientError::SessionExpired)
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Network(err.to_string())
    }
}

impl From<regex::Error> for ClientError {
    fn from(err: regex::Error) -> Self {
        ClientError::InvalidPattern(err.to_string())
    }
}

// == Result Type Alias ==
/// Convenience Result type for the client layer.
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_uses_server_message() {
        let err = ClientError::api(400, Some("title is required".to_string()));
        assert_eq!(
            err,
            ClientError::Api {
                status: 400,
                message: "title is required".to_string()
            }
        );
    }

    #[test]
    fn test_api_error_falls_back_to_generic() {
        assert_eq!(
            ClientError::api(500, None).to_string(),
            "request failed (status 500)"
        );
        assert_eq!(
            ClientError::api(502, Some(String::new())).to_string(),
            "request failed (status 502)"
        );
    }

    #[test]
    fn test_session_expired_display() {
        let err = ClientError::SessionExpired;
        assert!(err.is_session_expired());
        assert_eq!(err.to_string(), "session expired, please log in again");
    }

    #[test]
    fn test_regex_error_converts() {
        let err: ClientError = regex::Regex::new("(").unwrap_err().into();
        assert!(matches!(err, ClientError::InvalidPattern(_)));
    }
}
