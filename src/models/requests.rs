//! Request DTOs
//!
//! Defines the structure of outgoing request bodies the layer builds itself.

use serde::Serialize;

/// Request body for the token refresh endpoint (POST /auth/refresh)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    /// The refresh token being exchanged
    pub refresh_token: String,
}

impl RefreshRequest {
    pub fn new(refresh_token: impl Into<String>) -> Self {
        Self {
            refresh_token: refresh_token.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_request_serialize() {
        let req = RefreshRequest::new("rt-1");
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(json, r#"{"refreshToken":"rt-1"}"#);
    }
}
