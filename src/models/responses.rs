//! Response DTOs
//!
//! Defines the JSON envelope every backend response uses, and the payloads
//! this layer reads out of it.

use serde::{Deserialize, Serialize};

/// Envelope shared by every backend response.
///
/// `data` is optional so that failure envelopes, which usually omit it,
/// still decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the backend considers the call successful
    #[serde(default)]
    pub success: bool,
    /// Human readable message, shown to users on failure
    #[serde(default)]
    pub message: String,
    /// The payload
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Creates a successful envelope around `data`.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: "ok".to_string(),
            data: Some(data),
        }
    }

    /// Consumes the envelope, returning the payload if there is one.
    pub fn into_data(self) -> Option<T> {
        self.data
    }
}

/// Failure envelope, decoded loosely to pull out the server message.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

/// Payload of a successful refresh (POST /auth/refresh)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokens {
    /// New short-lived access token
    pub access_token: String,
    /// Replacement refresh token
    pub refresh_token: String,
    /// Access token lifetime in seconds
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// Payload of a successful upload (POST /files/upload)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    /// Where the stored file can be fetched
    #[serde(alias = "url")]
    pub file_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_api_response_deserialize() {
        let body = json!({"success": true, "message": "ok", "data": [1, 2]});
        let resp: ApiResponse<Vec<u32>> = serde_json::from_value(body).unwrap();
        assert!(resp.success);
        assert_eq!(resp.into_data(), Some(vec![1, 2]));
    }

    #[test]
    fn test_api_response_without_data() {
        let body = json!({"success": false, "message": "not found"});
        let resp: ApiResponse<Vec<u32>> = serde_json::from_value(body).unwrap();
        assert!(!resp.success);
        assert_eq!(resp.message, "not found");
        assert_eq!(resp.data, None);
    }

    #[test]
    fn test_refresh_tokens_camel_case() {
        let body = json!({"accessToken": "at", "refreshToken": "rt", "expiresIn": 900});
        let tokens: RefreshTokens = serde_json::from_value(body).unwrap();
        assert_eq!(tokens.access_token, "at");
        assert_eq!(tokens.refresh_token, "rt");
        assert_eq!(tokens.expires_in, Some(900));
    }

    #[test]
    fn test_error_body_tolerates_missing_message() {
        let body: ErrorBody = serde_json::from_str("{}").unwrap();
        assert_eq!(body.message, None);
    }

    #[test]
    fn test_uploaded_file_accepts_url_alias() {
        let file: UploadedFile = serde_json::from_value(json!({"url": "/f/1.png"})).unwrap();
        assert_eq!(file.file_url, "/f/1.png");
    }
}
