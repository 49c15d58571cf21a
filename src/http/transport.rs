//! HTTP transport boundary
//!
//! The "send a request, get status and body" primitive the authenticated
//! transport is built on, and its reqwest implementation.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::Result;
use crate::models::ErrorBody;

// == Request ==
/// A request relative to the API base URL.
///
/// Requests are replayable: the authenticated transport sends the same value
/// again after a token refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    /// Path plus query string, appended to the base URL
    pub endpoint: String,
    /// JSON body
    pub body: Option<Value>,
    /// Extra headers
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            body: None,
            headers: Vec::new(),
        }
    }

    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(Method::GET, endpoint)
    }

    pub fn post(endpoint: impl Into<String>) -> Self {
        Self::new(Method::POST, endpoint)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

// == Response ==
/// Status code and raw body of a completed exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Builds a response whose body is `value` encoded as JSON.
    pub fn json(status: u16, value: &Value) -> Self {
        Self::new(status, value.to_string())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    pub fn decode<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }

    /// The server-supplied `message` of a failure body, if any.
    pub fn error_message(&self) -> Option<String> {
        self.decode::<ErrorBody>().ok().and_then(|body| body.message)
    }
}

// == Transport Trait ==
/// Sends one request and returns whatever the server answered.
///
/// Implementations attach `bearer` as an `Authorization: Bearer` header when
/// given and report only the absence of a response as an error: any status
/// code, including 401 and 5xx, is a successful exchange at this level.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: &HttpRequest, bearer: Option<&str>) -> Result<HttpResponse>;
}

// == Reqwest Transport ==
/// [`HttpTransport`] over a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    base_url: String,
}

impl ReqwestTransport {
    /// Creates a transport rooted at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("educhain-client/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &HttpRequest, bearer: Option<&str>) -> Result<HttpResponse> {
        let url = self.url(&request.endpoint);
        let started = Instant::now();

        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .header(CONTENT_TYPE, "application/json");
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        debug!(
            method = %request.method,
            url = %url,
            status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request completed"
        );

        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_builders() {
        let req = HttpRequest::post("/knowledge")
            .with_body(json!({"title": "Borrowing"}))
            .with_header("X-Request-Id", "abc");

        assert_eq!(req.method, Method::POST);
        assert_eq!(req.endpoint, "/knowledge");
        assert_eq!(req.body, Some(json!({"title": "Borrowing"})));
        assert_eq!(req.headers, vec![("X-Request-Id".to_string(), "abc".to_string())]);
    }

    #[test]
    fn test_response_status_helpers() {
        assert!(HttpResponse::new(204, "").is_success());
        assert!(!HttpResponse::new(401, "").is_success());
        assert!(HttpResponse::new(401, "").is_unauthorized());
        assert!(!HttpResponse::new(500, "").is_unauthorized());
    }

    #[test]
    fn test_error_message_extraction() {
        let resp = HttpResponse::json(400, &json!({"success": false, "message": "bad title"}));
        assert_eq!(resp.error_message().as_deref(), Some("bad title"));

        assert_eq!(HttpResponse::new(502, "<html>gateway</html>").error_message(), None);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let transport = ReqwestTransport::with_client(Client::new(), "http://localhost:3000/api/");
        assert_eq!(transport.base_url(), "http://localhost:3000/api");
        assert_eq!(transport.url("/auth/refresh"), "http://localhost:3000/api/auth/refresh");
    }
}
