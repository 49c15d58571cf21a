//! Authenticated Transport
//!
//! Attaches the access token to every request, recovers from an expired
//! token with one refresh and one retry, and turns unsuccessful responses
//! into errors.

use std::sync::Arc;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::auth::{claims, LocalStore, LogNavigator, Navigator, RefreshCoordinator, TokenStore};
use crate::config::Config;
use crate::error::{ClientError, Result};
use crate::http::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
use crate::models::ApiResponse;

// == Api Client ==
pub struct ApiClient {
    transport: Arc<dyn HttpTransport>,
    tokens: Arc<dyn TokenStore>,
    refresh: RefreshCoordinator,
    navigator: Arc<dyn Navigator>,
    login_path: String,
}

impl ApiClient {
    /// Wires a client from its collaborators.
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        tokens: Arc<dyn TokenStore>,
        navigator: Arc<dyn Navigator>,
        config: &Config,
    ) -> Self {
        let refresh = RefreshCoordinator::new(
            Arc::clone(&tokens),
            Arc::clone(&transport),
            config.refresh_endpoint.clone(),
        );
        Self {
            transport,
            tokens,
            refresh,
            navigator,
            login_path: config.login_path.clone(),
        }
    }

    /// Builds the production client: reqwest transport, file-backed token
    /// store, log-only navigator.
    pub fn from_config(config: &Config) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::new(&config.api_base_url)?);
        let tokens = Arc::new(LocalStore::open(&config.token_store_path));
        Ok(Self::new(transport, tokens, Arc::new(LogNavigator), config))
    }

    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    pub fn refresh_coordinator(&self) -> &RefreshCoordinator {
        &self.refresh
    }

    // == Authenticated Request ==
    /// Sends `request` with the stored access token attached.
    ///
    /// A 401 answered to a request that carried a token triggers one refresh.
    /// If it yields a token the request is sent exactly once more and that
    /// response is final; if not, the user is sent to the login page and
    /// the call fails with [`ClientError::SessionExpired`]. Any final
    /// response outside 2xx becomes [`ClientError::Api`].
    pub async fn authenticated_request(&self, request: HttpRequest) -> Result<HttpResponse> {
        let access_token = self.tokens.access_token();
        let mut response = self
            .transport
            .send(&request, access_token.as_deref())
            .await?;

        if response.is_unauthorized() && access_token.is_some() {
            debug!(endpoint = %request.endpoint, "access token rejected, refreshing");
            match self.refresh.refresh().await {
                Some(fresh) => {
                    response = self.transport.send(&request, Some(&fresh)).await?;
                }
                None => {
                    warn!(endpoint = %request.endpoint, "session could not be refreshed");
                    self.navigator.redirect_to_login(&self.login_path);
                    return Err(ClientError::SessionExpired);
                }
            }
        }

        if !response.is_success() {
            return Err(ClientError::api(response.status, response.error_message()));
        }
        Ok(response)
    }

    /// Sends `request` and decodes the response envelope.
    pub async fn request<T: DeserializeOwned>(
        &self,
        request: HttpRequest,
    ) -> Result<ApiResponse<T>> {
        let response = self.authenticated_request(request).await?;
        response
            .decode()
            .map_err(|err| ClientError::Decode(err.to_string()))
    }

    // == Verbs ==
    /// GET `endpoint`, with `params` encoded as a query string. Null
    /// parameters are left out.
    pub async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: Option<&Map<String, Value>>,
    ) -> Result<ApiResponse<T>> {
        let endpoint = match params {
            Some(params) => format!("{endpoint}?{}", query_string(params)),
            None => endpoint.to_string(),
        };
        self.request(HttpRequest::get(endpoint)).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        endpoint: &str,
        body: Option<&B>,
    ) -> Result<ApiResponse<T>> {
        self.request(with_json(HttpRequest::post(endpoint), body)?).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        endpoint: &str,
        body: Option<&B>,
    ) -> Result<ApiResponse<T>> {
        self.request(with_json(HttpRequest::new(Method::PUT, endpoint), body)?)
            .await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize>(
        &self,
        endpoint: &str,
        body: Option<&B>,
    ) -> Result<ApiResponse<T>> {
        self.request(with_json(HttpRequest::new(Method::PATCH, endpoint), body)?)
            .await
    }

    pub async fn delete<T: DeserializeOwned, B: Serialize>(
        &self,
        endpoint: &str,
        body: Option<&B>,
    ) -> Result<ApiResponse<T>> {
        self.request(with_json(HttpRequest::new(Method::DELETE, endpoint), body)?)
            .await
    }

    // == Session ==
    /// True when an access token is stored and its `exp` claim has not passed.
    pub fn is_authenticated(&self) -> bool {
        self.tokens
            .access_token()
            .is_some_and(|token| !claims::is_expired(&token))
    }

    /// Drops all session credentials.
    pub fn logout(&self) {
        self.tokens.clear_tokens();
    }
}

fn with_json<B: Serialize>(request: HttpRequest, body: Option<&B>) -> Result<HttpRequest> {
    match body {
        Some(body) => {
            let value =
                serde_json::to_value(body).map_err(|err| ClientError::Decode(err.to_string()))?;
            Ok(request.with_body(value))
        }
        None => Ok(request),
    }
}

/// Form-encodes a parameter bag, skipping nulls. Strings are sent raw,
/// arrays as comma-joined items, everything else as its JSON text.
pub fn query_string(params: &Map<String, Value>) -> String {
    let pairs: Vec<(&str, String)> = params
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k.as_str(), param_text(v)))
        .collect();
    serde_urlencoded::to_string(pairs).unwrap_or_default()
}

fn param_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(param_text)
            .collect::<Vec<_>>()
            .join(","),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
