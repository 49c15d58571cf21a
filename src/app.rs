//! Application State
//!
//! Composition root: builds the single response cache, token store, refresh
//! coordinator and HTTP client for the process and hands out shared handles.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::auth::{LocalStore, LogNavigator, Navigator, TokenStore};
use crate::cache::{cache_key, ResponseCache};
use crate::config::Config;
use crate::error::Result;
use crate::http::{ApiClient, ReqwestTransport, Uploader};
use crate::models::ApiResponse;

/// Shared application state, cloned into every caller.
#[derive(Clone)]
pub struct AppState {
    pub client: Arc<ApiClient>,
    pub cache: ResponseCache,
    pub uploader: Uploader,
}

impl AppState {
    /// Creates the production state. Terminal auth failures are only logged.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_navigator(config, Arc::new(LogNavigator))
    }

    /// Creates the state with a caller-supplied login redirect.
    pub fn with_navigator(config: &Config, navigator: Arc<dyn Navigator>) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::new(&config.api_base_url)?);
        let tokens: Arc<dyn TokenStore> = Arc::new(LocalStore::open(&config.token_store_path));

        let uploader = Uploader::from_config(config, transport.client().clone(), Arc::clone(&tokens));
        let client = ApiClient::new(transport, tokens, navigator, config);

        Ok(Self {
            client: Arc::new(client),
            cache: ResponseCache::from_config(config),
            uploader,
        })
    }

    /// GET through the response cache.
    ///
    /// The key is derived from `endpoint` and `params`; a miss performs the
    /// authenticated request and caches the decoded envelope for `ttl`, or
    /// the cache default. Failed requests are not cached.
    pub async fn cached_get<T>(
        &self,
        endpoint: &str,
        params: Option<&Map<String, Value>>,
        ttl: Option<Duration>,
    ) -> Result<ApiResponse<T>>
    where
        T: Serialize + DeserializeOwned,
    {
        let key = cache_key(endpoint, params);
        let client = Arc::clone(&self.client);
        self.cache
            .with_cache(
                || async move { client.get::<T>(endpoint, params).await },
                &key,
                ttl,
            )
            .await
    }
}
