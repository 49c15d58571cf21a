//! Configuration Module
//!
//! Handles loading and managing client configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Client configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Prefix prepended to every endpoint
    pub api_base_url: String,
    /// Maximum number of entries the response cache can hold
    pub cache_max_entries: usize,
    /// Default TTL in milliseconds for cache entries without explicit TTL
    pub cache_default_ttl_ms: u64,
    /// Interval in seconds between caller-driven cache sweeps
    pub cleanup_interval: u64,
    /// File backing the persisted session credentials
    pub token_store_path: PathBuf,
    /// Navigation target on terminal authentication failure
    pub login_path: String,
    /// Path of the token refresh endpoint, relative to the base URL
    pub refresh_endpoint: String,
    /// Path of the file upload endpoint, relative to the base URL
    pub upload_endpoint: String,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `API_BASE_URL` - Endpoint prefix (default: http://localhost:3000/api)
    /// - `CACHE_MAX_ENTRIES` - Maximum cache entries (default: 100)
    /// - `CACHE_DEFAULT_TTL_MS` - Default TTL in milliseconds (default: 300000)
    /// - `CACHE_CLEANUP_INTERVAL_SECS` - Sweep frequency in seconds (default: 60)
    /// - `TOKEN_STORE_PATH` - Session file (default: .educhain/session.json)
    /// - `LOGIN_PATH` - Login entry point (default: /login)
    /// - `REFRESH_ENDPOINT` - Refresh endpoint (default: /auth/refresh)
    /// - `UPLOAD_ENDPOINT` - Upload endpoint (default: /files/upload)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_base_url: env::var("API_BASE_URL").unwrap_or(defaults.api_base_url),
            cache_max_entries: parse_var("CACHE_MAX_ENTRIES").unwrap_or(defaults.cache_max_entries),
            cache_default_ttl_ms: parse_var("CACHE_DEFAULT_TTL_MS")
                .unwrap_or(defaults.cache_default_ttl_ms),
            cleanup_interval: parse_var("CACHE_CLEANUP_INTERVAL_SECS")
                .unwrap_or(defaults.cleanup_interval),
            token_store_path: env::var("TOKEN_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.token_store_path),
            login_path: env::var("LOGIN_PATH").unwrap_or(defaults.login_path),
            refresh_endpoint: env::var("REFRESH_ENDPOINT").unwrap_or(defaults.refresh_endpoint),
            upload_endpoint: env::var("UPLOAD_ENDPOINT").unwrap_or(defaults.upload_endpoint),
        }
    }

    /// Default TTL as a `Duration`.
    pub fn default_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_default_ttl_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000/api".to_string(),
            cache_max_entries: 100,
            cache_default_ttl_ms: 5 * 60 * 1000,
            cleanup_interval: 60,
            token_store_path: PathBuf::from(".educhain/session.json"),
            login_path: "/login".to_string(),
            refresh_endpoint: "/auth/refresh".to_string(),
            upload_endpoint: "/files/upload".to_string(),
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}
