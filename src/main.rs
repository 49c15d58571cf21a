//! EduChain client demo
//!
//! Fetches one endpoint twice through the response cache and prints the
//! payload and cache statistics.
//!
//! Usage: `educhain-client [ENDPOINT] [KEY=VALUE ...]`

use std::env;

use anyhow::Context;
use serde_json::{Map, Value};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use educhain_client::{spawn_cleanup_task, AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" for this crate, overridable with RUST_LOG
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "educhain_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!(
        "Configuration loaded: base_url={}, cache_max_entries={}, default_ttl={}ms",
        config.api_base_url, config.cache_max_entries, config.cache_default_ttl_ms
    );

    let state = AppState::from_config(&config).context("building the HTTP client")?;
    if !state.client.is_authenticated() {
        warn!("no valid session stored, requests go out anonymously");
    }

    let cleanup_handle = spawn_cleanup_task(state.cache.clone(), config.cleanup_interval);

    let mut args = env::args().skip(1);
    let endpoint = args.next().unwrap_or_else(|| "/knowledge".to_string());
    let params = parse_params(args);

    tokio::select! {
        result = fetch_twice(&state, &endpoint, params.as_ref()) => {
            cleanup_handle.abort();
            result
        }
        _ = signal::ctrl_c() => {
            info!("Received Ctrl+C, aborting");
            cleanup_handle.abort();
            Ok(())
        }
    }
}

async fn fetch_twice(
    state: &AppState,
    endpoint: &str,
    params: Option<&Map<String, Value>>,
) -> anyhow::Result<()> {
    // The second call is served from the cache
    for _ in 0..2 {
        let response = state
            .cached_get::<Value>(endpoint, params, None)
            .await
            .with_context(|| format!("GET {endpoint}"))?;
        println!("{}", serde_json::to_string_pretty(&response)?);
    }

    let stats = state.cache.stats().await;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

/// Parses `key=value` arguments into a parameter bag. Values that read as
/// JSON keep their type; anything else is a string.
fn parse_params(args: impl Iterator<Item = String>) -> Option<Map<String, Value>> {
    let params: Map<String, Value> = args
        .filter_map(|arg| {
            let (key, raw) = arg.split_once('=')?;
            let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
            Some((key.to_string(), value))
        })
        .collect();
    (!params.is_empty()).then_some(params)
}
