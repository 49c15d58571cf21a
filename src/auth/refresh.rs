//! Refresh Coordinator
//!
//! Collapses concurrent access-token refreshes into one network call.
//!
//! The coordinator is either idle or refreshing. While idle, a request reads
//! the refresh token and, if there is one, starts the exchange and publishes
//! it as the current operation. While refreshing, every request awaits that
//! same operation without touching the store or the network. The slot is
//! emptied when the exchange settles, success or failure.

use std::sync::{Arc, Mutex, PoisonError, Weak};

use futures_util::future::{BoxFuture, Shared};
use futures_util::FutureExt;
use tracing::{debug, info, warn};

use crate::auth::TokenStore;
use crate::http::{HttpRequest, HttpTransport};
use crate::models::{ApiResponse, RefreshRequest, RefreshTokens};

type Refresh = Shared<BoxFuture<'static, Option<String>>>;
type Slot = Mutex<Option<Refresh>>;

/// Observable coordinator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Refreshing,
}

// == Refresh Coordinator ==
pub struct RefreshCoordinator {
    tokens: Arc<dyn TokenStore>,
    transport: Arc<dyn HttpTransport>,
    endpoint: String,
    current: Arc<Slot>,
}

impl RefreshCoordinator {
    /// Creates a coordinator that exchanges refresh tokens at `endpoint`.
    pub fn new(
        tokens: Arc<dyn TokenStore>,
        transport: Arc<dyn HttpTransport>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            tokens,
            transport,
            endpoint: endpoint.into(),
            current: Arc::new(Mutex::new(None)),
        }
    }

    pub fn state(&self) -> RefreshState {
        if self.lock().is_some() {
            RefreshState::Refreshing
        } else {
            RefreshState::Idle
        }
    }

    // == Refresh ==
    /// Obtains a new access token.
    ///
    /// Returns `None` without any network call when no refresh token is
    /// stored, and `None` after tearing the session down when the exchange
    /// fails. Callers arriving while an exchange is pending share its result.
    pub async fn refresh(&self) -> Option<String> {
        // Check and publish under one lock, with no await in between
        let pending = {
            let mut current = self.lock();
            match current.as_ref() {
                Some(pending) => {
                    debug!("joining in-flight token refresh");
                    pending.clone()
                }
                None => {
                    let refresh_token = self.tokens.refresh_token()?;
                    let pending = self.start(refresh_token);
                    *current = Some(pending.clone());
                    pending
                }
            }
        };

        pending.await
    }

    fn start(&self, refresh_token: String) -> Refresh {
        let tokens = Arc::clone(&self.tokens);
        let transport = Arc::clone(&self.transport);
        let endpoint = self.endpoint.clone();
        let slot: Weak<Slot> = Arc::downgrade(&self.current);

        async move {
            info!("refreshing access token");
            let outcome = exchange(transport.as_ref(), &endpoint, refresh_token).await;

            let access_token = match outcome {
                Ok(fresh) => {
                    tokens.set_tokens(&fresh.access_token, &fresh.refresh_token);
                    info!(expires_in = ?fresh.expires_in, "access token refreshed");
                    Some(fresh.access_token)
                }
                Err(reason) => {
                    warn!(reason = %reason, "token refresh failed, clearing session");
                    tokens.clear_tokens();
                    None
                }
            };

            if let Some(slot) = slot.upgrade() {
                *slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
            }
            access_token
        }
        .boxed()
        .shared()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Refresh>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Performs the refresh call. Any outcome other than a success envelope
/// carrying both tokens is a failure, described by the returned string.
async fn exchange(
    transport: &dyn HttpTransport,
    endpoint: &str,
    refresh_token: String,
) -> Result<RefreshTokens, String> {
    let body = serde_json::to_value(RefreshRequest::new(refresh_token))
        .map_err(|err| err.to_string())?;
    let request = HttpRequest::post(endpoint).with_body(body);

    let response = transport
        .send(&request, None)
        .await
        .map_err(|err| err.to_string())?;
    if !response.is_success() {
        return Err(format!("refresh endpoint answered {}", response.status));
    }

    let envelope: ApiResponse<RefreshTokens> =
        response.decode().map_err(|err| err.to_string())?;
    match envelope {
        ApiResponse {
            success: true,
            data: Some(tokens),
            ..
        } => Ok(tokens),
        ApiResponse { message, .. } => Err(format!("refresh rejected: {message}")),
    }
}
