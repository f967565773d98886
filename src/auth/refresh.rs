//! Single-flight token refresh.
//!
//! Most refresh-token schemes invalidate the old refresh token on use, so two
//! parallel refresh calls with the same token would log the user out. Every
//! caller that needs a refresh while one is running awaits the same shared
//! future instead of starting its own.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use log::{debug, info, warn};
use reqwest::{Client, Method};
use serde_json::json;

use crate::auth::tokens::{TokenStore, TokenUpdate};
use crate::auth::types::{ApiResponse, TokenPair};
use crate::config::ClientOptions;
use crate::error::Error;
use crate::fetch::FetchBuilder;

/// The network half of a refresh.
#[async_trait]
pub trait RefreshTransport: Send + Sync {
    /// Exchange `refresh_token` for a fresh pair.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, Error>;
}

/// `POST /auth/refresh {refreshToken}`
pub struct HttpRefreshTransport {
    url: String,
    client: Client,
    options: ClientOptions,
}

impl HttpRefreshTransport {
    pub fn new(api_url: &str, client: Client, options: ClientOptions) -> Self {
        Self {
            url: format!("{}/auth/refresh", api_url.trim_end_matches('/')),
            client,
            options,
        }
    }
}

#[async_trait]
impl RefreshTransport for HttpRefreshTransport {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, Error> {
        let response = FetchBuilder::new(&self.client, &self.url, Method::POST)
            .header("X-Client-Info", &self.options.client_info)
            .timeout(self.options.request_timeout)
            .json(&json!({ "refreshToken": refresh_token }))?
            .execute::<ApiResponse<TokenPair>>()
            .await?;
        response.into_data()
    }
}

/// Marker for a failed refresh. The cause is logged once where it happens;
/// every waiter sees the same uniform failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RefreshFailed;

type SharedRefresh = Shared<BoxFuture<'static, Result<TokenPair, RefreshFailed>>>;

/// Serializes refreshes behind one in-flight future.
pub struct RefreshCoordinator {
    transport: Arc<dyn RefreshTransport>,
    tokens: Arc<TokenStore>,
    in_flight: Mutex<Option<SharedRefresh>>,
}

impl RefreshCoordinator {
    pub fn new(transport: Arc<dyn RefreshTransport>, tokens: Arc<TokenStore>) -> Self {
        Self {
            transport,
            tokens,
            in_flight: Mutex::new(None),
        }
    }

    /// Whether a refresh is currently running.
    pub fn is_refreshing(&self) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Refresh the session, joining a refresh that is already running.
    ///
    /// On failure every token is cleared and every caller gets
    /// [`Error::SessionExpired`].
    pub async fn refresh(&self) -> Result<TokenPair, Error> {
        let shared = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
            match in_flight.as_ref() {
                Some(running) => {
                    debug!("Joining refresh already in flight");
                    running.clone()
                }
                None => {
                    let fut = Self::run(self.transport.clone(), self.tokens.clone())
                        .boxed()
                        .shared();
                    *in_flight = Some(fut.clone());
                    fut
                }
            }
        };

        let outcome = shared.clone().await;

        {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
            if in_flight.as_ref().map_or(false, |f| f.ptr_eq(&shared)) {
                *in_flight = None;
            }
        }

        outcome.map_err(|_| Error::SessionExpired)
    }

    /// Refresh unless the parent token already moved on since `seen`.
    ///
    /// A request that got a 401 with parent token `seen` only needs a new
    /// refresh if nobody replaced that token in the meantime; otherwise it
    /// can replay straight away with the current one.
    pub async fn refresh_if_stale(&self, seen: Option<&str>) -> Result<(), Error> {
        if !self.is_refreshing() {
            if let Some(current) = self.tokens.access_token() {
                if Some(current.as_str()) != seen {
                    debug!("Token already refreshed by another request");
                    return Ok(());
                }
            }
        }
        self.refresh().await.map(|_| ())
    }

    async fn run(
        transport: Arc<dyn RefreshTransport>,
        tokens: Arc<TokenStore>,
    ) -> Result<TokenPair, RefreshFailed> {
        let Some(refresh_token) = tokens.refresh_token() else {
            warn!("Refresh requested without a refresh token");
            tokens.clear_all();
            return Err(RefreshFailed);
        };

        match transport.refresh(&refresh_token).await {
            Ok(pair) => {
                tokens.set_tokens(TokenUpdate::pair(
                    pair.token.clone(),
                    pair.refresh_token.clone(),
                ));
                info!("Session refreshed");
                Ok(pair)
            }
            Err(e) => {
                warn!("Token refresh failed, clearing session: {}", e);
                tokens.clear_all();
                Err(RefreshFailed)
            }
        }
    }
}
