//! Authenticated access to the Orbit Learn REST API.
//!
//! Every call carries the active bearer token. A 401 outside `/auth/refresh`
//! gets exactly one refresh-and-retry cycle; a second 401 ends the session.

mod consent;
mod profiles;

pub use consent::{CardConsentIntent, ConsentClient, KbqAnswer, KbqQuestion, KbqResult};
pub use profiles::ProfilesClient;

use std::sync::Arc;

use log::{debug, warn};
use reqwest::{Client, Method};
use serde::{de::DeserializeOwned, Serialize};

use crate::auth::{RefreshCoordinator, TokenStore};
use crate::config::ClientOptions;
use crate::error::Error;
use crate::fetch::FetchBuilder;

const REFRESH_PATH: &str = "/auth/refresh";

/// Thin JSON client bound to the session's tokens.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    http_client: Client,
    options: ClientOptions,
    tokens: Arc<TokenStore>,
    refresher: Arc<RefreshCoordinator>,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        http_client: Client,
        options: ClientOptions,
        tokens: Arc<TokenStore>,
        refresher: Arc<RefreshCoordinator>,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
            options,
            tokens,
            refresher,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.tokens
    }

    pub fn refresher(&self) -> &Arc<RefreshCoordinator> {
        &self.refresher
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn builder(&self, method: Method, path: &str) -> FetchBuilder<'_> {
        FetchBuilder::new(&self.http_client, &self.url(path), method)
            .header("X-Client-Info", &self.options.client_info)
            .timeout(self.options.request_timeout)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        self.request(Method::GET, path, None).await
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let body = serde_json::to_vec(body)?;
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn patch<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let body = serde_json::to_vec(body)?;
        self.request(Method::PATCH, path, Some(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        self.request(Method::DELETE, path, None).await
    }

    /// POST without credentials and without the refresh cycle. Used for
    /// sign-up, sign-in and email verification.
    pub async fn post_public<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        self.builder(Method::POST, path)
            .json(body)?
            .execute::<T>()
            .await
    }

    /// POST once with whatever token is active, ignoring the response body.
    /// Used for best-effort calls such as sign-out.
    pub async fn post_once<B: Serialize>(&self, path: &str, body: &B) -> Result<(), Error> {
        let token = self.tokens.active_token();
        self.builder(Method::POST, path)
            .maybe_bearer_auth(token.as_deref())
            .json(body)?
            .execute_empty()
            .await
    }

    async fn send_once<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<T, Error> {
        let token = self.tokens.active_token();
        self.builder(method, path)
            .maybe_bearer_auth(token.as_deref())
            .raw_body(body)
            .execute::<T>()
            .await
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<T, Error> {
        if self.options.auto_refresh_token {
            self.refresh_ahead().await?;
        }

        let parent_seen = self.tokens.access_token();
        let child_used = self.tokens.is_child_mode();

        match self.send_once(method.clone(), path, body.clone()).await {
            Err(e) if e.is_unauthorized() && !path.starts_with(REFRESH_PATH) => {
                debug!("{} {} returned 401, refreshing", method, path);
                if child_used {
                    // The child-scoped token expired; continue in parent scope.
                    self.tokens.clear_child_token();
                }
                self.refresher
                    .refresh_if_stale(parent_seen.as_deref())
                    .await?;

                match self.send_once(method.clone(), path, body).await {
                    Err(e) if e.is_unauthorized() => {
                        warn!("{} {} still unauthorized after refresh", method, path);
                        self.tokens.clear_all();
                        Err(Error::SessionExpired)
                    }
                    other => other,
                }
            }
            other => other,
        }
    }

    /// Refresh before sending when the parent token is missing or its
    /// `exp` claim has passed but a refresh token is available.
    async fn refresh_ahead(&self) -> Result<(), Error> {
        if self.tokens.is_child_mode() || self.tokens.refresh_token().is_none() {
            return Ok(());
        }
        let needed = match self.tokens.access_token() {
            None => true,
            Some(_) => self.tokens.access_token_expired(self.options.expiry_margin),
        };
        if needed {
            debug!("Access token missing or expired, refreshing ahead of request");
            self.refresher.refresh().await?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("tokens", &self.tokens)
            .finish()
    }
}
