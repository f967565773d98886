//! Orbit Learn Rust Client Library
//!
//! Session core for the Orbit Learn platform: parent authentication with
//! dual parent/child tokens, single-flight token refresh, PIN-gated
//! parent mode, child profiles, parental consent, route guards and the
//! onboarding sequencer.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod fetch;
pub mod guards;
pub mod onboarding;
pub mod validation;

pub use orbit_learn_mode as mode;
pub use orbit_learn_storage as storage;

use std::sync::Arc;

use log::debug;
use reqwest::Client;
use url::Url;

use crate::api::{ApiClient, ConsentClient, ProfilesClient};
use crate::auth::{AuthSession, HttpRefreshTransport, RefreshCoordinator, TokenStore};
use crate::config::ClientOptions;
use crate::error::Error;
use crate::guards::GuardContext;
use orbit_learn_mode::{Mode, ModeOptions, ModeSession};
use orbit_learn_storage::StorageManager;

/// The main entry point for the Orbit Learn client
pub struct OrbitLearn {
    /// Base URL of the REST API, e.g. `https://orbitlearn.app/api`
    pub url: String,
    /// Client options
    pub options: ClientOptions,
    storage: StorageManager,
    auth: Arc<AuthSession>,
}

impl OrbitLearn {
    /// Create a client with in-memory storage and credentials and default
    /// options
    ///
    /// # Example
    ///
    /// ```
    /// use orbit_learn::OrbitLearn;
    ///
    /// let client = OrbitLearn::new("https://orbitlearn.app/api").unwrap();
    /// assert!(!client.auth().is_authenticated());
    /// ```
    pub fn new(api_url: &str) -> Result<Self, Error> {
        Self::new_with_storage(api_url, StorageManager::in_memory(), ClientOptions::default())
    }

    /// Create a client over durable storage. Tokens go to the storage's
    /// credential store, everything else to its plain store.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use std::sync::Arc;
    /// use orbit_learn::storage::{platform_credentials, FileStore, StorageManager};
    /// use orbit_learn::{config::ClientOptions, OrbitLearn};
    ///
    /// let store = FileStore::open("/var/lib/orbit-learn/session.json").unwrap();
    /// let credentials =
    ///     platform_credentials("orbit-learn", "/var/lib/orbit-learn/credentials.enc").unwrap();
    /// let client = OrbitLearn::new_with_storage(
    ///     "https://orbitlearn.app/api",
    ///     StorageManager::new(Arc::new(store), credentials),
    ///     ClientOptions::from_env(),
    /// )
    /// .unwrap();
    /// ```
    pub fn new_with_storage(
        api_url: &str,
        storage: StorageManager,
        options: ClientOptions,
    ) -> Result<Self, Error> {
        let parsed = Url::parse(api_url)?;
        let url = parsed.as_str().trim_end_matches('/').to_string();
        let http_client = Client::new();

        let tokens = Arc::new(TokenStore::new(storage.clone(), options.persist_session));
        let transport = Arc::new(HttpRefreshTransport::new(
            &url,
            http_client.clone(),
            options.clone(),
        ));
        let refresher = Arc::new(RefreshCoordinator::new(transport, tokens.clone()));
        let api = ApiClient::new(&url, http_client, options.clone(), tokens, refresher);
        let auth = Arc::new(AuthSession::new(api, storage.clone(), options.clone()));

        debug!("Orbit Learn client for {}", url);
        Ok(Self {
            url,
            options,
            storage,
            auth,
        })
    }

    /// The auth session, shared with every client built from this one
    pub fn auth(&self) -> &Arc<AuthSession> {
        &self.auth
    }

    /// Authenticated REST client
    pub fn api(&self) -> &ApiClient {
        self.auth.api()
    }

    pub fn storage(&self) -> &StorageManager {
        &self.storage
    }

    pub fn consent(&self) -> ConsentClient {
        ConsentClient::new(self.auth.clone())
    }

    pub fn profiles(&self) -> ProfilesClient {
        ProfilesClient::new(self.auth.clone())
    }

    /// Mode session for the signed-in parent.
    ///
    /// The first call after sign-in creates it in child mode and hands it
    /// to the auth session; later calls return the same session and ignore
    /// `options`. Signing out ends it.
    pub fn mode_session(&self, options: ModeOptions) -> Result<Arc<ModeSession>, Error> {
        if let Some(existing) = self.auth.mode_session() {
            return Ok(existing);
        }
        let user = self.auth.user().filter(|u| !u.id.is_empty());
        match user {
            Some(user) if self.auth.is_authenticated() => {
                let mode = Arc::new(ModeSession::new(&user.id, self.storage.clone(), options));
                self.auth.attach_mode_session(mode.clone());
                Ok(mode)
            }
            _ => Err(Error::NotInitialized),
        }
    }

    /// Inputs for the route guards from both sessions. Without a mode
    /// session the parent is treated as being in child mode.
    pub fn guard_context(&self) -> GuardContext {
        let snapshot = self.auth.snapshot();
        let user = snapshot.user.as_ref();
        GuardContext {
            is_authenticated: snapshot.flags.is_authenticated,
            email_verified: user.map_or(false, |u| u.email_verified),
            consent_status: user.map(|u| u.consent_status).unwrap_or_default(),
            child_count: snapshot.children.len(),
            current_mode: self
                .auth
                .mode_session()
                .map_or(Mode::Child, |m| m.current_mode()),
            has_active_profile: snapshot.current_profile.is_some(),
        }
    }
}

impl std::fmt::Debug for OrbitLearn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrbitLearn")
            .field("url", &self.url)
            .field("auth", &self.auth)
            .finish()
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::auth::{AuthEvent, AuthSession, ChildProfile, ConsentStatus, ParentUser};
    pub use crate::config::ClientOptions;
    pub use crate::error::Error;
    pub use crate::guards::{GuardContext, RouteDecision, RouteTarget};
    pub use crate::onboarding::{OnboardingFlow, OnboardingStep};
    pub use crate::OrbitLearn;
    pub use orbit_learn_mode::{Mode, ModeOptions, ModeSession};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_url() {
        assert!(matches!(OrbitLearn::new("not a url"), Err(Error::Url(_))));
    }

    #[test]
    fn test_mode_session_needs_sign_in() {
        let client = OrbitLearn::new("http://localhost:3000/api/").unwrap();
        assert_eq!(client.url, "http://localhost:3000/api");
        assert!(matches!(
            client.mode_session(ModeOptions::default()),
            Err(Error::NotInitialized)
        ));
        let ctx = client.guard_context();
        assert_eq!(ctx, GuardContext::default());
    }
}
