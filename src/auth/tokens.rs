//! Parent and child access tokens plus the rotating refresh token.

use std::sync::RwLock;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use log::{debug, warn};
use orbit_learn_storage::{keys, ExposeSecret, StorageManager};
use serde::Deserialize;
use tokio::sync::broadcast;

/// Partial token update. Fields left `None` are not touched.
#[derive(Debug, Clone, Default)]
pub struct TokenUpdate {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub child_token: Option<String>,
}

impl TokenUpdate {
    pub fn access(token: impl Into<String>) -> Self {
        Self {
            access_token: Some(token.into()),
            ..Default::default()
        }
    }

    pub fn child(token: impl Into<String>) -> Self {
        Self {
            child_token: Some(token.into()),
            ..Default::default()
        }
    }

    pub fn pair(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access_token: Some(access.into()),
            refresh_token: Some(refresh.into()),
            child_token: None,
        }
    }
}

/// Token store events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenEvent {
    Updated,
    ChildCleared,
    Cleared,
}

#[derive(Debug, Default)]
struct Tokens {
    access: Option<String>,
    child: Option<String>,
    refresh: Option<String>,
}

/// Holder of every credential the client uses.
///
/// The parent access token lives in memory only. The refresh token and the
/// child token are mirrored to the credential store (keyring or encrypted
/// file, never the plain store) so a restart can resume the session; the
/// mirror is written through on every change.
pub struct TokenStore {
    tokens: RwLock<Tokens>,
    storage: StorageManager,
    persist: bool,
    events: broadcast::Sender<TokenEvent>,
}

impl TokenStore {
    /// Create a store, restoring the durable refresh and child tokens.
    pub fn new(storage: StorageManager, persist: bool) -> Self {
        let (events, _) = broadcast::channel(16);
        let tokens = if persist {
            for key in keys::SECRET_KEYS {
                if let Err(e) = storage.migrate_plain_secret(key) {
                    warn!("Failed to move {} into the credential store: {}", key, e);
                }
            }
            let restore = |key| storage.secret(key).map(|s| s.expose_secret().to_string());
            Tokens {
                access: None,
                child: restore(keys::CHILD_TOKEN),
                refresh: restore(keys::REFRESH_TOKEN),
            }
        } else {
            Tokens::default()
        };
        debug!(
            "Token store ready (refresh restored: {}, child restored: {})",
            tokens.refresh.is_some(),
            tokens.child.is_some()
        );

        Self {
            tokens: RwLock::new(tokens),
            storage,
            persist,
            events,
        }
    }

    /// Subscribe to token changes.
    pub fn subscribe(&self) -> broadcast::Receiver<TokenEvent> {
        self.events.subscribe()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Tokens> {
        self.tokens.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Tokens> {
        self.tokens.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Token for the next API call: child token if set, else parent token.
    pub fn active_token(&self) -> Option<String> {
        let tokens = self.read();
        tokens.child.clone().or_else(|| tokens.access.clone())
    }

    pub fn access_token(&self) -> Option<String> {
        self.read().access.clone()
    }

    pub fn child_token(&self) -> Option<String> {
        self.read().child.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read().refresh.clone()
    }

    pub fn is_child_mode(&self) -> bool {
        self.read().child.is_some()
    }

    /// Any credential that can be used or turned into one.
    pub fn has_session(&self) -> bool {
        let tokens = self.read();
        tokens.access.is_some() || tokens.child.is_some() || tokens.refresh.is_some()
    }

    /// Apply the fields present in `update`.
    pub fn set_tokens(&self, update: TokenUpdate) {
        {
            let mut tokens = self.write();
            if let Some(access) = update.access_token {
                tokens.access = Some(access);
            }
            if let Some(refresh) = update.refresh_token {
                self.mirror(keys::REFRESH_TOKEN, Some(&refresh));
                tokens.refresh = Some(refresh);
            }
            if let Some(child) = update.child_token {
                self.mirror(keys::CHILD_TOKEN, Some(&child));
                tokens.child = Some(child);
            }
        }
        let _ = self.events.send(TokenEvent::Updated);
    }

    /// Drop the child token and fall back to parent scope.
    pub fn clear_child_token(&self) {
        {
            let mut tokens = self.write();
            if tokens.child.take().is_none() {
                return;
            }
            self.mirror(keys::CHILD_TOKEN, None);
        }
        debug!("Child token cleared, back to parent scope");
        let _ = self.events.send(TokenEvent::ChildCleared);
    }

    /// Wipe every token and its durable mirror.
    pub fn clear_all(&self) {
        {
            let mut tokens = self.write();
            *tokens = Tokens::default();
            self.mirror(keys::REFRESH_TOKEN, None);
            self.mirror(keys::CHILD_TOKEN, None);
        }
        debug!("All tokens cleared");
        let _ = self.events.send(TokenEvent::Cleared);
    }

    /// True when the parent access token carries an `exp` claim that has
    /// passed, allowing `margin` of slack. Opaque tokens never count as
    /// expired; the server's 401 decides for those.
    pub fn access_token_expired(&self, margin: std::time::Duration) -> bool {
        let Some(token) = self.access_token() else {
            return false;
        };
        match token_expires_at(&token) {
            Some(exp) => {
                let margin = chrono::Duration::from_std(margin).unwrap_or_else(|_| chrono::Duration::zero());
                Utc::now() + margin >= exp
            }
            None => false,
        }
    }

    fn mirror(&self, key: &str, value: Option<&str>) {
        if !self.persist {
            return;
        }
        // A failed mirror only costs the session on the next restart.
        if let Err(e) = self.storage.put_optional(key, value) {
            warn!("Failed to persist {}: {}", key, e);
        }
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tokens = self.read();
        f.debug_struct("TokenStore")
            .field("access", &tokens.access.is_some())
            .field("child", &tokens.child.is_some())
            .field("refresh", &tokens.refresh.is_some())
            .finish()
    }
}

#[derive(Deserialize)]
struct ExpClaim {
    exp: Option<i64>,
}

/// Read the `exp` claim of a JWT without verifying it.
pub fn token_expires_at(token: &str) -> Option<DateTime<Utc>> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claim: ExpClaim = serde_json::from_slice(&bytes).ok()?;
    Utc.timestamp_opt(claim.exp?, 0).single()
}
