use std::fmt;
use std::sync::Arc;

use log::{debug, warn};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::credentials::{CredentialStore, MemoryCredentials};
use crate::keys;
use crate::store::{KeyValueStore, MemoryStore};
use crate::Result;

/// Namespace a scoped key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    User,
    Child,
}

impl Scope {
    fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Child => "child",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn scope_prefix(scope: Scope, id: &str) -> String {
    format!("{}:{}:", scope, id)
}

/// Shared handle over a [`KeyValueStore`] with global and namespaced access,
/// plus the [`CredentialStore`] that holds the tokens.
///
/// Keys listed in [`keys::SECRET_KEYS`] are routed to the credential store
/// by `get`/`set`/`remove`, so the plain store never sees them.
///
/// Cloning is cheap; every clone talks to the same underlying stores.
#[derive(Clone)]
pub struct StorageManager {
    store: Arc<dyn KeyValueStore>,
    credentials: Arc<dyn CredentialStore>,
}

impl fmt::Debug for StorageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageManager")
            .field("keys", &self.store.keys().len())
            .finish()
    }
}

impl Default for StorageManager {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl StorageManager {
    pub fn new(store: Arc<dyn KeyValueStore>, credentials: Arc<dyn CredentialStore>) -> Self {
        Self { store, credentials }
    }

    /// Manager over a fresh [`MemoryStore`] and [`MemoryCredentials`].
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryCredentials::new()),
        )
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.credentials
    }

    pub fn get(&self, key: &str) -> Option<String> {
        if keys::is_secret(key) {
            return self.secret(key).map(|s| s.expose_secret().to_string());
        }
        self.store.get(key)
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        if keys::is_secret(key) {
            return self
                .credentials
                .save(key, &SecretString::from(value.to_string()));
        }
        self.store.set(key, value)
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        if keys::is_secret(key) {
            return self.credentials.delete(key);
        }
        self.store.remove(key)
    }

    /// Keys in the plain store. Secrets are not listed.
    pub fn keys(&self) -> Vec<String> {
        self.store.keys()
    }

    /// Write or remove `key` depending on whether `value` is present.
    pub fn put_optional(&self, key: &str, value: Option<&str>) -> Result<()> {
        match value {
            Some(v) => self.set(key, v),
            None => self.remove(key),
        }
    }

    /// Read from the credential store. Backend failures read as missing.
    pub fn secret(&self, key: &str) -> Option<SecretString> {
        match self.credentials.load(key) {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to read credential {}: {}", key, e);
                None
            }
        }
    }

    /// Move a secret left in the plain store by an older client into the
    /// credential store. Returns true when something was moved.
    pub fn migrate_plain_secret(&self, key: &str) -> Result<bool> {
        let Some(value) = self.store.get(key) else {
            return Ok(false);
        };
        if self.secret(key).is_none() {
            self.credentials
                .save(key, &SecretString::from(value))?;
        }
        self.store.remove(key)?;
        debug!("Moved {} out of the plain store", key);
        Ok(true)
    }

    /// View of the `user:{user_id}:` namespace.
    pub fn for_user(&self, user_id: &str) -> ScopedStorage {
        self.scoped(Scope::User, user_id)
    }

    /// View of the `child:{child_id}:` namespace.
    pub fn for_child(&self, child_id: &str) -> ScopedStorage {
        self.scoped(Scope::Child, child_id)
    }

    pub fn scoped(&self, scope: Scope, id: &str) -> ScopedStorage {
        ScopedStorage {
            store: self.store.clone(),
            prefix: scope_prefix(scope, id),
        }
    }

    /// Remove every key in a user's namespace.
    pub fn clear_user(&self, user_id: &str) -> Result<usize> {
        self.for_user(user_id).clear()
    }

    /// Remove every key in a child's namespace.
    pub fn clear_child(&self, child_id: &str) -> Result<usize> {
        self.for_child(child_id).clear()
    }

    /// Remove every scoped key for every user and child.
    ///
    /// Global keys are left alone.
    pub fn clear_all_scoped(&self) -> Result<usize> {
        let mut removed = 0;
        for scope in [Scope::User, Scope::Child] {
            removed += self.store.remove_prefix(&format!("{}:", scope))?;
        }
        if removed > 0 {
            debug!("Cleared {} scoped storage keys", removed);
        }
        Ok(removed)
    }
}

/// A `{scope}:{id}:` namespace inside a [`StorageManager`].
#[derive(Clone)]
pub struct ScopedStorage {
    store: Arc<dyn KeyValueStore>,
    prefix: String,
}

impl fmt::Debug for ScopedStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedStorage")
            .field("prefix", &self.prefix)
            .finish()
    }
}

impl ScopedStorage {
    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.store.get(&self.full_key(key))
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.store.set(&self.full_key(key), value)
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        self.store.remove(&self.full_key(key))
    }

    /// Deserialize a JSON value. Corrupt entries read as missing.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring corrupt value at {}{}: {}", self.prefix, key, e);
                None
            }
        }
    }

    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.set(key, &raw)
    }

    /// Keys in this namespace, with the prefix stripped.
    pub fn keys(&self) -> Vec<String> {
        self.store
            .keys()
            .into_iter()
            .filter_map(|k| k.strip_prefix(&self.prefix).map(str::to_string))
            .collect()
    }

    /// Remove the whole namespace.
    pub fn clear(&self) -> Result<usize> {
        self.store.remove_prefix(&self.prefix)
    }
}
