//! Durable storage for the Orbit Learn client
//!
//! This crate provides the key-value persistence the session core relies on:
//! the selected child profile, per-user parent PIN settings and the
//! `{scope}:{id}:{key}` namespaced cache that has to be wiped when a user
//! signs out or a child profile is removed. The refresh and child tokens go
//! to a separate [`CredentialStore`] instead: the system keyring, or an
//! encrypted file where there is none.

pub mod credentials;
mod error;
pub mod keys;
mod manager;
mod store;

pub use credentials::{
    platform_credentials, CredentialStore, EncryptedFileCredentials, KeyringCredentials,
    MemoryCredentials,
};
pub use error::StorageError;
pub use secrecy::{ExposeSecret, SecretString};
pub use manager::{Scope, ScopedStorage, StorageManager};
pub use store::{FileStore, KeyValueStore, MemoryStore};

/// 結果型
pub type Result<T> = std::result::Result<T, StorageError>;
