//! Secret storage for the refresh and child tokens.
//!
//! Secrets never go through a [`KeyValueStore`](crate::KeyValueStore); the
//! plain store is a wipeable cache and may be readable by other processes.
//! The platform keyring is preferred, with an AES-256-GCM encrypted file as
//! the fallback where no keyring is available.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{Aead, OsRng};
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use log::{debug, info, warn};
use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroize;

use crate::error::StorageError;
use crate::Result;

const NONCE_SIZE: usize = 12;
const KEY_SIZE: usize = 32;
const KEY_SALT: &[u8] = b"orbit-learn-credential-encryption-v1";
const AVAILABILITY_ACCOUNT: &str = "availability-check";

/// Where tokens that must not hit the plain store are kept.
pub trait CredentialStore: Send + Sync {
    /// Read a secret. A missing entry is `Ok(None)`.
    fn load(&self, key: &str) -> Result<Option<SecretString>>;

    /// Write a secret, replacing any previous one.
    fn save(&self, key: &str, value: &SecretString) -> Result<()>;

    /// Remove a secret. Removing a missing entry is not an error.
    fn delete(&self, key: &str) -> Result<()>;
}

/// Secrets held for the life of the process only.
#[derive(Debug, Default)]
pub struct MemoryCredentials {
    entries: RwLock<BTreeMap<String, SecretString>>,
}

impl MemoryCredentials {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentials {
    fn load(&self, key: &str) -> Result<Option<SecretString>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        Ok(entries
            .get(key)
            .map(|s| SecretString::from(s.expose_secret().to_string())))
    }

    fn save(&self, key: &str, value: &SecretString) -> Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            key.to_string(),
            SecretString::from(value.expose_secret().to_string()),
        );
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
        Ok(())
    }
}

fn keyring_error(e: keyring::Error) -> StorageError {
    StorageError::CredentialError(format!("keyring: {}", e))
}

/// System keyring: Secret Service on Linux, Keychain on macOS, Credential
/// Manager on Windows. One entry per key under a fixed service name.
#[derive(Debug, Clone)]
pub struct KeyringCredentials {
    service: String,
}

impl KeyringCredentials {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry> {
        keyring::Entry::new(&self.service, key).map_err(keyring_error)
    }

    /// Whether a keyring backend answers at all. A missing entry counts as
    /// available.
    pub fn is_available(&self) -> bool {
        match self.entry(AVAILABILITY_ACCOUNT).map(|e| e.get_password()) {
            Ok(Ok(_)) | Ok(Err(keyring::Error::NoEntry)) => true,
            Ok(Err(e)) => {
                debug!("Keyring unavailable: {}", e);
                false
            }
            Err(e) => {
                debug!("Keyring unavailable: {}", e);
                false
            }
        }
    }
}

impl CredentialStore for KeyringCredentials {
    fn load(&self, key: &str) -> Result<Option<SecretString>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(SecretString::from(value))),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(keyring_error(e)),
        }
    }

    fn save(&self, key: &str, value: &SecretString) -> Result<()> {
        self.entry(key)?
            .set_password(value.expose_secret())
            .map_err(keyring_error)
    }

    fn delete(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(keyring_error(e)),
        }
    }
}

/// Key derived from machine identity, so the file is useless when copied
/// to another machine or account.
pub fn machine_derived_key() -> [u8; KEY_SIZE] {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();

    #[cfg(target_os = "linux")]
    {
        if let Ok(id) = fs::read_to_string("/etc/machine-id") {
            hasher.update(id.trim().as_bytes());
        } else if let Ok(id) = fs::read_to_string("/var/lib/dbus/machine-id") {
            hasher.update(id.trim().as_bytes());
        }
    }

    if let Ok(hostname) = hostname::get() {
        hasher.update(hostname.as_encoded_bytes());
    }

    #[cfg(unix)]
    {
        hasher.update(unsafe { libc::getuid() }.to_le_bytes());
    }
    #[cfg(windows)]
    {
        if let Ok(user) = std::env::var("USERNAME") {
            hasher.update(user.as_bytes());
        }
    }

    hasher.update(KEY_SALT);

    let mut key = [0u8; KEY_SIZE];
    key.copy_from_slice(&hasher.finalize());
    key
}

fn set_owner_only(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}

/// All secrets in one AES-256-GCM encrypted file: a random 12-byte nonce
/// followed by the ciphertext of a JSON object. Rewritten on every change.
pub struct EncryptedFileCredentials {
    path: PathBuf,
    key: [u8; KEY_SIZE],
    entries: RwLock<BTreeMap<String, SecretString>>,
}

impl EncryptedFileCredentials {
    /// Open with the machine-derived key.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_key(path, machine_derived_key())
    }

    /// Open with an explicit key.
    pub fn with_key(path: impl AsRef<Path>, key: [u8; KEY_SIZE]) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            decrypt_entries(&fs::read(&path)?, &key)?
        } else {
            BTreeMap::new()
        };
        debug!(
            "Opened encrypted credentials at {} ({} entries)",
            path.display(),
            entries.len()
        );
        Ok(Self {
            path,
            key,
            entries: RwLock::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, SecretString>) -> Result<()> {
        if entries.is_empty() {
            if self.path.exists() {
                fs::remove_file(&self.path)?;
            }
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let output = encrypt_entries(entries, &self.key)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, &output)?;
        set_owner_only(&tmp)?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            warn!("Failed to replace {}: {}", self.path.display(), e);
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    fn mutate<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut BTreeMap<String, SecretString>),
    {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let mut next: BTreeMap<String, SecretString> = entries
            .iter()
            .map(|(k, v)| (k.clone(), SecretString::from(v.expose_secret().to_string())))
            .collect();
        f(&mut next);
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }
}

impl CredentialStore for EncryptedFileCredentials {
    fn load(&self, key: &str) -> Result<Option<SecretString>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        Ok(entries
            .get(key)
            .map(|s| SecretString::from(s.expose_secret().to_string())))
    }

    fn save(&self, key: &str, value: &SecretString) -> Result<()> {
        let value = value.expose_secret().to_string();
        self.mutate(|entries| {
            entries.insert(key.to_string(), SecretString::from(value));
        })
    }

    fn delete(&self, key: &str) -> Result<()> {
        if self.load(key)?.is_none() {
            return Ok(());
        }
        self.mutate(|entries| {
            entries.remove(key);
        })
    }
}

impl Drop for EncryptedFileCredentials {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl std::fmt::Debug for EncryptedFileCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedFileCredentials")
            .field("path", &self.path)
            .finish()
    }
}

fn cipher(key: &[u8; KEY_SIZE]) -> Result<Aes256Gcm> {
    Aes256Gcm::new_from_slice(key)
        .map_err(|e| StorageError::CredentialError(format!("cipher init failed: {}", e)))
}

fn encrypt_entries(entries: &BTreeMap<String, SecretString>, key: &[u8; KEY_SIZE]) -> Result<Vec<u8>> {
    let plain: BTreeMap<&str, &str> = entries
        .iter()
        .map(|(k, v)| (k.as_str(), v.expose_secret()))
        .collect();
    let mut json = serde_json::to_string(&plain)?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);
    let ciphertext = cipher(key)?
        .encrypt(Nonce::from_slice(&nonce_bytes), json.as_bytes())
        .map_err(|e| StorageError::CredentialError(format!("encryption failed: {}", e)));
    json.zeroize();
    let ciphertext = ciphertext?;

    let mut output = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    output.extend_from_slice(&nonce_bytes);
    output.extend_from_slice(&ciphertext);
    Ok(output)
}

fn decrypt_entries(data: &[u8], key: &[u8; KEY_SIZE]) -> Result<BTreeMap<String, SecretString>> {
    if data.len() < NONCE_SIZE {
        return Err(StorageError::CredentialError(
            "encrypted credential file is truncated".to_string(),
        ));
    }
    let (nonce, ciphertext) = data.split_at(NONCE_SIZE);
    let plaintext = cipher(key)?
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|e| StorageError::CredentialError(format!("decryption failed: {}", e)))?;

    let mut json = String::from_utf8(plaintext).map_err(|e| {
        StorageError::CredentialError(format!("invalid UTF-8 in decrypted data: {}", e))
    })?;
    let parsed: std::result::Result<BTreeMap<String, String>, _> = serde_json::from_str(&json);
    json.zeroize();
    Ok(parsed?
        .into_iter()
        .map(|(k, v)| (k, SecretString::from(v)))
        .collect())
}

/// The keyring when one answers, otherwise an encrypted file at
/// `fallback_path`.
pub fn platform_credentials(
    service: &str,
    fallback_path: impl AsRef<Path>,
) -> Result<Arc<dyn CredentialStore>> {
    let keyring = KeyringCredentials::new(service);
    if keyring.is_available() {
        info!("Storing credentials in the system keyring");
        return Ok(Arc::new(keyring));
    }
    let file = EncryptedFileCredentials::open(fallback_path)?;
    info!(
        "Keyring unavailable, storing credentials in {}",
        file.path().display()
    );
    Ok(Arc::new(file))
}
