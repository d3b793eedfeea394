//! Persistent credential storage.
//!
//! Holds two entries: the bearer token and the cached user profile. They are
//! written on login, read by every outgoing request, and cleared together on
//! logout or a 401.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use cablestore_core::UserProfile;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::CredentialError;

/// Storage key of the bearer token.
pub const TOKEN_KEY: &str = "access_token";
/// Storage key of the cached profile.
pub const USER_KEY: &str = "user_info";

/// Storage for the bearer token and cached profile.
pub trait CredentialStore: Send + Sync {
    /// Current bearer token, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn token(&self) -> Result<Option<SecretString>, CredentialError>;

    /// Persist a new bearer token.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn set_token(&self, token: &SecretString) -> Result<(), CredentialError>;

    /// Cached profile, if any. A corrupt entry reads as `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn user(&self) -> Result<Option<UserProfile>, CredentialError>;

    /// Persist the cached profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn set_user(&self, user: &UserProfile) -> Result<(), CredentialError>;

    /// Remove both entries. Clearing an empty store is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn clear(&self) -> Result<(), CredentialError>;
}

/// Raw stored entries. The profile is kept as an opaque JSON value so a
/// corrupt profile never makes the token unreadable.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct StoredEntries {
    #[serde(rename = "access_token", default, skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(rename = "user_info", default, skip_serializing_if = "Option::is_none")]
    user: Option<serde_json::Value>,
}

impl StoredEntries {
    fn profile(&self) -> Option<UserProfile> {
        let value = self.user.clone()?;
        match serde_json::from_value(value) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(error = %e, "Discarding unparsable cached user profile");
                None
            }
        }
    }
}

// =============================================================================
// In-memory store
// =============================================================================

/// Credential store that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    entries: Mutex<StoredEntries>,
}

impl MemoryCredentialStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with a token and optional profile.
    #[must_use]
    pub fn with_credentials(token: &str, user: Option<&UserProfile>) -> Self {
        Self {
            entries: Mutex::new(StoredEntries {
                token: Some(token.to_string()),
                user: user.and_then(|u| serde_json::to_value(u).ok()),
            }),
        }
    }

    /// Store a raw, possibly corrupt, profile entry.
    pub fn set_raw_user(&self, value: serde_json::Value) {
        self.lock().user = Some(value);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoredEntries> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn token(&self) -> Result<Option<SecretString>, CredentialError> {
        Ok(self.lock().token.clone().map(SecretString::from))
    }

    fn set_token(&self, token: &SecretString) -> Result<(), CredentialError> {
        self.lock().token = Some(token.expose_secret().to_string());
        Ok(())
    }

    fn user(&self) -> Result<Option<UserProfile>, CredentialError> {
        Ok(self.lock().profile())
    }

    fn set_user(&self, user: &UserProfile) -> Result<(), CredentialError> {
        self.lock().user = Some(serde_json::to_value(user)?);
        Ok(())
    }

    fn clear(&self) -> Result<(), CredentialError> {
        *self.lock() = StoredEntries::default();
        Ok(())
    }
}

// =============================================================================
// File-backed store
// =============================================================================

/// Credential store persisted as a small JSON file.
///
/// The file holds the same two keys a browser would keep in local storage.
/// A missing file is an empty store.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process
    guard: Mutex<()>,
}

impl FileCredentialStore {
    /// Use the credential file at `path`; it is created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    /// Location of the credential file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<StoredEntries, CredentialError> {
        match std::fs::read(&self.path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(StoredEntries::default()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StoredEntries::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, entries: &StoredEntries) -> Result<(), CredentialError> {
        if entries.token.is_none() && entries.user.is_none() {
            return match std::fs::remove_file(&self.path) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
                _ => Ok(()),
            };
        }
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_vec_pretty(entries)?)?;
        Ok(())
    }

    fn update(&self, apply: impl FnOnce(&mut StoredEntries)) -> Result<(), CredentialError> {
        let _held = self
            .guard
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut entries = self.read()?;
        apply(&mut entries);
        self.write(&entries)
    }
}

impl CredentialStore for FileCredentialStore {
    fn token(&self) -> Result<Option<SecretString>, CredentialError> {
        Ok(self.read()?.token.map(SecretString::from))
    }

    fn set_token(&self, token: &SecretString) -> Result<(), CredentialError> {
        let token = token.expose_secret().to_string();
        self.update(|entries| entries.token = Some(token))
    }

    fn user(&self) -> Result<Option<UserProfile>, CredentialError> {
        Ok(self.read()?.profile())
    }

    fn set_user(&self, user: &UserProfile) -> Result<(), CredentialError> {
        let value = serde_json::to_value(user)?;
        self.update(|entries| entries.user = Some(value))
    }

    fn clear(&self) -> Result<(), CredentialError> {
        self.update(|entries| *entries = StoredEntries::default())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn user() -> UserProfile {
        serde_json::from_value(serde_json::json!({
            "id": 5, "email": "buyer@acme.test", "company_name": "Acme Wire"
        }))
        .unwrap()
    }

    #[test]
    fn test_memory_store_roundtrip_and_clear() {
        let store = MemoryCredentialStore::new();
        assert!(store.token().unwrap().is_none());

        store.set_token(&SecretString::from("tok-1")).unwrap();
        store.set_user(&user()).unwrap();
        assert_eq!(store.token().unwrap().unwrap().expose_secret(), "tok-1");
        assert_eq!(store.user().unwrap(), Some(user()));

        store.clear().unwrap();
        assert!(store.token().unwrap().is_none());
        assert!(store.user().unwrap().is_none());

        // Idempotent
        store.clear().unwrap();
    }

    #[test]
    fn test_corrupt_profile_reads_as_none() {
        let store = MemoryCredentialStore::with_credentials("tok", None);
        store.set_raw_user(serde_json::json!("{not json"));
        assert!(store.user().unwrap().is_none());
        assert!(store.token().unwrap().is_some());
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("credentials.json");

        let store = FileCredentialStore::new(&path);
        store.set_token(&SecretString::from("tok-2")).unwrap();
        store.set_user(&user()).unwrap();

        let reopened = FileCredentialStore::new(&path);
        assert_eq!(reopened.token().unwrap().unwrap().expose_secret(), "tok-2");
        assert_eq!(reopened.user().unwrap().unwrap().email, "buyer@acme.test");

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw[TOKEN_KEY], "tok-2");
        assert_eq!(raw[USER_KEY]["company_name"], "Acme Wire");
    }

    #[test]
    fn test_file_store_clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        let store = FileCredentialStore::new(&path);

        store.set_token(&SecretString::from("tok")).unwrap();
        assert!(path.exists());

        store.clear().unwrap();
        assert!(!path.exists());
        store.clear().unwrap();
    }

    #[test]
    fn test_missing_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("absent.json"));
        assert!(store.token().unwrap().is_none());
        assert!(store.user().unwrap().is_none());
    }
}
