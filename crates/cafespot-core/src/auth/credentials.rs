use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use keyring::credential::{CredentialBuilderApi, CredentialPersistence};
use keyring::Entry;

use super::AuthError;

/// Default keychain service name
pub const DEFAULT_SERVICE_NAME: &str = "cafespot";

/// Fixed keys of the persisted credential set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKey {
    AccessToken,
    RefreshToken,
    DisplayName,
}

impl CredentialKey {
    pub const ALL: [CredentialKey; 3] = [
        CredentialKey::AccessToken,
        CredentialKey::RefreshToken,
        CredentialKey::DisplayName,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialKey::AccessToken => "access_token",
            CredentialKey::RefreshToken => "refresh_token",
            CredentialKey::DisplayName => "user_name",
        }
    }
}

impl fmt::Display for CredentialKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key-value storage for the session's secrets.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: CredentialKey) -> Result<Option<String>, AuthError>;

    fn set(&self, key: CredentialKey, value: &str) -> Result<(), AuthError>;

    /// Deleting a key that is not stored is not an error.
    fn delete(&self, key: CredentialKey) -> Result<(), AuthError>;
}

/// Credentials kept in the OS keychain.
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// Whether the compiled-in keychain backend keeps values after the process
    /// exits. False means keyring fell back to an in-memory or mock store.
    pub fn is_persistent() -> bool {
        matches!(
            keyring::default::default_credential_builder().persistence(),
            CredentialPersistence::UntilReboot | CredentialPersistence::UntilDelete
        )
    }

    fn entry(&self, key: CredentialKey) -> Result<Entry, AuthError> {
        Entry::new(&self.service, key.as_str())
            .map_err(|e| AuthError::Storage(format!("Failed to create keyring entry: {}", e)))
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE_NAME)
    }
}

impl CredentialStore for KeyringStore {
    fn get(&self, key: CredentialKey) -> Result<Option<String>, AuthError> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(AuthError::Storage(format!(
                "Failed to retrieve {} from keychain: {}",
                key, e
            ))),
        }
    }

    fn set(&self, key: CredentialKey, value: &str) -> Result<(), AuthError> {
        self.entry(key)?
            .set_password(value)
            .map_err(|e| AuthError::Storage(format!("Failed to store {} in keychain: {}", key, e)))
    }

    fn delete(&self, key: CredentialKey) -> Result<(), AuthError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(AuthError::Storage(format!(
                "Failed to delete {} from keychain: {}",
                key, e
            ))),
        }
    }
}

/// Process-local store. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<CredentialKey, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> Result<std::sync::MutexGuard<'_, HashMap<CredentialKey, String>>, AuthError> {
        self.values
            .lock()
            .map_err(|_| AuthError::Storage("Credential store lock poisoned".to_string()))
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, key: CredentialKey) -> Result<Option<String>, AuthError> {
        Ok(self.values()?.get(&key).cloned())
    }

    fn set(&self, key: CredentialKey, value: &str) -> Result<(), AuthError> {
        self.values()?.insert(key, value.to_string());
        Ok(())
    }

    fn delete(&self, key: CredentialKey) -> Result<(), AuthError> {
        self.values()?.remove(&key);
        Ok(())
    }
}
