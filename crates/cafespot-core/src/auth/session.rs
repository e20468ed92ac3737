use std::sync::Arc;

use tracing::warn;

use crate::models::AuthResponse;

use super::{AuthError, CredentialKey, CredentialStore};

/// The persisted credential set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_token: String,
    pub refresh_token: String,
    pub display_name: Option<String>,
}

impl From<AuthResponse> for Credentials {
    fn from(resp: AuthResponse) -> Self {
        Self {
            access_token: resp.access_token,
            refresh_token: resp.refresh_token,
            display_name: resp.user_name,
        }
    }
}

/// Reads and writes the credential set as a unit.
///
/// Not synchronized on its own; the session client serializes access.
///
/// `generation` counts sign-ins and sign-outs. A refresh started under one
/// generation must not write its result into another.
pub struct Session {
    store: Arc<dyn CredentialStore>,
    generation: u64,
}

impl Session {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self {
            store,
            generation: 0,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Mark the start of a new sign-in or sign-out.
    pub fn advance_generation(&mut self) {
        self.generation += 1;
    }

    /// Load the full set. Returns `None` unless both tokens are present.
    pub fn load(&self) -> Result<Option<Credentials>, AuthError> {
        let access_token = self.store.get(CredentialKey::AccessToken)?;
        let refresh_token = self.store.get(CredentialKey::RefreshToken)?;
        let display_name = self.store.get(CredentialKey::DisplayName)?;

        Ok(match (access_token, refresh_token) {
            (Some(access_token), Some(refresh_token)) => Some(Credentials {
                access_token,
                refresh_token,
                display_name,
            }),
            _ => None,
        })
    }

    /// Persist all fields. If any write fails the whole set is cleared, so
    /// a mix of old and new values is never left behind.
    pub fn save(&self, credentials: &Credentials) -> Result<(), AuthError> {
        if let Err(e) = self.write_all(credentials) {
            warn!(error = %e, "Failed to persist credentials, clearing partial state");
            if let Err(clear_err) = self.clear() {
                warn!(error = %clear_err, "Failed to clear partial credentials");
            }
            return Err(e);
        }
        Ok(())
    }

    fn write_all(&self, credentials: &Credentials) -> Result<(), AuthError> {
        self.store
            .set(CredentialKey::AccessToken, &credentials.access_token)?;
        self.store
            .set(CredentialKey::RefreshToken, &credentials.refresh_token)?;
        match credentials.display_name {
            Some(ref name) => self.store.set(CredentialKey::DisplayName, name)?,
            None => self.store.delete(CredentialKey::DisplayName)?,
        }
        Ok(())
    }

    /// Remove every field. Attempts all deletes and reports the first failure.
    pub fn clear(&self) -> Result<(), AuthError> {
        let mut first_error = None;
        for key in CredentialKey::ALL {
            if let Err(e) = self.store.delete(key) {
                warn!(key = %key, error = %e, "Failed to delete credential");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn get(&self, key: CredentialKey) -> Result<Option<String>, AuthError> {
        self.store.get(key)
    }

    pub fn access_token(&self) -> Result<Option<String>, AuthError> {
        self.get(CredentialKey::AccessToken)
    }

    pub fn refresh_token(&self) -> Result<Option<String>, AuthError> {
        self.get(CredentialKey::RefreshToken)
    }

    pub fn display_name(&self) -> Result<Option<String>, AuthError> {
        self.get(CredentialKey::DisplayName)
    }
}
