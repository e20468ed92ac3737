use thiserror::Error;

use crate::api::RequestError;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("No refresh token available")]
    MissingRefreshToken,

    #[error("Refresh token rejected: {0}")]
    RefreshRejected(String),

    #[error("Signed in or out while the session was being refreshed")]
    SessionEnded,

    #[error("Credential storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Request(#[from] RequestError),
}

impl AuthError {
    /// Errors after which the stored session cannot be recovered by refreshing.
    pub fn ends_session(&self) -> bool {
        matches!(
            self,
            AuthError::MissingRefreshToken
                | AuthError::RefreshRejected(_)
                | AuthError::SessionEnded
        )
    }
}
