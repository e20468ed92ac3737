//! Cafespot core - session client, API client, models and configuration
//! for the cafe-discovery backend.
//!
//! Build a [`SessionClient`] over a transport and a credential store, share
//! it as an `Arc`, and wrap it in an [`ApiClient`] for typed calls:
//!
//! ```no_run
//! use std::sync::Arc;
//! use cafespot_core::{ApiClient, Config, HttpTransport, KeyringStore, SessionClient};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::load()?;
//! let transport = HttpTransport::new(config.api_base_url.clone(), config.request_timeout())?;
//! let store = KeyringStore::new(config.keyring_service.clone());
//! let session = Arc::new(SessionClient::new(Arc::new(transport), Arc::new(store)));
//! let api = ApiClient::new(session.clone());
//!
//! session.login("a@b.com", "secret").await?;
//! let favorites = api.favorites().await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod utils;

#[cfg(test)]
mod testing;

pub use api::{ApiClient, ApiRequest, ApiResponse, HttpTransport, RequestError, Transport};
pub use auth::{
    AuthError, CredentialKey, CredentialStore, Credentials, KeyringStore, MemoryStore,
    SessionClient, SessionEvent,
};
pub use config::Config;
