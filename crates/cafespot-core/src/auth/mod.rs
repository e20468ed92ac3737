//! Authentication module for managing user sessions and credentials.
//!
//! This module provides:
//! - `SessionClient`: login/register/logout, bearer attachment and the
//!   refresh-and-retry protocol around every authenticated request
//! - `Session`: the persisted credential set, written and cleared as a unit
//! - `CredentialStore`: secure storage via the OS keyring, or in memory
//!
//! Access tokens are refreshed reactively on a 401; there is no timer.

pub mod client;
pub mod credentials;
pub mod error;
pub mod events;
pub mod pipeline;
pub mod session;

pub use client::SessionClient;
pub use credentials::{CredentialKey, CredentialStore, KeyringStore, MemoryStore};
pub use error::AuthError;
pub use events::SessionEvent;
pub use session::{Credentials, Session};
