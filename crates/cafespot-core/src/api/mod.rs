//! REST API client module for the cafespot backend.
//!
//! This module provides the request pipeline pieces and the typed
//! `ApiClient` used to search cafes and manage favorites.
//!
//! All authenticated calls go through the session client, which attaches
//! the bearer token and transparently refreshes an expired access token.

pub mod client;
pub mod error;
pub mod paths;
pub mod transport;

pub use client::ApiClient;
pub use error::RequestError;
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Transport};
