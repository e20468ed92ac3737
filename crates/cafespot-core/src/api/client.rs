//! API client for the cafespot backend.
//!
//! This module provides the `ApiClient` struct for searching cafes and
//! managing favorites. Every call goes through the shared `SessionClient`,
//! so expired access tokens are refreshed transparently.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::auth::SessionClient;
use crate::models::{
    FavoritesResponse, MessageResponse, PasswordChangeRequest, Profile, SearchRequest,
    SearchResponse, User,
};

use super::{paths, ApiRequest, RequestError};

/// Typed endpoint wrappers.
/// Clone is cheap - the session client is shared.
#[derive(Clone)]
pub struct ApiClient {
    session: Arc<SessionClient>,
}

impl ApiClient {
    pub fn new(session: Arc<SessionClient>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Arc<SessionClient> {
        &self.session
    }

    /// Send through the session pipeline and decode a successful body.
    async fn fetch<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, RequestError> {
        let path = request.path.clone();
        let response = self.session.send(request).await?.error_for_status()?;
        debug!(path = %path, bytes = response.body.len(), "Decoding response");
        response.json()
    }

    // ===== Search =====

    /// Free-text cafe search
    pub async fn search_cafes(&self, query: &str) -> Result<SearchResponse, RequestError> {
        let request = ApiRequest::post(paths::SEARCH).with_json(&SearchRequest {
            query: query.to_string(),
        })?;
        self.fetch(request).await
    }

    /// Most searched places
    pub async fn top_places(&self) -> Result<SearchResponse, RequestError> {
        self.fetch(ApiRequest::get(paths::SEARCH_TOP_PLACES)).await
    }

    // ===== Favorites =====

    pub async fn favorites(&self) -> Result<FavoritesResponse, RequestError> {
        self.fetch(ApiRequest::get(paths::FAVORITES)).await
    }

    /// Flip the favorite flag of a place. Returns true if it is now a favorite.
    pub async fn toggle_favorite(&self, place_id: &str) -> Result<bool, RequestError> {
        let request =
            ApiRequest::post(paths::FAVORITES_TOGGLE).with_query(paths::PLACE_ID_PARAM, place_id);
        self.fetch(request).await
    }

    pub async fn is_favorite(&self, place_id: &str) -> Result<bool, RequestError> {
        let request =
            ApiRequest::get(paths::FAVORITES_CHECK).with_query(paths::PLACE_ID_PARAM, place_id);
        self.fetch(request).await
    }

    // ===== Account =====

    pub async fn current_user(&self) -> Result<User, RequestError> {
        self.fetch(ApiRequest::get(paths::AUTH_ME)).await
    }

    /// The signed-in user, falling back to the cached display name when the
    /// profile endpoint cannot be reached.
    pub async fn profile(&self) -> Result<Profile, RequestError> {
        match self.current_user().await {
            Ok(user) => Ok(Profile::Live(user)),
            Err(e) => match self.session.display_name().await {
                Some(display_name) => {
                    warn!(error = %e, "Profile fetch failed, using cached display name");
                    Ok(Profile::Cached { display_name })
                }
                None => Err(e),
            },
        }
    }

    pub async fn change_password(
        &self,
        current_password: &str,
        new_password: &str,
    ) -> Result<String, RequestError> {
        let request = ApiRequest::patch(paths::AUTH_CHANGE_PASSWORD).with_json(&PasswordChangeRequest {
            current_password: current_password.to_string(),
            new_password: new_password.to_string(),
        })?;
        let response: MessageResponse = self.fetch(request).await?;
        Ok(response.message)
    }
}
