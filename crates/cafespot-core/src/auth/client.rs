//! Session client for the cafespot backend.
//!
//! Every authenticated call goes through `SessionClient::send`, which attaches
//! the stored access token, and on a 401 refreshes the session and resends the
//! request exactly once. A refresh that fails clears the stored credentials and
//! publishes `SessionEvent::NavigateToLogin`.

use std::sync::Arc;

use reqwest::Method;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::api::{paths, ApiRequest, ApiResponse, RequestError, Transport};
use crate::models::{AuthResponse, LoginRequest, RefreshRequest, RegisterRequest};

use super::pipeline::{attach_bearer, retry_decision, RetryDecision};
use super::{AuthError, CredentialKey, CredentialStore, Credentials, Session, SessionEvent};

/// Capacity of the session event channel.
/// Subscribers that fall further behind than this miss the oldest events.
const EVENT_CHANNEL_CAPACITY: usize = 16;

pub struct SessionClient {
    transport: Arc<dyn Transport>,
    session: Mutex<Session>,
    /// Held for the duration of a refresh so concurrent 401s share one call.
    refresh_gate: Mutex<()>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionClient {
    pub fn new(transport: Arc<dyn Transport>, store: Arc<dyn CredentialStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            transport,
            session: Mutex::new(Session::new(store)),
            refresh_gate: Mutex::new(()),
            events,
        }
    }

    /// Subscribe to session events (sign-in, refresh, sign-out, navigate-to-login).
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    // =========================================================================
    // Credential access
    // =========================================================================

    /// Read one stored value. Storage failures read as absent.
    async fn stored(&self, key: CredentialKey) -> Option<String> {
        match self.session.lock().await.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to read credential, treating as absent");
                None
            }
        }
    }

    /// The stored credential set, if complete.
    pub async fn credentials(&self) -> Option<Credentials> {
        match self.session.lock().await.load() {
            Ok(credentials) => credentials,
            Err(e) => {
                warn!(error = %e, "Failed to load credentials");
                None
            }
        }
    }

    /// Cached display name from the last sign-in or refresh.
    pub async fn display_name(&self) -> Option<String> {
        self.stored(CredentialKey::DisplayName).await
    }

    pub async fn has_access_token(&self) -> bool {
        self.stored(CredentialKey::AccessToken).await.is_some()
    }

    /// The access token to send with, and the session generation it belongs to.
    async fn bearer_snapshot(&self) -> (Option<String>, u64) {
        let session = self.session.lock().await;
        let token = session.access_token().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read access token, sending without one");
            None
        });
        (token, session.generation())
    }

    // =========================================================================
    // Sign-in / sign-out
    // =========================================================================

    /// Authenticate with email and password and persist the returned tokens.
    pub async fn login(&self, email: &str, password: &str) -> Result<Credentials, AuthError> {
        let request = ApiRequest::post(paths::AUTH_LOGIN).with_json(&LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        })?;
        self.sign_in(request).await
    }

    /// Create an account and persist the returned tokens.
    pub async fn register(
        &self,
        name: Option<&str>,
        email: &str,
        password: &str,
    ) -> Result<Credentials, AuthError> {
        let request = ApiRequest::post(paths::AUTH_REGISTER).with_json(&RegisterRequest {
            name: name.map(str::to_string),
            email: email.to_string(),
            password: password.to_string(),
        })?;
        self.sign_in(request).await
    }

    async fn sign_in(&self, request: ApiRequest) -> Result<Credentials, AuthError> {
        // Sign-in goes straight to the transport: a rejected password is not
        // an expired session and must not start a refresh.
        let response = self.transport.send(&request).await?;
        if !response.is_success() {
            let err = Self::sign_in_error(response);
            warn!(path = %request.path, error = %err, "Sign-in rejected");
            return Err(err);
        }

        let credentials: Credentials = response.json::<AuthResponse>()?.into();
        {
            let mut session = self.session.lock().await;
            session.advance_generation();
            session.save(&credentials)?;
        }

        info!(path = %request.path, "Signed in");
        self.emit(SessionEvent::SignedIn {
            display_name: credentials.display_name.clone(),
        });
        Ok(credentials)
    }

    fn sign_in_error(response: ApiResponse) -> AuthError {
        match response.status.as_u16() {
            400 | 401 | 403 | 422 => {
                AuthError::InvalidCredentials(RequestError::detail_message(&response.body))
            }
            _ => AuthError::Request(RequestError::from_status(response.status, &response.body)),
        }
    }

    /// Clear all stored credentials. Never fails; safe when already signed out.
    pub async fn logout(&self, redirect_to_login: bool) {
        {
            let mut session = self.session.lock().await;
            session.advance_generation();
            if let Err(e) = session.clear() {
                warn!(error = %e, "Failed to clear credentials during logout");
            }
        }
        info!(redirect_to_login, "Signed out");
        self.emit(SessionEvent::SignedOut);
        if redirect_to_login {
            self.emit(SessionEvent::NavigateToLogin);
        }
    }

    // =========================================================================
    // Refresh
    // =========================================================================

    /// Exchange the stored refresh token for a new credential set.
    ///
    /// Does not clear credentials on failure; callers decide whether the
    /// failure ends the session.
    pub async fn refresh_session(&self) -> Result<Credentials, AuthError> {
        let _gate = self.refresh_gate.lock().await;
        let generation = self.session.lock().await.generation();
        self.refresh_locked(generation).await
    }

    /// Refresh with the gate already held.
    ///
    /// The new tokens are only stored if no sign-in or sign-out happened since
    /// `generation`; otherwise they are dropped and `SessionEnded` is returned.
    async fn refresh_locked(&self, generation: u64) -> Result<Credentials, AuthError> {
        let refresh_token = {
            let session = self.session.lock().await;
            if session.generation() != generation {
                return Err(AuthError::SessionEnded);
            }
            session.refresh_token().unwrap_or_else(|e| {
                warn!(error = %e, "Failed to read refresh token");
                None
            })
        };
        let Some(refresh_token) = refresh_token else {
            warn!("No refresh token available");
            return Err(AuthError::MissingRefreshToken);
        };

        let request =
            ApiRequest::post(paths::AUTH_REFRESH).with_json(&RefreshRequest { refresh_token })?;
        let response = self.transport.send(&request).await?;
        if !response.is_success() {
            return Err(AuthError::RefreshRejected(RequestError::detail_message(
                &response.body,
            )));
        }

        let credentials: Credentials = response.json::<AuthResponse>()?.into();
        {
            let session = self.session.lock().await;
            if session.generation() != generation {
                info!("Session changed while refreshing, discarding new tokens");
                return Err(AuthError::SessionEnded);
            }
            session.save(&credentials)?;
        }

        debug!("Session refreshed");
        self.emit(SessionEvent::Refreshed);
        Ok(credentials)
    }

    /// Obtain a usable access token after `rejected`, sent under `generation`,
    /// drew a 401.
    ///
    /// If another request refreshed while this one waited for the gate, the
    /// token it stored is reused instead of spending the rotated refresh token
    /// a second time. If the session was signed out in the meantime, including
    /// by a failed refresh of another request, this fails with `SessionEnded`
    /// without a refresh call or another navigation event.
    ///
    /// A failed refresh signs out before the gate is released.
    async fn refresh_after_rejection(
        &self,
        rejected: Option<&str>,
        generation: u64,
    ) -> Result<String, AuthError> {
        let _gate = self.refresh_gate.lock().await;

        let (current, current_generation) = self.bearer_snapshot().await;
        if current_generation != generation {
            debug!("Session changed while waiting to refresh");
            return current.ok_or(AuthError::SessionEnded);
        }
        if let Some(current) = current {
            if rejected != Some(current.as_str()) {
                debug!("Session already refreshed by a concurrent request");
                return Ok(current);
            }
        }

        match self.refresh_locked(generation).await {
            Ok(credentials) => Ok(credentials.access_token),
            Err(AuthError::SessionEnded) => {
                // A sign-in during the refresh wins; after a sign-out there is no token
                self.bearer_snapshot().await.0.ok_or(AuthError::SessionEnded)
            }
            Err(e) => {
                if e.ends_session() {
                    info!(error = %e, "Refresh token no longer valid, signing out");
                } else {
                    warn!(error = %e, "Session refresh failed, signing out");
                }
                self.logout(true).await;
                Err(e)
            }
        }
    }

    // =========================================================================
    // Authenticated requests
    // =========================================================================

    /// Send `method path` with an optional JSON body through the session pipeline.
    pub async fn authenticated_request(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<ApiResponse, RequestError> {
        self.send(ApiRequest::new(method, path).with_body(body)).await
    }

    /// Like `authenticated_request`, with query parameters.
    pub async fn authenticated_request_with_query(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<serde_json::Value>,
    ) -> Result<ApiResponse, RequestError> {
        let request = query
            .iter()
            .fold(ApiRequest::new(method, path), |req, (key, value)| {
                req.with_query(key, value)
            })
            .with_body(body);
        self.send(request).await
    }

    /// Send `request` with bearer attachment and at most one refresh-and-retry.
    ///
    /// Non-401 responses, a 401 from the refresh endpoint, and the response to
    /// the retried send are returned as-is whatever their status. Transport
    /// failures (including timeouts) are returned without refreshing. When the
    /// session cannot be refreshed the error is `SessionExpired`, and the
    /// stored credentials are already cleared.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, RequestError> {
        let (mut bearer, generation) = self.bearer_snapshot().await;
        let mut retried = false;

        loop {
            let outbound = attach_bearer(&request, bearer.take());
            let response = self.transport.send(&outbound).await?;

            match retry_decision(&response, &outbound, retried) {
                RetryDecision::Return => return Ok(response),
                RetryDecision::Refresh => {
                    retried = true;
                    debug!(path = %request.path, "Access token rejected, refreshing session");

                    match self
                        .refresh_after_rejection(outbound.bearer_token(), generation)
                        .await
                    {
                        Ok(token) => bearer = Some(token),
                        Err(e) => return Err(RequestError::SessionExpired(Box::new(e))),
                    }
                }
            }
        }
    }

    /// Whether the stored access token is accepted by the backend right now.
    ///
    /// Probes `GET /auth/me`; any failure, including an unrecoverable refresh,
    /// reads as not authenticated.
    pub async fn is_authenticated(&self) -> bool {
        if !self.has_access_token().await {
            return false;
        }
        match self.send(ApiRequest::get(paths::AUTH_ME)).await {
            Ok(response) => response.is_success(),
            Err(e) => {
                debug!(error = %e, "Authentication probe failed");
                false
            }
        }
    }
}
