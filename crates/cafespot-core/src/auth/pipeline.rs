//! Request decoration and the refresh-and-retry decision.
//!
//! The session client composes these around `Transport::send`:
//! `send = with_auth_retry(with_bearer(raw))`. Both steps are plain functions
//! of their inputs so the policy can be checked without any I/O.

use crate::api::{ApiRequest, ApiResponse};

/// Copy of `request` carrying `token` as its bearer credential.
/// A `None` token sends the request unauthenticated.
pub fn attach_bearer(request: &ApiRequest, token: Option<String>) -> ApiRequest {
    request.clone().with_bearer(token)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Hand the response to the caller as-is.
    Return,
    /// Refresh the session, then resend once.
    Refresh,
}

/// Decide what to do with `response` to `request`.
///
/// Only a 401 to a non-refresh request that has not been retried yet asks
/// for a refresh; everything else, including a second 401, is returned.
pub fn retry_decision(response: &ApiResponse, request: &ApiRequest, retried: bool) -> RetryDecision {
    if response.is_unauthorized() && !retried && !request.is_refresh_call() {
        RetryDecision::Refresh
    } else {
        RetryDecision::Return
    }
}
