/// Notifications published by the session client.
///
/// Presentation code subscribes with `SessionClient::subscribe` and routes
/// the user to the login screen on `NavigateToLogin`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn { display_name: Option<String> },
    Refreshed,
    SignedOut,
    NavigateToLogin,
}
