//! In-process stand-in for the cafespot backend, used by unit tests.
//!
//! Tokens are issued as `A<n>`/`R<n>` with `n` counting up from 1, and
//! refresh tokens rotate on every use, like the real backend.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use tokio::sync::Notify;

use crate::api::{paths, ApiRequest, ApiResponse, RequestError, Transport};

const CATALOG: [(&str, &str, f64); 3] = [
    ("p123", "Kahve Durağı", 4.6),
    ("p456", "Moda Roasters", 4.4),
    ("p789", "Bean There", 3.9),
];

struct Account {
    password: String,
    name: String,
}

#[derive(Default)]
struct State {
    users: HashMap<String, Account>,
    generation: u32,
    /// access token -> email
    access_tokens: HashMap<String, String>,
    /// live refresh token -> email
    refresh_tokens: HashMap<String, String>,
    favorites: HashMap<String, HashSet<String>>,
    reject_refresh: bool,
    denied_paths: HashSet<String>,
    timeout_paths: HashSet<String>,
    holds: HashMap<String, Arc<PathHold>>,
    sent: Vec<ApiRequest>,
}

/// Parks one request until the test lets it go.
#[derive(Default)]
pub(crate) struct PathHold {
    /// Notified once the held request has been received.
    pub reached: Notify,
    /// Notify to let the held request be answered.
    pub release: Notify,
}

pub(crate) struct FakeBackend {
    state: Mutex<State>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(State::default()),
        })
    }

    pub fn with_user(email: &str, password: &str, name: &str) -> Arc<Self> {
        let backend = Self::new();
        backend.state().users.insert(
            email.to_string(),
            Account {
                password: password.to_string(),
                name: name.to_string(),
            },
        );
        backend
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Invalidate every access token issued so far.
    pub fn expire_access_tokens(&self) {
        self.state().access_tokens.clear();
    }

    /// Refuse all refresh requests from now on.
    pub fn reject_refresh(&self) {
        self.state().reject_refresh = true;
    }

    /// Answer 401 on `path` whatever token is presented.
    pub fn deny_path(&self, path: &str) {
        self.state().denied_paths.insert(path.to_string());
    }

    pub fn time_out_path(&self, path: &str) {
        self.state().timeout_paths.insert(path.to_string());
    }

    /// Park the next request to `path` after it is recorded and before it is
    /// answered.
    pub fn hold_path(&self, path: &str) -> Arc<PathHold> {
        let hold = Arc::new(PathHold::default());
        self.state().holds.insert(path.to_string(), hold.clone());
        hold
    }

    pub fn sent(&self) -> Vec<ApiRequest> {
        self.state().sent.clone()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.state().sent.iter().filter(|r| r.path == path).count()
    }

    /// Refresh tokens presented to the refresh endpoint, in order.
    pub fn refresh_tokens_presented(&self) -> Vec<String> {
        self.state()
            .sent
            .iter()
            .filter(|r| r.path == paths::AUTH_REFRESH)
            .filter_map(|r| r.body.as_ref()?.get("refresh_token")?.as_str().map(str::to_string))
            .collect()
    }
}

#[async_trait]
impl Transport for FakeBackend {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, RequestError> {
        let hold = {
            let mut state = self.state();
            state.sent.push(request.clone());
            state.holds.remove(&request.path)
        };
        if let Some(hold) = hold {
            hold.reached.notify_one();
            hold.release.notified().await;
        }
        // Let concurrent requests interleave the way real I/O would.
        tokio::task::yield_now().await;
        let mut state = self.state();
        respond(&mut state, request)
    }
}

fn ok(body: Value) -> ApiResponse {
    ApiResponse::new(StatusCode::OK, body.to_string())
}

fn fail(status: StatusCode, detail: &str) -> ApiResponse {
    ApiResponse::new(status, json!({ "detail": detail }).to_string())
}

fn body_str<'a>(request: &'a ApiRequest, key: &str) -> Option<&'a str> {
    request.body.as_ref()?.get(key)?.as_str()
}

fn query<'a>(request: &'a ApiRequest, key: &str) -> Option<&'a str> {
    request
        .query
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn cafe_json(id: &str, name: &str, rating: f64) -> Value {
    json!({ "id": id, "name": name, "rating": rating, "business_status": "OPERATIONAL" })
}

fn cafe_list<'a>(ids: impl Iterator<Item = &'a (&'a str, &'a str, f64)>) -> Value {
    let cafes: Vec<Value> = ids.map(|(id, name, rating)| cafe_json(id, name, *rating)).collect();
    json!({ "total": cafes.len(), "cafes": cafes })
}

fn issue(state: &mut State, email: &str) -> Value {
    state.generation += 1;
    let access = format!("A{}", state.generation);
    let refresh = format!("R{}", state.generation);
    state.access_tokens.insert(access.clone(), email.to_string());
    state.refresh_tokens.insert(refresh.clone(), email.to_string());
    let name = state.users.get(email).map(|a| a.name.clone()).unwrap_or_default();
    json!({ "access_token": access, "refresh_token": refresh, "user_name": name })
}

/// Email of the caller if the request is authorized.
fn caller(state: &State, request: &ApiRequest) -> Option<String> {
    if state.denied_paths.contains(&request.path) {
        return None;
    }
    state.access_tokens.get(request.bearer_token()?).cloned()
}

fn respond(state: &mut State, request: &ApiRequest) -> Result<ApiResponse, RequestError> {
    if state.timeout_paths.contains(&request.path) {
        return Err(RequestError::Timeout);
    }

    let unauthorized = || fail(StatusCode::UNAUTHORIZED, "Could not validate credentials");

    let response = match (request.method.as_str(), request.path.as_str()) {
        ("POST", paths::AUTH_LOGIN) => {
            let email = body_str(request, "email").unwrap_or_default().to_string();
            let password = body_str(request, "password").unwrap_or_default();
            let valid = state
                .users
                .get(&email)
                .map(|account| account.password == password)
                .unwrap_or(false);
            if valid {
                ok(issue(state, &email))
            } else {
                fail(StatusCode::UNAUTHORIZED, "Incorrect email or password")
            }
        }
        ("POST", paths::AUTH_REGISTER) => {
            let email = body_str(request, "email").unwrap_or_default().to_string();
            if state.users.contains_key(&email) {
                fail(StatusCode::BAD_REQUEST, "Email already registered")
            } else {
                let account = Account {
                    password: body_str(request, "password").unwrap_or_default().to_string(),
                    name: body_str(request, "name").unwrap_or_default().to_string(),
                };
                state.users.insert(email.clone(), account);
                ok(issue(state, &email))
            }
        }
        ("POST", paths::AUTH_REFRESH) => {
            let presented = body_str(request, "refresh_token").unwrap_or_default().to_string();
            match state.refresh_tokens.remove(&presented) {
                Some(email) if !state.reject_refresh => ok(issue(state, &email)),
                Some(email) => {
                    state.refresh_tokens.insert(presented, email);
                    fail(StatusCode::UNAUTHORIZED, "Invalid refresh token")
                }
                None => fail(StatusCode::UNAUTHORIZED, "Invalid refresh token"),
            }
        }
        ("GET", paths::AUTH_ME) => match caller(state, request) {
            Some(email) => {
                let name = state.users.get(&email).map(|a| a.name.clone()).unwrap_or_default();
                ok(json!({ "user_id": format!("u-{}", email), "email": email, "name": name }))
            }
            None => unauthorized(),
        },
        ("PATCH", paths::AUTH_CHANGE_PASSWORD) => match caller(state, request) {
            Some(email) => {
                let current = body_str(request, "current_password").unwrap_or_default();
                let new = body_str(request, "new_password").unwrap_or_default().to_string();
                match state.users.get_mut(&email) {
                    Some(account) if account.password == current => {
                        account.password = new;
                        ok(json!({ "message": "Password changed" }))
                    }
                    // The backend reports a wrong current password as 401
                    _ => fail(StatusCode::UNAUTHORIZED, "Current password is incorrect"),
                }
            }
            None => unauthorized(),
        },
        ("POST", paths::SEARCH) => {
            let needle = body_str(request, "query").unwrap_or_default().to_lowercase();
            ok(cafe_list(
                CATALOG
                    .iter()
                    .filter(|(_, name, _)| name.to_lowercase().contains(&needle)),
            ))
        }
        ("GET", paths::SEARCH_TOP_PLACES) => ok(cafe_list(CATALOG.iter())),
        ("GET", paths::FAVORITES) => match caller(state, request) {
            Some(email) => {
                let favorites = state.favorites.get(&email).cloned().unwrap_or_default();
                ok(cafe_list(
                    CATALOG.iter().filter(|(id, _, _)| favorites.contains(*id)),
                ))
            }
            None => unauthorized(),
        },
        ("POST", paths::FAVORITES_TOGGLE) => match (caller(state, request), query(request, paths::PLACE_ID_PARAM)) {
            (None, _) => unauthorized(),
            (Some(_), None) => fail(StatusCode::UNPROCESSABLE_ENTITY, "place_id is required"),
            (Some(email), Some(place_id)) => {
                let favorites = state.favorites.entry(email).or_default();
                let added = if favorites.remove(place_id) {
                    false
                } else {
                    favorites.insert(place_id.to_string());
                    true
                };
                ok(json!(added))
            }
        },
        ("GET", paths::FAVORITES_CHECK) => match (caller(state, request), query(request, paths::PLACE_ID_PARAM)) {
            (None, _) => unauthorized(),
            (Some(_), None) => fail(StatusCode::UNPROCESSABLE_ENTITY, "place_id is required"),
            (Some(email), Some(place_id)) => {
                let favorite = state
                    .favorites
                    .get(&email)
                    .map(|f| f.contains(place_id))
                    .unwrap_or(false);
                ok(json!(favorite))
            }
        },
        _ => fail(StatusCode::NOT_FOUND, "Not Found"),
    };

    Ok(response)
}
