//! Raw HTTP transport.
//!
//! `Transport` is the bottom of the request pipeline: it sends exactly one
//! request and buffers the response body. Bearer attachment and the
//! refresh-and-retry policy are layered on top by the session client, so a
//! transport never inspects status codes or touches stored credentials.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::paths;
use super::RequestError;

/// An outbound call. Cloned when it has to be resent after a refresh.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    pub bearer: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            bearer: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn with_query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn with_body(mut self, body: Option<serde_json::Value>) -> Self {
        self.body = body;
        self
    }

    /// Serialize `body` as the JSON payload.
    pub fn with_json<B: Serialize>(self, body: &B) -> Result<Self, RequestError> {
        let value = serde_json::to_value(body)
            .map_err(|e| RequestError::InvalidResponse(format!("Failed to encode request: {}", e)))?;
        Ok(self.with_body(Some(value)))
    }

    pub fn with_bearer(mut self, token: Option<String>) -> Self {
        self.bearer = token;
        self
    }

    pub fn bearer_token(&self) -> Option<&str> {
        self.bearer.as_deref()
    }

    /// Whether this request targets the token refresh endpoint.
    pub fn is_refresh_call(&self) -> bool {
        self.path.trim_end_matches('/') == paths::AUTH_REFRESH
    }
}

/// A fully buffered response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == StatusCode::UNAUTHORIZED
    }

    /// Turn a non-success status into the matching `RequestError`.
    pub fn error_for_status(self) -> Result<Self, RequestError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(RequestError::from_status(self.status, &self.body))
        }
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, RequestError> {
        serde_json::from_str(&self.body).map_err(|e| {
            RequestError::InvalidResponse(format!("Failed to parse JSON response: {}", e))
        })
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, RequestError>;
}

/// reqwest-backed transport.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RequestError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, RequestError> {
        let url = self.url(&request.path);

        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .header(header::ACCEPT, "application/json");

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(ref token) = request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        debug!(
            method = %request.method,
            path = %request.path,
            status = status.as_u16(),
            authenticated = request.bearer.is_some(),
            "Response received"
        );

        Ok(ApiResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    #[test]
    fn test_is_refresh_call() {
        assert!(ApiRequest::post("/auth/refresh").is_refresh_call());
        assert!(ApiRequest::post("/auth/refresh/").is_refresh_call());
        assert!(!ApiRequest::post("/auth/login").is_refresh_call());
        assert!(!ApiRequest::get("/favorites/").is_refresh_call());
    }

    #[test]
    fn test_error_for_status() {
        let ok = ApiResponse::new(StatusCode::OK, "true");
        assert!(ok.error_for_status().is_ok());

        let denied = ApiResponse::new(StatusCode::UNAUTHORIZED, r#"{"detail":"expired"}"#);
        assert!(matches!(
            denied.error_for_status(),
            Err(RequestError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_http_transport_sends_bearer_query_and_body() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/favorites/toggle")
            .match_query(Matcher::UrlEncoded("place_id".into(), "p123".into()))
            .match_header("authorization", "Bearer A1")
            .match_body(Matcher::Json(serde_json::json!({"note": "x"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("true")
            .create_async()
            .await;

        let transport = HttpTransport::new(server.url(), Duration::from_secs(5)).unwrap();
        let request = ApiRequest::post("/favorites/toggle")
            .with_query("place_id", "p123")
            .with_bearer(Some("A1".to_string()))
            .with_body(Some(serde_json::json!({"note": "x"})));

        let response = transport.send(&request).await.unwrap();
        assert!(response.is_success());
        assert!(response.json::<bool>().unwrap());

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_transport_returns_error_statuses_as_responses() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/auth/me")
            .with_status(401)
            .with_body(r#"{"detail":"Not authenticated"}"#)
            .create_async()
            .await;

        let transport = HttpTransport::new(format!("{}/", server.url()), Duration::from_secs(5)).unwrap();
        let response = transport.send(&ApiRequest::get("/auth/me")).await.unwrap();
        assert!(response.is_unauthorized());
    }

    #[tokio::test]
    async fn test_http_transport_timeout_maps_to_timeout() {
        // The kernel completes the handshake but nothing ever reads or answers.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        let transport = HttpTransport::new(url, Duration::from_millis(100)).unwrap();
        let err = transport.send(&ApiRequest::get("/favorites/")).await.unwrap_err();
        assert!(matches!(err, RequestError::Timeout), "{err:?}");
        assert!(err.is_transport_failure());
    }

    #[tokio::test]
    async fn test_http_transport_connection_failure_is_network_error() {
        // Nothing listens on port 9 of localhost in the test environment.
        let transport = HttpTransport::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let err = transport.send(&ApiRequest::get("/auth/me")).await.unwrap_err();
        assert!(err.is_transport_failure());
    }
}
