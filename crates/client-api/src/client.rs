//! HTTP client with bearer-token binding.

use async_trait::async_trait;
use client_auth::{AuthError, AuthResponse, AuthResult, AuthTransport, LogoutResponse, TokenBinder};
use reqwest::StatusCode;
use serde::Serialize;
use std::sync::RwLock;
use std::time::Duration;
use tracing::{debug, warn};

/// API client configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// REST API base URL (e.g., https://api.crewgate.app).
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: client_core::DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: 15,
        }
    }
}

impl ApiConfig {
    /// Derive the API configuration from the loaded client config.
    pub fn from_core(config: &client_core::Config) -> Self {
        Self {
            base_url: config.api_base_url.clone(),
            request_timeout_secs: config.request_timeout_secs,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// REST client for the Crewgate backend.
///
/// Holds the current bearer token behind the `TokenBinder` port; every
/// outbound request picks up whatever the session manager last bound.
pub struct ApiClient {
    config: ApiConfig,
    http_client: reqwest::Client,
    bearer: RwLock<Option<String>>,
}

impl ApiClient {
    /// Create a new API client.
    pub fn new(config: ApiConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
            bearer: RwLock::new(None),
        }
    }

    /// Create with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ApiConfig::default())
    }

    /// Currently bound bearer token, if any.
    pub fn auth_token(&self) -> Option<String> {
        self.bearer.read().unwrap().clone()
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.config.request_timeout_secs)
    }

    fn apply_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.auth_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn post_auth_endpoint<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> AuthResult<AuthResponse> {
        let url = self.endpoint(path);
        debug!(url = %url, "Sending auth request");

        let response = self
            .apply_auth(self.http_client.post(&url))
            .timeout(self.request_timeout())
            .json(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let body = response.text().await.map_err(map_reqwest_error)?;

        auth_response_from_body(status, &body)
    }
}

impl TokenBinder for ApiClient {
    fn set_auth_token(&self, token: Option<&str>) {
        let mut bearer = self.bearer.write().unwrap();
        *bearer = token.map(String::from);
    }
}

#[async_trait]
impl AuthTransport for ApiClient {
    async fn login(&self, username: &str, password: &str) -> AuthResult<AuthResponse> {
        self.post_auth_endpoint("/api/v1/auth/login", &LoginRequest { username, password })
            .await
    }

    async fn refresh(&self, refresh_token: &str) -> AuthResult<AuthResponse> {
        self.post_auth_endpoint("/api/v1/auth/refresh", &RefreshRequest { refresh_token })
            .await
    }

    async fn logout(&self) -> AuthResult<LogoutResponse> {
        let url = self.endpoint("/api/v1/auth/logout");
        debug!(url = %url, "Sending logout notification");

        let response = self
            .apply_auth(self.http_client.post(&url))
            .timeout(self.request_timeout())
            .send()
            .await
            .map_err(map_reqwest_error)?;

        if !response.status().is_success() {
            let status = response.status();
            warn!(status = %status, "Logout notification rejected");
            return Ok(LogoutResponse { success: false });
        }

        let ack = response
            .json::<LogoutResponse>()
            .await
            .unwrap_or(LogoutResponse { success: true });
        Ok(ack)
    }
}

/// Interpret an auth endpoint response.
///
/// The backend reports rejections through the `success` flag in a structured
/// body, on 2xx and 4xx alike; only a body that doesn't parse is a transport
/// failure.
fn auth_response_from_body(status: StatusCode, body: &str) -> AuthResult<AuthResponse> {
    match serde_json::from_str::<AuthResponse>(body) {
        Ok(response) => Ok(response),
        Err(_) if !status.is_success() => Err(AuthError::Transport(format!(
            "HTTP {}: {}",
            status.as_u16(),
            body
        ))),
        Err(err) => Err(AuthError::Transport(format!(
            "Malformed auth response: {}",
            err
        ))),
    }
}

fn map_reqwest_error(err: reqwest::Error) -> AuthError {
    if err.is_timeout() {
        AuthError::Transport("Request timed out".to_string())
    } else {
        AuthError::Transport(err.to_string())
    }
}
