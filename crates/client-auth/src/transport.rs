//! Ports the session manager consumes.
//!
//! The HTTP client itself lives elsewhere; the session manager only needs
//! "send login/refresh/logout, get back token + user + expiry" plus a hook
//! to push the current bearer token into the shared request headers.

use crate::AuthResult;
use async_trait::async_trait;
use client_storage::UserRecord;
use serde::Deserialize;

/// Token response returned by the login and refresh endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub user: Option<UserRecord>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Access-token lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// Acknowledgment from the best-effort logout endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct LogoutResponse {
    pub success: bool,
}

/// Async transport the session manager drives for credential exchange.
#[async_trait]
pub trait AuthTransport: Send + Sync {
    async fn login(&self, username: &str, password: &str) -> AuthResult<AuthResponse>;

    async fn refresh(&self, refresh_token: &str) -> AuthResult<AuthResponse>;

    async fn logout(&self) -> AuthResult<LogoutResponse>;
}

/// Single point that sets/clears the bearer header used by outbound REST
/// calls. Called by the session manager after every access-token change.
pub trait TokenBinder: Send + Sync {
    fn set_auth_token(&self, token: Option<&str>);
}

#[cfg(test)]
mod tests {
    use super::*;
    use client_storage::UserRole;

    #[test]
    fn test_auth_response_deserializes_camel_case() {
        let json = r#"{
            "success": true,
            "user": {"id": "u-1", "username": "bob", "role": "collaborator"},
            "accessToken": "at-1",
            "refreshToken": "rt-1",
            "expiresIn": 3600
        }"#;

        let response: AuthResponse = serde_json::from_str(json).unwrap();
        assert!(response.success);
        assert_eq!(response.access_token.as_deref(), Some("at-1"));
        assert_eq!(response.refresh_token.as_deref(), Some("rt-1"));
        assert_eq!(response.expires_in, Some(3600));
        assert_eq!(response.user.unwrap().role, UserRole::Collaborator);
    }

    #[test]
    fn test_auth_response_failure_shape() {
        let json = r#"{"success": false, "message": "Invalid username or password"}"#;

        let response: AuthResponse = serde_json::from_str(json).unwrap();
        assert!(!response.success);
        assert_eq!(
            response.message.as_deref(),
            Some("Invalid username or password")
        );
        assert!(response.user.is_none());
        assert!(response.access_token.is_none());
    }
}
