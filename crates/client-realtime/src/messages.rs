//! Hub protocol messages.

use serde::{Deserialize, Serialize};

/// Hub message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HubMessageType {
    // Connection
    Auth,
    AuthResult,
    Error,

    // Group membership
    JoinGroup,
    LeaveGroup,
    Joined,
    Left,

    // Pushed content
    Notification,
    DashboardDelta,

    Heartbeat,
}

/// A message sent to/from the hub.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HubMessage {
    #[serde(rename = "type")]
    pub msg_type: HubMessageType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
}

impl HubMessage {
    /// Create a new hub message.
    pub fn new(msg_type: HubMessageType) -> Self {
        Self {
            msg_type,
            group: None,
            payload: None,
            timestamp: Some(chrono::Utc::now().to_rfc3339()),
            error: None,
            success: None,
        }
    }

    /// Create an AUTH message carrying the bearer token.
    pub fn auth(access_token: &str) -> Self {
        Self {
            msg_type: HubMessageType::Auth,
            group: None,
            payload: Some(serde_json::json!({
                "accessToken": access_token,
            })),
            timestamp: Some(chrono::Utc::now().to_rfc3339()),
            error: None,
            success: None,
        }
    }

    /// Create a JOIN_GROUP message.
    pub fn join_group(group: &str) -> Self {
        Self {
            msg_type: HubMessageType::JoinGroup,
            group: Some(group.to_string()),
            payload: None,
            timestamp: Some(chrono::Utc::now().to_rfc3339()),
            error: None,
            success: None,
        }
    }

    /// Create a LEAVE_GROUP message.
    pub fn leave_group(group: &str) -> Self {
        Self {
            msg_type: HubMessageType::LeaveGroup,
            group: Some(group.to_string()),
            payload: None,
            timestamp: Some(chrono::Utc::now().to_rfc3339()),
            error: None,
            success: None,
        }
    }

    /// Create a HEARTBEAT message.
    pub fn heartbeat() -> Self {
        Self::new(HubMessageType::Heartbeat)
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Auth result payload.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResultPayload {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Name of the user-specific group a session subscribes to.
pub fn user_group(user_id: &str) -> String {
    format!("user:{}", user_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_message() {
        let msg = HubMessage::auth("token123");
        let json = msg.to_json().unwrap();

        assert!(json.contains("\"type\":\"AUTH\""));
        assert!(json.contains("\"accessToken\":\"token123\""));
    }

    #[test]
    fn test_join_group_message() {
        let msg = HubMessage::join_group("user:abc");
        let json = msg.to_json().unwrap();

        assert!(json.contains("\"type\":\"JOIN_GROUP\""));
        assert!(json.contains("\"group\":\"user:abc\""));
    }

    #[test]
    fn test_leave_group_message() {
        let msg = HubMessage::leave_group("user:abc");
        let json = msg.to_json().unwrap();

        assert!(json.contains("\"type\":\"LEAVE_GROUP\""));
        assert!(msg.timestamp.is_some());
    }

    #[test]
    fn test_heartbeat_message() {
        let msg = HubMessage::heartbeat();
        let json = msg.to_json().unwrap();

        assert!(json.contains("\"type\":\"HEARTBEAT\""));
    }

    #[test]
    fn test_deserialize_auth_result() {
        let json = r#"{"type":"AUTH_RESULT","success":true}"#;
        let msg: HubMessage = serde_json::from_str(json).unwrap();

        assert_eq!(msg.msg_type, HubMessageType::AuthResult);
        assert_eq!(msg.success, Some(true));
    }

    #[test]
    fn test_deserialize_joined_with_group() {
        let json = r#"{"type":"JOINED","group":"user:abc","success":true}"#;
        let msg: HubMessage = serde_json::from_str(json).unwrap();

        assert_eq!(msg.msg_type, HubMessageType::Joined);
        assert_eq!(msg.group.as_deref(), Some("user:abc"));
    }

    #[test]
    fn test_message_error_field() {
        let json = r#"{"type":"ERROR","error":"Something went wrong"}"#;
        let msg: HubMessage = serde_json::from_str(json).unwrap();

        assert_eq!(msg.msg_type, HubMessageType::Error);
        assert_eq!(msg.error, Some("Something went wrong".to_string()));
    }

    #[test]
    fn test_message_type_names() {
        let types = vec![
            (HubMessageType::Auth, "AUTH"),
            (HubMessageType::AuthResult, "AUTH_RESULT"),
            (HubMessageType::Error, "ERROR"),
            (HubMessageType::JoinGroup, "JOIN_GROUP"),
            (HubMessageType::LeaveGroup, "LEAVE_GROUP"),
            (HubMessageType::Joined, "JOINED"),
            (HubMessageType::Left, "LEFT"),
            (HubMessageType::Notification, "NOTIFICATION"),
            (HubMessageType::DashboardDelta, "DASHBOARD_DELTA"),
            (HubMessageType::Heartbeat, "HEARTBEAT"),
        ];

        for (msg_type, expected_name) in types {
            let msg = HubMessage::new(msg_type);
            let json = msg.to_json().unwrap();
            assert!(
                json.contains(&format!("\"type\":\"{}\"", expected_name)),
                "Expected type {} in JSON",
                expected_name
            );
        }
    }

    #[test]
    fn test_message_roundtrip() {
        let original = HubMessage::auth("my-token");
        let json = original.to_json().unwrap();
        let parsed = HubMessage::from_json(&json).unwrap();

        assert_eq!(parsed.msg_type, HubMessageType::Auth);
        assert!(parsed.payload.is_some());
    }

    #[test]
    fn test_auth_result_payload_deserialize() {
        let json = r#"{"success":false,"error":"Invalid token"}"#;
        let result: AuthResultPayload = serde_json::from_str(json).unwrap();

        assert!(!result.success);
        assert_eq!(result.error, Some("Invalid token".to_string()));
    }

    #[test]
    fn test_user_group_name() {
        assert_eq!(user_group("abc-123"), "user:abc-123");
    }
}
