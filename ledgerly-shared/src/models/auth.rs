use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::UserProfile;

/// How the active credential was obtained.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    /// Email and password against the API.
    #[default]
    Local,
    /// Google OAuth redirect flow.
    Google,
}

impl AuthType {
    /// Return the canonical string representation written to storage.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Google => "google",
        }
    }
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthType {
    type Err = &'static str;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "local" => Ok(Self::Local),
            "google" => Ok(Self::Google),
            _ => Err("unknown auth type"),
        }
    }
}

/// Body of `POST /auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginRequest {
    /// The user's email address.
    pub email: String,

    /// The user's password.
    pub password: String,
}

/// Body of `POST /auth/register`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegisterRequest {
    /// Display name for the new account.
    pub name: String,

    /// The user's email address.
    pub email: String,

    /// The user's password.
    pub password: String,
}

/// Successful login or registration payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthResponse {
    /// Profile of the authenticated user.
    pub user: UserProfile,

    /// Bearer token for subsequent requests.
    pub token: String,

    /// Optional human-readable status from the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Payload of `GET /auth/profile`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfileResponse {
    /// Profile of the user owning the bearer token.
    pub user: UserProfile,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn auth_type_roundtrip() {
        for (text, auth_type) in [("local", AuthType::Local), ("google", AuthType::Google)] {
            assert_eq!(auth_type.as_str(), text);
            assert_eq!(auth_type.to_string(), text);
            assert_eq!(AuthType::from_str(text).unwrap(), auth_type);
        }
    }

    #[test]
    fn auth_type_invalid() {
        assert!(AuthType::from_str("github").is_err());
    }

    #[test]
    fn auth_type_defaults_to_local() {
        assert_eq!(AuthType::default(), AuthType::Local);
    }

    #[test]
    fn auth_type_serializes_lowercase() {
        assert_eq!(serde_json::to_value(AuthType::Google).unwrap(), json!("google"));
    }

    #[test]
    fn auth_response_without_message() {
        let body = json!({ "user": { "id": 1, "name": "A" }, "token": "t1" });
        let response: AuthResponse = serde_json::from_value(body).unwrap();

        assert_eq!(response.token, "t1");
        assert_eq!(response.user.name(), Some("A"));
        assert!(response.message.is_none());
    }

    #[test]
    fn register_request_shape() {
        let request = RegisterRequest {
            name: "Asha".to_string(),
            email: "asha@example.com".to_string(),
            password: "hunter22".to_string(),
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({ "name": "Asha", "email": "asha@example.com", "password": "hunter22" })
        );
    }
}
