//! Error types for API access and credential storage.

use reqwest::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

/// Result of an API call.
pub type ClientResult<T> = Result<T, ClientError>;

/// Failures talking to the Ledgerly API.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server responded with {status}: {}", .message.as_deref().unwrap_or("no details"))]
    Status {
        status: StatusCode,
        message: Option<String>,
    },

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid endpoint `{path}`: {source}")]
    Endpoint {
        path: String,
        #[source]
        source: url::ParseError,
    },
}

impl ClientError {
    /// Message suitable for the session's `error` field.
    ///
    /// Prefers the server's own explanation and otherwise falls back to the
    /// caller's generic message, so transport details never reach the UI.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Status {
                message: Some(message),
                ..
            } => message.clone(),
            _ => fallback.to_string(),
        }
    }

    /// HTTP status, when the server answered at all.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(err) => err.status(),
            _ => None,
        }
    }
}

/// Failures reading or writing the persisted credential.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access credential file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("credential file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_prefers_server_text() {
        let err = ClientError::Status {
            status: StatusCode::UNAUTHORIZED,
            message: Some("Invalid credentials".to_string()),
        };
        assert_eq!(err.user_message("Login failed"), "Invalid credentials");
        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn user_message_falls_back() {
        let err = ClientError::Status {
            status: StatusCode::BAD_GATEWAY,
            message: None,
        };
        assert_eq!(err.user_message("Login failed"), "Login failed");

        let decode = serde_json::from_str::<u8>("x").unwrap_err();
        assert_eq!(
            ClientError::from(decode).user_message("Failed to load user"),
            "Failed to load user"
        );
    }

    #[test]
    fn status_display_without_message() {
        let err = ClientError::Status {
            status: StatusCode::NOT_FOUND,
            message: None,
        };
        assert_eq!(err.to_string(), "server responded with 404 Not Found: no details");
    }
}
