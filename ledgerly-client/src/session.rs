//! The session record and its status view.

use shared::models::{AuthType, UserProfile};

use crate::token_store::StoredCredential;

/// Client-side record of authentication status.
///
/// `token.is_some()` is what "signed in" means; `user` can lag behind it while
/// a profile fetch is outstanding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    /// Profile of the signed-in user, once loaded.
    pub user: Option<UserProfile>,
    /// Bearer token sent with API requests.
    pub token: Option<String>,
    /// How `token` was obtained. `Local` when signed out.
    pub auth_type: AuthType,
    /// An operation is in flight.
    pub loading: bool,
    /// Message from the last failed operation.
    pub error: Option<String>,
}

/// Coarse view of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Unauthenticated,
    Loading,
    Authenticated,
    /// Signed out after a failure; `error` holds the reason.
    Error,
}

impl Session {
    /// Signed out, idle, no error.
    #[must_use]
    pub fn unauthenticated() -> Self {
        Self::default()
    }

    /// Starting state of a client: whatever was persisted, still loading.
    #[must_use]
    pub fn restore(credential: Option<StoredCredential>) -> Self {
        let (token, auth_type) = match credential {
            Some(credential) => (Some(credential.token), credential.auth_type),
            None => (None, AuthType::Local),
        };
        Self {
            user: None,
            token,
            auth_type,
            loading: true,
            error: None,
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        if self.loading {
            SessionStatus::Loading
        } else if self.token.is_some() {
            SessionStatus::Authenticated
        } else if self.error.is_some() {
            SessionStatus::Error
        } else {
            SessionStatus::Unauthenticated
        }
    }

    /// The persisted form of this session, if it holds a credential.
    #[must_use]
    pub fn credential(&self) -> Option<StoredCredential> {
        self.token
            .as_ref()
            .map(|token| StoredCredential::new(token.clone(), self.auth_type))
    }
}
