//! Session transitions.
//!
//! [`reduce`] is the only code that builds a new [`Session`] from an old one.

use shared::models::{AuthType, UserProfile};

use crate::session::Session;

/// Why a profile load ended without a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadFailure {
    /// Nothing to load: no credential was persisted. Not an error.
    NoSession,
    /// The profile request failed.
    FetchFailed(String),
}

/// Every way a session can change.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    LoginStart,
    RegisterStart,
    LoginSuccess {
        user: UserProfile,
        token: String,
    },
    RegisterSuccess {
        user: UserProfile,
        token: String,
    },
    OAuthLoginSuccess {
        user: UserProfile,
        token: String,
        auth_type: AuthType,
    },
    LoginFailure(String),
    RegisterFailure(String),
    Logout,
    LoadUserSuccess(UserProfile),
    LoadUserFailure(LoadFailure),
    ClearError,
}

impl Transition {
    /// Stable name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::LoginStart => "login_start",
            Self::RegisterStart => "register_start",
            Self::LoginSuccess { .. } => "login_success",
            Self::RegisterSuccess { .. } => "register_success",
            Self::OAuthLoginSuccess { .. } => "oauth_login_success",
            Self::LoginFailure(_) => "login_failure",
            Self::RegisterFailure(_) => "register_failure",
            Self::Logout => "logout",
            Self::LoadUserSuccess(_) => "load_user_success",
            Self::LoadUserFailure(_) => "load_user_failure",
            Self::ClearError => "clear_error",
        }
    }
}

/// Apply `transition` to `session`.
#[must_use]
pub fn reduce(session: Session, transition: Transition) -> Session {
    match transition {
        Transition::LoginStart | Transition::RegisterStart => Session {
            loading: true,
            error: None,
            ..session
        },
        Transition::LoginSuccess { user, token } | Transition::RegisterSuccess { user, token } => {
            established(user, token, AuthType::Local)
        }
        Transition::OAuthLoginSuccess {
            user,
            token,
            auth_type,
        } => established(user, token, auth_type),
        Transition::LoginFailure(message) | Transition::RegisterFailure(message) => Session {
            user: None,
            token: None,
            loading: false,
            error: Some(message),
            ..session
        },
        Transition::Logout => Session::unauthenticated(),
        Transition::LoadUserSuccess(_) if session.token.is_none() => session,
        Transition::LoadUserSuccess(user) => Session {
            user: Some(user),
            loading: false,
            error: None,
            ..session
        },
        Transition::LoadUserFailure(failure) => Session {
            user: None,
            token: None,
            loading: false,
            error: match failure {
                LoadFailure::NoSession => None,
                LoadFailure::FetchFailed(message) => Some(message),
            },
            ..session
        },
        Transition::ClearError => Session {
            error: None,
            ..session
        },
    }
}

fn established(user: UserProfile, token: String, auth_type: AuthType) -> Session {
    Session {
        user: Some(user),
        token: Some(token),
        auth_type,
        loading: false,
        error: None,
    }
}
