//! Completion of the Google OAuth redirect.
//!
//! The backend sends the browser to `/oauth/callback` with either a `token` or
//! an `error` query parameter; [`OAuthCallbackHandler`] turns that into a
//! session and a navigation.

use std::{
    borrow::Cow,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    auth::{AuthController, AuthOutcome},
    navigation::{Navigator, Notifier, Route},
};

const PROVIDER_ERROR_MESSAGE: &str = "Google authentication failed. Please try again.";
const MISSING_TOKEN_MESSAGE: &str = "No authentication token received.";
const GENERIC_FAILURE_MESSAGE: &str = "Authentication failed. Please try again.";

/// `token` and `error` query parameters of the OAuth redirect.
///
/// Empty values are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    pub token: Option<String>,
    pub error: Option<String>,
}

impl CallbackParams {
    #[must_use]
    pub fn from_url(url: &Url) -> Self {
        Self::from_pairs(url.query_pairs())
    }

    /// Parse a raw query string, with or without the leading `?`.
    #[must_use]
    pub fn from_query(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        Self::from_pairs(url::form_urlencoded::parse(query.as_bytes()))
    }

    fn from_pairs<'a>(pairs: impl Iterator<Item = (Cow<'a, str>, Cow<'a, str>)>) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs {
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                "token" if params.token.is_none() => params.token = Some(value.into_owned()),
                "error" if params.error.is_none() => params.error = Some(value.into_owned()),
                _ => {}
            }
        }
        params
    }
}

/// How a callback visit ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Session established; the user was sent home.
    Authenticated,
    /// The provider reported an error; no request was made.
    ProviderError(String),
    MissingToken,
    /// The backend rejected the token or could not be reached.
    Failed(String),
    /// This handler already ran.
    AlreadyHandled,
}

/// Completes an OAuth sign-in from the redirect URL. Runs once per instance.
pub struct OAuthCallbackHandler {
    auth: Arc<AuthController>,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
    handled: AtomicBool,
}

impl std::fmt::Debug for OAuthCallbackHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthCallbackHandler")
            .field("handled", &self.handled.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl OAuthCallbackHandler {
    pub fn new(
        auth: Arc<AuthController>,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            auth,
            navigator,
            notifier,
            handled: AtomicBool::new(false),
        }
    }

    pub async fn handle(&self, params: CallbackParams) -> CallbackOutcome {
        if self.handled.swap(true, Ordering::SeqCst) {
            debug!("oauth callback already handled");
            return CallbackOutcome::AlreadyHandled;
        }

        if let Some(error) = params.error {
            warn!(%error, "oauth provider returned an error");
            self.fail(PROVIDER_ERROR_MESSAGE);
            return CallbackOutcome::ProviderError(error);
        }

        let Some(token) = params.token else {
            warn!("oauth callback carried no token");
            self.fail(MISSING_TOKEN_MESSAGE);
            return CallbackOutcome::MissingToken;
        };

        match self.auth.process_oauth_login(&token).await {
            AuthOutcome::Success => {
                info!("oauth sign-in complete");
                self.navigator.navigate(Route::Home);
                CallbackOutcome::Authenticated
            }
            AuthOutcome::Failed(message) => {
                self.fail(&message);
                CallbackOutcome::Failed(message)
            }
            AuthOutcome::Superseded => {
                self.fail(GENERIC_FAILURE_MESSAGE);
                CallbackOutcome::Failed(GENERIC_FAILURE_MESSAGE.to_string())
            }
        }
    }

    fn fail(&self, message: &str) {
        let message = if message.trim().is_empty() {
            GENERIC_FAILURE_MESSAGE
        } else {
            message
        };
        self.notifier.notify_error(message);
        self.navigator.navigate(Route::Login);
    }
}
