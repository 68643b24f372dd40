//! Ports to whatever hosts the client: page navigation and user-visible
//! notifications.

use std::fmt;
use url::Url;

/// In-app destinations the auth flows send the user to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Dashboard.
    Home,
    Login,
    /// Frontend landing page of the OAuth redirect.
    OAuthCallback,
}

impl Route {
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Home => "/",
            Self::Login => "/login",
            Self::OAuthCallback => "/oauth/callback",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait Navigator: Send + Sync {
    /// Leave the app for `url` (full-page redirect). Nothing is awaited.
    fn redirect_external(&self, url: &Url);

    /// Move to `route`, replacing the current history entry.
    fn navigate(&self, route: Route);
}

#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send + Sync {
    /// Show an error message to the user.
    fn notify_error(&self, message: &str);
}
