//! The auth state machine and the operations that drive it.
//!
//! Each operation dispatches [`Transition`]s through one lock; the dispatch
//! that changes the credential also persists it and reconfigures the API
//! client before the lock is released, so storage, headers and the session
//! never disagree once a call returns.
//!
//! A generation counter guards every network result. `login`, `register`,
//! `process_oauth_login` and `logout` advance it, and a response is applied
//! only if the generation it started under is still current.

use shared::{
    config::Config,
    models::{AuthResponse, AuthType, LoginRequest, ProfileResponse, RegisterRequest, UserProfile},
};
use std::{
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    api::ApiClient,
    cache::CacheOptions,
    error::{ClientError, ClientResult},
    navigation::Navigator,
    reducer::{LoadFailure, Transition, reduce},
    session::Session,
    token_store::TokenStore,
};

const LOGIN_ENDPOINT: &str = "auth/login";
const REGISTER_ENDPOINT: &str = "auth/register";
const PROFILE_ENDPOINT: &str = "auth/profile";
const LOGOUT_ENDPOINT: &str = "auth/logout";

const LOGIN_FAILED: &str = "Login failed";
const REGISTRATION_FAILED: &str = "Registration failed";
const LOAD_USER_FAILED: &str = "Failed to load user";
const GOOGLE_AUTH_FAILED: &str = "Google authentication failed";

/// Result of a credential-establishing operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// The session now holds the new credential (or, for logout, none).
    Success,
    /// The request failed; carries the message also stored in the session.
    Failed(String),
    /// A later login or logout started before this one finished; its result was dropped.
    Superseded,
}

impl AuthOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// Result of a profile load.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// The profile was stored in the session.
    Loaded(UserProfile),
    /// Bootstrap found no persisted credential.
    NoSession,
    /// The fetch failed; the credential was discarded.
    Failed(String),
    /// The session changed while the request was in flight; the response was dropped.
    Stale,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Bypass the response cache.
    pub force_refresh: bool,
}

/// Owner of the one [`Session`] of a running client.
pub struct AuthController {
    api: ApiClient,
    store: Arc<dyn TokenStore>,
    navigator: Arc<dyn Navigator>,
    state: watch::Sender<Session>,
    dispatch_lock: Mutex<()>,
    generation: AtomicU64,
    bootstrapped: AtomicBool,
    google_login_url: Url,
    profile_cache_ttl: Duration,
}

impl std::fmt::Debug for AuthController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthController")
            .field("api", &self.api)
            .field("session", &*self.state.borrow())
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl AuthController {
    /// Build a controller from configuration.
    ///
    /// # Errors
    /// Fails if the HTTP client cannot be built or the OAuth entry URL cannot be derived.
    pub fn from_config(
        config: &Config,
        store: Arc<dyn TokenStore>,
        navigator: Arc<dyn Navigator>,
    ) -> ClientResult<Self> {
        let api = ApiClient::new(&config.api_base_url, config.request_timeout())?;
        let google_login_url = config
            .google_login_url()
            .map_err(|source| ClientError::Endpoint {
                path: "auth/google".to_string(),
                source,
            })?;
        Ok(Self::new(
            api,
            store,
            navigator,
            google_login_url,
            config.profile_cache_ttl(),
        ))
    }

    /// Build a controller around an existing API client.
    ///
    /// The session starts from whatever `store` holds, still loading; call
    /// [`AuthController::bootstrap`] to settle it.
    pub fn new(
        api: ApiClient,
        store: Arc<dyn TokenStore>,
        navigator: Arc<dyn Navigator>,
        google_login_url: Url,
        profile_cache_ttl: Duration,
    ) -> Self {
        let persisted = match store.load() {
            Ok(credential) => credential,
            Err(err) => {
                warn!(error = %err, "ignoring unreadable persisted credential");
                None
            }
        };

        let initial = Session::restore(persisted);
        let (state, _) = watch::channel(initial.clone());
        let controller = Self {
            api,
            store,
            navigator,
            state,
            dispatch_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
            bootstrapped: AtomicBool::new(false),
            google_login_url,
            profile_cache_ttl,
        };
        controller.sync_credential(None, &initial);
        controller
    }

    /// Snapshot of the current session.
    pub fn session(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Observe every session change.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Rehydrate the session at start-up. Runs at most once; later calls return `None`.
    pub async fn bootstrap(&self) -> Option<LoadOutcome> {
        if self.bootstrapped.swap(true, Ordering::SeqCst) {
            debug!("bootstrap already ran");
            return None;
        }

        if self.state.borrow().token.is_some() {
            debug!("persisted credential found; loading profile");
            return Some(self.load_user(LoadOptions::default()).await);
        }

        let generation = self.current_generation();
        let settled = Transition::LoadUserFailure(LoadFailure::NoSession);
        if self.dispatch_if_current(generation, settled) {
            Some(LoadOutcome::NoSession)
        } else {
            Some(LoadOutcome::Stale)
        }
    }

    /// Sign in with email and password.
    pub async fn login(&self, email: &str, password: &str) -> AuthOutcome {
        self.dispatch(Transition::LoginStart);
        let generation = self.advance_generation();

        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let result = self.api.post::<_, AuthResponse>(LOGIN_ENDPOINT, &request).await;

        self.settle(
            generation,
            result,
            LOGIN_FAILED,
            |response| Transition::LoginSuccess {
                user: response.user,
                token: response.token,
            },
            Transition::LoginFailure,
        )
    }

    /// Create an account and sign in with it.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> AuthOutcome {
        self.dispatch(Transition::RegisterStart);
        let generation = self.advance_generation();

        let request = RegisterRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        let result = self.api.post::<_, AuthResponse>(REGISTER_ENDPOINT, &request).await;

        self.settle(
            generation,
            result,
            REGISTRATION_FAILED,
            |response| Transition::RegisterSuccess {
                user: response.user,
                token: response.token,
            },
            Transition::RegisterFailure,
        )
    }

    /// Sign out. Always ends unauthenticated, whatever the server says.
    pub async fn logout(&self) -> AuthOutcome {
        self.advance_generation();
        self.api.clear_cache();

        if self.state.borrow().token.is_some() {
            if let Err(err) = self.api.post_empty(LOGOUT_ENDPOINT).await {
                warn!(error = %err, "logout request failed; clearing local session anyway");
            }
        }

        // Requests started while the logout call was pending still carried the old token.
        self.dispatch_advancing(Transition::Logout);
        info!("signed out");
        AuthOutcome::Success
    }

    /// Fetch the current user's profile and store it in the session.
    pub async fn load_user(&self, options: LoadOptions) -> LoadOutcome {
        let generation = self.current_generation();
        let cache = CacheOptions::new(self.profile_cache_ttl).force_refresh(options.force_refresh);

        match self.api.get_cached::<ProfileResponse>(PROFILE_ENDPOINT, cache).await {
            Ok(profile) => {
                let user = profile.user;
                if self.dispatch_if_current(generation, Transition::LoadUserSuccess(user.clone())) {
                    Self::log_user("profile loaded", &user);
                    LoadOutcome::Loaded(user)
                } else {
                    LoadOutcome::Stale
                }
            }
            Err(err) => {
                let message = err.user_message(LOAD_USER_FAILED);
                warn!(error = %err, "profile load failed");
                let failure =
                    Transition::LoadUserFailure(LoadFailure::FetchFailed(message.clone()));
                if self.dispatch_if_current(generation, failure) {
                    LoadOutcome::Failed(message)
                } else {
                    LoadOutcome::Stale
                }
            }
        }
    }

    /// Establish a session from a token handed back by the OAuth redirect.
    pub async fn process_oauth_login(&self, token: &str) -> AuthOutcome {
        self.dispatch(Transition::LoginStart);
        let generation = self.advance_generation();
        self.api.clear_cache();

        let result = self
            .api
            .get_with_token::<ProfileResponse>(PROFILE_ENDPOINT, token)
            .await;

        self.settle(
            generation,
            result,
            GOOGLE_AUTH_FAILED,
            |profile| Transition::OAuthLoginSuccess {
                user: profile.user,
                token: token.to_string(),
                auth_type: AuthType::Google,
            },
            Transition::LoginFailure,
        )
    }

    /// Send the user to the backend's Google OAuth entry point.
    pub fn initiate_google_login(&self) {
        info!(url = %self.google_login_url, "redirecting to Google sign-in");
        self.navigator.redirect_external(&self.google_login_url);
    }

    pub fn clear_error(&self) {
        self.dispatch(Transition::ClearError);
    }

    fn settle<T>(
        &self,
        generation: u64,
        result: ClientResult<T>,
        fallback: &str,
        on_success: impl FnOnce(T) -> Transition,
        on_failure: impl FnOnce(String) -> Transition,
    ) -> AuthOutcome {
        match result {
            Ok(value) => {
                if self.dispatch_if_current(generation, on_success(value)) {
                    AuthOutcome::Success
                } else {
                    AuthOutcome::Superseded
                }
            }
            Err(err) => {
                let message = err.user_message(fallback);
                warn!(error = %err, "authentication failed");
                if self.dispatch_if_current(generation, on_failure(message.clone())) {
                    AuthOutcome::Failed(message)
                } else {
                    AuthOutcome::Superseded
                }
            }
        }
    }

    fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn advance_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn dispatch(&self, transition: Transition) {
        let _guard = self.dispatch_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.apply(transition);
    }

    /// Apply `transition` and invalidate every result still in flight.
    fn dispatch_advancing(&self, transition: Transition) {
        let _guard = self.dispatch_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.advance_generation();
        self.apply(transition);
    }

    /// Apply `transition` only if no login or logout started since `generation`.
    fn dispatch_if_current(&self, generation: u64, transition: Transition) -> bool {
        let _guard = self.dispatch_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if self.current_generation() != generation {
            debug!(transition = transition.name(), generation, "dropping stale result");
            return false;
        }
        self.apply(transition);
        true
    }

    /// Callers hold `dispatch_lock`.
    fn apply(&self, transition: Transition) {
        let name = transition.name();
        let mut previous = None;
        self.state.send_modify(|session| {
            let before = std::mem::take(session);
            *session = reduce(before.clone(), transition);
            previous = Some(before);
        });

        let current = self.state.borrow().clone();
        debug!(transition = name, status = ?current.status(), "session transition");
        self.sync_credential(previous.as_ref(), &current);
    }

    /// Mirror the session credential into storage and the API client.
    fn sync_credential(&self, previous: Option<&Session>, current: &Session) {
        let unchanged = previous.is_some_and(|previous| {
            previous.token == current.token && previous.auth_type == current.auth_type
        });
        if unchanged {
            return;
        }

        if previous.is_some_and(|previous| previous.token != current.token) {
            self.api.clear_cache();
        }

        match current.credential() {
            Some(credential) => {
                if let Err(err) = self.store.save(&credential) {
                    warn!(error = %err, "failed to persist credential");
                }
                self.api.set_bearer_token(Some(credential.token));
                info!(auth_type = %credential.auth_type, "session credential active");
            }
            None => {
                if let Err(err) = self.store.clear() {
                    warn!(error = %err, "failed to remove persisted credential");
                }
                self.api.set_bearer_token(None);
                debug!("session credential cleared");
            }
        }
    }

    fn log_user(event: &str, user: &UserProfile) {
        info!(
            user_id = user.id().as_deref().unwrap_or("unknown"),
            email = user.email().unwrap_or(""),
            "{}",
            event
        );
    }
}
