#![cfg_attr(not(test), forbid(unsafe_code))]
#![warn(clippy::pedantic)]

//! Session client for the Ledgerly personal-finance API.
//!
//! [`AuthController`] owns the session and runs login, registration, logout,
//! profile loading and the OAuth hand-off. Storage and navigation are injected
//! through the [`TokenStore`], [`Navigator`] and [`Notifier`] ports.

pub mod api;
pub mod auth;
pub mod cache;
pub mod error;
pub mod navigation;
pub mod oauth_callback;
pub mod reducer;
pub mod session;
pub mod token_store;

pub use api::ApiClient;
pub use auth::{AuthController, AuthOutcome, LoadOptions, LoadOutcome};
pub use cache::CacheOptions;
pub use error::{ClientError, ClientResult, StoreError};
pub use navigation::{Navigator, Notifier, Route};
pub use oauth_callback::{CallbackOutcome, CallbackParams, OAuthCallbackHandler};
pub use reducer::{LoadFailure, Transition};
pub use session::{Session, SessionStatus};
pub use token_store::{FileTokenStore, MemoryTokenStore, StoredCredential, TokenStore};
