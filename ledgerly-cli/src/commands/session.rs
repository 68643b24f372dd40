use std::{
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use client::{
    AuthController, AuthOutcome, CallbackOutcome, CallbackParams, FileTokenStore, LoadOptions,
    LoadOutcome, Navigator, Notifier, OAuthCallbackHandler, Route, Session,
};
use directories::BaseDirs;
use rpassword::prompt_password;
use shared::config::Config;
use tracing::debug;
use url::Url;

#[derive(Subcommand, Debug)]
pub enum SessionCommand {
    /// Sign in with email and password
    Login {
        #[arg(long, short)]
        email: Option<String>,
    },
    /// Create an account and sign in with it
    Register {
        #[arg(long, short)]
        name: String,
        #[arg(long, short)]
        email: Option<String>,
    },
    /// Show the signed-in user
    Me {
        /// Fetch the profile even if a cached copy is fresh
        #[arg(long)]
        refresh: bool,
    },
    /// Sign out and forget the stored credential
    Logout,
    /// Print the URL that starts Google sign-in
    Google,
    /// Finish Google sign-in from the URL the browser was redirected to
    Callback {
        /// Full redirect URL, e.g. http://localhost:5173/oauth/callback?token=...
        redirect_url: Url,
    },
}

/// Prints where the user has to go next; a terminal cannot follow redirects.
#[derive(Debug)]
struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn redirect_external(&self, url: &Url) {
        println!("Open this URL in your browser to continue: {url}");
    }

    fn navigate(&self, route: Route) {
        debug!(%route, "navigation requested");
    }
}

#[derive(Debug)]
struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify_error(&self, message: &str) {
        eprintln!("error: {message}");
    }
}

pub async fn run(command: SessionCommand, config: &Config) -> Result<()> {
    let path = session_path(config);
    let store = Arc::new(FileTokenStore::new(&path));
    let auth = Arc::new(
        AuthController::from_config(config, store, Arc::new(TerminalNavigator))
            .context("failed to set up the API client")?,
    );

    match command {
        SessionCommand::Login { email } => login(&auth, email, &path).await,
        SessionCommand::Register { name, email } => register(&auth, &name, email, &path).await,
        SessionCommand::Me { refresh } => me(&auth, refresh).await,
        SessionCommand::Logout => logout(&auth, &path).await,
        SessionCommand::Google => {
            auth.initiate_google_login();
            println!("Then run `ledgerly session callback <URL>` with the address you land on.");
            Ok(())
        }
        SessionCommand::Callback { redirect_url } => {
            check_redirect_origin(&config.frontend_url, &redirect_url)?;
            callback(auth, &redirect_url, &path).await
        }
    }
}

async fn login(auth: &AuthController, email: Option<String>, path: &Path) -> Result<()> {
    let email = match email {
        Some(email) => email,
        None => prompt("Email: ")?,
    };
    let password = read_password()?;

    match auth.login(&email, &password).await {
        AuthOutcome::Success => {
            print_session_summary(&auth.session(), path);
            Ok(())
        }
        AuthOutcome::Failed(message) => bail!("login failed: {message}"),
        AuthOutcome::Superseded => bail!("login was interrupted"),
    }
}

async fn register(
    auth: &AuthController,
    name: &str,
    email: Option<String>,
    path: &Path,
) -> Result<()> {
    let email = match email {
        Some(email) => email,
        None => prompt("Email: ")?,
    };
    let password = read_password()?;

    match auth.register(name, &email, &password).await {
        AuthOutcome::Success => {
            print_session_summary(&auth.session(), path);
            Ok(())
        }
        AuthOutcome::Failed(message) => bail!("registration failed: {message}"),
        AuthOutcome::Superseded => bail!("registration was interrupted"),
    }
}

async fn me(auth: &AuthController, refresh: bool) -> Result<()> {
    let mut outcome = auth.bootstrap().await;
    if refresh && matches!(outcome, Some(LoadOutcome::Loaded(_))) {
        outcome = Some(auth.load_user(LoadOptions { force_refresh: true }).await);
    }

    match outcome {
        Some(LoadOutcome::Loaded(_)) => {
            print_user(&auth.session());
            Ok(())
        }
        Some(LoadOutcome::NoSession) => {
            bail!("no active session found; run `ledgerly session login` first")
        }
        Some(LoadOutcome::Failed(message)) => bail!(
            "session is no longer valid ({message}); run `ledgerly session login` to sign in again"
        ),
        Some(LoadOutcome::Stale) | None => bail!("session changed while loading; try again"),
    }
}

async fn logout(auth: &AuthController, path: &Path) -> Result<()> {
    let had_session = auth.session().token.is_some();
    auth.logout().await;

    if had_session {
        println!("Signed out; removed credential at {}", path.display());
    } else {
        println!("No active session found at {}", path.display());
    }
    Ok(())
}

async fn callback(auth: Arc<AuthController>, redirect_url: &Url, path: &Path) -> Result<()> {
    let handler = OAuthCallbackHandler::new(
        auth.clone(),
        Arc::new(TerminalNavigator),
        Arc::new(TerminalNotifier),
    );

    match handler.handle(CallbackParams::from_url(redirect_url)).await {
        CallbackOutcome::Authenticated => {
            print_session_summary(&auth.session(), path);
            Ok(())
        }
        CallbackOutcome::ProviderError(error) => bail!("Google sign-in was rejected: {error}"),
        CallbackOutcome::MissingToken => bail!("redirect URL carried no token"),
        CallbackOutcome::Failed(message) => bail!("Google sign-in failed: {message}"),
        CallbackOutcome::AlreadyHandled => Ok(()),
    }
}

/// Refuse redirect URLs that did not come back to the configured frontend.
fn check_redirect_origin(frontend_url: &Url, redirect_url: &Url) -> Result<()> {
    if redirect_url.origin() != frontend_url.origin() {
        bail!(
            "redirect URL {} does not match the configured frontend {}",
            redirect_url.origin().ascii_serialization(),
            frontend_url.origin().ascii_serialization()
        );
    }
    Ok(())
}

/// Where the credential is persisted: the configured path, else the platform config directory.
pub fn session_path(config: &Config) -> PathBuf {
    config.session_path.clone().unwrap_or_else(|| {
        BaseDirs::new()
            .map(|dirs| dirs.config_dir().join("ledgerly").join("session.json"))
            .unwrap_or_else(|| PathBuf::from("./ledgerly-session.json"))
    })
}

fn prompt(message: &str) -> Result<String> {
    print!("{message}");
    io::stdout().flush().ok();
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let trimmed = input.trim().to_string();
    if trimmed.is_empty() {
        bail!("input must not be empty");
    }
    Ok(trimmed)
}

fn read_password() -> Result<String> {
    let password = prompt_password("Password: ").context("failed to read password")?;
    if password.trim().is_empty() {
        bail!("password must not be empty");
    }
    Ok(password)
}

fn print_user(session: &Session) {
    let Some(user) = &session.user else {
        return;
    };
    match (user.name(), user.email()) {
        (Some(name), Some(email)) => println!("Signed in as {name} <{email}>"),
        (Some(name), None) => println!("Signed in as {name}"),
        (None, Some(email)) => println!("Signed in as {email}"),
        (None, None) => println!("Signed in"),
    }
    if let Some(id) = user.id() {
        println!("user id: {id}");
    }
    println!("sign-in method: {}", session.auth_type);
}

fn print_session_summary(session: &Session, path: &Path) {
    print_user(session);
    println!("credential stored at {}", path.display());
}
