//! In-process fake of the Ledgerly auth API plus recording ports.

#![allow(dead_code)]

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use client::{AuthController, MemoryTokenStore, Navigator, Notifier, Route, StoredCredential};
use serde_json::{Value, json};
use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    },
    time::Duration,
};
use tokio::net::TcpListener;
use url::Url;

pub const SLOW_TOKEN: &str = "slow";
pub const SLOW_PROFILE_DELAY: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub path: &'static str,
    pub authorization: Option<String>,
}

#[derive(Debug, Default)]
pub struct BackendState {
    requests: Mutex<Vec<RecordedRequest>>,
    profile_hits: AtomicUsize,
    profile_delay_ms: AtomicU64,
    logout_delay_ms: AtomicU64,
    pub fail_logout: AtomicBool,
}

impl BackendState {
    fn record(&self, method: &'static str, path: &'static str, headers: &HeaderMap) {
        let authorization = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        self.requests.lock().unwrap().push(RecordedRequest {
            method,
            path,
            authorization,
        });
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.path == path)
            .collect()
    }

    pub fn profile_hits(&self) -> usize {
        self.profile_hits.load(Ordering::SeqCst)
    }

    /// Delay every profile response, whatever the token.
    pub fn set_profile_delay(&self, delay: Duration) {
        self.profile_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn set_logout_delay(&self, delay: Duration) {
        self.logout_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    async fn pause(delay_ms: &AtomicU64) {
        let millis = delay_ms.load(Ordering::SeqCst);
        if millis > 0 {
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }
    }
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string)
}

async fn login(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.record("POST", "/auth/login", &headers);
    if body["password"] == "pw" {
        Json(json!({
            "message": "Login successful",
            "user": { "id": 1, "name": "A", "email": body["email"] },
            "token": "t1"
        }))
        .into_response()
    } else {
        error(StatusCode::UNAUTHORIZED, "Invalid credentials")
    }
}

async fn register(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.record("POST", "/auth/register", &headers);
    if body["email"] == "taken@b.com" {
        return error(StatusCode::BAD_REQUEST, "User already exists");
    }
    (
        StatusCode::CREATED,
        Json(json!({
            "user": { "id": 2, "name": body["name"], "email": body["email"] },
            "token": "t-reg"
        })),
    )
        .into_response()
}

async fn profile(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Response {
    state.record("GET", "/auth/profile", &headers);
    state.profile_hits.fetch_add(1, Ordering::SeqCst);
    BackendState::pause(&state.profile_delay_ms).await;

    match bearer(&headers).as_deref() {
        Some("t1") => Json(json!({ "user": { "id": 1, "name": "A" } })).into_response(),
        Some("t2") => Json(json!({ "user": { "id": 7, "name": "G", "email": "g@b.com" } }))
            .into_response(),
        Some("t-reg") => Json(json!({ "user": { "id": 2, "name": "R" } })).into_response(),
        Some(SLOW_TOKEN) => {
            tokio::time::sleep(SLOW_PROFILE_DELAY).await;
            Json(json!({ "user": { "id": 9, "name": "Slow" } })).into_response()
        }
        Some(_) => error(StatusCode::UNAUTHORIZED, "Token is not valid"),
        None => error(StatusCode::UNAUTHORIZED, "No token, authorization denied"),
    }
}

async fn logout(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Response {
    state.record("POST", "/auth/logout", &headers);
    BackendState::pause(&state.logout_delay_ms).await;
    if state.fail_logout.load(Ordering::SeqCst) {
        error(StatusCode::INTERNAL_SERVER_ERROR, "Server error")
    } else {
        StatusCode::NO_CONTENT.into_response()
    }
}

/// Fake API listening on an ephemeral local port.
pub struct FakeBackend {
    pub base_url: Url,
    pub state: Arc<BackendState>,
}

impl FakeBackend {
    pub async fn start() -> Self {
        let state = Arc::new(BackendState::default());
        let app = Router::new()
            .route("/api/auth/login", post(login))
            .route("/api/auth/register", post(register))
            .route("/api/auth/profile", get(profile))
            .route("/api/auth/logout", post(logout))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: Url::parse(&format!("http://{addr}/api/")).unwrap(),
            state,
        }
    }
}

#[derive(Debug, Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<Route>>,
    external: Mutex<Vec<Url>>,
}

impl RecordingNavigator {
    pub fn routes(&self) -> Vec<Route> {
        self.routes.lock().unwrap().clone()
    }

    pub fn external(&self) -> Vec<Url> {
        self.external.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn redirect_external(&self, url: &Url) {
        self.external.lock().unwrap().push(url.clone());
    }

    fn navigate(&self, route: Route) {
        self.routes.lock().unwrap().push(route);
    }
}

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    errors: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify_error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }
}

pub struct Harness {
    pub backend: FakeBackend,
    pub store: Arc<MemoryTokenStore>,
    pub navigator: Arc<RecordingNavigator>,
    pub auth: Arc<AuthController>,
}

impl Harness {
    pub async fn start() -> Self {
        Self::with_store(MemoryTokenStore::new()).await
    }

    pub async fn with_credential(credential: StoredCredential) -> Self {
        Self::with_store(MemoryTokenStore::with_credential(credential)).await
    }

    async fn with_store(store: MemoryTokenStore) -> Self {
        let backend = FakeBackend::start().await;
        let store = Arc::new(store);
        let navigator = Arc::new(RecordingNavigator::default());
        let auth = Arc::new(controller(&backend.base_url, store.clone(), navigator.clone()));
        Self {
            backend,
            store,
            navigator,
            auth,
        }
    }
}

pub fn controller(
    base_url: &Url,
    store: Arc<MemoryTokenStore>,
    navigator: Arc<RecordingNavigator>,
) -> AuthController {
    let api = client::ApiClient::new(base_url, Duration::from_secs(5)).unwrap();
    AuthController::new(
        api,
        store,
        navigator,
        base_url.join("auth/google").unwrap(),
        Duration::from_secs(30),
    )
}
