//! Common test utilities for E2E tests
//!
//! Boots a stub GitHub (token endpoint plus `/user` and `/user/repos`) and
//! the application wired against it, each on an ephemeral port.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    Form, Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use async_trait::async_trait;
use ghportal::auth::{SessionId, SessionRecord};
use ghportal::data::{MemorySessionStore, SessionStore};
use ghportal::error::AppError;
use ghportal::{AppState, config};
use serde_json::json;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Authorization code the stub exchanges for [`GOOD_TOKEN`]
pub const GOOD_CODE: &str = "good-code";
pub const GOOD_TOKEN: &str = "tok1";
/// Authorization code whose token GitHub later rejects
pub const REVOKED_CODE: &str = "revoked-code";
pub const REVOKED_TOKEN: &str = "revoked-token";

/// Requests observed by the stub GitHub
#[derive(Default)]
pub struct StubLog {
    pub token_requests: Vec<HashMap<String, String>>,
    pub api_paths: Vec<String>,
}

/// Stub GitHub instance
pub struct StubGitHub {
    pub addr: String,
    pub log: Arc<Mutex<StubLog>>,
}

impl StubGitHub {
    pub async fn start() -> Self {
        let log = Arc::new(Mutex::new(StubLog::default()));

        let app = Router::new()
            .route("/login/oauth/access_token", post(stub_token))
            .route("/user", get(stub_user))
            .route("/user/repos", get(stub_repos))
            .route("/not-found", get(stub_not_found).post(stub_not_found))
            .route("/plain", get(stub_plain))
            .with_state(log.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = format!("http://{}", listener.local_addr().unwrap());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, log }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    pub fn token_requests(&self) -> Vec<HashMap<String, String>> {
        self.log.lock().unwrap().token_requests.clone()
    }

    pub fn api_paths(&self) -> Vec<String> {
        self.log.lock().unwrap().api_paths.clone()
    }
}

async fn stub_token(
    State(log): State<Arc<Mutex<StubLog>>>,
    Form(form): Form<HashMap<String, String>>,
) -> Json<serde_json::Value> {
    let code = form.get("code").cloned().unwrap_or_default();
    let well_formed = form.get("grant_type").map(String::as_str) == Some("authorization_code")
        && form.get("client_id").map(String::as_str) == Some("test-client-id")
        && form.get("client_secret").map(String::as_str) == Some("test-client-secret");
    log.lock().unwrap().token_requests.push(form);

    // GitHub reports a bad code with 200 and an `error` field.
    match (well_formed, code.as_str()) {
        (true, GOOD_CODE) => Json(json!({
            "access_token": GOOD_TOKEN,
            "token_type": "bearer",
            "scope": "public_repo,user"
        })),
        (true, REVOKED_CODE) => Json(json!({
            "access_token": REVOKED_TOKEN,
            "token_type": "bearer",
            "scope": "public_repo,user"
        })),
        _ => Json(json!({
            "error": "bad_verification_code",
            "error_description": "The code passed is incorrect or expired."
        })),
    }
}

fn bearer_is_valid(headers: &HeaderMap) -> bool {
    let expected = format!("Bearer {GOOD_TOKEN}");
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        == Some(expected.as_str())
}

fn bad_credentials() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "message": "Bad credentials" })),
    )
        .into_response()
}

async fn stub_user(State(log): State<Arc<Mutex<StubLog>>>, headers: HeaderMap) -> Response {
    log.lock().unwrap().api_paths.push("/user".to_string());

    if !bearer_is_valid(&headers) {
        return bad_credentials();
    }

    Json(json!({
        "login": "octocat",
        "id": 583231,
        "avatar_url": "https://avatars.githubusercontent.com/u/583231?v=4",
        "name": "The <Octocat>",
        "type": "User"
    }))
    .into_response()
}

async fn stub_repos(
    State(log): State<Arc<Mutex<StubLog>>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    log.lock().unwrap().api_paths.push("/user/repos".to_string());

    if !bearer_is_valid(&headers) {
        return bad_credentials();
    }
    if query.get("sort").map(String::as_str) != Some("created")
        || query.get("direction").map(String::as_str) != Some("desc")
    {
        return (StatusCode::BAD_REQUEST, "unexpected ordering").into_response();
    }

    Json(json!([
        {
            "id": 2,
            "name": "newest",
            "full_name": "octocat/newest",
            "html_url": "https://github.com/octocat/newest",
            "description": "Created last",
            "language": "Rust",
            "stargazers_count": 3,
            "forks_count": 1,
            "private": false
        },
        {
            "id": 1,
            "name": "Hello-World",
            "full_name": "octocat/Hello-World",
            "html_url": "https://github.com/octocat/Hello-World",
            "description": null,
            "language": null,
            "stargazers_count": 1500,
            "forks_count": 1400,
            "private": false
        }
    ]))
    .into_response()
}

async fn stub_not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "not found")
}

async fn stub_plain() -> &'static str {
    "plain text"
}

/// Session store that fails selected writes and delegates everything else
///
/// `put` fails only for `Authenticated` records, so a login can start
/// but never complete.
pub struct FailingSessionStore {
    inner: MemorySessionStore,
    fail_authenticated_put: bool,
    fail_destroy: bool,
}

impl FailingSessionStore {
    pub fn failing_token_write() -> Arc<Self> {
        Arc::new(Self {
            inner: MemorySessionStore::new(std::time::Duration::from_secs(3600)),
            fail_authenticated_put: true,
            fail_destroy: false,
        })
    }

    pub fn failing_destroy() -> Arc<Self> {
        Arc::new(Self {
            inner: MemorySessionStore::new(std::time::Duration::from_secs(3600)),
            fail_authenticated_put: false,
            fail_destroy: true,
        })
    }
}

#[async_trait]
impl SessionStore for FailingSessionStore {
    async fn get(&self, id: &SessionId) -> Result<Option<SessionRecord>, AppError> {
        self.inner.get(id).await
    }

    async fn put(&self, id: &SessionId, record: &SessionRecord) -> Result<(), AppError> {
        if self.fail_authenticated_put && record.access_token().is_some() {
            return Err(AppError::SessionPersistence("disk full".to_string()));
        }
        self.inner.put(id, record).await
    }

    async fn destroy(&self, id: &SessionId) -> Result<(), AppError> {
        if self.fail_destroy {
            return Err(AppError::SessionPersistence("database is locked".to_string()));
        }
        self.inner.destroy(id).await
    }

    async fn take_state(&self, id: &SessionId) -> Result<Option<String>, AppError> {
        self.inner.take_state(id).await
    }

    async fn purge_expired(&self) -> Result<u64, AppError> {
        self.inner.purge_expired().await
    }
}

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub github: StubGitHub,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a test server backed by the in-memory session store
    pub async fn new() -> Self {
        Self::with_store(config::SessionStoreKind::Memory).await
    }

    /// Create a test server backed by the SQLite session store
    pub async fn with_sqlite() -> Self {
        Self::with_store(config::SessionStoreKind::Sqlite).await
    }

    /// Create a test server around a caller-supplied session store
    pub async fn with_session_store(sessions: Arc<dyn SessionStore>) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let github = StubGitHub::start().await;
        let config = ghportal::test_support::test_config(&github.addr, &github.addr);

        let state = AppState::with_store(config, sessions).unwrap();
        Self::serve(state, github, temp_dir).await
    }

    async fn with_store(store: config::SessionStoreKind) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let github = StubGitHub::start().await;

        let mut config = ghportal::test_support::test_config(&github.addr, &github.addr);
        config.session.store = store;
        config.session.path = temp_dir.path().join("sessions.db");

        let state = AppState::new(config).await.unwrap();
        Self::serve(state, github, temp_dir).await
    }

    async fn serve(state: AppState, github: StubGitHub, temp_dir: TempDir) -> Self {
        // Redirects are asserted on, never followed.
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = format!("http://{}", listener.local_addr().unwrap());

        let app = ghportal::build_router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            state,
            github,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// A client that remembers the session cookie between requests
    pub fn browser(&self) -> Browser<'_> {
        Browser {
            server: self,
            cookie: None,
        }
    }
}

/// Minimal cookie-carrying client for one browser session
pub struct Browser<'a> {
    server: &'a TestServer,
    pub cookie: Option<String>,
}

impl Browser<'_> {
    /// GET `path`, sending the current cookie and applying any `Set-Cookie`
    pub async fn get(&mut self, path: &str) -> reqwest::Response {
        let mut request = self.server.client.get(self.server.url(path));
        if let Some(cookie) = &self.cookie {
            request = request.header(header::COOKIE, cookie);
        }

        let response = request.send().await.unwrap();
        if let Some(update) = session_cookie_update(&response) {
            self.cookie = update;
        }
        response
    }

    /// Start a login and return the `state` sent to GitHub
    pub async fn begin_login(&mut self) -> String {
        let response = self.get("/login").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let location = location(&response);
        let url = url::Url::parse(&location).unwrap();
        url.query_pairs()
            .find(|(key, _)| key == "state")
            .map(|(_, value)| value.into_owned())
            .expect("authorize redirect carries state")
    }

    /// Complete a login with `code` and return the callback response
    pub async fn complete_login(&mut self, code: &str) -> reqwest::Response {
        let state = self.begin_login().await;
        self.get(&format!("/callback?code={code}&state={state}"))
            .await
    }
}

/// `Location` header of a redirect
pub fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .expect("redirect has a location")
        .to_str()
        .unwrap()
        .to_string()
}

/// Session cookie change carried by a response
///
/// `Some(Some(pair))` sets the cookie, `Some(None)` clears it, `None` leaves it.
pub fn session_cookie_update(response: &reqwest::Response) -> Option<Option<String>> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .filter_map(|pair| pair.split_once('='))
        .find(|(name, _)| name.trim() == "ghportal.sid")
        .map(|(name, value)| {
            if value.is_empty() {
                None
            } else {
                Some(format!("{}={}", name.trim(), value))
            }
        })
}

/// Raw `Set-Cookie` headers of a response
pub fn set_cookie_headers(response: &reqwest::Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .map(ToString::to_string)
        .collect()
}
