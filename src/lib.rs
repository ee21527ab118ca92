//! ghportal - Sign in with GitHub and browse your repositories
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Web Layer (Axum)                        │
//! │  - OAuth routes (/login, /callback, /logout)                │
//! │  - HTML pages (/, /repos)                                   │
//! │  - Health and metrics                                       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Session Layer                             │
//! │  - Signed session cookie                                    │
//! │  - Per-session OAuth state and access token                 │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌──────────────────────────────┬──────────────────────────────┐
//! │         Data Layer           │        GitHub Client          │
//! │  - In-memory store (moka)    │  - Token exchange            │
//! │  - SQLite store (sqlx)       │  - Profile and repositories   │
//! └──────────────────────────────┴──────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTML pages and the metrics endpoint
//! - `auth`: GitHub OAuth flow, sessions and cookies
//! - `github`: Outbound HTTP client for GitHub
//! - `data`: Session stores
//! - `config`: Configuration management
//! - `error`: Error types
//! - `metrics`: Prometheus instruments

pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod github;
pub mod metrics;
#[doc(hidden)]
pub mod test_support;

use std::sync::Arc;
use std::time::Duration;

/// Application state shared across all handlers
///
/// Cloned for each request; everything inside is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Session store (memory or SQLite)
    pub sessions: Arc<dyn data::SessionStore>,

    /// GitHub API client
    pub github: Arc<github::GitHubClient>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Open the configured session store
    /// 2. Build the GitHub client
    ///
    /// # Errors
    /// Returns error if the store cannot be opened or the client cannot be built
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        let ttl = Duration::from_secs(config.session.ttl_seconds);
        let sessions: Arc<dyn data::SessionStore> = match config.session.store {
            config::SessionStoreKind::Memory => {
                tracing::info!("Using in-memory session store");
                Arc::new(data::MemorySessionStore::new(ttl))
            }
            config::SessionStoreKind::Sqlite => {
                Arc::new(data::SqliteSessionStore::connect(&config.session.path, ttl).await?)
            }
        };

        Self::with_store(config, sessions)
    }

    /// Build state around an existing session store
    pub fn with_store(
        config: config::AppConfig,
        sessions: Arc<dyn data::SessionStore>,
    ) -> Result<Self, error::AppError> {
        let github = github::GitHubClient::new(&config.github)?;

        Ok(Self {
            config: Arc::new(config),
            sessions,
            github: Arc::new(github),
        })
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::{Router, middleware};
    use tower_http::{compression::CompressionLayer, trace::TraceLayer};

    Router::new()
        .merge(auth::auth_router())
        .merge(api::pages_router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::session_layer,
        ))
        .route("/health", axum::routing::get(health_check))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        .merge(api::metrics_router())
}

async fn health_check() -> &'static str {
    "OK"
}
