//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration files (config/default.toml, config/local.toml)
//! 3. Environment variables (GHPORTAL__*)
//! 4. The flat deployment variables (CLIENT_ID, CLIENT_SECRET, BASE_URL,
//!    SESSION_SECRET, PORT), which win over everything else

use serde::Deserialize;
use std::{fmt, net::IpAddr, path::PathBuf};

use crate::error::AppError;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub github: GitHubConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 3000)
    pub port: u16,
    /// Public base URL (e.g., "https://portal.example.com")
    pub base_url: String,
}

impl ServerConfig {
    /// OAuth redirect URI registered with GitHub
    ///
    /// # Returns
    /// `base_url` with any trailing slash removed, followed by `/callback`
    pub fn redirect_uri(&self) -> String {
        format!("{}/callback", self.base_url.trim_end_matches('/'))
    }

    pub fn is_https(&self) -> bool {
        url::Url::parse(&self.base_url)
            .map(|url| url.scheme() == "https")
            .unwrap_or(false)
    }
}

/// GitHub OAuth application and API endpoints
#[derive(Clone, Deserialize)]
pub struct GitHubConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Browser-facing authorization endpoint
    pub authorize_url: String,
    /// Back-channel code-for-token endpoint
    pub token_url: String,
    /// REST API root (no trailing slash)
    pub api_url: String,
    /// Space-separated scopes requested at login
    pub scope: String,
    /// Outbound request timeout in seconds
    pub request_timeout_seconds: u64,
}

impl fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("authorize_url", &self.authorize_url)
            .field("token_url", &self.token_url)
            .field("api_url", &self.api_url)
            .field("scope", &self.scope)
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .finish()
    }
}

/// Session store backend selector
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionStoreKind {
    #[default]
    Memory,
    Sqlite,
}

/// Session configuration
#[derive(Clone, Deserialize)]
pub struct SessionConfig {
    /// Cookie signing key (32+ bytes)
    pub secret: String,
    /// Time-to-live of a session record in seconds (default: 86400 = 24h)
    pub ttl_seconds: u64,
    /// Name of the session cookie
    pub cookie_name: String,
    #[serde(default)]
    pub store: SessionStoreKind,
    /// SQLite file used when `store = "sqlite"`
    pub path: PathBuf,
    /// How often expired SQLite rows are purged
    pub purge_interval_seconds: u64,
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("secret", &"<redacted>")
            .field("ttl_seconds", &self.ttl_seconds)
            .field("cookie_name", &self.cookie_name)
            .field("store", &self.store)
            .field("path", &self.path)
            .field("purge_interval_seconds", &self.purge_interval_seconds)
            .finish()
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }

    /// `EnvFilter` directives used when `RUST_LOG` is unset
    pub fn default_filter(&self) -> String {
        format!("ghportal={},tower_http=debug", self.level.trim().to_ascii_lowercase())
    }
}

impl AppConfig {
    /// Load configuration from files and the process environment
    ///
    /// # Errors
    /// Returns error if configuration is missing or invalid
    pub fn load() -> Result<Self, AppError> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Load configuration, resolving the flat deployment variables through `lookup`
    ///
    /// `CLIENT_ID` and `CLIENT_SECRET` also accept their `GITHUB_` prefixed
    /// spellings.
    pub fn load_with<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        use config::{Config, Environment, File};

        let first = |keys: &[&str]| -> Option<String> {
            keys.iter()
                .find_map(|key| lookup(key).filter(|value| !value.trim().is_empty()))
        };

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("server.base_url", "http://localhost:3000")?
            .set_default(
                "github.authorize_url",
                "https://github.com/login/oauth/authorize",
            )?
            .set_default(
                "github.token_url",
                "https://github.com/login/oauth/access_token",
            )?
            .set_default("github.api_url", "https://api.github.com")?
            .set_default("github.scope", "user public_repo")?
            .set_default("github.request_timeout_seconds", 30)?
            .set_default("session.ttl_seconds", 86400)?
            .set_default("session.cookie_name", "ghportal.sid")?
            .set_default("session.store", "memory")?
            .set_default("session.path", "sessions.db")?
            .set_default("session.purge_interval_seconds", 600)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("GHPORTAL")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("github.client_id", first(&["CLIENT_ID", "GITHUB_CLIENT_ID"]))?
            .set_override_option(
                "github.client_secret",
                first(&["CLIENT_SECRET", "GITHUB_CLIENT_SECRET"]),
            )?
            .set_override_option("server.base_url", first(&["BASE_URL"]))?
            .set_override_option("session.secret", first(&["SESSION_SECRET"]))?
            .set_override_option("server.port", first(&["PORT"]))?
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub fn should_use_secure_cookies(&self) -> bool {
        self.server.is_https()
    }

    pub(crate) fn validate(&self) -> Result<(), AppError> {
        const MIN_SESSION_SECRET_BYTES: usize = 32;

        if self.github.client_id.trim().is_empty() {
            return Err(AppError::Config(
                "github.client_id (CLIENT_ID) must not be empty".to_string(),
            ));
        }

        if self.github.client_secret.trim().is_empty() {
            return Err(AppError::Config(
                "github.client_secret (CLIENT_SECRET) must not be empty".to_string(),
            ));
        }

        if self.session.secret.len() < MIN_SESSION_SECRET_BYTES {
            return Err(AppError::Config(format!(
                "session.secret (SESSION_SECRET) must be at least {} bytes",
                MIN_SESSION_SECRET_BYTES
            )));
        }

        if self.session.ttl_seconds == 0 {
            return Err(AppError::Config(
                "session.ttl_seconds must be greater than 0".to_string(),
            ));
        }

        const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
        if !LOG_LEVELS.contains(&self.logging.level.trim().to_ascii_lowercase().as_str()) {
            return Err(AppError::Config(format!(
                "logging.level must be one of {LOG_LEVELS:?}, got {:?}",
                self.logging.level
            )));
        }

        if !matches!(self.logging.format.to_ascii_lowercase().as_str(), "pretty" | "json") {
            return Err(AppError::Config(format!(
                "logging.format must be \"pretty\" or \"json\", got {:?}",
                self.logging.format
            )));
        }

        let base_url = url::Url::parse(&self.server.base_url).map_err(|e| {
            AppError::Config(format!("server.base_url (BASE_URL) is not a valid URL: {e}"))
        })?;

        match base_url.scheme() {
            "https" => {}
            "http" => {
                let host = base_url.host_str().unwrap_or_default();
                if !is_local_host(host) {
                    return Err(AppError::Config(
                        "server.base_url must use https for non-local hosts".to_string(),
                    ));
                }
                tracing::warn!(
                    host = %host,
                    "Using insecure session cookies for local development"
                );
            }
            scheme => {
                return Err(AppError::Config(format!(
                    "server.base_url has unsupported scheme {scheme:?}"
                )));
            }
        }

        Ok(())
    }
}

fn is_local_host(host: &str) -> bool {
    let host = host
        .trim_start_matches('[')
        .trim_end_matches(']')
        .trim_end_matches('.')
        .to_ascii_lowercase();
    if host == "localhost" || host.ends_with(".localhost") {
        return true;
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        return ip.is_loopback() || ip.is_unspecified();
    }

    false
}
