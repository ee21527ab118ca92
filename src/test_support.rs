//! Usage: Public test helpers for unit and integration tests.

use std::path::PathBuf;

use crate::config::{
    AppConfig, GitHubConfig, LoggingConfig, ServerConfig, SessionConfig, SessionStoreKind,
};

/// Configuration pointing the GitHub client at stub endpoints
///
/// # Arguments
/// * `github_base_url` - Root serving `/login/oauth/authorize` and `/login/oauth/access_token`
/// * `api_base_url` - Root serving `/user` and `/user/repos`
pub fn test_config(github_base_url: &str, api_base_url: &str) -> AppConfig {
    let github_base_url = github_base_url.trim_end_matches('/');

    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            base_url: "http://127.0.0.1:3000".to_string(),
        },
        github: GitHubConfig {
            client_id: "test-client-id".to_string(),
            client_secret: "test-client-secret".to_string(),
            authorize_url: format!("{github_base_url}/login/oauth/authorize"),
            token_url: format!("{github_base_url}/login/oauth/access_token"),
            api_url: api_base_url.trim_end_matches('/').to_string(),
            scope: "user public_repo".to_string(),
            request_timeout_seconds: 10,
        },
        session: SessionConfig {
            secret: "test-secret-key-32-bytes-long!!!".to_string(),
            ttl_seconds: 86_400,
            cookie_name: "ghportal.sid".to_string(),
            store: SessionStoreKind::Memory,
            path: PathBuf::from("sessions.db"),
            purge_interval_seconds: 600,
        },
        logging: LoggingConfig {
            level: "info".to_string(),
            format: "pretty".to_string(),
        },
    }
}
