//! GitHub OAuth flow
//!
//! Implements the OAuth 2.0 authorization code flow with GitHub.
//!
//! Per session: `Anonymous -> AwaitingCallback -> Authenticated`, and back
//! to `Anonymous` on logout or on any failed callback.

use axum::{
    Router,
    extract::{Query, State, rejection::QueryRejection},
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use axum_extra::extract::CookieJar;
use rand::RngCore;
use serde::Deserialize;
use subtle::ConstantTimeEq;
use url::Url;

use super::middleware::{SessionHandle, clear_session_cookie, cookie_issued, session_cookie};
use super::session::{SessionId, SessionRecord};
use crate::AppState;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::github::TokenExchangeRequest;
use crate::metrics::OAUTH_LOGINS_TOTAL;

/// Error indicator for a missing or mismatched `state`
pub const ERROR_INVALID_STATE: &str = "invalid_state";
/// Error indicator for every other login failure
pub const ERROR_AUTH_FAILED: &str = "auth_failed";

/// Random bytes in a CSRF state token (hex-encoded to twice as many chars)
const OAUTH_STATE_BYTES: usize = 16;

/// Create authentication router
///
/// Routes:
/// - GET /login - Redirect to GitHub
/// - GET /callback - OAuth callback
/// - GET /logout - Logout
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login))
        .route("/callback", get(callback))
        .route("/logout", get(logout))
}

// =============================================================================
// Initiate
// =============================================================================

/// GET /login
///
/// # Steps
/// 1. Generate CSRF state token
/// 2. Replace the session with `AwaitingCallback`, dropping any old token
/// 3. Redirect to GitHub with response_type, client_id, redirect_uri, scope, state
async fn login(State(state): State<AppState>, SessionHandle(id): SessionHandle) -> Redirect {
    let oauth_state = generate_oauth_state();
    let record = SessionRecord::AwaitingCallback {
        state: oauth_state.clone(),
    };

    if let Err(error) = state.sessions.put(&id, &record).await {
        tracing::error!(%error, "Failed to store OAuth state");
        OAUTH_LOGINS_TOTAL
            .with_label_values(&["session_error"])
            .inc();
        return error_redirect(ERROR_AUTH_FAILED);
    }

    match authorize_url(&state.config, &oauth_state) {
        Ok(url) => {
            tracing::debug!("Redirecting to GitHub authorization page");
            Redirect::to(url.as_str())
        }
        Err(error) => {
            tracing::error!(%error, "Failed to build GitHub authorize URL");
            error_redirect(ERROR_AUTH_FAILED)
        }
    }
}

// =============================================================================
// Callback
// =============================================================================

/// Query parameters from GitHub callback
#[derive(Debug, Deserialize)]
struct CallbackQuery {
    /// Authorization code
    code: Option<String>,
    /// CSRF state token
    state: Option<String>,
    /// Set by GitHub when the user denies access
    error: Option<String>,
}

/// GET /callback
///
/// # Steps
/// 1. Consume the stored CSRF state (single use), even if the query is malformed
/// 2. Verify it against the query `state`
/// 3. Exchange code for access token
/// 4. Store the token under a fresh session id and wait for the write
/// 5. Set the new cookie and redirect to home
///
/// Every failure redirects with an error indicator except a failed token
/// write, which is returned as a server error.
async fn callback(
    State(state): State<AppState>,
    SessionHandle(id): SessionHandle,
    jar: CookieJar,
    query: Result<Query<CallbackQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let expected = match state.sessions.take_state(&id).await {
        Ok(expected) => expected,
        Err(error) => {
            tracing::error!(%error, "Failed to read OAuth state from session");
            return Ok(login_failed("session_error", ERROR_AUTH_FAILED));
        }
    };

    // A malformed query still burns the pending state.
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => {
            tracing::warn!(error = %rejection.body_text(), "Rejecting malformed OAuth callback");
            return Ok(login_failed("invalid_state", ERROR_INVALID_STATE));
        }
    };

    if let Err(error) = verify_state(expected.as_deref(), query.state.as_deref()) {
        tracing::warn!(
            %error,
            pending = expected.is_some(),
            supplied = query.state.is_some(),
            "Rejecting OAuth callback"
        );
        return Ok(login_failed("invalid_state", ERROR_INVALID_STATE));
    }

    if let Some(provider_error) = query.error.as_deref() {
        tracing::warn!(provider_error = %provider_error, "GitHub authorization was not granted");
        return Ok(login_failed("denied", ERROR_AUTH_FAILED));
    }

    let Some(code) = query.code.as_deref().filter(|code| !code.is_empty()) else {
        tracing::warn!("OAuth callback without authorization code");
        return Ok(login_failed("missing_code", ERROR_AUTH_FAILED));
    };

    let redirect_uri = state.config.server.redirect_uri();
    let request = TokenExchangeRequest {
        client_id: &state.config.github.client_id,
        client_secret: &state.config.github.client_secret,
        code,
        redirect_uri: &redirect_uri,
    };

    let access_token = match state.github.exchange_code_for_token(&request).await {
        Ok(token) => token,
        Err(error) => {
            tracing::error!(%error, kind = error.kind(), "GitHub access token exchange failed");
            return Ok(login_failed("exchange_error", ERROR_AUTH_FAILED));
        }
    };

    // New id on privilege change; the old one was emptied by take_state.
    let authenticated_id = SessionId::generate();
    if let Err(error) = state
        .sessions
        .put(&authenticated_id, &SessionRecord::authenticated(access_token))
        .await
    {
        OAUTH_LOGINS_TOTAL
            .with_label_values(&["session_error"])
            .inc();
        return Err(error);
    }

    let jar = jar.add(session_cookie(&state.config, &authenticated_id)?);

    OAUTH_LOGINS_TOTAL.with_label_values(&["success"]).inc();
    tracing::info!("GitHub login completed");

    Ok((cookie_issued(), jar, Redirect::to("/")).into_response())
}

// =============================================================================
// Logout
// =============================================================================

/// GET /logout
///
/// Destroys the session record, clears the cookie and redirects home.
/// A failed destroy is logged and otherwise ignored.
async fn logout(
    State(state): State<AppState>,
    SessionHandle(id): SessionHandle,
    jar: CookieJar,
) -> impl IntoResponse {
    if let Err(error) = state.sessions.destroy(&id).await {
        tracing::warn!(%error, "Failed to destroy session during logout");
    }

    let jar = jar.add(clear_session_cookie(&state.config));
    (cookie_issued(), jar, Redirect::to("/"))
}

// =============================================================================
// Helpers
// =============================================================================

/// Generate a random CSRF state token
pub fn generate_oauth_state() -> String {
    let mut bytes = [0_u8; OAUTH_STATE_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Verify the callback's `state` against the value stored in the session
///
/// Fails when either side is missing, when the supplied value is empty,
/// or when the bytes differ.
pub fn verify_state(expected: Option<&str>, supplied: Option<&str>) -> Result<(), AppError> {
    match (expected, supplied) {
        (Some(expected), Some(supplied))
            if !supplied.is_empty() && bool::from(expected.as_bytes().ct_eq(supplied.as_bytes())) =>
        {
            Ok(())
        }
        _ => Err(AppError::StateMismatch),
    }
}

/// GitHub authorize URL for a login attempt
pub fn authorize_url(config: &AppConfig, oauth_state: &str) -> Result<Url, AppError> {
    let mut url = Url::parse(&config.github.authorize_url)
        .map_err(|e| AppError::Config(format!("github.authorize_url is invalid: {e}")))?;

    url.query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("client_id", &config.github.client_id)
        .append_pair("redirect_uri", &config.server.redirect_uri())
        .append_pair("scope", &config.github.scope)
        .append_pair("state", oauth_state);

    Ok(url)
}

fn error_redirect(indicator: &str) -> Redirect {
    Redirect::to(&format!("/?error={indicator}"))
}

fn login_failed(outcome: &str, indicator: &str) -> Response {
    OAUTH_LOGINS_TOTAL.with_label_values(&[outcome]).inc();
    error_redirect(indicator).into_response()
}
