//! Session middleware
//!
//! Gives every browser a signed session cookie and exposes the session
//! to handlers through extractors.

use axum::{
    Extension, async_trait,
    extract::{FromRef, FromRequestParts, State},
    http::{HeaderValue, Request, header::SET_COOKIE, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};

use super::session::{SessionId, SessionRecord, sign_session_id, verify_session_cookie};
use crate::AppState;
use crate::config::AppConfig;
use crate::error::AppError;

/// Response marker: the handler already set or cleared the session cookie
///
/// Returned as `Extension(SessionCookieIssued)` by handlers that rotate or
/// end the session, so the middleware does not issue a second cookie.
#[derive(Debug, Clone, Copy)]
pub struct SessionCookieIssued;

/// Build the session cookie for `id`
pub fn session_cookie(config: &AppConfig, id: &SessionId) -> Result<Cookie<'static>, AppError> {
    let value = sign_session_id(id, &config.session.secret)?;

    Ok(Cookie::build((config.session.cookie_name.clone(), value))
        .path("/")
        .http_only(true)
        .secure(config.should_use_secure_cookies())
        .same_site(SameSite::Lax)
        .build())
}

/// Build a cookie that makes the browser drop its session cookie
pub fn clear_session_cookie(config: &AppConfig) -> Cookie<'static> {
    let mut cookie = Cookie::build((config.session.cookie_name.clone(), String::new()))
        .path("/")
        .http_only(true)
        .build();
    cookie.make_removal();
    cookie
}

/// Middleware resolving the session id of every request
///
/// A valid signed cookie is reused; anything else gets a fresh id and a
/// `Set-Cookie` on the way out. The id is stored in request extensions.
///
/// # Usage
/// ```ignore
/// let app = Router::new()
///     .route("/", ...)
///     .layer(middleware::from_fn_with_state(state, session_layer));
/// ```
pub async fn session_layer(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let existing = jar
        .get(&state.config.session.cookie_name)
        .and_then(|cookie| verify_session_cookie(cookie.value(), &state.config.session.secret));

    let (id, is_new) = match existing {
        Some(id) => (id, false),
        None => (SessionId::generate(), true),
    };

    request.extensions_mut().insert(id.clone());

    let mut response = next.run(request).await;

    if is_new && response.extensions().get::<SessionCookieIssued>().is_none() {
        let cookie = session_cookie(&state.config, &id)?;
        let header = HeaderValue::from_str(&cookie.to_string())
            .map_err(|e| AppError::Internal(e.into()))?;
        response.headers_mut().append(SET_COOKIE, header);
    }

    Ok(response)
}

/// Extractor for the current session id, without touching the store
#[derive(Debug, Clone)]
pub struct SessionHandle(pub SessionId);

#[async_trait]
impl<S> FromRequestParts<S> for SessionHandle
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionId>()
            .cloned()
            .map(SessionHandle)
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("session layer is not installed")))
    }
}

/// Extractor for the current session id and its stored record
///
/// A session without a stored record is `Anonymous`.
///
/// # Usage
/// ```ignore
/// async fn handler(session: CurrentSession) -> impl IntoResponse {
///     match session.record.access_token() { ... }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub id: SessionId,
    pub record: SessionRecord,
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentSession
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let SessionHandle(id) = SessionHandle::from_request_parts(parts, state).await?;
        let app_state = AppState::from_ref(state);
        let record = app_state.sessions.get(&id).await?.unwrap_or_default();

        Ok(CurrentSession { id, record })
    }
}

/// Response part that marks the session cookie as handled
pub fn cookie_issued() -> Extension<SessionCookieIssued> {
    Extension(SessionCookieIssued)
}
