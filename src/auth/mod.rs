//! GitHub OAuth authentication
//!
//! Handles:
//! - GitHub OAuth flow
//! - Session ids, records and cookies
//! - Session middleware and extractors

mod middleware;
mod oauth;
pub mod session;

pub use middleware::{CurrentSession, SessionHandle, session_layer};
pub use oauth::{
    ERROR_AUTH_FAILED, ERROR_INVALID_STATE, auth_router, authorize_url, generate_oauth_state,
    verify_state,
};
pub use session::{SessionId, SessionRecord, sign_session_id, verify_session_cookie};
