//! Session identifiers and records
//!
//! The browser only ever holds a signed session id. The CSRF state and the
//! access token live in the session store.

use std::fmt;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

const SESSION_ID_BYTES: usize = 32;

/// Opaque session identifier
///
/// Not `Display`; the id is a bearer credential.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh random session id
    pub fn generate() -> Self {
        let mut bytes = [0_u8; SESSION_ID_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn parse(raw: &str) -> Option<Self> {
        let decoded = URL_SAFE_NO_PAD.decode(raw).ok()?;
        (decoded.len() == SESSION_ID_BYTES).then(|| Self(raw.to_string()))
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionId(..)")
    }
}

/// Server-side session state
///
/// A session with no stored record is `Anonymous`.
#[derive(Clone, PartialEq, Eq, Default)]
pub enum SessionRecord {
    #[default]
    Anonymous,
    /// Login started; `state` must come back on the callback
    AwaitingCallback { state: String },
    /// Login completed
    Authenticated { access_token: String },
}

impl SessionRecord {
    pub fn authenticated(access_token: impl Into<String>) -> Self {
        Self::Authenticated {
            access_token: access_token.into(),
        }
    }

    pub fn access_token(&self) -> Option<&str> {
        match self {
            Self::Authenticated { access_token } => Some(access_token),
            _ => None,
        }
    }
}

impl fmt::Debug for SessionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => f.write_str("Anonymous"),
            Self::AwaitingCallback { .. } => f
                .debug_struct("AwaitingCallback")
                .field("state", &"<redacted>")
                .finish(),
            Self::Authenticated { .. } => f
                .debug_struct("Authenticated")
                .field("access_token", &"<redacted>")
                .finish(),
        }
    }
}

/// Create the signed cookie value for a session id
///
/// Format: `{session_id}.base64(hmac_sha256(session_id))`
pub fn sign_session_id(id: &SessionId, secret: &str) -> Result<String, AppError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid session secret: {e}")))?;
    mac.update(id.as_str().as_bytes());
    let signature = mac.finalize().into_bytes();

    Ok(format!("{}.{}", id.as_str(), URL_SAFE_NO_PAD.encode(signature)))
}

/// Verify a signed cookie value and return the session id it carries
///
/// Returns `None` for malformed values and bad signatures alike.
pub fn verify_session_cookie(value: &str, secret: &str) -> Option<SessionId> {
    let (raw_id, signature_b64) = value.split_once('.')?;
    let id = SessionId::parse(raw_id)?;
    let signature = URL_SAFE_NO_PAD.decode(signature_b64).ok()?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(id.as_str().as_bytes());
    mac.verify_slice(&signature).ok()?;

    Some(id)
}
