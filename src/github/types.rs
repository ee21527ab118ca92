//! GitHub wire types
//!
//! Read-only projections of the JSON GitHub returns. Only the fields the
//! application renders are kept; everything else is ignored on decode.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Authenticated user, from `GET /user`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub login: String,
    pub id: u64,
    pub avatar_url: String,
    /// Display name; GitHub returns null when unset
    pub name: Option<String>,
}

/// Repository, from `GET /user/repos`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub html_url: String,
    pub description: Option<String>,
    pub language: Option<String>,
    pub stargazers_count: u64,
    pub forks_count: u64,
}

/// Inputs of the code-for-token call
#[derive(Debug, Clone)]
pub struct TokenExchangeRequest<'a> {
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub code: &'a str,
    pub redirect_uri: &'a str,
}

impl TokenExchangeRequest<'_> {
    /// Form fields sent to the token endpoint
    pub fn form_fields(&self) -> [(&str, &str); 5] {
        [
            ("grant_type", "authorization_code"),
            ("client_id", self.client_id),
            ("client_secret", self.client_secret),
            ("code", self.code),
            ("redirect_uri", self.redirect_uri),
        ]
    }
}

/// Raw token endpoint body
///
/// GitHub answers some failures with HTTP 200 and an `error` field.
#[derive(Debug, Deserialize)]
struct TokenResponseBody {
    access_token: Option<String>,
    error: Option<String>,
}

/// Classified token endpoint answer: exactly one of token or error code
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenExchangeOutcome {
    Granted { access_token: String },
    Denied { error_code: String },
}

impl TokenExchangeOutcome {
    /// Classify a decoded token endpoint body
    ///
    /// An `error` field wins over a token, and a body with neither is
    /// treated as denied.
    pub fn from_json(body: serde_json::Value) -> Result<Self, AppError> {
        let body: TokenResponseBody = serde_json::from_value(body)?;

        match (body.error, body.access_token) {
            (Some(error_code), _) => Ok(Self::Denied { error_code }),
            (None, Some(access_token)) if !access_token.is_empty() => {
                Ok(Self::Granted { access_token })
            }
            (None, _) => Ok(Self::Denied {
                error_code: "missing_access_token".to_string(),
            }),
        }
    }

    pub fn into_access_token(self) -> Result<String, AppError> {
        match self {
            Self::Granted { access_token } => Ok(access_token),
            Self::Denied { error_code } => Err(AppError::TokenExchange(error_code)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_payload_with_success_status_is_denied() {
        let outcome =
            TokenExchangeOutcome::from_json(json!({"error": "bad_verification_code"})).unwrap();
        assert_eq!(
            outcome,
            TokenExchangeOutcome::Denied {
                error_code: "bad_verification_code".to_string()
            }
        );
        assert!(matches!(
            outcome.into_access_token(),
            Err(AppError::TokenExchange(code)) if code == "bad_verification_code"
        ));
    }

    #[test]
    fn token_payload_is_granted() {
        let outcome = TokenExchangeOutcome::from_json(
            json!({"access_token": "abc123", "token_type": "bearer"}),
        )
        .unwrap();
        assert_eq!(outcome.into_access_token().unwrap(), "abc123");
    }

    #[test]
    fn error_wins_over_token() {
        let outcome = TokenExchangeOutcome::from_json(
            json!({"access_token": "abc123", "error": "incorrect_client_credentials"}),
        )
        .unwrap();
        assert!(matches!(outcome, TokenExchangeOutcome::Denied { .. }));
    }

    #[test]
    fn body_without_token_is_denied() {
        let outcome = TokenExchangeOutcome::from_json(json!({"token_type": "bearer"})).unwrap();
        assert_eq!(
            outcome,
            TokenExchangeOutcome::Denied {
                error_code: "missing_access_token".to_string()
            }
        );
    }

    #[test]
    fn non_object_body_is_decode_error() {
        let result = TokenExchangeOutcome::from_json(json!(["not", "an", "object"]));
        assert!(matches!(result, Err(AppError::Decode(_))));
    }

    #[test]
    fn repository_accepts_null_description_and_language() {
        let repo: Repository = serde_json::from_value(json!({
            "id": 7,
            "name": "demo",
            "full_name": "octocat/demo",
            "html_url": "https://github.com/octocat/demo",
            "description": null,
            "language": null,
            "stargazers_count": 3,
            "forks_count": 1,
            "private": false
        }))
        .unwrap();
        assert_eq!(repo.description, None);
        assert_eq!(repo.full_name, "octocat/demo");
    }

    #[test]
    fn token_request_form_includes_grant_type() {
        let request = TokenExchangeRequest {
            client_id: "id",
            client_secret: "secret",
            code: "code",
            redirect_uri: "http://localhost:3000/callback",
        };
        let fields = request.form_fields();
        assert_eq!(fields[0], ("grant_type", "authorization_code"));
        assert!(fields.contains(&("code", "code")));
    }
}
