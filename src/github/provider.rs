//! GitHub API operations used by the portal

use std::time::Duration;

use super::client::ApiClient;
use super::types::{Repository, TokenExchangeOutcome, TokenExchangeRequest, UserProfile};
use crate::config::GitHubConfig;
use crate::error::AppError;

/// GitHub client bound to the configured endpoints
#[derive(Debug, Clone)]
pub struct GitHubClient {
    api: ApiClient,
    token_url: String,
    api_url: String,
}

impl GitHubClient {
    pub fn new(config: &GitHubConfig) -> Result<Self, AppError> {
        let api = ApiClient::new(Duration::from_secs(config.request_timeout_seconds))?;

        Ok(Self {
            api,
            token_url: config.token_url.clone(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    /// Exchange an authorization code for an access token
    ///
    /// A 2xx answer is only a success when it carries `access_token` and no
    /// `error`; GitHub reports bad codes with HTTP 200.
    ///
    /// # Errors
    /// * `AppError::TokenExchange` - provider refused the code
    /// * any error of [`ApiClient::request`]
    pub async fn exchange_code_for_token(
        &self,
        request: &TokenExchangeRequest<'_>,
    ) -> Result<String, AppError> {
        let form = request.form_fields();
        let body = self.api.request(&self.token_url, Some(form.as_slice()), None).await?;

        let outcome = TokenExchangeOutcome::from_json(body)?;
        if let TokenExchangeOutcome::Denied { error_code } = &outcome {
            tracing::warn!(
                url = %self.token_url,
                error_code = %error_code,
                "Token exchange refused by provider"
            );
        }

        outcome.into_access_token()
    }

    /// Fetch the profile of the token's owner
    pub async fn fetch_user_profile(&self, access_token: &str) -> Result<UserProfile, AppError> {
        let url = format!("{}/user", self.api_url);
        let body = self.api.request(&url, None, Some(access_token)).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// Fetch the token owner's repositories, newest first
    pub async fn fetch_user_repositories(
        &self,
        access_token: &str,
    ) -> Result<Vec<Repository>, AppError> {
        let url = format!("{}/user/repos?sort=created&direction=desc", self.api_url);
        let body = self.api.request(&url, None, Some(access_token)).await?;
        Ok(serde_json::from_value(body)?)
    }
}
