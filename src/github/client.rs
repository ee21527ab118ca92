//! Outbound HTTP helper
//!
//! One entry point, [`ApiClient::request`], used for every call to GitHub.

use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};

use crate::error::AppError;
use crate::metrics::PROVIDER_REQUESTS_TOTAL;

const ACCEPT_JSON: &str = "application/vnd.github.v3+json, application/json";
const USER_AGENT: &str = concat!("ghportal/", env!("CARGO_PKG_VERSION"));

/// JSON-over-HTTP client with optional form body and bearer token
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
}

impl ApiClient {
    /// Build a client with the fixed `Accept` and `User-Agent` headers
    ///
    /// # Arguments
    /// * `timeout` - Per-request timeout applied by the transport
    pub fn new(timeout: Duration) -> Result<Self, AppError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_JSON));

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self { http })
    }

    /// Send a request and decode the JSON response
    ///
    /// `form` switches the request to a form-encoded POST; without it the
    /// request is a GET. `bearer` adds `Authorization: Bearer <token>`.
    ///
    /// # Errors
    /// * `AppError::Request` - non-2xx status, carrying the raw body text
    /// * `AppError::Decode` - 2xx body that is not JSON
    /// * `AppError::HttpClient` - transport failure
    pub async fn request(
        &self,
        url: &str,
        form: Option<&[(&str, &str)]>,
        bearer: Option<&str>,
    ) -> Result<serde_json::Value, AppError> {
        let (method, mut builder) = match form {
            Some(fields) => ("POST", self.http.post(url).form(fields)),
            None => ("GET", self.http.get(url)),
        };

        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }

        tracing::debug!(%url, method, "Sending provider request");

        let response = builder.send().await.map_err(|error| {
            tracing::warn!(%url, method, error = %error, "Provider request failed");
            PROVIDER_REQUESTS_TOTAL
                .with_label_values(&[method, "transport_error"])
                .inc();
            AppError::HttpClient(error)
        })?;

        let status = response.status();
        PROVIDER_REQUESTS_TOTAL
            .with_label_values(&[method, status.as_str()])
            .inc();

        let body = response.text().await?;

        if !status.is_success() {
            tracing::warn!(
                %url,
                method,
                status = status.as_u16(),
                "Provider responded with error status"
            );
            return Err(AppError::Request {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|error| {
            tracing::warn!(%url, method, status = status.as_u16(), %error, "Provider returned invalid JSON");
            AppError::Decode(error.to_string())
        })
    }
}
