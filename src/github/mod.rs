//! GitHub integration
//!
//! - Generic JSON request helper
//! - OAuth token exchange
//! - User and repository endpoints

mod client;
mod provider;
mod types;

pub use client::ApiClient;
pub use provider::GitHubClient;
pub use types::{Repository, TokenExchangeOutcome, TokenExchangeRequest, UserProfile};
