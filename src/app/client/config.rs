//! HTTP client configuration and building logic
//!
//! This module handles the configuration and construction of the HTTP client
//! used for RustMaps API calls and asset downloads.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::constants::{api, http, limits};
use crate::errors::{ApiError, ApiResult};

/// Configuration of the remote service client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// API root, e.g. `https://api.rustmaps.com/v4`
    pub base_url: String,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Global ceiling on API calls; 0 disables pacing
    pub calls_per_minute: u32,
    /// User agent sent with every request
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: api::BASE_URL.to_string(),
            request_timeout: http::REQUEST_TIMEOUT,
            connect_timeout: http::CONNECT_TIMEOUT,
            calls_per_minute: limits::CALLS_PER_MINUTE,
            user_agent: http::USER_AGENT.to_string(),
        }
    }
}

impl ClientConfig {
    /// Builds the HTTP client with the specified configuration
    pub fn build_http_client(&self) -> ApiResult<Client> {
        Client::builder()
            .timeout(self.request_timeout)
            .connect_timeout(self.connect_timeout)
            .user_agent(self.user_agent.as_str())
            .tcp_nodelay(true)
            .build()
            .map_err(ApiError::Http)
    }

    /// Parse the base URL, normalised with a trailing slash so that endpoint
    /// segments append below it
    pub fn parsed_base_url(&self) -> ApiResult<Url> {
        let mut url = Url::parse(&self.base_url).map_err(|e| ApiError::InvalidUrl {
            url: self.base_url.clone(),
            error: e.to_string(),
        })?;

        if url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl {
                url: self.base_url.clone(),
                error: "URL cannot be used as a base".to_string(),
            });
        }

        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }
}
