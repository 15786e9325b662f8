//! Remote service client for the RustMaps API
//!
//! The module is organized into specialized components:
//! - `config`: HTTP client configuration and building
//! - `rate_limit`: the global pacing monitor shared by every call
//! - `response`: mapping of status codes and bodies onto request state
//! - `types`: wire types of the API envelopes
//! - `fake`: in-memory implementation used by tests

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use tracing::{debug, info};
use url::Url;

use crate::app::models::MapRequest;
use crate::constants::api;
use crate::errors::{ApiError, ApiResult};

pub mod config;
pub mod fake;
pub mod rate_limit;
pub mod response;
pub mod types;

pub use config::ClientConfig;
pub use fake::FakeMapsApi;
pub use rate_limit::RateLimiter;
pub use response::{apply_submission, interpret_quota, interpret_status};
pub use types::{GenerateResponse, QuotaSnapshot, StatusData, StatusReport};

/// Operations offered by the map generation service
///
/// Submissions write the resulting status back onto the request. Domain
/// rejections are reported both on the request and as an error so callers can
/// branch on either.
#[async_trait]
pub trait MapsApi: Send + Sync {
    /// Submit a map built from a saved configuration
    async fn submit_custom(&self, request: &mut MapRequest)
        -> ApiResult<Option<GenerateResponse>>;

    /// Submit a procedural map
    async fn submit_procedural(
        &self,
        request: &mut MapRequest,
    ) -> ApiResult<Option<GenerateResponse>>;

    /// Look up the current state of a map without touching the request
    async fn fetch_status(&self, request: &MapRequest) -> ApiResult<StatusReport>;

    /// Current account usage against its limits
    async fn fetch_quota(&self) -> ApiResult<QuotaSnapshot>;

    /// Replace the API key used for subsequent calls
    fn set_api_key(&mut self, api_key: String);
}

/// HTTP implementation of [`MapsApi`]
#[derive(Debug, Clone)]
pub struct RustMapsClient {
    http: Client,
    base_url: Url,
    api_key: String,
    rate_limiter: Arc<RateLimiter>,
}

impl RustMapsClient {
    /// Creates a client from configuration
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the base URL is invalid or the HTTP client cannot
    /// be built
    pub fn new(config: &ClientConfig, api_key: impl Into<String>) -> ApiResult<Self> {
        let http = config.build_http_client()?;
        let base_url = config.parsed_base_url()?;
        let rate_limiter = Arc::new(RateLimiter::per_minute(config.calls_per_minute));

        info!("Created RustMaps client for {}", base_url);

        Ok(Self {
            http,
            base_url,
            api_key: api_key.into(),
            rate_limiter,
        })
    }

    /// Underlying HTTP client, shared with the download manager
    pub fn http_client(&self) -> &Client {
        &self.http
    }

    /// API root the endpoints are resolved against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build an endpoint URL from path segments below the base
    fn endpoint(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| ApiError::InvalidUrl {
                url: self.base_url.to_string(),
                error: "URL cannot be used as a base".to_string(),
            })?;
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    /// Status endpoint: by map ID when known, otherwise by size and seed
    fn status_endpoint(&self, request: &MapRequest) -> ApiResult<Url> {
        if request.map_id.is_empty() {
            let size = request.size.to_string();
            self.endpoint(&[api::MAPS, size.as_str(), request.seed.as_str()])
        } else {
            self.endpoint(&[api::MAPS, request.map_id.as_str()])
        }
    }

    /// Pace, send and read a request; returns the status code and body text
    async fn execute(&self, request: RequestBuilder) -> ApiResult<(u16, String)> {
        self.rate_limiter.wait().await;

        let response = request
            .header(api::API_KEY_HEADER, self.api_key.as_str())
            .send()
            .await?;
        let code = response.status().as_u16();
        let body = response.text().await?;

        debug!(status = code, body = %body, "Response received");
        Ok((code, body))
    }

    async fn submit<B: serde::Serialize + Sync>(
        &self,
        url: Url,
        body: &B,
        request: &mut MapRequest,
    ) -> ApiResult<Option<GenerateResponse>> {
        debug!(
            seed = %request.seed,
            size = request.size,
            config = %request.saved_config,
            staging = request.staging,
            "Submitting map to {}",
            url
        );
        let (code, text) = self.execute(self.http.post(url).json(body)).await?;
        apply_submission(request, code, &text)
    }
}

#[async_trait]
impl MapsApi for RustMapsClient {
    async fn submit_custom(
        &self,
        request: &mut MapRequest,
    ) -> ApiResult<Option<GenerateResponse>> {
        let url = self.endpoint(&api::CUSTOM_SAVED_CONFIG[..])?;
        let body = types::CustomBody::from(&*request);
        self.submit(url, &body, request).await
    }

    async fn submit_procedural(
        &self,
        request: &mut MapRequest,
    ) -> ApiResult<Option<GenerateResponse>> {
        let url = self.endpoint(&[api::MAPS])?;
        let body = types::ProceduralBody::from(&*request);
        self.submit(url, &body, request).await
    }

    async fn fetch_status(&self, request: &MapRequest) -> ApiResult<StatusReport> {
        let url = self.status_endpoint(request)?;
        debug!(
            seed = %request.seed,
            size = request.size,
            staging = request.staging,
            "Getting map status"
        );
        let (code, text) = self.execute(self.http.get(url)).await?;
        interpret_status(code, &text)
    }

    async fn fetch_quota(&self) -> ApiResult<QuotaSnapshot> {
        let url = self.endpoint(&api::LIMITS[..])?;
        let (code, text) = self.execute(self.http.get(url)).await?;
        interpret_quota(code, &text)
    }

    fn set_api_key(&mut self, api_key: String) {
        self.api_key = api_key;
    }
}
