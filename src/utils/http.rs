//! HTTP client utilities.

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

use crate::sources::SourceError;

/// Shared HTTP client with sensible defaults and an optional client-side rate limit
#[derive(Clone)]
pub struct HttpClient {
    client: Arc<Client>,
    limiter: Option<Arc<DefaultDirectRateLimiter>>,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("rate_limited", &self.limiter.is_some())
            .finish()
    }
}

impl HttpClient {
    /// Create a new HTTP client with the crate's user agent
    pub fn new() -> Result<Self, SourceError> {
        Self::with_user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ))
    }

    /// Create a new HTTP client with a custom user agent
    pub fn with_user_agent(user_agent: &str) -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| SourceError::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client: Arc::new(client),
            limiter: None,
        })
    }

    /// Limit outgoing requests to `requests_per_second` (fractions allowed)
    pub fn rate_limited(mut self, requests_per_second: Option<f32>) -> Self {
        self.limiter = requests_per_second
            .filter(|rps| rps.is_finite() && *rps > 0.0)
            .and_then(|rps| Quota::with_period(Duration::from_secs_f32(1.0 / rps)))
            .map(|quota| Arc::new(RateLimiter::direct(quota.allow_burst(nonzero!(1u32)))));
        self
    }

    /// Get the underlying client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Wait until the rate limiter admits another request
    async fn ready(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }

    /// Start a GET request once the rate limiter allows it
    pub async fn get(&self, url: &str) -> RequestBuilder {
        self.ready().await;
        self.client.get(url)
    }

    /// Start a POST request once the rate limiter allows it
    pub async fn post(&self, url: &str) -> RequestBuilder {
        self.ready().await;
        self.client.post(url)
    }

    /// Send a request and decode a JSON body
    ///
    /// A 404 is `Ok(None)`; callers treat it as "no match". Other failures are mapped
    /// onto [`SourceError`] so the retry layer can tell transient errors apart.
    pub async fn fetch_json<T: DeserializeOwned>(
        request: RequestBuilder,
        provider: &str,
    ) -> Result<Option<T>, SourceError> {
        let response = request.send().await?;
        let status = response.status();

        match status {
            StatusCode::NOT_FOUND => return Ok(None),
            StatusCode::TOO_MANY_REQUESTS => return Err(SourceError::RateLimit),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(SourceError::Unauthorized(format!(
                    "{} rejected the credentials ({})",
                    provider, status
                )))
            }
            s if s.is_server_error() => {
                return Err(SourceError::Network(format!(
                    "{} returned status: {}",
                    provider, status
                )))
            }
            s if !s.is_success() => {
                return Err(SourceError::Api(format!(
                    "{} returned status: {}",
                    provider, status
                )))
            }
            _ => {}
        }

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| SourceError::Parse(format!("{} JSON: {}", provider, e)))
    }
}
