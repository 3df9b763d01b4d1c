//! Utility modules supporting provider calls.
//!
//! - [`HttpClient`]: shared HTTP client with an optional client-side rate limit
//! - [`RetryConfig`] / [`with_retry`]: exponential backoff for transient provider errors
//! - [`CacheService`]: file-backed cache of provider lookups
//!
//! # Retry with Backoff
//!
//! ```rust,no_run
//! use citeflex::sources::SourceError;
//! use citeflex::utils::{with_retry, RetryConfig};
//!
//! # async fn fetch_data() -> Result<String, SourceError> { Ok("data".to_string()) }
//! # #[tokio::main]
//! # async fn main() -> Result<(), SourceError> {
//! let result = with_retry(RetryConfig::default(), || async { fetch_data().await }).await?;
//! # Ok(())
//! # }
//! ```

mod cache;
mod http;
mod retry;

pub use cache::{CacheResult, CacheService, CacheStats};
pub use http::HttpClient;
pub use retry::{api_retry_config, with_retry, RetryConfig, TransientError};
