//! Metadata providers behind a single trait-based capability.
//!
//! Every provider implements [`Source`]: one lookup query in, at most one
//! [`ProviderResult`] out. Providers normalize their own payloads into a
//! [`CanonicalRecord`](crate::models::CanonicalRecord) before returning, so the
//! cascade never sees provider-specific shapes.
//!
//! # Providers
//!
//! Offline (always compiled, no network):
//!
//! - `famous_cases` - landmark US cases with short-name aliases
//! - `uk_neutral` - UK neutral citations such as `[2024] UKSC 12`
//! - `interview`, `newspaper`, `government`, `web_page` - records derived from the query
//!   text or URL
//!
//! Network (each behind a Cargo feature, all enabled by default):
//!
//! - `source-semantic` - Semantic Scholar
//! - `source-crossref` - Crossref
//! - `source-openalex` - OpenAlex
//! - `source-pubmed` - PubMed E-utilities
//! - `source-courtlistener` - CourtListener opinion search
//! - `source-google-books` - Google Books
//! - `source-open-library` - Open Library
//! - `source-google-cse` - Google Custom Search (needs an API key and engine id)
//!
//! # Runtime Configuration
//!
//! Providers can be switched off per id without recompiling:
//!
//! ```toml
//! [providers.google_cse]
//! enabled = false
//!
//! [providers.crossref]
//! min_confidence = 0.6
//! requests_per_second = 5.0
//! ```
//!
//! A provider that is disabled, or lacks the credentials it needs, is simply not
//! registered; the cascade skips ids it cannot find.

#[cfg(feature = "source-courtlistener")]
mod courtlistener;
#[cfg(feature = "source-crossref")]
mod crossref;
mod extractors;
mod famous_cases;
#[cfg(feature = "source-google-books")]
mod google_books;
#[cfg(feature = "source-google-cse")]
mod google_cse;
#[cfg(feature = "source-open-library")]
mod open_library;
#[cfg(feature = "source-openalex")]
mod openalex;
#[cfg(feature = "source-pubmed")]
mod pubmed;
mod registry;
#[cfg(feature = "source-semantic")]
mod semantic;
mod uk_citation;

pub mod mock;

pub use mock::{MockBehavior, MockSource};

pub use extractors::{GovernmentExtractor, InterviewExtractor, NewspaperExtractor, WebPageExtractor};
pub use famous_cases::{FamousCase, FamousCasesSource, FAMOUS_CASES};
pub use registry::{CascadePlan, SourceCapabilities, SourceRegistry};
pub use uk_citation::UkNeutralCitationSource;

#[cfg(feature = "source-courtlistener")]
pub use courtlistener::CourtListenerSource;
#[cfg(feature = "source-crossref")]
pub use crossref::CrossRefSource;
#[cfg(feature = "source-google-books")]
pub use google_books::GoogleBooksSource;
#[cfg(feature = "source-google-cse")]
pub use google_cse::GoogleCseSource;
#[cfg(feature = "source-open-library")]
pub use open_library::OpenLibrarySource;
#[cfg(feature = "source-openalex")]
pub use openalex::OpenAlexSource;
#[cfg(feature = "source-pubmed")]
pub use pubmed::PubMedSource;
#[cfg(feature = "source-semantic")]
pub use semantic::SemanticScholarSource;

use crate::models::{CanonicalRecord, LookupQuery, ProviderResult, ReferenceType};
use crate::normalize::match_confidence;
use async_trait::async_trait;

/// The capability every metadata provider exposes.
///
/// # Implementing a New Source
///
/// 1. Create a struct that implements `Source`
/// 2. Map the provider's payload into a `CanonicalRecord` inside `search`
/// 3. Return `Ok(ProviderResult::no_match(..))` when nothing fits; reserve `Err` for
///    transport, auth and parse failures
/// 4. Register it in `SourceRegistry::from_config` and add its id to a `CascadePlan`
#[async_trait]
pub trait Source: Send + Sync + std::fmt::Debug {
    /// Unique identifier, used in cascade plans and config (e.g. "crossref")
    fn id(&self) -> &str;

    /// Human-readable name of this source
    fn name(&self) -> &str;

    /// Describe the capabilities of this source
    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::SEARCH
    }

    /// Whether this source answers without network calls
    fn is_offline(&self) -> bool {
        self.capabilities().contains(SourceCapabilities::OFFLINE)
    }

    /// The provider's own minimum acceptable match confidence, if it has one
    fn min_confidence(&self) -> Option<f64> {
        None
    }

    /// Find the single best match for `query`
    async fn search(&self, query: &LookupQuery) -> Result<ProviderResult, SourceError>;
}

/// Errors that can occur when talking to a provider
///
/// "Nothing matched" is never an error; providers return
/// [`ProviderResult::no_match`] for that.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(String),

    /// Parsing error (JSON, HTML, etc.)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Unexpected API response
    #[error("API error: {0}")]
    Api(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimit,

    /// Missing or rejected credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// IO error (file system)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("Error: {0}")]
    Other(String),
}

/// Pick the candidate that best answers `query`
///
/// Candidates without minimum data are dropped. Scores come from
/// [`match_confidence`]; on a tie the provider's own ranking (input order) wins.
pub(crate) fn best_match<I>(provider: &str, query: &str, candidates: I) -> ProviderResult
where
    I: IntoIterator<Item = CanonicalRecord>,
{
    let mut best: Option<(CanonicalRecord, f64)> = None;
    for record in candidates {
        if !record.has_minimum_data() {
            continue;
        }
        let score = match_confidence(query, &record);
        if best.as_ref().map_or(true, |(_, top)| score > *top) {
            best = Some((record, score));
        }
    }

    match best {
        Some((record, score)) => ProviderResult::matched(provider, record, score),
        None => ProviderResult::no_match(provider),
    }
}

/// Type for an article-like record: medical when the query was routed as medical
pub(crate) fn article_type(routed: ReferenceType) -> ReferenceType {
    match routed {
        ReferenceType::Medical => ReferenceType::Medical,
        _ => ReferenceType::Journal,
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_capabilities() {
        let caps = SourceCapabilities::SEARCH | SourceCapabilities::OFFLINE;

        assert!(caps.contains(SourceCapabilities::SEARCH));
        assert!(caps.contains(SourceCapabilities::OFFLINE));
        assert!(!caps.contains(SourceCapabilities::DOI_LOOKUP));
    }

    #[test]
    fn test_offline_sources_report_offline() {
        let source = FamousCasesSource::new();
        assert!(source.is_offline());
        assert!(source.capabilities().contains(SourceCapabilities::SEARCH));
    }

    #[test]
    fn test_error_conversion() {
        let err: SourceError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, SourceError::Parse(_)));
    }
}
