//! End-to-end resolution: route the query, run the cascade, format the record.
//!
//! Provider and classifier failures never leave this module; callers only ever see
//! [`ResolveError::NotFound`] or [`ResolveError::InvalidStyle`].

use futures_util::stream::{self, StreamExt};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::sync::Arc;
use std::time::Duration;

use crate::cascade::{CascadeOrchestrator, ProviderAttempt};
use crate::classifier::{Classifier, GeminiClassifier};
use crate::config::Config;
use crate::formatters;
use crate::models::{CanonicalRecord, Citation, CitationStyle, DetectionResult, ReferenceType};
use crate::router::{ConfidenceRouter, Routing};
use crate::sources::{CascadePlan, SourceError, SourceRegistry};
use crate::utils::{CacheService, HttpClient};

/// The only failures a caller of the pipeline can see
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResolveError {
    /// Every provider in the plan was tried without an acceptable match
    #[error("no record found for '{query}'")]
    NotFound { query: String, tried: Vec<String> },

    /// The style name does not map to a supported style
    #[error("unsupported citation style: '{0}'")]
    InvalidStyle(String),
}

impl ResolveError {
    /// Short machine-readable kind
    pub fn kind(&self) -> &'static str {
        match self {
            ResolveError::NotFound { .. } => "not_found",
            ResolveError::InvalidStyle(_) => "invalid_style",
        }
    }
}

impl From<crate::models::UnsupportedStyle> for ResolveError {
    fn from(err: crate::models::UnsupportedStyle) -> Self {
        ResolveError::InvalidStyle(err.0)
    }
}

/// A resolved query: the record, its citation, and how it was found
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub query: String,
    pub detection: DetectionResult,
    /// Whether the AI classifier was consulted
    pub escalated: bool,
    pub provider: String,
    pub confidence: f64,
    pub record: CanonicalRecord,
    pub citation: Citation,
    pub attempts: Vec<ProviderAttempt>,
}

/// One entry of a batch, in input order
#[derive(Debug, Clone, PartialEq)]
pub struct BatchItem {
    pub query: String,
    pub result: Result<Resolution, ResolveError>,
}

impl BatchItem {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

impl Serialize for BatchItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.result {
            Ok(resolution) => {
                let mut state = serializer.serialize_struct("BatchItem", 3)?;
                state.serialize_field("query", &self.query)?;
                state.serialize_field("status", "resolved")?;
                state.serialize_field("resolution", resolution)?;
                state.end()
            }
            Err(error) => {
                let tried: &[String] = match error {
                    ResolveError::NotFound { tried, .. } => tried,
                    ResolveError::InvalidStyle(_) => &[],
                };
                let mut state = serializer.serialize_struct("BatchItem", 4)?;
                state.serialize_field("query", &self.query)?;
                state.serialize_field("status", error.kind())?;
                state.serialize_field("error", &error.to_string())?;
                state.serialize_field("tried", tried)?;
                state.end()
            }
        }
    }
}

/// An acceptable match offered as one of several choices
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub provider: String,
    pub confidence: f64,
    pub record: CanonicalRecord,
    pub citation: Citation,
}

/// Parse a style name, surfacing unknown names as `InvalidStyle`
pub fn parse_style(style: &str) -> Result<CitationStyle, ResolveError> {
    Ok(style.parse::<CitationStyle>()?)
}

/// Owns the router and the cascade; cheap to share behind an `Arc`
#[derive(Debug, Clone)]
pub struct Resolver {
    router: ConfidenceRouter,
    cascade: CascadeOrchestrator,
    max_concurrent: usize,
}

impl Resolver {
    /// Resolver wired from configuration: every available provider, the Gemini
    /// classifier when a key is present, and the lookup cache when enabled
    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        let registry = Arc::new(SourceRegistry::from_config(config)?);

        let classifier: Option<Arc<dyn Classifier>> = match &config.api_keys.gemini {
            Some(key) if config.routing.ai_enabled => {
                let client = Arc::new(HttpClient::with_user_agent(&config.http.user_agent)?);
                Some(Arc::new(GeminiClassifier::new(
                    client,
                    key.clone(),
                    config.routing.ai_model.clone(),
                )))
            }
            _ => None,
        };
        let router = ConfidenceRouter::from_config(&config.routing, classifier);

        let mut cascade = CascadeOrchestrator::from_config(registry, config);
        if config.cache.enabled {
            let cache = CacheService::from_config(config.cache.clone());
            match cache.initialize() {
                Ok(()) => cascade = cascade.with_cache(Arc::new(cache)),
                Err(e) => tracing::warn!("Lookup cache unavailable, continuing without it: {}", e),
            }
        }

        tracing::debug!(
            "Resolver ready: {} provider(s), classifier {}",
            cascade.registry().len(),
            if router.has_classifier() { "on" } else { "off" }
        );

        Ok(Self {
            router,
            cascade,
            max_concurrent: config.cascade.max_concurrent.max(1),
        })
    }

    pub fn builder(registry: Arc<SourceRegistry>) -> ResolverBuilder {
        ResolverBuilder::new(registry)
    }

    pub fn router(&self) -> &ConfidenceRouter {
        &self.router
    }

    pub fn cascade(&self) -> &CascadeOrchestrator {
        &self.cascade
    }

    /// Route `query` without resolving it
    pub async fn detect(&self, query: &str) -> Routing {
        self.router.route(query).await
    }

    /// Resolve one query into a record and a citation in `style`
    pub async fn resolve(&self, query: &str, style: &str) -> Result<Resolution, ResolveError> {
        let style = parse_style(style)?;
        self.resolve_with(query, style).await
    }

    async fn resolve_with(
        &self,
        query: &str,
        style: CitationStyle,
    ) -> Result<Resolution, ResolveError> {
        let routing = self.router.route(query).await;
        let detection = routing.detection;
        tracing::debug!(
            "'{}' routed as {} ({:.2})",
            query,
            detection.reference_type,
            detection.confidence
        );

        let outcome = self.cascade.run(detection.reference_type, query).await?;
        let record = retag(outcome.record, detection.reference_type);
        let citation = formatters::format_citation(&record, style);

        Ok(Resolution {
            query: query.to_string(),
            detection,
            escalated: routing.escalated,
            provider: outcome.provider,
            confidence: outcome.confidence,
            record,
            citation,
            attempts: outcome.attempts,
        })
    }

    /// Resolve every query independently, preserving input order
    ///
    /// The style is checked once up front; after that a failing query only fails its
    /// own item.
    pub async fn resolve_many<I, S>(
        &self,
        queries: I,
        style: &str,
    ) -> Result<Vec<BatchItem>, ResolveError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let style = parse_style(style)?;
        let items = stream::iter(queries.into_iter().map(Into::into))
            .map(|query: String| async move {
                let result = self.resolve_with(&query, style).await;
                BatchItem { query, result }
            })
            .buffered(self.max_concurrent)
            .collect::<Vec<_>>()
            .await;

        let resolved = items.iter().filter(|item| item.is_ok()).count();
        tracing::info!("Batch finished: {}/{} resolved", resolved, items.len());
        Ok(items)
    }

    /// Every acceptable match across the plan, each formatted in `style`
    pub async fn candidates(
        &self,
        query: &str,
        style: &str,
        limit: usize,
    ) -> Result<Vec<Candidate>, ResolveError> {
        let style = parse_style(style)?;
        let routing = self.router.route(query).await;
        let reference_type = routing.detection.reference_type;

        let candidates = self
            .cascade
            .candidates(reference_type, query, limit)
            .await
            .into_iter()
            .filter_map(|result| {
                let record = retag(result.record?, reference_type);
                let citation = formatters::format_citation(&record, style);
                Some(Candidate {
                    provider: result.provider,
                    confidence: result.confidence,
                    record,
                    citation,
                })
            })
            .collect();
        Ok(candidates)
    }
}

/// Format an already-known record
pub fn format_record(record: &CanonicalRecord, style: &str) -> Result<Citation, ResolveError> {
    Ok(formatters::format_citation(record, parse_style(style)?))
}

/// Short-form (subsequent) citation for an already-known record
pub fn format_short(
    record: &CanonicalRecord,
    style: &str,
    pinpoint: Option<&str>,
) -> Result<Citation, ResolveError> {
    Ok(formatters::format_short(record, parse_style(style)?, pinpoint))
}

/// Give generic provider records the routed type, so they are formatted by its rules
fn retag(record: CanonicalRecord, routed: ReferenceType) -> CanonicalRecord {
    if record.reference_type() == ReferenceType::Unknown && routed != ReferenceType::Unknown {
        record.to_builder().reference_type(routed).build()
    } else {
        record
    }
}

/// Assembles a [`Resolver`] from parts
#[derive(Debug)]
pub struct ResolverBuilder {
    router: ConfidenceRouter,
    cascade: CascadeOrchestrator,
    max_concurrent: usize,
}

impl ResolverBuilder {
    pub fn new(registry: Arc<SourceRegistry>) -> Self {
        Self {
            router: ConfidenceRouter::default(),
            cascade: CascadeOrchestrator::new(registry),
            max_concurrent: 4,
        }
    }

    pub fn router(mut self, router: ConfidenceRouter) -> Self {
        self.router = router;
        self
    }

    pub fn classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.router = self.router.with_classifier(classifier);
        self
    }

    pub fn plan(mut self, plan: CascadePlan) -> Self {
        self.cascade = self.cascade.with_plan(plan);
        self
    }

    pub fn provider_timeout(mut self, timeout: Duration) -> Self {
        self.cascade = self.cascade.with_timeout(timeout);
        self
    }

    pub fn min_confidence(mut self, min_confidence: f64) -> Self {
        self.cascade = self.cascade.with_min_confidence(min_confidence);
        self
    }

    pub fn cache(mut self, cache: Arc<CacheService>) -> Self {
        self.cascade = self.cascade.with_cache(cache);
        self
    }

    pub fn max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn build(self) -> Resolver {
        Resolver {
            router: self.router,
            cascade: self.cascade,
            max_concurrent: self.max_concurrent,
        }
    }
}
