//! Engine cascade: try providers in plan order until one gives an acceptable match.
//!
//! Provider calls are sequential. Each is bounded by its own timeout, and a timeout,
//! failure or weak match only moves the cascade on to the next provider. Every step
//! is kept as a [`ProviderAttempt`] so a resolution can explain itself.

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::models::{CanonicalRecord, LookupQuery, ProviderResult, ReferenceType};
use crate::normalize::normalize_title;
use crate::pipeline::ResolveError;
use crate::sources::{CascadePlan, Source, SourceCapabilities, SourceRegistry};
use crate::utils::{CacheResult, CacheService};

/// What happened when the cascade reached one provider
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// Matched at or above the provider's minimum; the cascade stopped here
    Accepted { confidence: f64 },
    /// Matched, but too weakly
    BelowThreshold { confidence: f64, minimum: f64 },
    /// No match, or a match without enough data to cite
    NoMatch,
    /// Transport, auth or parse failure
    Failed { error: String },
    /// The call outlived the per-provider timeout
    TimedOut,
    /// The plan names a provider that is not registered
    Unavailable,
    /// Answered from the lookup cache
    Cached { confidence: f64 },
}

impl AttemptOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            AttemptOutcome::Accepted { .. } => "accepted",
            AttemptOutcome::BelowThreshold { .. } => "below threshold",
            AttemptOutcome::NoMatch => "no match",
            AttemptOutcome::Failed { .. } => "failed",
            AttemptOutcome::TimedOut => "timed out",
            AttemptOutcome::Unavailable => "unavailable",
            AttemptOutcome::Cached { .. } => "cached",
        }
    }

    /// Whether this attempt produced the cascade's answer
    pub fn is_accepted(&self) -> bool {
        matches!(
            self,
            AttemptOutcome::Accepted { .. } | AttemptOutcome::Cached { .. }
        )
    }
}

/// One step of the cascade's audit trail
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderAttempt {
    pub provider: String,
    #[serde(flatten)]
    pub outcome: AttemptOutcome,
    pub elapsed_ms: u64,
}

/// The first acceptable match, plus how the cascade got there
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CascadeOutcome {
    pub provider: String,
    pub confidence: f64,
    pub record: CanonicalRecord,
    pub attempts: Vec<ProviderAttempt>,
}

/// Runs the per-type provider plan against a registry
#[derive(Debug, Clone)]
pub struct CascadeOrchestrator {
    registry: Arc<SourceRegistry>,
    plan: CascadePlan,
    provider_timeout: Duration,
    min_confidence: f64,
    provider_minimums: HashMap<String, f64>,
    cache: Option<Arc<CacheService>>,
}

impl CascadeOrchestrator {
    /// Orchestrator with the built-in plan, a 10 s timeout and a 0.5 minimum
    pub fn new(registry: Arc<SourceRegistry>) -> Self {
        Self {
            registry,
            plan: CascadePlan::default(),
            provider_timeout: Duration::from_secs(10),
            min_confidence: 0.5,
            provider_minimums: HashMap::new(),
            cache: None,
        }
    }

    pub fn from_config(registry: Arc<SourceRegistry>, config: &Config) -> Self {
        let provider_minimums = config
            .providers
            .iter()
            .filter_map(|(id, provider)| provider.min_confidence.map(|min| (id.clone(), min)))
            .collect();

        Self {
            registry,
            plan: CascadePlan::from_config(&config.cascade),
            provider_timeout: config.cascade.provider_timeout(),
            min_confidence: config.cascade.min_confidence,
            provider_minimums,
            cache: None,
        }
    }

    pub fn with_plan(mut self, plan: CascadePlan) -> Self {
        self.plan = plan;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    pub fn with_provider_minimum(mut self, provider: impl Into<String>, minimum: f64) -> Self {
        self.provider_minimums.insert(provider.into(), minimum);
        self
    }

    pub fn with_cache(mut self, cache: Arc<CacheService>) -> Self {
        self.cache = Some(cache).filter(|c| c.is_enabled());
        self
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn plan(&self) -> &CascadePlan {
        &self.plan
    }

    /// Minimum confidence for `source`: configured override, then the provider's own, then global
    fn minimum_for(&self, source: &dyn Source) -> f64 {
        self.provider_minimums
            .get(source.id())
            .copied()
            .or_else(|| source.min_confidence())
            .unwrap_or(self.min_confidence)
    }

    /// Plan order for `reference_type`, with providers that can look up an identifier
    /// carried by `query` moved ahead
    fn providers_for(&self, reference_type: ReferenceType, query: &str) -> Vec<String> {
        let wanted = SourceCapabilities::lookups_for(query);
        if !wanted.is_empty() {
            tracing::debug!("Query carries identifiers, preferring {:?} providers", wanted);
        }
        self.registry
            .prefer_capable(self.plan.providers_for(reference_type), wanted)
    }

    /// Resolve `query` as `reference_type`, stopping at the first acceptable match
    pub async fn run(
        &self,
        reference_type: ReferenceType,
        query: &str,
    ) -> Result<CascadeOutcome, ResolveError> {
        let lookup = LookupQuery::new(query, reference_type);
        let providers = self.providers_for(reference_type, query);
        let mut attempts = Vec::with_capacity(providers.len());

        for id in &providers {
            let (attempt, result) = self.attempt(id, &lookup).await;
            let accepted = attempt.outcome.is_accepted();
            tracing::debug!("{} -> {}", id, attempt.outcome.label());
            attempts.push(attempt);

            if accepted {
                if let Some(ProviderResult {
                    record: Some(record),
                    confidence,
                    ..
                }) = result
                {
                    tracing::info!("Resolved '{}' via {} ({:.2})", query, id, confidence);
                    return Ok(CascadeOutcome {
                        provider: id.clone(),
                        confidence,
                        record,
                        attempts,
                    });
                }
            }
        }

        tracing::info!(
            "No acceptable match for '{}' after {} provider(s)",
            query,
            attempts.len()
        );
        Err(ResolveError::NotFound {
            query: query.to_string(),
            tried: attempts
                .into_iter()
                .filter(|a| a.outcome != AttemptOutcome::Unavailable)
                .map(|a| a.provider)
                .collect(),
        })
    }

    /// Every acceptable match in the plan, deduplicated by title, at most `limit`
    ///
    /// Providers are still queried one after another, in plan order.
    pub async fn candidates(
        &self,
        reference_type: ReferenceType,
        query: &str,
        limit: usize,
    ) -> Vec<ProviderResult> {
        let lookup = LookupQuery::new(query, reference_type);
        let mut seen = HashSet::new();
        let mut found = Vec::new();

        for id in self.providers_for(reference_type, query) {
            if found.len() >= limit {
                break;
            }
            let (attempt, result) = self.attempt(&id, &lookup).await;
            if !attempt.outcome.is_accepted() {
                continue;
            }
            let Some(result) = result else { continue };

            let key = result
                .record
                .as_ref()
                .and_then(CanonicalRecord::title)
                .map(normalize_title)
                .unwrap_or_default();
            if seen.insert(key) {
                found.push(result);
            }
        }
        found
    }

    /// Query one provider, consulting the cache first
    async fn attempt(
        &self,
        id: &str,
        query: &LookupQuery,
    ) -> (ProviderAttempt, Option<ProviderResult>) {
        let started = Instant::now();
        let finish = |outcome: AttemptOutcome| ProviderAttempt {
            provider: id.to_string(),
            outcome,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        let Some(source) = self.registry.get(id) else {
            tracing::debug!("Provider {} is not registered, skipping", id);
            return (finish(AttemptOutcome::Unavailable), None);
        };
        let minimum = self.minimum_for(source.as_ref());
        let cache = self.cache.as_ref().filter(|_| !source.is_offline());

        if let Some(cache) = cache {
            match cache.get_lookup(id, query) {
                CacheResult::Hit(result) if result.is_acceptable(minimum) => {
                    let confidence = result.confidence;
                    return (finish(AttemptOutcome::Cached { confidence }), Some(result));
                }
                CacheResult::Hit(_) | CacheResult::Miss | CacheResult::Expired => {}
            }
        }

        let result = match tokio::time::timeout(self.provider_timeout, source.search(query)).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                tracing::warn!("Provider {} failed: {}", id, e);
                return (finish(AttemptOutcome::Failed { error: e.to_string() }), None);
            }
            Err(_) => {
                tracing::warn!("Provider {} timed out after {:?}", id, self.provider_timeout);
                return (finish(AttemptOutcome::TimedOut), None);
            }
        };

        let usable = result.matched
            && result
                .record
                .as_ref()
                .is_some_and(CanonicalRecord::has_minimum_data);
        if !usable {
            return (finish(AttemptOutcome::NoMatch), None);
        }
        if result.confidence < minimum {
            return (
                finish(AttemptOutcome::BelowThreshold {
                    confidence: result.confidence,
                    minimum,
                }),
                None,
            );
        }

        if let Some(cache) = cache {
            cache.set_lookup(id, query, &result);
        }
        let confidence = result.confidence;
        (finish(AttemptOutcome::Accepted { confidence }), Some(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::sources::{MockBehavior, MockSource};
    use tempfile::TempDir;

    fn record(title: &str) -> CanonicalRecord {
        CanonicalRecord::builder(ReferenceType::Journal)
            .title(title)
            .build()
    }

    fn orchestrator(sources: &[MockSource], order: &[&str]) -> CascadeOrchestrator {
        let mut registry = SourceRegistry::empty();
        for source in sources {
            registry.register(Arc::new(source.clone()));
        }
        CascadeOrchestrator::new(Arc::new(registry))
            .with_plan(CascadePlan::default().with_order(ReferenceType::Journal, order.iter().copied()))
            .with_timeout(Duration::from_millis(100))
    }

    #[tokio::test]
    async fn test_stops_at_first_acceptable_match() {
        let p1 = MockSource::new("p1", MockBehavior::Fail("down".into()));
        let p2 = MockSource::matching("p2", record("Second"), 0.8);
        let p3 = MockSource::matching("p3", record("Third"), 0.9);
        let cascade = orchestrator(&[p1.clone(), p2.clone(), p3.clone()], &["p1", "p2", "p3"]);

        let outcome = cascade.run(ReferenceType::Journal, "query").await.unwrap();

        assert_eq!(outcome.provider, "p2");
        assert_eq!(outcome.record.title(), Some("Second"));
        assert_eq!((p1.calls(), p2.calls(), p3.calls()), (1, 1, 0));
        assert!(matches!(outcome.attempts[0].outcome, AttemptOutcome::Failed { .. }));
        assert_eq!(outcome.attempts[1].outcome, AttemptOutcome::Accepted { confidence: 0.8 });
    }

    #[tokio::test]
    async fn test_weak_timed_out_and_missing_providers_advance() {
        let weak = MockSource::matching("weak", record("Weak"), 0.3);
        let slow = MockSource::new("slow", MockBehavior::Hang(Duration::from_secs(5)));
        let empty = MockSource::matching("empty", CanonicalRecord::builder(ReferenceType::Journal).build(), 0.9);
        let good = MockSource::matching("good", record("Good"), 0.6);
        let cascade = orchestrator(
            &[weak, slow, empty, good],
            &["weak", "ghost", "slow", "empty", "good"],
        );

        let outcome = cascade.run(ReferenceType::Journal, "query").await.unwrap();
        let outcomes: Vec<&str> = outcome.attempts.iter().map(|a| a.outcome.label()).collect();

        assert_eq!(
            outcomes,
            vec!["below threshold", "unavailable", "timed out", "no match", "accepted"]
        );
        assert_eq!(outcome.provider, "good");
    }

    #[tokio::test]
    async fn test_exhaustion_is_not_found() {
        let none = MockSource::new("none", MockBehavior::NoMatch);
        let cascade = orchestrator(&[none], &["none", "ghost"]);

        let err = cascade.run(ReferenceType::Journal, "xyz").await.unwrap_err();
        match err {
            ResolveError::NotFound { query, tried } => {
                assert_eq!(query, "xyz");
                assert_eq!(tried, vec!["none"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_provider_minimums() {
        let own = MockSource::matching("own", record("Own"), 0.6).with_min_confidence(0.7);
        let configured = MockSource::matching("configured", record("Configured"), 0.6);
        let cascade = orchestrator(&[own.clone(), configured.clone()], &["own", "configured"])
            .with_provider_minimum("configured", 0.55);

        let outcome = cascade.run(ReferenceType::Journal, "query").await.unwrap();
        assert_eq!(outcome.provider, "configured");
        assert_eq!(
            outcome.attempts[0].outcome,
            AttemptOutcome::BelowThreshold {
                confidence: 0.6,
                minimum: 0.7
            }
        );
    }

    #[tokio::test]
    async fn test_cache_answers_repeat_queries() {
        let dir = TempDir::new().unwrap();
        let cache = CacheService::from_config(CacheConfig {
            enabled: true,
            directory: Some(dir.path().to_path_buf()),
            ttl_seconds: 3600,
        });
        cache.initialize().unwrap();

        let source = MockSource::matching("net", record("Cached Title"), 0.9);
        let cascade = orchestrator(&[source.clone()], &["net"]).with_cache(Arc::new(cache));

        let first = cascade.run(ReferenceType::Journal, "cached title").await.unwrap();
        let second = cascade.run(ReferenceType::Journal, "cached title").await.unwrap();

        assert_eq!(source.calls(), 1);
        assert!(matches!(first.attempts[0].outcome, AttemptOutcome::Accepted { .. }));
        assert!(matches!(second.attempts[0].outcome, AttemptOutcome::Cached { .. }));
        assert_eq!(first.record, second.record);
    }

    #[tokio::test]
    async fn test_identifier_lookup_providers_go_first() {
        let search = MockSource::matching("search", record("By Search"), 0.8);
        let doi = MockSource::matching("doi", record("By DOI"), 0.95)
            .with_capabilities(SourceCapabilities::SEARCH | SourceCapabilities::DOI_LOOKUP);
        let cascade = orchestrator(&[search.clone(), doi.clone()], &["search", "doi"]);

        let outcome = cascade
            .run(ReferenceType::Journal, "Granovetter 1973 doi:10.1086/225469")
            .await
            .unwrap();
        assert_eq!(outcome.provider, "doi");
        assert_eq!(search.calls(), 0);

        let outcome = cascade
            .run(ReferenceType::Journal, "Granovetter weak ties")
            .await
            .unwrap();
        assert_eq!(outcome.provider, "search");
        assert_eq!(doi.calls(), 1);
    }

    #[tokio::test]
    async fn test_candidates_dedupe_by_title() {
        let a = MockSource::matching("a", record("Same Title"), 0.9);
        let b = MockSource::matching("b", record("same title!"), 0.8);
        let c = MockSource::matching("c", record("Other Title"), 0.7);
        let d = MockSource::new("d", MockBehavior::NoMatch);
        let cascade = orchestrator(&[a, b, c, d.clone()], &["a", "b", "c", "d"]);

        let found = cascade.candidates(ReferenceType::Journal, "title", 5).await;
        let providers: Vec<&str> = found.iter().map(|r| r.provider.as_str()).collect();
        assert_eq!(providers, vec!["a", "c"]);
        assert_eq!(d.calls(), 1);

        let limited = cascade.candidates(ReferenceType::Journal, "title", 1).await;
        assert_eq!(limited.len(), 1);
    }
}
