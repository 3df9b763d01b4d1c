//! Scriptable source for tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::models::{CanonicalRecord, LookupQuery, ProviderResult};
use crate::sources::{Source, SourceCapabilities, SourceError};

/// What a [`MockSource`] does when searched
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Return this record at this confidence
    Match(CanonicalRecord, f64),
    /// Return an explicit no-match
    NoMatch,
    /// Fail with a network error
    Fail(String),
    /// Sleep for the given duration, then report no match
    Hang(Duration),
}

/// A source that plays back a fixed behaviour and records what it was asked
#[derive(Debug, Clone)]
pub struct MockSource {
    id: String,
    behavior: MockBehavior,
    capabilities: SourceCapabilities,
    min_confidence: Option<f64>,
    calls: Arc<AtomicUsize>,
    queries: Arc<Mutex<Vec<String>>>,
}

impl MockSource {
    pub fn new(id: impl Into<String>, behavior: MockBehavior) -> Self {
        Self {
            id: id.into(),
            behavior,
            capabilities: SourceCapabilities::SEARCH,
            min_confidence: None,
            calls: Arc::new(AtomicUsize::new(0)),
            queries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Shorthand for a source that always matches `record`
    pub fn matching(id: impl Into<String>, record: CanonicalRecord, confidence: f64) -> Self {
        Self::new(id, MockBehavior::Match(record, confidence))
    }

    pub fn offline(mut self) -> Self {
        self.capabilities |= SourceCapabilities::OFFLINE;
        self
    }

    pub fn with_capabilities(mut self, capabilities: SourceCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = Some(min_confidence);
        self
    }

    /// Number of searches so far (shared between clones)
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Query texts seen so far, in order
    pub fn queries(&self) -> Vec<String> {
        self.queries
            .lock()
            .map(|queries| queries.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Source for MockSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        "Mock"
    }

    fn capabilities(&self) -> SourceCapabilities {
        self.capabilities
    }

    fn min_confidence(&self) -> Option<f64> {
        self.min_confidence
    }

    async fn search(&self, query: &LookupQuery) -> Result<ProviderResult, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(query.text.clone());
        }

        match &self.behavior {
            MockBehavior::Match(record, confidence) => Ok(ProviderResult::matched(
                self.id.clone(),
                record.clone(),
                *confidence,
            )),
            MockBehavior::NoMatch => Ok(ProviderResult::no_match(self.id.clone())),
            MockBehavior::Fail(message) => Err(SourceError::Network(message.clone())),
            MockBehavior::Hang(duration) => {
                tokio::time::sleep(*duration).await;
                Ok(ProviderResult::no_match(self.id.clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReferenceType;

    #[tokio::test]
    async fn test_mock_records_calls() {
        let record = CanonicalRecord::builder(ReferenceType::Book)
            .title("Walden")
            .build();
        let source = MockSource::matching("books", record, 0.8);
        let observer = source.clone();

        let result = source
            .search(&LookupQuery::new("walden", ReferenceType::Book))
            .await
            .unwrap();

        assert!(result.matched);
        assert_eq!(result.provider, "books");
        assert_eq!(observer.calls(), 1);
        assert_eq!(observer.queries(), vec!["walden"]);
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let source = MockSource::new("down", MockBehavior::Fail("boom".into())).offline();
        assert!(source.is_offline());
        assert!(source
            .search(&LookupQuery::new("x", ReferenceType::Unknown))
            .await
            .is_err());
    }
}
