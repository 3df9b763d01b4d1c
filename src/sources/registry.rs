//! Registry of metadata providers and the per-type cascade plans.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::Arc;

use super::{
    FamousCasesSource, GovernmentExtractor, InterviewExtractor, NewspaperExtractor, Source,
    SourceError, UkNeutralCitationSource, WebPageExtractor,
};
use crate::config::{CascadeConfig, Config};
use crate::models::ReferenceType;
use crate::normalize::{extract_doi, extract_isbn, extract_pmid};
use crate::utils::HttpClient;

bitflags::bitflags! {
    /// Capabilities that a source can support
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SourceCapabilities: u32 {
        const SEARCH = 1 << 0;
        const DOI_LOOKUP = 1 << 1;
        const ISBN_LOOKUP = 1 << 2;
        const PMID_LOOKUP = 1 << 3;
        const OFFLINE = 1 << 4;
    }
}

impl SourceCapabilities {
    /// Identifier lookups that `text` calls for, one flag per identifier it carries
    pub fn lookups_for(text: &str) -> Self {
        let mut wanted = Self::empty();
        wanted.set(Self::DOI_LOOKUP, extract_doi(text).is_some());
        wanted.set(Self::ISBN_LOOKUP, extract_isbn(text).is_some());
        wanted.set(Self::PMID_LOOKUP, extract_pmid(text).is_some());
        wanted
    }
}

/// Registry of available providers, keyed by id
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    sources: HashMap<String, Arc<dyn Source>>,
}

impl SourceRegistry {
    /// Create a registry holding only the offline providers
    pub fn new() -> Self {
        let mut registry = Self::empty();

        registry.register(Arc::new(FamousCasesSource::new()));
        registry.register(Arc::new(UkNeutralCitationSource::new()));
        registry.register(Arc::new(InterviewExtractor::new()));
        registry.register(Arc::new(NewspaperExtractor::new()));
        registry.register(Arc::new(GovernmentExtractor::new()));
        registry.register(Arc::new(WebPageExtractor::new()));

        registry
    }

    /// Create a registry with no providers at all
    pub fn empty() -> Self {
        Self {
            sources: HashMap::new(),
        }
    }

    /// Offline providers plus every compiled network provider that is enabled and has
    /// the credentials it needs
    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        let mut registry = Self::new();

        #[allow(unused_variables)]
        let client = |id: &str| -> Result<Arc<HttpClient>, SourceError> {
            Ok(Arc::new(
                HttpClient::with_user_agent(&config.http.user_agent)?
                    .rate_limited(config.provider(id).requests_per_second),
            ))
        };
        #[allow(unused_variables)]
        let mailto = config.http.contact_email.clone();

        #[cfg(feature = "source-semantic")]
        {
            registry.register(Arc::new(
                super::SemanticScholarSource::new(client("semantic_scholar")?)
                    .with_api_key(config.api_keys.semantic_scholar.clone()),
            ));
        }

        #[cfg(feature = "source-crossref")]
        {
            registry.register(Arc::new(
                super::CrossRefSource::new(client("crossref")?).with_mailto(mailto.clone()),
            ));
        }

        #[cfg(feature = "source-openalex")]
        {
            registry.register(Arc::new(
                super::OpenAlexSource::new(client("openalex")?).with_mailto(mailto.clone()),
            ));
        }

        #[cfg(feature = "source-pubmed")]
        {
            registry.register(Arc::new(
                super::PubMedSource::new(client("pubmed")?)
                    .with_api_key(config.api_keys.pubmed.clone()),
            ));
        }

        #[cfg(feature = "source-courtlistener")]
        {
            registry.register(Arc::new(
                super::CourtListenerSource::new(client("courtlistener")?)
                    .with_api_key(config.api_keys.courtlistener.clone()),
            ));
        }

        #[cfg(feature = "source-google-books")]
        {
            registry.register(Arc::new(super::GoogleBooksSource::new(client(
                "google_books",
            )?)));
        }

        #[cfg(feature = "source-open-library")]
        {
            registry.register(Arc::new(super::OpenLibrarySource::new(client(
                "open_library",
            )?)));
        }

        #[cfg(feature = "source-google-cse")]
        {
            match (&config.api_keys.google_cse_key, &config.api_keys.google_cse_id) {
                (Some(key), Some(engine)) => {
                    registry.register(Arc::new(super::GoogleCseSource::new(
                        client("google_cse")?,
                        key.clone(),
                        engine.clone(),
                    )));
                }
                _ => tracing::debug!("Google CSE not registered: key or engine id missing"),
            }
        }

        let disabled: Vec<String> = registry
            .ids()
            .filter(|id| !config.provider(id).enabled)
            .map(str::to_string)
            .collect();
        for id in disabled {
            tracing::debug!("Provider disabled by config: {}", id);
            registry.sources.remove(&id);
        }

        Ok(registry)
    }

    /// Register a new source, replacing any source with the same id
    pub fn register(&mut self, source: Arc<dyn Source>) {
        self.sources.insert(source.id().to_string(), source);
    }

    /// Get a source by ID
    pub fn get(&self, id: &str) -> Option<&Arc<dyn Source>> {
        self.sources.get(id)
    }

    /// Get all registered sources
    pub fn all(&self) -> impl Iterator<Item = &Arc<dyn Source>> {
        self.sources.values()
    }

    /// Get all source IDs
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(|s| s.as_str())
    }

    /// Get sources that support any of the given capabilities
    pub fn with_capability(&self, capability: SourceCapabilities) -> Vec<&Arc<dyn Source>> {
        self.all()
            .filter(|s| s.capabilities().intersects(capability))
            .collect()
    }

    /// Move the ids of providers able to do one of the `wanted` lookups to the front
    ///
    /// Relative order is kept within both groups. Unregistered ids stay where they fall.
    pub fn prefer_capable(&self, ids: Vec<String>, wanted: SourceCapabilities) -> Vec<String> {
        if wanted.is_empty() {
            return ids;
        }
        let capable: HashSet<&str> = self
            .with_capability(wanted)
            .into_iter()
            .map(|s| s.id())
            .collect();
        let (first, rest): (Vec<String>, Vec<String>) = ids
            .into_iter()
            .partition(|id| capable.contains(id.as_str()));
        first.into_iter().chain(rest).collect()
    }

    /// Get the number of registered sources
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Ordered provider ids for each reference type
#[derive(Debug, Clone, Default)]
pub struct CascadePlan {
    overrides: HashMap<ReferenceType, Vec<String>>,
}

impl CascadePlan {
    /// Built-in provider order for a reference type
    pub fn default_order(reference_type: ReferenceType) -> &'static [&'static str] {
        match reference_type {
            ReferenceType::Journal => &["semantic_scholar", "crossref", "openalex", "google_cse"],
            ReferenceType::Medical => &["pubmed", "crossref"],
            ReferenceType::Legal => &["famous_cases", "uk_neutral", "courtlistener"],
            ReferenceType::Book => &["google_books", "open_library", "openalex"],
            ReferenceType::Interview => &["interview"],
            ReferenceType::Newspaper => &["newspaper"],
            ReferenceType::Government => &["government"],
            ReferenceType::Unknown => &[
                "web_page",
                "semantic_scholar",
                "crossref",
                "openalex",
                "google_cse",
            ],
        }
    }

    /// Built-in order with the overrides from `[cascade.plans]`
    pub fn from_config(config: &CascadeConfig) -> Self {
        let mut plan = Self::default();
        for (key, ids) in &config.plans {
            match ReferenceType::from_str(key) {
                Ok(reference_type) => {
                    plan.overrides.insert(reference_type, ids.clone());
                }
                Err(e) => tracing::warn!("Ignoring cascade plan: {}", e),
            }
        }
        plan
    }

    /// Replace the order for one reference type
    pub fn with_order<I, S>(mut self, reference_type: ReferenceType, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.overrides
            .insert(reference_type, ids.into_iter().map(Into::into).collect());
        self
    }

    /// Provider ids to try, in order
    pub fn providers_for(&self, reference_type: ReferenceType) -> Vec<String> {
        match self.overrides.get(&reference_type) {
            Some(ids) => ids.clone(),
            None => Self::default_order(reference_type)
                .iter()
                .map(|id| id.to_string())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{MockBehavior, MockSource};

    #[test]
    fn test_registry_basic() {
        let registry = SourceRegistry::new();

        assert_eq!(registry.len(), 6);
        assert!(!registry.is_empty());
        assert!(SourceRegistry::empty().is_empty());
    }

    #[test]
    fn test_get_source() {
        let registry = SourceRegistry::new();

        let cases = registry.get("famous_cases");
        assert!(cases.is_some());
        assert_eq!(cases.unwrap().id(), "famous_cases");

        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn test_offline_sources() {
        let registry = SourceRegistry::new();
        let offline = registry.with_capability(SourceCapabilities::OFFLINE);
        assert_eq!(offline.len(), registry.len());
    }

    #[test]
    fn test_from_config_respects_disabled_providers() {
        let mut config = Config::default();
        config.api_keys.google_cse_key = None;
        config.api_keys.google_cse_id = None;
        config.providers.insert(
            "famous_cases".to_string(),
            crate::config::ProviderConfig {
                enabled: false,
                ..Default::default()
            },
        );

        let registry = SourceRegistry::from_config(&config).unwrap();
        assert!(registry.get("famous_cases").is_none());
        assert!(registry.get("uk_neutral").is_some());
        assert!(registry.get("google_cse").is_none());
    }

    #[cfg(feature = "source-crossref")]
    #[test]
    fn test_from_config_registers_network_sources() {
        let registry = SourceRegistry::from_config(&Config::default()).unwrap();
        let crossref = registry.get("crossref").unwrap();
        assert!(crossref
            .capabilities()
            .contains(SourceCapabilities::DOI_LOOKUP));
        assert!(!crossref.is_offline());
    }

    #[test]
    fn test_lookups_for_identifiers() {
        assert_eq!(
            SourceCapabilities::lookups_for("Smith 2020, doi:10.1086/225469"),
            SourceCapabilities::DOI_LOOKUP
        );
        assert_eq!(
            SourceCapabilities::lookups_for("Walden ISBN 978-0-306-40615-7"),
            SourceCapabilities::ISBN_LOOKUP
        );
        assert_eq!(
            SourceCapabilities::lookups_for("PMID: 12345678"),
            SourceCapabilities::PMID_LOOKUP
        );
        assert!(SourceCapabilities::lookups_for("Granovetter weak ties").is_empty());
    }

    #[test]
    fn test_prefer_capable_keeps_relative_order() {
        let mut registry = SourceRegistry::empty();
        registry.register(Arc::new(MockSource::new("search", MockBehavior::NoMatch)));
        registry.register(Arc::new(
            MockSource::new("doi", MockBehavior::NoMatch)
                .with_capabilities(SourceCapabilities::SEARCH | SourceCapabilities::DOI_LOOKUP),
        ));
        registry.register(Arc::new(
            MockSource::new("isbn", MockBehavior::NoMatch)
                .with_capabilities(SourceCapabilities::SEARCH | SourceCapabilities::ISBN_LOOKUP),
        ));
        let ids = || {
            ["search", "ghost", "isbn", "doi"]
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
        };

        assert_eq!(
            registry.prefer_capable(ids(), SourceCapabilities::DOI_LOOKUP),
            vec!["doi", "search", "ghost", "isbn"]
        );
        assert_eq!(
            registry.prefer_capable(
                ids(),
                SourceCapabilities::DOI_LOOKUP | SourceCapabilities::ISBN_LOOKUP
            ),
            vec!["isbn", "doi", "search", "ghost"]
        );
        assert_eq!(registry.prefer_capable(ids(), SourceCapabilities::empty()), ids());
    }

    #[test]
    fn test_default_plans() {
        let plan = CascadePlan::default();
        assert_eq!(
            plan.providers_for(ReferenceType::Journal),
            vec!["semantic_scholar", "crossref", "openalex", "google_cse"]
        );
        assert_eq!(
            plan.providers_for(ReferenceType::Book),
            vec!["google_books", "open_library", "openalex"]
        );
        assert_eq!(
            plan.providers_for(ReferenceType::Legal).first().map(String::as_str),
            Some("famous_cases")
        );
        for reference_type in ReferenceType::ALL {
            assert!(!plan.providers_for(reference_type).is_empty());
        }
    }

    #[test]
    fn test_plan_overrides_from_config() {
        let mut config = CascadeConfig::default();
        config
            .plans
            .insert("book".to_string(), vec!["open_library".to_string()]);
        config
            .plans
            .insert("poetry".to_string(), vec!["crossref".to_string()]);

        let plan = CascadePlan::from_config(&config);
        assert_eq!(plan.providers_for(ReferenceType::Book), vec!["open_library"]);
        assert_eq!(plan.providers_for(ReferenceType::Medical), vec!["pubmed", "crossref"]);
    }
}
