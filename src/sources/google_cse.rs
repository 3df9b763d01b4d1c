//! Google Custom Search provider.
//!
//! The engine is expected to be configured for scholarly sites. Records come from the
//! `citation_*` meta tags publishers embed (Highwire Press conventions), falling back
//! to the result title and snippet.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::tables;
use crate::detect::url_host;
use crate::models::{CanonicalRecord, IdentifierKind, LookupQuery, ProviderResult, ReferenceType};
use crate::normalize::{
    coerce_year, extract_doi, extract_pmid, non_empty, parse_person_name, value_text,
};
use crate::sources::{best_match, Source, SourceError};
use crate::utils::{api_retry_config, with_retry, HttpClient};

const GOOGLE_CSE_API_BASE: &str = "https://www.googleapis.com/customsearch/v1";

static JSTOR_STABLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"jstor\.org/stable/(\d+)").unwrap());

/// Trailing " - JSTOR", " | Oxford Academic" and similar site suffixes
static SITE_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\s*[-|].*?(JSTOR|Google Scholar|PubMed|Oxford|Cambridge|Wiley|Springer|SAGE|Taylor|Project MUSE|ScienceDirect).*$",
    )
    .unwrap()
});

static SNIPPET_AUTHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:by\s+)?([A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)\s*[-–·]").unwrap()
});

const LEGAL_HOSTS: &[&str] = &["courtlistener.com", "oyez.org", "heinonline.org"];
const BOOK_HOSTS: &[&str] = &["hathitrust.org", "archive.org", "worldcat.org"];

/// Google Custom Search source
///
/// Needs both an API key and a search engine id; the registry only builds it when
/// both are configured.
#[derive(Debug, Clone)]
pub struct GoogleCseSource {
    client: Arc<HttpClient>,
    base_url: String,
    api_key: String,
    engine_id: String,
}

impl GoogleCseSource {
    pub fn new(client: Arc<HttpClient>, api_key: impl Into<String>, engine_id: impl Into<String>) -> Self {
        Self {
            client,
            base_url: GOOGLE_CSE_API_BASE.to_string(),
            api_key: api_key.into(),
            engine_id: engine_id.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl Source for GoogleCseSource {
    fn id(&self) -> &str {
        "google_cse"
    }

    fn name(&self) -> &str {
        "Google Custom Search"
    }

    async fn search(&self, query: &LookupQuery) -> Result<ProviderResult, SourceError> {
        if query.is_blank() {
            return Ok(ProviderResult::no_match(self.id()));
        }

        let url = format!(
            "{}?key={}&cx={}&q={}&num=5",
            self.base_url,
            urlencoding::encode(&self.api_key),
            urlencoding::encode(&self.engine_id),
            urlencoding::encode(query.text.trim())
        );

        let client = Arc::clone(&self.client);
        let data: Option<CSEResponse> = with_retry(api_retry_config(), || {
            let client = Arc::clone(&client);
            let url = url.clone();
            async move { HttpClient::fetch_json(client.get(&url).await, "Google CSE").await }
        })
        .await?;

        let routed = query.reference_type;
        let records = data
            .map(|d| d.items)
            .unwrap_or_default()
            .into_iter()
            .map(|item| item.into_record(routed));

        Ok(best_match(self.id(), &query.text, records))
    }
}

fn type_for_link(link: &str, has_journal: bool, routed: ReferenceType) -> ReferenceType {
    let host = url_host(link).unwrap_or_default();
    if LEGAL_HOSTS.iter().any(|d| tables::host_matches(&host, d)) {
        ReferenceType::Legal
    } else if BOOK_HOSTS.iter().any(|d| tables::host_matches(&host, d)) {
        ReferenceType::Book
    } else if has_journal {
        ReferenceType::Journal
    } else {
        routed
    }
}

fn clean_result_title(title: &str) -> Option<String> {
    let title = SITE_SUFFIX.replace(title, "");
    non_empty(title.trim_end_matches("...").trim_end_matches('…'))
}

// ===== Google CSE API Types =====

#[derive(Debug, Deserialize)]
struct CSEResponse {
    #[serde(default)]
    items: Vec<CSEItem>,
}

#[derive(Debug, Deserialize)]
struct CSEItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
    pagemap: Option<CSEPagemap>,
}

#[derive(Debug, Deserialize)]
struct CSEPagemap {
    #[serde(default)]
    metatags: Vec<HashMap<String, serde_json::Value>>,
}

impl CSEItem {
    fn into_record(self, routed: ReferenceType) -> CanonicalRecord {
        let tags = self
            .pagemap
            .and_then(|p| p.metatags.into_iter().next())
            .unwrap_or_default();
        let tag = |name: &str| tags.get(name).and_then(value_text);

        let journal = tag("citation_journal_title").or_else(|| tag("citation_journal_abbrev"));
        let title = tag("citation_title")
            .or_else(|| tag("og:title"))
            .or_else(|| clean_result_title(&self.title));

        let author = tag("citation_author")
            .and_then(|a| parse_person_name(&a))
            .or_else(|| {
                SNIPPET_AUTHOR
                    .captures(&self.snippet)
                    .and_then(|caps| caps.get(1))
                    .and_then(|m| parse_person_name(m.as_str()))
            });

        let year = tag("citation_publication_date")
            .or_else(|| tag("citation_date"))
            .as_deref()
            .and_then(coerce_year)
            .or_else(|| coerce_year(&format!("{} {}", self.title, self.snippet)));

        let pages = match (tag("citation_firstpage"), tag("citation_lastpage")) {
            (Some(first), Some(last)) => Some(format!("{}-{}", first, last)),
            (first, _) => first,
        };

        // JSTOR stable ids map onto 10.2307 DOIs
        let doi = tag("citation_doi")
            .and_then(|doi| extract_doi(&doi).or(Some(doi)))
            .or_else(|| {
                JSTOR_STABLE
                    .captures(&self.link)
                    .and_then(|caps| caps.get(1))
                    .map(|id| format!("10.2307/{}", id.as_str()))
            });
        let pmid = extract_pmid(&self.link);

        let reference_type = type_for_link(&self.link, journal.is_some(), routed);
        let venue = journal.or_else(|| tag("og:site_name"));

        CanonicalRecord::builder(reference_type)
            .title_opt(title)
            .authors(author)
            .year_opt(year)
            .venue_opt(venue)
            .publisher_opt(tag("citation_publisher"))
            .volume_opt(tag("citation_volume"))
            .issue_opt(tag("citation_issue"))
            .pages_opt(pages)
            .url_opt(non_empty(&self.link))
            .identifier_opt(IdentifierKind::Doi, doi)
            .identifier_opt(IdentifierKind::Pmid, pmid)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const RESULTS: &str = r#"{
        "items": [
            {
                "title": "Why Democracies Fail - JSTOR",
                "link": "https://www.jstor.org/stable/1234567",
                "snippet": "by Jane Roe - Journal of Democracy, 1999 ...",
                "pagemap": {"metatags": [{
                    "citation_title": "Why Democracies Fail",
                    "citation_author": "Roe, Jane",
                    "citation_journal_title": "Journal of Democracy",
                    "citation_publication_date": "1999/04/01",
                    "citation_volume": "10",
                    "citation_issue": "2",
                    "citation_firstpage": "5",
                    "citation_lastpage": "19"
                }]}
            }
        ]
    }"#;

    #[tokio::test]
    async fn test_metatags_become_record() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("key".into(), "k".into()),
                Matcher::UrlEncoded("cx".into(), "engine".into()),
                Matcher::UrlEncoded("q".into(), "roe why democracies fail".into()),
            ]))
            .with_status(200)
            .with_body(RESULTS)
            .create_async()
            .await;

        let source = GoogleCseSource::new(Arc::new(HttpClient::new().unwrap()), "k", "engine")
            .with_base_url(server.url());
        let result = source
            .search(&LookupQuery::new("roe why democracies fail", ReferenceType::Unknown))
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(result.matched);
        let record = result.record.unwrap();
        assert_eq!(record.reference_type(), ReferenceType::Journal);
        assert_eq!(record.title(), Some("Why Democracies Fail"));
        assert_eq!(record.authors()[0].family, "Roe");
        assert_eq!(record.venue(), Some("Journal of Democracy"));
        assert_eq!(record.year(), Some(1999));
        assert_eq!(record.pages(), Some("5-19"));
        assert_eq!(record.identifier(IdentifierKind::Doi), Some("10.2307/1234567"));
    }

    #[test]
    fn test_snippet_fallback() {
        let item: CSEItem = serde_json::from_str(
            r#"{"title": "Collected Essays | Cambridge Core",
                "link": "https://archive.org/details/essays",
                "snippet": "Smith - 1987 - a collection of essays"}"#,
        )
        .unwrap();
        let record = item.into_record(ReferenceType::Unknown);
        assert_eq!(record.reference_type(), ReferenceType::Book);
        assert_eq!(record.title(), Some("Collected Essays"));
        assert_eq!(record.year(), Some(1987));
        assert_eq!(record.authors()[0].family, "Smith");
    }

    #[test]
    fn test_pubmed_links_carry_pmid() {
        let item: CSEItem = serde_json::from_str(
            r#"{"title": "Some trial", "link": "https://pubmed.ncbi.nlm.nih.gov/31978945/", "snippet": ""}"#,
        )
        .unwrap();
        let record = item.into_record(ReferenceType::Medical);
        assert_eq!(record.reference_type(), ReferenceType::Medical);
        assert_eq!(record.identifier(IdentifierKind::Pmid), Some("31978945"));
    }
}
