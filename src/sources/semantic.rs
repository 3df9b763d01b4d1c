//! Semantic Scholar provider.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use crate::models::{CanonicalRecord, IdentifierKind, LookupQuery, ProviderResult};
use crate::normalize::{non_empty, normalize_title, parse_person_name};
use crate::sources::{article_type, best_match, Source, SourceError};
use crate::utils::{api_retry_config, with_retry, HttpClient};

const SEMANTIC_API_BASE: &str = "https://api.semanticscholar.org/graph/v1";

const SEARCH_FIELDS: &str = "title,authors,venue,publicationVenue,year,externalIds,url,journal";

/// Semantic Scholar research source
///
/// Uses the Graph API paper search. Candidates are re-ranked by how well their
/// authors and title words line up with the query before the best one is scored.
#[derive(Debug, Clone)]
pub struct SemanticScholarSource {
    client: Arc<HttpClient>,
    base_url: String,
    api_key: Option<String>,
}

impl SemanticScholarSource {
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self::with_base_url(client, SEMANTIC_API_BASE)
    }

    pub fn with_base_url(client: Arc<HttpClient>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: None,
        }
    }

    /// Optional key for higher rate limits
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    /// Add API key to request headers if available
    fn add_api_key_if_present(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(ref key) = self.api_key {
            builder.header("x-api-key", key)
        } else {
            builder
        }
    }
}

/// Author-aware ranking score for a candidate
///
/// A family name found in the query is worth 10, a given name 5, and every shared
/// title word 2.
fn rank_score(query: &str, paper: &S2Paper) -> u32 {
    let query_words: Vec<String> = normalize_title(query)
        .split(' ')
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect();
    let has = |word: &str| query_words.iter().any(|w| w == word);

    let mut score = 0;
    for author in paper.authors.iter().filter_map(|a| a.name.as_deref()) {
        let Some(author) = parse_person_name(author) else {
            continue;
        };
        if normalize_title(&author.family).split(' ').any(|w| !w.is_empty() && has(w)) {
            score += 10;
        }
        if let Some(given) = author.given.as_deref() {
            if normalize_title(given).split(' ').any(|w| w.len() > 1 && has(w)) {
                score += 5;
            }
        }
    }

    if let Some(title) = paper.title.as_deref() {
        let title = normalize_title(title);
        score += 2 * title.split(' ').filter(|w| w.len() > 2 && has(w)).count() as u32;
    }
    score
}

#[async_trait]
impl Source for SemanticScholarSource {
    fn id(&self) -> &str {
        "semantic_scholar"
    }

    fn name(&self) -> &str {
        "Semantic Scholar"
    }

    async fn search(&self, query: &LookupQuery) -> Result<ProviderResult, SourceError> {
        if query.is_blank() {
            return Ok(ProviderResult::no_match(self.id()));
        }

        let url = format!(
            "{}/paper/search?query={}&limit=5&fields={}",
            self.base_url,
            urlencoding::encode(&query.text),
            SEARCH_FIELDS
        );

        let client = Arc::clone(&self.client);
        let data: Option<S2SearchResponse> = with_retry(api_retry_config(), || {
            let client = Arc::clone(&client);
            let url = url.clone();
            async move {
                let request = self.add_api_key_if_present(client.get(&url).await);
                HttpClient::fetch_json(request, "Semantic Scholar").await
            }
        })
        .await?;

        let mut papers = data.map(|d| d.data).unwrap_or_default();
        // Stable sort: equal scores keep the API's relevance order
        papers.sort_by_key(|paper| std::cmp::Reverse(rank_score(&query.text, paper)));

        let routed = query.reference_type;
        let records = papers.into_iter().map(|paper| paper.into_record(routed));
        Ok(best_match(self.id(), &query.text, records))
    }
}

// ===== Semantic Scholar API Types =====

#[derive(Debug, Deserialize)]
struct S2SearchResponse {
    #[serde(default)]
    data: Vec<S2Paper>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct S2Paper {
    title: Option<String>,
    #[serde(default)]
    authors: Vec<S2Author>,
    venue: Option<String>,
    publication_venue: Option<S2Venue>,
    journal: Option<S2Journal>,
    year: Option<i32>,
    external_ids: Option<S2ExternalIds>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct S2Author {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct S2Venue {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct S2Journal {
    name: Option<String>,
    volume: Option<String>,
    pages: Option<String>,
}

#[derive(Debug, Deserialize)]
struct S2ExternalIds {
    #[serde(rename = "DOI")]
    doi: Option<String>,
    #[serde(rename = "PubMed")]
    pubmed: Option<String>,
}

impl S2Paper {
    fn into_record(self, routed: crate::models::ReferenceType) -> CanonicalRecord {
        let (journal_name, volume, pages) = match self.journal {
            Some(j) => (j.name, j.volume, j.pages),
            None => (None, None, None),
        };
        let venue = journal_name
            .and_then(non_empty)
            .or_else(|| self.publication_venue.and_then(|v| v.name).and_then(non_empty))
            .or_else(|| self.venue.and_then(non_empty));
        let (doi, pmid) = match self.external_ids {
            Some(ids) => (ids.doi, ids.pubmed),
            None => (None, None),
        };
        let url = doi
            .as_ref()
            .map(|doi| format!("https://doi.org/{}", doi))
            .or(self.url);

        CanonicalRecord::builder(article_type(routed))
            .title_opt(self.title.and_then(non_empty))
            .authors(
                self.authors
                    .iter()
                    .filter_map(|a| a.name.as_deref())
                    .filter_map(parse_person_name),
            )
            .year_opt(self.year)
            .venue_opt(venue)
            .volume_opt(volume.and_then(non_empty))
            .pages_opt(pages.and_then(non_empty).map(|p| p.replace(' ', "")))
            .url_opt(url)
            .identifier_opt(IdentifierKind::Doi, doi.and_then(non_empty))
            .identifier_opt(IdentifierKind::Pmid, pmid.and_then(non_empty))
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReferenceType;
    use mockito::Matcher;

    const RESPONSE: &str = r#"{
        "total": 2,
        "data": [
            {
                "title": "Sprains and Strains in Sport",
                "authors": [{"name": "Alice Walker"}],
                "venue": "Sports Medicine",
                "year": 2001
            },
            {
                "title": "Trains, Brains, and Sprains",
                "authors": [{"name": "Bryan Caplan"}],
                "venue": "",
                "journal": {"name": "Econ Journal Watch", "volume": "15", "pages": "100 - 120"},
                "year": 2018,
                "externalIds": {"DOI": "10.1000/ejw.2018.15", "PubMed": null},
                "url": "https://www.semanticscholar.org/paper/abc"
            }
        ]
    }"#;

    fn source(server: &mockito::ServerGuard) -> SemanticScholarSource {
        SemanticScholarSource::with_base_url(Arc::new(HttpClient::new().unwrap()), server.url())
    }

    #[tokio::test]
    async fn test_author_aware_ranking() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/paper/search")
            .match_query(Matcher::UrlEncoded("query".into(), "caplan sprains".into()))
            .with_status(200)
            .with_body(RESPONSE)
            .create_async()
            .await;

        let result = source(&server)
            .search(&LookupQuery::new("caplan sprains", ReferenceType::Journal))
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(result.matched);
        let record = result.record.unwrap();
        assert_eq!(record.title(), Some("Trains, Brains, and Sprains"));
        assert_eq!(record.venue(), Some("Econ Journal Watch"));
        assert_eq!(record.pages(), Some("100-120"));
        assert_eq!(record.identifier(IdentifierKind::Doi), Some("10.1000/ejw.2018.15"));
        assert_eq!(record.url(), Some("https://doi.org/10.1000/ejw.2018.15"));
    }

    #[tokio::test]
    async fn test_api_key_header() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/paper/search")
            .match_query(Matcher::Any)
            .match_header("x-api-key", "secret")
            .with_status(200)
            .with_body(r#"{"total": 0, "data": []}"#)
            .create_async()
            .await;

        let result = source(&server)
            .with_api_key(Some("secret".to_string()))
            .search(&LookupQuery::new("anything", ReferenceType::Journal))
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(!result.matched);
    }

    #[tokio::test]
    async fn test_medical_routing_keeps_medical_type() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/paper/search")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(RESPONSE)
            .create_async()
            .await;

        let result = source(&server)
            .search(&LookupQuery::new("sprains strains sport", ReferenceType::Medical))
            .await
            .unwrap();
        assert_eq!(
            result.record.unwrap().reference_type(),
            ReferenceType::Medical
        );
    }

    #[test]
    fn test_rank_score() {
        let paper: S2Paper = serde_json::from_str(
            r#"{"title": "Trains, Brains, and Sprains", "authors": [{"name": "Bryan Caplan"}]}"#,
        )
        .unwrap();
        assert_eq!(rank_score("bryan caplan trains", &paper), 17);
        assert_eq!(rank_score("nothing relevant", &paper), 0);
    }
}
