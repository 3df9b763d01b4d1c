//! PubMed provider using the NCBI E-utilities API.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::models::{CanonicalRecord, IdentifierKind, LookupQuery, ProviderResult, ReferenceType};
use crate::normalize::{coerce_year, extract_pmid, non_empty, parse_person_name, MAX_MATCH_CONFIDENCE};
use crate::sources::{best_match, Source, SourceCapabilities, SourceError};
use crate::utils::{api_retry_config, with_retry, HttpClient};

/// PubMed E-utilities API base URL
const PUBMED_API_BASE: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

/// PubMed research source
///
/// Runs `esearch` for the best PMID (exact phrase first, then the bare terms) and
/// reads its `esummary`. A PMID in the query skips the search.
#[derive(Debug, Clone)]
pub struct PubMedSource {
    client: Arc<HttpClient>,
    base_url: String,
    api_key: Option<String>,
}

impl PubMedSource {
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self::with_base_url(client, PUBMED_API_BASE)
    }

    pub fn with_base_url(client: Arc<HttpClient>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: None,
        }
    }

    /// Optional NCBI key (raises the rate limit from 3 to 10 requests per second)
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    fn build_url(&self, endpoint: &str, params: &[(&str, &str)]) -> String {
        let mut url = format!("{}/{}?db=pubmed&retmode=json", self.base_url, endpoint);
        for (key, value) in params {
            url.push_str(&format!("&{}={}", key, urlencoding::encode(value)));
        }
        if let Some(key) = &self.api_key {
            url.push_str(&format!("&api_key={}", urlencoding::encode(key)));
        }
        url
    }

    async fn fetch<T: for<'de> Deserialize<'de>>(&self, url: String) -> Result<Option<T>, SourceError> {
        let client = Arc::clone(&self.client);
        with_retry(api_retry_config(), || {
            let client = Arc::clone(&client);
            let url = url.clone();
            async move { HttpClient::fetch_json::<T>(client.get(&url).await, "PubMed").await }
        })
        .await
    }

    /// Best PMID for free text: exact phrase, then plain terms
    async fn find_pmid(&self, text: &str) -> Result<Option<String>, SourceError> {
        let phrase = format!("\"{}\"", text.trim().trim_matches('"'));
        for term in [phrase.as_str(), text.trim()] {
            let url = self.build_url("esearch.fcgi", &[("term", term), ("retmax", "1")]);
            let data: Option<ESearchResponse> = self.fetch(url).await?;
            if let Some(pmid) = data.and_then(|d| d.esearchresult.idlist.into_iter().next()) {
                return Ok(Some(pmid));
            }
        }
        Ok(None)
    }

    async fn summary(&self, pmid: &str) -> Result<Option<CanonicalRecord>, SourceError> {
        let url = self.build_url("esummary.fcgi", &[("id", pmid)]);
        let data: Option<ESummaryResponse> = self.fetch(url).await?;

        let Some(entry) = data.and_then(|mut d| d.result.remove(pmid)) else {
            return Ok(None);
        };
        let summary: PMSummary = serde_json::from_value(entry)?;
        if summary.error.is_some() {
            return Ok(None);
        }
        Ok(Some(summary.into_record(pmid)))
    }
}

#[async_trait]
impl Source for PubMedSource {
    fn id(&self) -> &str {
        "pubmed"
    }

    fn name(&self) -> &str {
        "PubMed"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::SEARCH | SourceCapabilities::PMID_LOOKUP
    }

    async fn search(&self, query: &LookupQuery) -> Result<ProviderResult, SourceError> {
        if query.is_blank() {
            return Ok(ProviderResult::no_match(self.id()));
        }

        if let Some(pmid) = extract_pmid(&query.text) {
            return Ok(match self.summary(&pmid).await? {
                Some(record) => ProviderResult::matched(self.id(), record, MAX_MATCH_CONFIDENCE),
                None => ProviderResult::no_match(self.id()),
            });
        }

        let Some(pmid) = self.find_pmid(&query.text).await? else {
            return Ok(ProviderResult::no_match(self.id()));
        };
        let record = self.summary(&pmid).await?;
        Ok(best_match(self.id(), &query.text, record))
    }
}

// ===== PubMed API Types =====

#[derive(Debug, Deserialize)]
struct ESearchResponse {
    esearchresult: ESearchResult,
}

#[derive(Debug, Deserialize)]
struct ESearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ESummaryResponse {
    /// Keyed by PMID, plus a `uids` list
    #[serde(default)]
    result: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct PMSummary {
    title: Option<String>,
    #[serde(default)]
    authors: Vec<PMAuthor>,
    pubdate: Option<String>,
    fulljournalname: Option<String>,
    source: Option<String>,
    volume: Option<String>,
    issue: Option<String>,
    pages: Option<String>,
    #[serde(default)]
    articleids: Vec<PMArticleId>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PMAuthor {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PMArticleId {
    idtype: String,
    value: String,
}

impl PMSummary {
    fn into_record(self, pmid: &str) -> CanonicalRecord {
        let doi = self
            .articleids
            .iter()
            .find(|id| id.idtype == "doi")
            .and_then(|id| non_empty(&id.value));

        CanonicalRecord::builder(ReferenceType::Medical)
            .title_opt(
                self.title
                    .as_deref()
                    .map(|t| t.trim().trim_end_matches('.'))
                    .and_then(non_empty),
            )
            .authors(
                self.authors
                    .iter()
                    .filter_map(|a| a.name.as_deref())
                    .filter_map(parse_person_name),
            )
            .year_opt(self.pubdate.as_deref().and_then(coerce_year))
            .venue_opt(
                self.fulljournalname
                    .and_then(non_empty)
                    .or_else(|| self.source.and_then(non_empty)),
            )
            .volume_opt(self.volume.and_then(non_empty))
            .issue_opt(self.issue.and_then(non_empty))
            .pages_opt(self.pages.and_then(non_empty))
            .url(format!("https://pubmed.ncbi.nlm.nih.gov/{}/", pmid))
            .identifier(IdentifierKind::Pmid, pmid)
            .identifier_opt(IdentifierKind::Doi, doi)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const SUMMARY: &str = r#"{
        "header": {"type": "esummary"},
        "result": {
            "uids": ["31978945"],
            "31978945": {
                "uid": "31978945",
                "pubdate": "2020 Feb 20",
                "source": "N Engl J Med",
                "fulljournalname": "The New England journal of medicine",
                "title": "A Novel Coronavirus from Patients with Pneumonia in China, 2019.",
                "authors": [{"name": "Zhu N", "authtype": "Author"}, {"name": "Zhang D"}],
                "volume": "382",
                "issue": "8",
                "pages": "727-733",
                "articleids": [
                    {"idtype": "pubmed", "value": "31978945"},
                    {"idtype": "doi", "value": "10.1056/NEJMoa2001017"}
                ]
            }
        }
    }"#;

    fn source(server: &mockito::ServerGuard) -> PubMedSource {
        PubMedSource::with_base_url(Arc::new(HttpClient::new().unwrap()), server.url())
    }

    #[tokio::test]
    async fn test_search_then_summary() {
        let mut server = mockito::Server::new_async().await;
        let phrase = server
            .mock("GET", "/esearch.fcgi")
            .match_query(Matcher::UrlEncoded(
                "term".into(),
                "\"novel coronavirus pneumonia china\"".into(),
            ))
            .with_status(200)
            .with_body(r#"{"esearchresult": {"count": "0", "idlist": []}}"#)
            .create_async()
            .await;
        let terms = server
            .mock("GET", "/esearch.fcgi")
            .match_query(Matcher::UrlEncoded(
                "term".into(),
                "novel coronavirus pneumonia china".into(),
            ))
            .with_status(200)
            .with_body(r#"{"esearchresult": {"count": "1", "idlist": ["31978945"]}}"#)
            .create_async()
            .await;
        let summary = server
            .mock("GET", "/esummary.fcgi")
            .match_query(Matcher::UrlEncoded("id".into(), "31978945".into()))
            .with_status(200)
            .with_body(SUMMARY)
            .create_async()
            .await;

        let result = source(&server)
            .search(&LookupQuery::new(
                "novel coronavirus pneumonia china",
                ReferenceType::Medical,
            ))
            .await
            .unwrap();

        phrase.assert_async().await;
        terms.assert_async().await;
        summary.assert_async().await;

        assert!(result.matched);
        let record = result.record.unwrap();
        assert_eq!(record.reference_type(), ReferenceType::Medical);
        assert_eq!(
            record.title(),
            Some("A Novel Coronavirus from Patients with Pneumonia in China, 2019")
        );
        assert_eq!(record.year(), Some(2020));
        assert_eq!(record.venue(), Some("The New England journal of medicine"));
        assert_eq!(record.authors()[0].family, "Zhu");
        assert_eq!(record.identifier(IdentifierKind::Doi), Some("10.1056/NEJMoa2001017"));
        assert_eq!(record.url(), Some("https://pubmed.ncbi.nlm.nih.gov/31978945/"));
    }

    #[tokio::test]
    async fn test_pmid_skips_search() {
        let mut server = mockito::Server::new_async().await;
        let search = server
            .mock("GET", "/esearch.fcgi")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;
        let _summary = server
            .mock("GET", "/esummary.fcgi")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(SUMMARY)
            .create_async()
            .await;

        let result = source(&server)
            .search(&LookupQuery::new("PMID: 31978945", ReferenceType::Medical))
            .await
            .unwrap();

        search.assert_async().await;
        assert!(result.matched);
        assert_eq!(result.confidence, MAX_MATCH_CONFIDENCE);
    }

    #[tokio::test]
    async fn test_no_ids_is_no_match() {
        let mut server = mockito::Server::new_async().await;
        let search = server
            .mock("GET", "/esearch.fcgi")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"esearchresult": {"idlist": []}}"#)
            .expect(2)
            .create_async()
            .await;

        let result = source(&server)
            .search(&LookupQuery::new("zzzz qqqq", ReferenceType::Medical))
            .await
            .unwrap();

        search.assert_async().await;
        assert!(!result.matched);
    }
}
