//! Crossref provider: DOI lookup and bibliographic search.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use crate::models::{
    extra, Author, CanonicalRecord, IdentifierKind, LookupQuery, ProviderResult, ReferenceType,
};
use crate::normalize::{extract_doi, non_empty, publisher_place};
use crate::sources::{article_type, best_match, Source, SourceCapabilities, SourceError};
use crate::utils::{api_retry_config, with_retry, HttpClient};

const CROSSREF_API_BASE: &str = "https://api.crossref.org";

/// Crossref research source
///
/// Uses the Crossref REST API: `/works/{doi}` when the query carries a DOI, otherwise
/// `query.bibliographic` search. A contact address puts requests in the polite pool.
#[derive(Debug, Clone)]
pub struct CrossRefSource {
    client: Arc<HttpClient>,
    base_url: String,
    mailto: Option<String>,
}

impl CrossRefSource {
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self::with_base_url(client, CROSSREF_API_BASE)
    }

    pub fn with_base_url(client: Arc<HttpClient>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            mailto: None,
        }
    }

    pub fn with_mailto(mut self, mailto: Option<String>) -> Self {
        self.mailto = mailto;
        self
    }

    fn polite(&self, url: String) -> String {
        match &self.mailto {
            Some(mailto) => {
                let sep = if url.contains('?') { '&' } else { '?' };
                format!("{}{}mailto={}", url, sep, urlencoding::encode(mailto))
            }
            None => url,
        }
    }

    async fn fetch<T: for<'de> Deserialize<'de>>(&self, url: String) -> Result<Option<T>, SourceError> {
        let client = Arc::clone(&self.client);
        with_retry(api_retry_config(), || {
            let client = Arc::clone(&client);
            let url = url.clone();
            async move { HttpClient::fetch_json::<T>(client.get(&url).await, "Crossref").await }
        })
        .await
    }

    async fn lookup_doi(&self, doi: &str, routed: ReferenceType) -> Result<Option<CanonicalRecord>, SourceError> {
        let url = self.polite(format!("{}/works/{}", self.base_url, urlencoding::encode(doi)));
        let data: Option<CRItemResponse> = self.fetch(url).await?;
        Ok(data.map(|d| d.message.into_record(routed)))
    }
}

#[async_trait]
impl Source for CrossRefSource {
    fn id(&self) -> &str {
        "crossref"
    }

    fn name(&self) -> &str {
        "Crossref"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::SEARCH | SourceCapabilities::DOI_LOOKUP
    }

    async fn search(&self, query: &LookupQuery) -> Result<ProviderResult, SourceError> {
        if query.is_blank() {
            return Ok(ProviderResult::no_match(self.id()));
        }

        if let Some(doi) = extract_doi(&query.text) {
            if let Some(record) = self.lookup_doi(&doi, query.reference_type).await? {
                return Ok(best_match(self.id(), &query.text, [record]));
            }
            tracing::debug!("Crossref has no record for DOI {}, falling back to search", doi);
        }

        let url = self.polite(format!(
            "{}/works?query.bibliographic={}&rows=5",
            self.base_url,
            urlencoding::encode(&query.text)
        ));
        let data: Option<CRResponse> = self.fetch(url).await?;

        let records = data
            .map(|d| d.message.items)
            .unwrap_or_default()
            .into_iter()
            .map(|item| item.into_record(query.reference_type));

        Ok(best_match(self.id(), &query.text, records))
    }
}

// ===== Crossref API Types =====

#[derive(Debug, Deserialize)]
struct CRResponse {
    message: CRMessage,
}

#[derive(Debug, Deserialize)]
struct CRItemResponse {
    message: CRItem,
}

#[derive(Debug, Deserialize)]
struct CRMessage {
    #[serde(default)]
    items: Vec<CRItem>,
}

#[derive(Debug, Deserialize)]
struct CRItem {
    #[serde(default)]
    title: Vec<String>,
    #[serde(default)]
    author: Vec<CRAuthor>,
    #[serde(rename = "container-title", default)]
    container_title: Vec<String>,
    #[serde(rename = "published-print")]
    published_print: Option<CRDate>,
    #[serde(rename = "published-online")]
    published_online: Option<CRDate>,
    issued: Option<CRDate>,
    created: Option<CRDate>,
    volume: Option<String>,
    issue: Option<String>,
    page: Option<String>,
    #[serde(rename = "DOI")]
    doi: Option<String>,
    #[serde(rename = "ISBN", default)]
    isbn: Vec<String>,
    publisher: Option<String>,
    #[serde(rename = "type")]
    item_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CRAuthor {
    given: Option<String>,
    family: Option<String>,
    /// Institutional authors come through as `name`
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CRDate {
    #[serde(rename = "date-parts", default)]
    date_parts: Vec<Vec<Option<i32>>>,
}

impl CRDate {
    fn year(&self) -> Option<i32> {
        self.date_parts.first()?.first().copied().flatten()
    }
}

impl CRItem {
    fn year(&self) -> Option<i32> {
        [
            &self.published_print,
            &self.published_online,
            &self.issued,
            &self.created,
        ]
        .into_iter()
        .flatten()
        .find_map(CRDate::year)
    }

    fn into_record(self, routed: ReferenceType) -> CanonicalRecord {
        let is_book = matches!(
            self.item_type.as_deref(),
            Some("book" | "monograph" | "edited-book" | "book-chapter" | "book-section")
        );
        let reference_type = if is_book {
            ReferenceType::Book
        } else {
            article_type(routed)
        };

        let year = self.year();
        let authors: Vec<Author> = self
            .author
            .iter()
            .filter_map(|a| match a.family.as_deref().and_then(non_empty) {
                Some(family) => Some(Author::new(a.given.clone().unwrap_or_default(), family)),
                None => a.name.as_deref().and_then(non_empty).map(Author::institutional),
            })
            .collect();

        let place = if is_book {
            publisher_place(self.publisher.as_deref(), None)
        } else {
            None
        };
        let url = self.doi.as_ref().map(|doi| format!("https://doi.org/{}", doi));

        let mut builder = CanonicalRecord::builder(reference_type)
            .title_opt(self.title.into_iter().find_map(non_empty))
            .authors(authors)
            .year_opt(year)
            .volume_opt(self.volume.and_then(non_empty))
            .issue_opt(self.issue.and_then(non_empty))
            .pages_opt(self.page.and_then(non_empty))
            .publisher_opt(self.publisher.and_then(non_empty))
            .url_opt(url)
            .identifier_opt(IdentifierKind::Doi, self.doi.and_then(non_empty))
            .identifier_opt(IdentifierKind::Isbn, self.isbn.into_iter().find_map(non_empty))
            .extra_opt(extra::PLACE, place);

        if let Some(container) = self.container_title.into_iter().find_map(non_empty) {
            builder = builder.venue(container);
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const ARTICLE: &str = r#"{
        "title": ["Trains, Brains, and Sprains"],
        "author": [{"given": "Bryan", "family": "Caplan"}, {"name": "Cato Institute"}],
        "container-title": ["Journal of Economic Perspectives"],
        "published-print": {"date-parts": [[2004, 3]]},
        "volume": "18",
        "issue": "1",
        "page": "1-20",
        "DOI": "10.1257/089533004773563485",
        "type": "journal-article"
    }"#;

    fn source(server: &mockito::ServerGuard) -> CrossRefSource {
        CrossRefSource::with_base_url(Arc::new(HttpClient::new().unwrap()), server.url())
    }

    #[tokio::test]
    async fn test_bibliographic_search() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/works")
            .match_query(Matcher::UrlEncoded(
                "query.bibliographic".into(),
                "caplan trains brains".into(),
            ))
            .with_status(200)
            .with_body(format!(r#"{{"message": {{"items": [{}]}}}}"#, ARTICLE))
            .create_async()
            .await;

        let result = source(&server)
            .search(&LookupQuery::new("caplan trains brains", ReferenceType::Journal))
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(result.matched);
        assert!(result.confidence > 0.9);
        let record = result.record.unwrap();
        assert_eq!(record.title(), Some("Trains, Brains, and Sprains"));
        assert_eq!(record.venue(), Some("Journal of Economic Perspectives"));
        assert_eq!(record.year(), Some(2004));
        assert_eq!(record.authors()[0].family, "Caplan");
        assert_eq!(record.authors()[1].family, "Cato Institute");
        assert_eq!(
            record.identifier(IdentifierKind::Doi),
            Some("10.1257/089533004773563485")
        );
        assert_eq!(
            record.url(),
            Some("https://doi.org/10.1257/089533004773563485")
        );
    }

    #[tokio::test]
    async fn test_doi_lookup() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", Matcher::Regex(r"^/works/10\.1257".into()))
            .with_status(200)
            .with_body(format!(r#"{{"message": {}}}"#, ARTICLE))
            .create_async()
            .await;

        let result = source(&server)
            .search(&LookupQuery::new(
                "doi:10.1257/089533004773563485",
                ReferenceType::Journal,
            ))
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(result.matched);
        assert_eq!(result.confidence, crate::normalize::MAX_MATCH_CONFIDENCE);
    }

    #[tokio::test]
    async fn test_empty_results_are_no_match() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", Matcher::Any)
            .with_status(200)
            .with_body(r#"{"message": {"items": []}}"#)
            .create_async()
            .await;

        let result = source(&server)
            .search(&LookupQuery::new("nothing like this", ReferenceType::Journal))
            .await
            .unwrap();
        assert!(!result.matched);
    }

    #[tokio::test]
    async fn test_server_error_is_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", Matcher::Any)
            .with_status(400)
            .create_async()
            .await;

        let err = source(&server)
            .search(&LookupQuery::new("anything", ReferenceType::Journal))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Api(_)));
    }

    #[test]
    fn test_book_items_become_books() {
        let item: CRItem = serde_json::from_str(
            r#"{"title": ["The Myth of the Rational Voter"], "type": "book",
                "publisher": "Princeton University Press", "ISBN": ["9780691138732"]}"#,
        )
        .unwrap();
        let record = item.into_record(ReferenceType::Journal);
        assert_eq!(record.reference_type(), ReferenceType::Book);
        assert_eq!(record.extra(extra::PLACE), Some("Princeton"));
        assert_eq!(record.identifier(IdentifierKind::Isbn), Some("9780691138732"));
    }
}
