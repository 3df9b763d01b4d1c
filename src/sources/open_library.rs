//! Open Library provider: ISBN editions and catalogue search.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use crate::models::{
    extra, Author, CanonicalRecord, IdentifierKind, LookupQuery, ProviderResult, ReferenceType,
};
use crate::normalize::{
    coerce_year, extract_isbn, non_empty, parse_person_name, publisher_place, MAX_MATCH_CONFIDENCE,
};
use crate::sources::{best_match, Source, SourceCapabilities, SourceError};
use crate::utils::{api_retry_config, with_retry, HttpClient};

const OPEN_LIBRARY_API_BASE: &str = "https://openlibrary.org";

/// Author references resolved per edition
const MAX_EDITION_AUTHORS: usize = 3;

/// Open Library source
///
/// An ISBN resolves the edition directly (authors are separate documents);
/// anything else goes through `search.json`.
#[derive(Debug, Clone)]
pub struct OpenLibrarySource {
    client: Arc<HttpClient>,
    base_url: String,
}

impl OpenLibrarySource {
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self::with_base_url(client, OPEN_LIBRARY_API_BASE)
    }

    pub fn with_base_url(client: Arc<HttpClient>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    async fn fetch<T: for<'de> Deserialize<'de>>(&self, url: String) -> Result<Option<T>, SourceError> {
        let client = Arc::clone(&self.client);
        with_retry(api_retry_config(), || {
            let client = Arc::clone(&client);
            let url = url.clone();
            async move { HttpClient::fetch_json::<T>(client.get(&url).await, "Open Library").await }
        })
        .await
    }

    async fn edition(&self, isbn: &str) -> Result<Option<CanonicalRecord>, SourceError> {
        let url = format!("{}/isbn/{}.json", self.base_url, isbn);
        let Some(edition) = self.fetch::<OLEdition>(url).await? else {
            return Ok(None);
        };

        let mut authors = Vec::new();
        for reference in edition.authors.iter().take(MAX_EDITION_AUTHORS) {
            let url = format!("{}{}.json", self.base_url, reference.key);
            // A missing author document should not sink the edition
            match self.fetch::<OLAuthor>(url).await {
                Ok(Some(author)) => authors.extend(author.name.as_deref().and_then(parse_person_name)),
                Ok(None) => {}
                Err(e) => tracing::debug!("Open Library author {} failed: {}", reference.key, e),
            }
        }

        let url = format!("{}/isbn/{}", self.base_url, isbn);
        Ok(Some(edition.into_record(authors, isbn, url)))
    }
}

#[async_trait]
impl Source for OpenLibrarySource {
    fn id(&self) -> &str {
        "open_library"
    }

    fn name(&self) -> &str {
        "Open Library"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::SEARCH | SourceCapabilities::ISBN_LOOKUP
    }

    async fn search(&self, query: &LookupQuery) -> Result<ProviderResult, SourceError> {
        if query.is_blank() {
            return Ok(ProviderResult::no_match(self.id()));
        }

        if let Some(isbn) = extract_isbn(&query.text) {
            if let Some(record) = self.edition(&isbn).await? {
                if record.has_minimum_data() {
                    return Ok(ProviderResult::matched(self.id(), record, MAX_MATCH_CONFIDENCE));
                }
            }
        }

        let url = format!(
            "{}/search.json?q={}&limit=5",
            self.base_url,
            urlencoding::encode(query.text.trim())
        );
        let data: Option<OLSearchResponse> = self.fetch(url).await?;

        let records = data
            .map(|d| d.docs)
            .unwrap_or_default()
            .into_iter()
            .map(OLDoc::into_record);

        Ok(best_match(self.id(), &query.text, records))
    }
}

// ===== Open Library API Types =====

#[derive(Debug, Deserialize)]
struct OLSearchResponse {
    #[serde(default)]
    docs: Vec<OLDoc>,
}

#[derive(Debug, Deserialize)]
struct OLDoc {
    title: Option<String>,
    subtitle: Option<String>,
    #[serde(default)]
    author_name: Vec<String>,
    first_publish_year: Option<i32>,
    #[serde(default)]
    publisher: Vec<String>,
    #[serde(default)]
    isbn: Vec<String>,
    key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OLEdition {
    title: Option<String>,
    subtitle: Option<String>,
    #[serde(default)]
    publishers: Vec<String>,
    publish_date: Option<String>,
    #[serde(default)]
    authors: Vec<OLKey>,
    #[serde(default)]
    publish_places: Vec<String>,
    edition_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OLKey {
    key: String,
}

#[derive(Debug, Deserialize)]
struct OLAuthor {
    name: Option<String>,
}

fn full_title(title: Option<String>, subtitle: Option<String>) -> Option<String> {
    match (title.and_then(non_empty), subtitle.and_then(non_empty)) {
        (Some(title), Some(subtitle)) => Some(format!("{}: {}", title, subtitle)),
        (title, _) => title,
    }
}

impl OLDoc {
    fn into_record(self) -> CanonicalRecord {
        let publisher = self.publisher.into_iter().find_map(non_empty);
        let place = publisher_place(publisher.as_deref(), None);
        let url = self
            .key
            .and_then(non_empty)
            .map(|key| format!("{}{}", OPEN_LIBRARY_API_BASE, key));

        CanonicalRecord::builder(ReferenceType::Book)
            .title_opt(full_title(self.title, self.subtitle))
            .authors(self.author_name.iter().filter_map(|a| parse_person_name(a)))
            .year_opt(self.first_publish_year)
            .publisher_opt(publisher)
            .url_opt(url)
            .identifier_opt(IdentifierKind::Isbn, self.isbn.into_iter().find_map(non_empty))
            .extra_opt(extra::PLACE, place)
            .build()
    }
}

impl OLEdition {
    fn into_record(self, authors: Vec<Author>, isbn: &str, url: String) -> CanonicalRecord {
        let publisher = self.publishers.into_iter().find_map(non_empty);
        let listed_place = self.publish_places.into_iter().find_map(non_empty);
        let place = publisher_place(publisher.as_deref(), listed_place.as_deref());

        CanonicalRecord::builder(ReferenceType::Book)
            .title_opt(full_title(self.title, self.subtitle))
            .authors(authors)
            .year_opt(self.publish_date.as_deref().and_then(coerce_year))
            .publisher_opt(publisher)
            .url(url)
            .identifier(IdentifierKind::Isbn, isbn)
            .extra_opt(extra::PLACE, place)
            .extra_opt(extra::EDITION, self.edition_name.and_then(non_empty))
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn source(server: &mockito::ServerGuard) -> OpenLibrarySource {
        OpenLibrarySource::with_base_url(Arc::new(HttpClient::new().unwrap()), server.url())
    }

    #[tokio::test]
    async fn test_isbn_edition_with_authors() {
        let mut server = mockito::Server::new_async().await;
        let edition = server
            .mock("GET", "/isbn/9780691129426.json")
            .with_status(200)
            .with_body(
                r#"{"title": "The Myth of the Rational Voter", "publishers": ["Princeton University Press"],
                    "publish_date": "2007", "authors": [{"key": "/authors/OL123A"}]}"#,
            )
            .create_async()
            .await;
        let author = server
            .mock("GET", "/authors/OL123A.json")
            .with_status(200)
            .with_body(r#"{"name": "Bryan Caplan"}"#)
            .create_async()
            .await;

        let result = source(&server)
            .search(&LookupQuery::new("9780691129426", ReferenceType::Book))
            .await
            .unwrap();

        edition.assert_async().await;
        author.assert_async().await;
        assert!(result.matched);
        assert_eq!(result.confidence, MAX_MATCH_CONFIDENCE);
        let record = result.record.unwrap();
        assert_eq!(record.authors()[0].family, "Caplan");
        assert_eq!(record.year(), Some(2007));
        assert_eq!(record.extra(extra::PLACE), Some("Princeton"));
        assert!(record.url().unwrap().ends_with("/isbn/9780691129426"));
    }

    #[tokio::test]
    async fn test_unknown_isbn_falls_back_to_search() {
        let mut server = mockito::Server::new_async().await;
        let _edition = server
            .mock("GET", "/isbn/9780691129426.json")
            .with_status(404)
            .create_async()
            .await;
        let search = server
            .mock("GET", "/search.json")
            .match_query(Matcher::UrlEncoded("q".into(), "9780691129426".into()))
            .with_status(200)
            .with_body(r#"{"numFound": 0, "docs": []}"#)
            .create_async()
            .await;

        let result = source(&server)
            .search(&LookupQuery::new("9780691129426", ReferenceType::Book))
            .await
            .unwrap();

        search.assert_async().await;
        assert!(!result.matched);
    }

    #[tokio::test]
    async fn test_catalogue_search() {
        let mut server = mockito::Server::new_async().await;
        let _search = server
            .mock("GET", "/search.json")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"docs": [{"title": "Walden", "author_name": ["Henry David Thoreau"],
                    "first_publish_year": 1854, "publisher": ["Ticknor and Fields"], "key": "/works/OL1W"}]}"#,
            )
            .create_async()
            .await;

        let result = source(&server)
            .search(&LookupQuery::new("thoreau walden", ReferenceType::Book))
            .await
            .unwrap();

        assert!(result.matched);
        let record = result.record.unwrap();
        assert_eq!(record.title(), Some("Walden"));
        assert_eq!(record.year(), Some(1854));
        assert_eq!(record.url(), Some("https://openlibrary.org/works/OL1W"));
    }
}
