//! Google Books provider.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use crate::models::{
    extra, CanonicalRecord, IdentifierKind, LookupQuery, ProviderResult, ReferenceType,
};
use crate::normalize::{
    coerce_year, extract_isbn, non_empty, parse_person_name, publisher_place, MAX_MATCH_CONFIDENCE,
};
use crate::sources::{best_match, Source, SourceCapabilities, SourceError};
use crate::utils::{api_retry_config, with_retry, HttpClient};

const GOOGLE_BOOKS_API_BASE: &str = "https://www.googleapis.com/books/v1";

/// Google Books source
///
/// `isbn:` queries when the text carries a valid ISBN, free text otherwise. No key needed.
#[derive(Debug, Clone)]
pub struct GoogleBooksSource {
    client: Arc<HttpClient>,
    base_url: String,
}

impl GoogleBooksSource {
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self::with_base_url(client, GOOGLE_BOOKS_API_BASE)
    }

    pub fn with_base_url(client: Arc<HttpClient>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl Source for GoogleBooksSource {
    fn id(&self) -> &str {
        "google_books"
    }

    fn name(&self) -> &str {
        "Google Books"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::SEARCH | SourceCapabilities::ISBN_LOOKUP
    }

    async fn search(&self, query: &LookupQuery) -> Result<ProviderResult, SourceError> {
        if query.is_blank() {
            return Ok(ProviderResult::no_match(self.id()));
        }

        let isbn = extract_isbn(&query.text);
        let q = match &isbn {
            Some(isbn) => format!("isbn:{}", isbn),
            None => query.text.trim().to_string(),
        };
        let url = format!(
            "{}/volumes?q={}&maxResults=5&printType=books",
            self.base_url,
            urlencoding::encode(&q)
        );

        let client = Arc::clone(&self.client);
        let data: Option<GBResponse> = with_retry(api_retry_config(), || {
            let client = Arc::clone(&client);
            let url = url.clone();
            async move { HttpClient::fetch_json(client.get(&url).await, "Google Books").await }
        })
        .await?;

        let records = data
            .map(|d| d.items)
            .unwrap_or_default()
            .into_iter()
            .map(GBVolume::into_record);

        if isbn.is_some() {
            // Google only answers isbn: queries with that edition
            return Ok(match records.into_iter().find(CanonicalRecord::has_minimum_data) {
                Some(record) => ProviderResult::matched(self.id(), record, MAX_MATCH_CONFIDENCE),
                None => ProviderResult::no_match(self.id()),
            });
        }

        Ok(best_match(self.id(), &query.text, records))
    }
}

// ===== Google Books API Types =====

#[derive(Debug, Deserialize)]
struct GBResponse {
    #[serde(default)]
    items: Vec<GBVolume>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GBVolume {
    volume_info: GBVolumeInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GBVolumeInfo {
    title: Option<String>,
    subtitle: Option<String>,
    #[serde(default)]
    authors: Vec<String>,
    publisher: Option<String>,
    published_date: Option<String>,
    #[serde(default)]
    industry_identifiers: Vec<GBIdentifier>,
    info_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GBIdentifier {
    #[serde(rename = "type")]
    kind: String,
    identifier: String,
}

impl GBVolume {
    fn into_record(self) -> CanonicalRecord {
        let info = self.volume_info;

        let title = match (info.title.and_then(non_empty), info.subtitle.and_then(non_empty)) {
            (Some(title), Some(subtitle)) => Some(format!("{}: {}", title, subtitle)),
            (title, _) => title,
        };

        let isbn = ["ISBN_13", "ISBN_10"].iter().find_map(|kind| {
            info.industry_identifiers
                .iter()
                .find(|id| id.kind == *kind)
                .and_then(|id| non_empty(&id.identifier))
        });

        let place = publisher_place(info.publisher.as_deref(), None);

        CanonicalRecord::builder(ReferenceType::Book)
            .title_opt(title)
            .authors(info.authors.iter().filter_map(|a| parse_person_name(a)))
            .year_opt(info.published_date.as_deref().and_then(coerce_year))
            .publisher_opt(info.publisher.and_then(non_empty))
            .url_opt(info.info_link.and_then(non_empty))
            .identifier_opt(IdentifierKind::Isbn, isbn)
            .extra_opt(extra::PLACE, place)
            .build()
    }
}
