//! OpenAlex provider.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use crate::models::{CanonicalRecord, IdentifierKind, LookupQuery, ProviderResult, ReferenceType};
use crate::normalize::{non_empty, parse_person_name};
use crate::sources::{article_type, best_match, Source, SourceError};
use crate::utils::{api_retry_config, with_retry, HttpClient};

const OPENALEX_API_BASE: &str = "https://api.openalex.org";

/// OpenAlex research source
///
/// Free-text search over `/works`. A contact address puts requests in the polite pool.
#[derive(Debug, Clone)]
pub struct OpenAlexSource {
    client: Arc<HttpClient>,
    base_url: String,
    mailto: Option<String>,
}

impl OpenAlexSource {
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self::with_base_url(client, OPENALEX_API_BASE)
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
}

#[async_trait]
impl Source for OpenAlexSource {
    fn id(&self) -> &str {
        "openalex"
    }

    fn name(&self) -> &str {
        "OpenAlex"
    }

    async fn search(&self, query: &LookupQuery) -> Result<ProviderResult, SourceError> {
        if query.is_blank() {
            return Ok(ProviderResult::no_match(self.id()));
        }

        let mut url = format!(
            "{}/works?search={}&per-page=5",
            self.base_url,
            urlencoding::encode(&query.text)
        );
        if let Some(mailto) = &self.mailto {
            url.push_str(&format!("&mailto={}", urlencoding::encode(mailto)));
        }

        let client = Arc::clone(&self.client);
        let data: Option<OAResponse> = with_retry(api_retry_config(), || {
            let client = Arc::clone(&client);
            let url = url.clone();
            async move { HttpClient::fetch_json(client.get(&url).await, "OpenAlex").await }
        })
        .await?;

        let records = data
            .map(|d| d.results)
            .unwrap_or_default()
            .into_iter()
            .map(|work| work.into_record(query.reference_type));

        Ok(best_match(self.id(), &query.text, records))
    }
}

// ===== OpenAlex API Types =====

#[derive(Debug, Deserialize)]
struct OAResponse {
    #[serde(default)]
    results: Vec<OAWork>,
}

#[derive(Debug, Deserialize)]
struct OAWork {
    /// Older records only carry `display_name`
    title: Option<String>,
    display_name: Option<String>,
    publication_year: Option<i32>,
    doi: Option<String>,
    #[serde(default)]
    authorships: Vec<OAAuthorship>,
    primary_location: Option<OALocation>,
    biblio: Option<OABiblio>,
    #[serde(rename = "type")]
    work_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OAAuthorship {
    author: OAAuthor,
}

#[derive(Debug, Deserialize)]
struct OAAuthor {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OALocation {
    source: Option<OASource>,
    landing_page_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OASource {
    display_name: Option<String>,
    host_organization_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OABiblio {
    volume: Option<String>,
    issue: Option<String>,
    first_page: Option<String>,
    last_page: Option<String>,
}

fn strip_doi_prefix(doi: &str) -> &str {
    doi.strip_prefix("https://doi.org/")
        .or_else(|| doi.strip_prefix("http://doi.org/"))
        .unwrap_or(doi)
}

impl OAWork {
    fn into_record(self, routed: ReferenceType) -> CanonicalRecord {
        let reference_type = match self.work_type.as_deref() {
            Some("book") | Some("monograph") => ReferenceType::Book,
            _ if routed == ReferenceType::Book => ReferenceType::Book,
            _ => article_type(routed),
        };

        let (venue, publisher, landing) = match self.primary_location {
            Some(location) => {
                let (venue, publisher) = match location.source {
                    Some(source) => (source.display_name, source.host_organization_name),
                    None => (None, None),
                };
                (venue, publisher, location.landing_page_url)
            }
            None => (None, None, None),
        };

        let (volume, issue, pages) = match self.biblio {
            Some(b) => {
                let pages = match (b.first_page.and_then(non_empty), b.last_page.and_then(non_empty)) {
                    (Some(first), Some(last)) if first != last => Some(format!("{}-{}", first, last)),
                    (Some(first), _) => Some(first),
                    (None, _) => None,
                };
                (b.volume, b.issue, pages)
            }
            None => (None, None, None),
        };

        let doi = self
            .doi
            .as_deref()
            .map(strip_doi_prefix)
            .and_then(non_empty);
        let url = doi
            .as_ref()
            .map(|doi| format!("https://doi.org/{}", doi))
            .or(landing);

        let builder = CanonicalRecord::builder(reference_type)
            .title_opt(self.title.or(self.display_name).and_then(non_empty))
            .authors(
                self.authorships
                    .iter()
                    .filter_map(|a| a.author.display_name.as_deref())
                    .filter_map(parse_person_name),
            )
            .year_opt(self.publication_year)
            .volume_opt(volume.and_then(non_empty))
            .issue_opt(issue.and_then(non_empty))
            .pages_opt(pages)
            .url_opt(url)
            .identifier_opt(IdentifierKind::Doi, doi);

        if reference_type == ReferenceType::Book {
            builder.publisher_opt(publisher.and_then(non_empty)).build()
        } else {
            builder.venue_opt(venue.and_then(non_empty)).build()
        }
    }
}
