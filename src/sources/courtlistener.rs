//! CourtListener opinion search for US case law.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::sync::Arc;

use crate::models::{
    extra, CanonicalRecord, IdentifierKind, LookupQuery, ProviderResult, ReferenceType,
};
use crate::normalize::{coerce_year, non_empty};
use crate::sources::{best_match, Source, SourceError};
use crate::utils::{api_retry_config, with_retry, HttpClient};

const COURTLISTENER_API_BASE: &str = "https://www.courtlistener.com/api/rest/v3";
const COURTLISTENER_SITE: &str = "https://www.courtlistener.com";

/// Results inspected per attempt
const MAX_RESULTS: usize = 10;

/// Score at which later attempts are not worth making
const STRONG_MATCH: f64 = 0.8;

/// Plaintiffs too common to search on alone
const GENERIC_PARTIES: &[&str] = &[
    "state", "people", "united", "states", "board", "city", "county", "in re",
];

static VERSUS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s+v\.?\s+").unwrap());
static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").unwrap());

/// One search attempt: the `q` parameter, plus a plaintiff every result must name
#[derive(Debug, Clone, PartialEq, Eq)]
struct SearchAttempt {
    name: &'static str,
    q: String,
    require_plaintiff: Option<String>,
}

/// Drop "v." and punctuation
fn keyword_query(query: &str) -> String {
    let without_v = VERSUS.replace_all(query, " ");
    NON_WORD.replace_all(&without_v, "").trim().to_string()
}

/// Lucene fuzzy terms (`term~`) for words longer than three characters
fn fuzzy_query(keywords: &str) -> String {
    keywords
        .split_whitespace()
        .map(|term| {
            if term.chars().count() > 3 && !term.chars().all(|c| c.is_ascii_digit()) {
                format!("{}~", term)
            } else {
                term.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn plaintiff(query: &str) -> Option<String> {
    let mut parts = VERSUS.splitn(query, 2);
    let first = parts.next()?.trim();
    parts.next()?;
    non_empty(first)
}

/// Phrase, keywords, fuzzy, then plaintiff alone when it is distinctive
fn search_attempts(query: &str) -> Vec<SearchAttempt> {
    let query = query.trim();
    let keywords = keyword_query(query);
    let mut attempts = vec![
        SearchAttempt {
            name: "phrase",
            q: format!("\"{}\"", query),
            require_plaintiff: None,
        },
        SearchAttempt {
            name: "keyword",
            q: keywords.clone(),
            require_plaintiff: None,
        },
        SearchAttempt {
            name: "fuzzy",
            q: fuzzy_query(&keywords),
            require_plaintiff: None,
        },
    ];

    if let Some(plaintiff) = plaintiff(query) {
        let lower = plaintiff.to_lowercase();
        if plaintiff.chars().count() > 4 && !GENERIC_PARTIES.contains(&lower.as_str()) {
            attempts.push(SearchAttempt {
                name: "plaintiff",
                q: plaintiff,
                require_plaintiff: Some(lower),
            });
        }
    }
    attempts
}

/// CourtListener legal source
///
/// Requires an API token; requests without one are rejected upstream.
#[derive(Debug, Clone)]
pub struct CourtListenerSource {
    client: Arc<HttpClient>,
    base_url: String,
    api_key: Option<String>,
}

impl CourtListenerSource {
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self::with_base_url(client, COURTLISTENER_API_BASE)
    }

    pub fn with_base_url(client: Arc<HttpClient>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    async fn run_attempt(&self, attempt: &SearchAttempt) -> Result<Vec<CLOpinion>, SourceError> {
        let url = format!(
            "{}/search/?q={}&type=o&order_by={}&format=json",
            self.base_url,
            urlencoding::encode(&attempt.q),
            urlencoding::encode("score desc")
        );

        let client = Arc::clone(&self.client);
        let data: Option<CLSearchResponse> = with_retry(api_retry_config(), || {
            let client = Arc::clone(&client);
            let url = url.clone();
            async move {
                let mut request = client.get(&url).await;
                if let Some(key) = &self.api_key {
                    request = request.header("Authorization", format!("Token {}", key));
                }
                HttpClient::fetch_json(request, "CourtListener").await
            }
        })
        .await?;

        Ok(data.map(|d| d.results).unwrap_or_default())
    }
}

#[async_trait]
impl Source for CourtListenerSource {
    fn id(&self) -> &str {
        "courtlistener"
    }

    fn name(&self) -> &str {
        "CourtListener"
    }

    async fn search(&self, query: &LookupQuery) -> Result<ProviderResult, SourceError> {
        if query.is_blank() {
            return Ok(ProviderResult::no_match(self.id()));
        }

        let mut best = ProviderResult::no_match(self.id());
        let mut last_error = None;
        let mut answered = false;

        for attempt in search_attempts(&query.text) {
            let opinions = match self.run_attempt(&attempt).await {
                Ok(opinions) => opinions,
                Err(SourceError::Unauthorized(reason)) => {
                    return Err(SourceError::Unauthorized(reason))
                }
                Err(e) => {
                    tracing::warn!("CourtListener {} attempt failed: {}", attempt.name, e);
                    last_error = Some(e);
                    continue;
                }
            };
            answered = true;

            let records = opinions
                .into_iter()
                .take(MAX_RESULTS)
                .filter(|opinion| match (&attempt.require_plaintiff, opinion.case_name()) {
                    (Some(plaintiff), Some(name)) => name.to_lowercase().contains(plaintiff),
                    _ => true,
                })
                .map(CLOpinion::into_record);

            let result = best_match(self.id(), &query.text, records);
            if result.matched && (!best.matched || result.confidence > best.confidence) {
                tracing::debug!(
                    "CourtListener {} attempt scored {:.2}",
                    attempt.name,
                    result.confidence
                );
                best = result;
            }
            if best.matched && best.confidence >= STRONG_MATCH {
                break;
            }
        }

        match last_error {
            Some(e) if !answered => Err(e),
            _ => Ok(best),
        }
    }
}

// ===== CourtListener API Types =====

#[derive(Debug, Deserialize)]
struct CLSearchResponse {
    #[serde(default)]
    results: Vec<CLOpinion>,
}

#[derive(Debug, Deserialize)]
struct CLOpinion {
    #[serde(rename = "caseName")]
    case_name_camel: Option<String>,
    case_name: Option<String>,
    #[serde(rename = "dateFiled")]
    date_filed: Option<String>,
    #[serde(alias = "citations")]
    citation: Option<CLCitation>,
    court: Option<String>,
    absolute_url: Option<String>,
    #[serde(rename = "docketNumber")]
    docket_number: Option<String>,
}

/// Citations come back as a single string or a list
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CLCitation {
    One(String),
    Many(Vec<String>),
}

impl CLCitation {
    fn first(self) -> Option<String> {
        match self {
            CLCitation::One(citation) => non_empty(citation),
            CLCitation::Many(list) => list.into_iter().find_map(non_empty),
        }
    }
}

impl CLOpinion {
    fn case_name(&self) -> Option<&str> {
        self.case_name_camel
            .as_deref()
            .or(self.case_name.as_deref())
            .filter(|name| !name.trim().is_empty())
    }

    fn into_record(self) -> CanonicalRecord {
        let case_name = self.case_name().map(str::to_string);
        let url = self
            .absolute_url
            .and_then(non_empty)
            .map(|path| format!("{}{}", COURTLISTENER_SITE, path));

        CanonicalRecord::builder(ReferenceType::Legal)
            .title_opt(case_name)
            .court_opt(self.court.and_then(non_empty))
            .year_opt(self.date_filed.as_deref().and_then(coerce_year))
            .url_opt(url)
            .identifier_opt(IdentifierKind::DocketNumber, self.docket_number.and_then(non_empty))
            .extra_opt(extra::REPORTER_CITATION, self.citation.and_then(CLCitation::first))
            .extra(extra::JURISDICTION, "US")
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const OPINION: &str = r#"{
        "count": 1,
        "results": [{
            "caseName": "Tarasoff v. Regents of University of California",
            "dateFiled": "1976-07-01",
            "citation": ["17 Cal. 3d 425", "551 P.2d 334"],
            "court": "California Supreme Court",
            "absolute_url": "/opinion/1175445/tarasoff-v-regents/",
            "docketNumber": "S.F. 23042"
        }]
    }"#;

    fn source(server: &mockito::ServerGuard) -> CourtListenerSource {
        CourtListenerSource::with_base_url(Arc::new(HttpClient::new().unwrap()), server.url())
    }

    #[test]
    fn test_search_attempts() {
        let attempts = search_attempts("Tarasoff v. Regents");
        let queries: Vec<&str> = attempts.iter().map(|a| a.q.as_str()).collect();
        assert_eq!(
            queries,
            vec!["\"Tarasoff v. Regents\"", "Tarasoff Regents", "Tarasoff~ Regents~", "Tarasoff"]
        );
        assert_eq!(attempts[3].require_plaintiff.as_deref(), Some("tarasoff"));
    }

    #[test]
    fn test_generic_plaintiff_is_skipped() {
        assert_eq!(search_attempts("State v. Smith").len(), 3);
        assert_eq!(search_attempts("People v. Jones").len(), 3);
        assert_eq!(search_attempts("Roe v. Wade").len(), 3);
        assert_eq!(search_attempts("just some words").len(), 3);
    }

    #[test]
    fn test_fuzzy_query_skips_short_terms_and_numbers() {
        assert_eq!(fuzzy_query("Roe Wade 1973"), "Roe Wade~ 1973");
    }

    #[tokio::test]
    async fn test_phrase_attempt_with_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/search/")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("q".into(), "\"Tarasoff v. Regents\"".into()),
                Matcher::UrlEncoded("type".into(), "o".into()),
            ]))
            .match_header("authorization", "Token abc123")
            .with_status(200)
            .with_body(OPINION)
            .create_async()
            .await;

        let result = source(&server)
            .with_api_key(Some("abc123".to_string()))
            .search(&LookupQuery::new("Tarasoff v. Regents", ReferenceType::Legal))
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(result.matched);
        let record = result.record.unwrap();
        assert_eq!(
            record.title(),
            Some("Tarasoff v. Regents of University of California")
        );
        assert_eq!(record.year(), Some(1976));
        assert_eq!(record.extra(extra::REPORTER_CITATION), Some("17 Cal. 3d 425"));
        assert_eq!(record.extra(extra::JURISDICTION), Some("US"));
        assert_eq!(record.identifier(IdentifierKind::DocketNumber), Some("S.F. 23042"));
        assert_eq!(
            record.url(),
            Some("https://www.courtlistener.com/opinion/1175445/tarasoff-v-regents/")
        );
    }

    #[tokio::test]
    async fn test_falls_through_attempts() {
        let mut server = mockito::Server::new_async().await;
        let empty = server
            .mock("GET", "/search/")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"count": 0, "results": []}"#)
            .expect(4)
            .create_async()
            .await;

        let result = source(&server)
            .search(&LookupQuery::new("Tarasoff v. Regents", ReferenceType::Legal))
            .await
            .unwrap();

        empty.assert_async().await;
        assert!(!result.matched);
    }

    #[tokio::test]
    async fn test_rejected_token_is_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/search/")
            .match_query(Matcher::Any)
            .with_status(401)
            .create_async()
            .await;

        let err = source(&server)
            .search(&LookupQuery::new("Roe v. Wade", ReferenceType::Legal))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_weak_phrase_hit_does_not_hide_keyword_hit() {
        let mut server = mockito::Server::new_async().await;
        let phrase = server
            .mock("GET", "/search/")
            .match_query(Matcher::UrlEncoded("q".into(), "\"Tarasoff v. Regents\"".into()))
            .with_status(200)
            .with_body(
                r#"{"count": 1, "results": [{"caseName": "Regents v. Smith", "dateFiled": "1990-01-01"}]}"#,
            )
            .create_async()
            .await;
        let keyword = server
            .mock("GET", "/search/")
            .match_query(Matcher::UrlEncoded("q".into(), "Tarasoff Regents".into()))
            .with_status(200)
            .with_body(OPINION)
            .create_async()
            .await;

        let result = source(&server)
            .search(&LookupQuery::new("Tarasoff v. Regents", ReferenceType::Legal))
            .await
            .unwrap();

        phrase.assert_async().await;
        keyword.assert_async().await;
        assert!(result.matched);
        assert!(result.confidence >= STRONG_MATCH);
        assert_eq!(
            result.record.unwrap().title(),
            Some("Tarasoff v. Regents of University of California")
        );
    }

    #[tokio::test]
    async fn test_failed_attempt_moves_on() {
        let mut server = mockito::Server::new_async().await;
        let _phrase = server
            .mock("GET", "/search/")
            .match_query(Matcher::UrlEncoded("q".into(), "\"Tarasoff v. Regents\"".into()))
            .with_status(400)
            .create_async()
            .await;
        let keyword = server
            .mock("GET", "/search/")
            .match_query(Matcher::UrlEncoded("q".into(), "Tarasoff Regents".into()))
            .with_status(200)
            .with_body(OPINION)
            .create_async()
            .await;

        let result = source(&server)
            .search(&LookupQuery::new("Tarasoff v. Regents", ReferenceType::Legal))
            .await
            .unwrap();

        keyword.assert_async().await;
        assert!(result.matched);
        assert_eq!(result.record.unwrap().year(), Some(1976));
    }
}
