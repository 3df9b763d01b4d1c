//! Offline extractors that build records from the query text or URL itself.
//!
//! Interviews, newspaper articles, government documents and generic web pages rarely
//! have a metadata API worth calling. These providers derive what they can (names,
//! dates, publication, agency, a title from the URL slug) and hand the cascade a record
//! like any other provider.

use async_trait::async_trait;
use chrono::{Datelike, Local, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::config::tables;
use crate::detect::{is_url, url_host};
use crate::models::{extra, CanonicalRecord, LookupQuery, ProviderResult, ReferenceType};
use crate::normalize::non_empty;
use crate::sources::{Source, SourceCapabilities, SourceError};

const EXTRACTED_CONFIDENCE: f64 = 0.9;
const FALLBACK_CONFIDENCE: f64 = 0.6;

static SLASH_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})[/-](\d{1,2})[/-](\d{2,4})\b").unwrap());

static WORD_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+(\d{1,2})(?:st|nd|rd|th)?,?\s+(\d{4})",
    )
    .unwrap()
});

static INTERVIEW_WITH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^([^,]+?)\s+interview\s+with\s+([^,]+)").unwrap());

static INTERVIEWED_BY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^([^,]+?)\s+interview(?:ed)?\s+by\s+([^,]+)").unwrap());

static LEADING_INTERVIEW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:interview|conversation|personal communication)\s+with\s+([^,]+)")
        .unwrap()
});

static NAME_INTERVIEW: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^([^,]+?)\s+interview").unwrap());

static LOCATIONS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r",\s*([A-Za-z][A-Za-z\s\.]+),\s*([A-Z]{2})(?:\s*,|\s*$)",
        r",\s*([A-Za-z][A-Za-z\s]+),\s*([A-Za-z]{2,})\s*(?:,|$)",
        r"([A-Z][a-z]+(?:\s+[A-Z][a-z]+)?),\s*([A-Z]{2})\b",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static PATH_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"/(\d{4})/(\d{2})/(\d{2})/").unwrap());

static PAGE_EXTENSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.(?:html?|php|aspx?)$").unwrap());

static FILE_EXTENSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.[a-z]{2,4}$").unwrap());

static FEDERAL_REGISTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d+)\s+FR\s+(\d+)\b").unwrap());

static ACRONYMS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        "FDA", "NIH", "CDC", "US", "UK", "AI", "CEO", "CFO", "CTO", "NASA", "FBI", "CIA", "NBA",
        "NFL", "MLB", "COVID", "DNA", "RNA",
    ]
    .iter()
    .map(|acronym| {
        let title = title_case(acronym);
        (Regex::new(&format!(r"\b{}\b", title)).unwrap(), *acronym)
    })
    .collect()
});

/// "May 7, 1918"
fn long_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn month_number(name: &str) -> Option<u32> {
    let months = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];
    let prefix = name.get(..3)?.to_lowercase();
    months
        .iter()
        .position(|m| *m == prefix)
        .and_then(|i| u32::try_from(i + 1).ok())
}

/// A date mentioned in free text: the matched span and its long form when it parses
fn find_date(text: &str) -> Option<(String, Option<NaiveDate>)> {
    if let Some(caps) = SLASH_DATE.captures(text) {
        let span = caps.get(0)?.as_str().to_string();
        let month: u32 = caps.get(1)?.as_str().parse().ok()?;
        let day: u32 = caps.get(2)?.as_str().parse().ok()?;
        let year_text = caps.get(3)?.as_str();
        let mut year: i32 = year_text.parse().ok()?;
        if year_text.len() == 2 {
            year += if year < 69 { 2000 } else { 1900 };
        }
        return Some((span, NaiveDate::from_ymd_opt(year, month, day)));
    }

    let caps = WORD_DATE.captures(text)?;
    let span = caps.get(0)?.as_str().to_string();
    let parsed = (|| {
        let month = month_number(caps.get(1)?.as_str())?;
        let day: u32 = caps.get(2)?.as_str().parse().ok()?;
        let year: i32 = caps.get(3)?.as_str().parse().ok()?;
        NaiveDate::from_ymd_opt(year, month, day)
    })();
    Some((span, parsed))
}

/// Title derived from the last path segment of a URL
fn slug_title(url: &Url, extension: &Regex) -> Option<String> {
    let slug = url.path().trim_end_matches('/').rsplit('/').next()?;
    let slug = extension.replace(slug, "");
    if !slug.chars().any(char::is_alphabetic) {
        return None;
    }
    let mut title = title_case(&slug.replace(['-', '_'], " "));
    for (pattern, acronym) in ACRONYMS.iter() {
        title = pattern.replace_all(&title, *acronym).into_owned();
    }
    non_empty(title)
}

fn bare_host(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    Some(host.strip_prefix("www.").map(str::to_string).unwrap_or(host))
}

fn access_date_text(fixed: Option<NaiveDate>) -> String {
    long_date(fixed.unwrap_or_else(|| Local::now().date_naive()))
}

fn trim_trailing_punctuation(text: &str) -> &str {
    text.trim().trim_end_matches(['.', ',', ';', ':', ')'])
}

/// Interview metadata from free text
///
/// Handles "John Smith interview, May 7, 1918, Boston, MA",
/// "Kevin Smith interview with William Jones, 11/27/1981, Austin, TX" and
/// "Interview with Jane Doe".
pub fn extract_interview(text: &str) -> CanonicalRecord {
    let text = text.trim();
    let mut builder = CanonicalRecord::builder(ReferenceType::Interview);

    let date = find_date(text);
    let without_date = match &date {
        Some((span, _)) => text.replace(span.as_str(), ""),
        None => text.to_string(),
    };

    if let Some((span, parsed)) = &date {
        match parsed {
            Some(day) => {
                builder = builder
                    .extra(extra::DATE, long_date(*day))
                    .year(day.year());
            }
            None => builder = builder.extra(extra::DATE, span.clone()),
        }
    }

    let name = |caps: &regex::Captures<'_>, i: usize| {
        caps.get(i).and_then(|m| non_empty(title_case(m.as_str())))
    };

    if let Some(caps) = INTERVIEW_WITH.captures(&without_date) {
        builder = builder
            .extra_opt(extra::INTERVIEWER, name(&caps, 1))
            .extra_opt(extra::INTERVIEWEE, name(&caps, 2));
    } else if let Some(caps) = INTERVIEWED_BY.captures(&without_date) {
        builder = builder
            .extra_opt(extra::INTERVIEWEE, name(&caps, 1))
            .extra_opt(extra::INTERVIEWER, name(&caps, 2));
    } else if let Some(caps) = LEADING_INTERVIEW.captures(&without_date) {
        builder = builder.extra_opt(extra::INTERVIEWEE, name(&caps, 1));
    } else if let Some(caps) = NAME_INTERVIEW.captures(&without_date) {
        builder = builder.extra_opt(extra::INTERVIEWEE, name(&caps, 1));
    }

    for pattern in LOCATIONS.iter() {
        if let Some(caps) = pattern.captures(&without_date) {
            let city = caps.get(1).map(|m| title_case(m.as_str())).unwrap_or_default();
            let state = caps.get(2).map(|m| m.as_str().trim()).unwrap_or_default();
            let state = if state.len() == 2 {
                state.to_uppercase()
            } else {
                title_case(state)
            };
            if !city.is_empty() {
                builder = builder.extra(extra::LOCATION, format!("{}, {}", city, state));
            }
            break;
        }
    }

    builder.build()
}

/// Newspaper article metadata from its URL
pub fn extract_newspaper(text: &str, access_date: Option<NaiveDate>) -> Option<CanonicalRecord> {
    let url = Url::parse(trim_trailing_punctuation(text)).ok()?;
    let host = bare_host(&url)?;
    let venue = tables::newspaper_name(&host)
        .map(str::to_string)
        .unwrap_or(host);

    let mut builder = CanonicalRecord::builder(ReferenceType::Newspaper)
        .venue(venue)
        .url(url.as_str())
        .title_opt(slug_title(&url, &PAGE_EXTENSION))
        .extra(extra::ACCESS_DATE, access_date_text(access_date));

    if let Some(caps) = PATH_DATE.captures(url.path()) {
        let parts: Option<(i32, u32, u32)> = (|| {
            Some((
                caps.get(1)?.as_str().parse().ok()?,
                caps.get(2)?.as_str().parse().ok()?,
                caps.get(3)?.as_str().parse().ok()?,
            ))
        })();
        if let Some(day) = parts.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)) {
            builder = builder
                .extra(extra::DATE, long_date(day))
                .year_opt(parts.map(|(y, _, _)| y));
        }
    }

    Some(builder.build())
}

/// Government document metadata from a `.gov` URL or a Federal Register reference
pub fn extract_government(text: &str, access_date: Option<NaiveDate>) -> CanonicalRecord {
    let clean = trim_trailing_punctuation(text);
    let builder = CanonicalRecord::builder(ReferenceType::Government)
        .extra(extra::ACCESS_DATE, access_date_text(access_date));

    if is_url(clean) {
        if let Ok(url) = Url::parse(clean) {
            let agency = bare_host(&url)
                .map(|host| tables::gov_agency(&host))
                .unwrap_or(tables::DEFAULT_GOV_AGENCY);
            return builder
                .url(url.as_str())
                .title_opt(slug_title(&url, &FILE_EXTENSION))
                .extra(extra::AGENCY, agency)
                .build();
        }
    }

    let builder = builder.extra(extra::AGENCY, tables::DEFAULT_GOV_AGENCY);
    match FEDERAL_REGISTER.captures(clean) {
        Some(caps) => {
            let volume = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let page = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
            builder
                .title(format!("Federal Register Vol. {}, Page {}", volume, page))
                .venue("Federal Register")
                .volume(volume)
                .pages(page)
                .extra(extra::DOCUMENT_NUMBER, format!("{} FR {}", volume, page))
                .build()
        }
        None => builder.title_opt(non_empty(clean)).build(),
    }
}

/// Basic metadata for a generic web page
pub fn extract_web_page(text: &str, access_date: Option<NaiveDate>) -> Option<CanonicalRecord> {
    let url = Url::parse(trim_trailing_punctuation(text)).ok()?;
    let host = bare_host(&url)?;
    let title = slug_title(&url, &FILE_EXTENSION).unwrap_or_else(|| host.clone());
    let venue = tables::academic_venue(&host)
        .map(str::to_string)
        .unwrap_or(host);

    Some(
        CanonicalRecord::builder(ReferenceType::Unknown)
            .title(title)
            .venue(venue)
            .url(url.as_str())
            .extra(extra::ACCESS_DATE, access_date_text(access_date))
            .build(),
    )
}

macro_rules! offline_source {
    ($(#[$doc:meta])* $name:ident, $id:literal, $label:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Default)]
        pub struct $name {
            access_date: Option<NaiveDate>,
        }

        impl $name {
            pub fn new() -> Self {
                Self::default()
            }

            /// Pin the access date instead of using today's date
            pub fn with_access_date(mut self, date: NaiveDate) -> Self {
                self.access_date = Some(date);
                self
            }

            const ID: &'static str = $id;
            const NAME: &'static str = $label;
        }
    };
}

offline_source!(
    /// Interview records from free text
    InterviewExtractor, "interview", "Interview Extractor"
);
offline_source!(
    /// Newspaper articles from their URL
    NewspaperExtractor, "newspaper", "Newspaper Extractor"
);
offline_source!(
    /// Government documents from `.gov` URLs and Federal Register references
    GovernmentExtractor, "government", "Government Extractor"
);
offline_source!(
    /// Generic web pages from their URL
    WebPageExtractor, "web_page", "Web Page Extractor"
);

fn offline_result(id: &str, record: Option<CanonicalRecord>, confidence: f64) -> ProviderResult {
    match record.filter(CanonicalRecord::has_minimum_data) {
        Some(record) => ProviderResult::matched(id, record, confidence),
        None => ProviderResult::no_match(id),
    }
}

#[async_trait]
impl Source for InterviewExtractor {
    fn id(&self) -> &str {
        Self::ID
    }

    fn name(&self) -> &str {
        Self::NAME
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::SEARCH | SourceCapabilities::OFFLINE
    }

    async fn search(&self, query: &LookupQuery) -> Result<ProviderResult, SourceError> {
        let record = extract_interview(&query.text);
        Ok(offline_result(self.id(), Some(record), EXTRACTED_CONFIDENCE))
    }
}

#[async_trait]
impl Source for NewspaperExtractor {
    fn id(&self) -> &str {
        Self::ID
    }

    fn name(&self) -> &str {
        Self::NAME
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::SEARCH | SourceCapabilities::OFFLINE
    }

    async fn search(&self, query: &LookupQuery) -> Result<ProviderResult, SourceError> {
        if !is_url(&query.text) {
            return Ok(ProviderResult::no_match(self.id()));
        }
        let known = url_host(&query.text).is_some_and(|host| tables::newspaper_name(&host).is_some());
        let confidence = if known {
            EXTRACTED_CONFIDENCE
        } else {
            FALLBACK_CONFIDENCE
        };
        let record = extract_newspaper(&query.text, self.access_date);
        Ok(offline_result(self.id(), record, confidence))
    }
}

#[async_trait]
impl Source for GovernmentExtractor {
    fn id(&self) -> &str {
        Self::ID
    }

    fn name(&self) -> &str {
        Self::NAME
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::SEARCH | SourceCapabilities::OFFLINE
    }

    async fn search(&self, query: &LookupQuery) -> Result<ProviderResult, SourceError> {
        let record = extract_government(&query.text, self.access_date);
        let confidence = if record.url().is_some() || record.extra(extra::DOCUMENT_NUMBER).is_some() {
            EXTRACTED_CONFIDENCE
        } else {
            FALLBACK_CONFIDENCE
        };
        Ok(offline_result(self.id(), Some(record), confidence))
    }
}

#[async_trait]
impl Source for WebPageExtractor {
    fn id(&self) -> &str {
        Self::ID
    }

    fn name(&self) -> &str {
        Self::NAME
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::SEARCH | SourceCapabilities::OFFLINE
    }

    async fn search(&self, query: &LookupQuery) -> Result<ProviderResult, SourceError> {
        if !is_url(&query.text) {
            return Ok(ProviderResult::no_match(self.id()));
        }
        let record = extract_web_page(&query.text, self.access_date);
        Ok(offline_result(self.id(), record, FALLBACK_CONFIDENCE))
    }
}
