//! Canonical bibliographic record shared by every provider and formatter.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The kind of work a query refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceType {
    Journal,
    Book,
    Legal,
    Interview,
    Newspaper,
    Government,
    Medical,
    Unknown,
}

impl ReferenceType {
    /// Every reference type, in detection priority order with `Unknown` last
    pub const ALL: [ReferenceType; 8] = [
        ReferenceType::Interview,
        ReferenceType::Legal,
        ReferenceType::Government,
        ReferenceType::Newspaper,
        ReferenceType::Medical,
        ReferenceType::Journal,
        ReferenceType::Book,
        ReferenceType::Unknown,
    ];

    /// Lowercase identifier (used in config keys and the AI prompt)
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceType::Journal => "journal",
            ReferenceType::Book => "book",
            ReferenceType::Legal => "legal",
            ReferenceType::Interview => "interview",
            ReferenceType::Newspaper => "newspaper",
            ReferenceType::Government => "government",
            ReferenceType::Medical => "medical",
            ReferenceType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ReferenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name a reference type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown reference type: {0}")]
pub struct UnknownReferenceType(pub String);

impl FromStr for ReferenceType {
    type Err = UnknownReferenceType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "journal" | "article" | "journal_article" => Ok(ReferenceType::Journal),
            "book" => Ok(ReferenceType::Book),
            "legal" | "case" | "legal_case" => Ok(ReferenceType::Legal),
            "interview" => Ok(ReferenceType::Interview),
            "newspaper" | "news" => Ok(ReferenceType::Newspaper),
            "government" | "gov" => Ok(ReferenceType::Government),
            "medical" => Ok(ReferenceType::Medical),
            "unknown" | "url" => Ok(ReferenceType::Unknown),
            other => Err(UnknownReferenceType(other.to_string())),
        }
    }
}

/// A person or institution credited on a work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// Given name(s) or initials; absent for institutional authors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given: Option<String>,

    /// Family name, or the full name of an institution
    pub family: String,
}

impl Author {
    pub fn new(given: impl Into<String>, family: impl Into<String>) -> Self {
        let given = given.into();
        Self {
            given: if given.trim().is_empty() {
                None
            } else {
                Some(given)
            },
            family: family.into(),
        }
    }

    /// An author with only a single name (organisation, mononym)
    pub fn institutional(name: impl Into<String>) -> Self {
        Self {
            given: None,
            family: name.into(),
        }
    }

    /// "Given Family"
    pub fn full_name(&self) -> String {
        match &self.given {
            Some(given) => format!("{} {}", given, self.family),
            None => self.family.clone(),
        }
    }

    /// "Family, Given"
    pub fn inverted_name(&self) -> String {
        match &self.given {
            Some(given) => format!("{}, {}", self.family, given),
            None => self.family.clone(),
        }
    }

    /// Initials of the given names, e.g. "B. D." for "Bryan Douglas"
    pub fn initials(&self) -> Option<String> {
        let given = self.given.as_deref()?;
        let initials: Vec<String> = given
            .split(|c: char| c.is_whitespace() || c == '.')
            .filter(|part| !part.is_empty())
            .map(|part| {
                part.split('-')
                    .filter_map(|piece| piece.chars().next())
                    .map(|c| format!("{}.", c.to_uppercase()))
                    .collect::<Vec<_>>()
                    .join("-")
            })
            .collect();

        if initials.is_empty() {
            None
        } else {
            Some(initials.join(" "))
        }
    }
}

/// Identifier schemes kept apart in [`CanonicalRecord::identifiers`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierKind {
    Doi,
    Isbn,
    DocketNumber,
    Pmid,
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IdentifierKind::Doi => "DOI",
            IdentifierKind::Isbn => "ISBN",
            IdentifierKind::DocketNumber => "Docket No.",
            IdentifierKind::Pmid => "PMID",
        })
    }
}

/// Well-known keys of [`CanonicalRecord::extra`]
pub mod extra {
    pub const JURISDICTION: &str = "jurisdiction";
    pub const EDITION: &str = "edition";
    pub const PLACE: &str = "place";
    pub const REPORTER_CITATION: &str = "reporter_citation";
    pub const NEUTRAL_CITATION: &str = "neutral_citation";
    pub const INTERVIEWER: &str = "interviewer";
    pub const INTERVIEWEE: &str = "interviewee";
    pub const LOCATION: &str = "location";
    pub const DATE: &str = "date";
    pub const AGENCY: &str = "agency";
    pub const DOCUMENT_NUMBER: &str = "document_number";
    pub const ACCESS_DATE: &str = "access_date";
}

/// A normalized bibliographic record
///
/// Every provider maps its payload into this shape at its own boundary. Records are
/// assembled with [`CanonicalRecordBuilder`] and are read-only afterwards. Only
/// `reference_type` is mandatory; an absent field is `None`, which is distinct from
/// an empty string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    #[serde(rename = "type")]
    reference_type: ReferenceType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    title: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    authors: Vec<Author>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    year: Option<i32>,

    /// Journal, newspaper or website name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    venue: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    publisher: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    court: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    volume: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    issue: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pages: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    identifiers: BTreeMap<IdentifierKind, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    extra: BTreeMap<String, String>,
}

impl CanonicalRecord {
    /// Start building a record of the given type
    pub fn builder(reference_type: ReferenceType) -> CanonicalRecordBuilder {
        CanonicalRecordBuilder::new(reference_type)
    }

    pub fn reference_type(&self) -> ReferenceType {
        self.reference_type
    }

    /// Title of the work; for legal records this is the case name
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn authors(&self) -> &[Author] {
        &self.authors
    }

    pub fn year(&self) -> Option<i32> {
        self.year
    }

    pub fn venue(&self) -> Option<&str> {
        self.venue.as_deref()
    }

    pub fn publisher(&self) -> Option<&str> {
        self.publisher.as_deref()
    }

    pub fn court(&self) -> Option<&str> {
        self.court.as_deref()
    }

    pub fn volume(&self) -> Option<&str> {
        self.volume.as_deref()
    }

    pub fn issue(&self) -> Option<&str> {
        self.issue.as_deref()
    }

    pub fn pages(&self) -> Option<&str> {
        self.pages.as_deref()
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn identifier(&self, kind: IdentifierKind) -> Option<&str> {
        self.identifiers.get(&kind).map(String::as_str)
    }

    pub fn identifiers(&self) -> &BTreeMap<IdentifierKind, String> {
        &self.identifiers
    }

    pub fn extra(&self, key: &str) -> Option<&str> {
        self.extra.get(key).map(String::as_str)
    }

    pub fn extras(&self) -> &BTreeMap<String, String> {
        &self.extra
    }

    /// Whether the record carries enough to produce a useful citation
    pub fn has_minimum_data(&self) -> bool {
        let filled = |v: Option<&str>| v.is_some_and(|s| !s.trim().is_empty());
        match self.reference_type {
            ReferenceType::Legal => filled(self.title()),
            ReferenceType::Interview => {
                filled(self.extra(extra::INTERVIEWEE)) || filled(self.extra(extra::INTERVIEWER))
            }
            ReferenceType::Newspaper | ReferenceType::Government => {
                filled(self.title()) || filled(self.url())
            }
            _ => filled(self.title()),
        }
    }

    /// Copy this record into a builder, e.g. to re-tag its type before it is handed out
    pub fn to_builder(&self) -> CanonicalRecordBuilder {
        CanonicalRecordBuilder {
            record: self.clone(),
        }
    }
}

macro_rules! text_setters {
    ($($field:ident, $field_opt:ident;)*) => {
        $(
            pub fn $field(mut self, value: impl Into<String>) -> Self {
                self.record.$field = Some(value.into());
                self
            }

            pub fn $field_opt(mut self, value: Option<String>) -> Self {
                if value.is_some() {
                    self.record.$field = value;
                }
                self
            }
        )*
    };
}

/// Builder for [`CanonicalRecord`]
#[derive(Debug, Clone)]
pub struct CanonicalRecordBuilder {
    record: CanonicalRecord,
}

impl CanonicalRecordBuilder {
    pub fn new(reference_type: ReferenceType) -> Self {
        Self {
            record: CanonicalRecord {
                reference_type,
                title: None,
                authors: Vec::new(),
                year: None,
                venue: None,
                publisher: None,
                court: None,
                volume: None,
                issue: None,
                pages: None,
                url: None,
                identifiers: BTreeMap::new(),
                extra: BTreeMap::new(),
            },
        }
    }

    pub fn reference_type(mut self, reference_type: ReferenceType) -> Self {
        self.record.reference_type = reference_type;
        self
    }

    text_setters! {
        title, title_opt;
        venue, venue_opt;
        publisher, publisher_opt;
        court, court_opt;
        volume, volume_opt;
        issue, issue_opt;
        pages, pages_opt;
        url, url_opt;
    }

    pub fn author(mut self, author: Author) -> Self {
        self.record.authors.push(author);
        self
    }

    pub fn authors(mut self, authors: impl IntoIterator<Item = Author>) -> Self {
        self.record.authors.extend(authors);
        self
    }

    pub fn year(mut self, year: i32) -> Self {
        self.record.year = Some(year);
        self
    }

    pub fn year_opt(mut self, year: Option<i32>) -> Self {
        if year.is_some() {
            self.record.year = year;
        }
        self
    }

    /// Record an identifier. The first value stored for a kind wins.
    pub fn identifier(mut self, kind: IdentifierKind, value: impl Into<String>) -> Self {
        let value = value.into();
        match self.record.identifiers.get(&kind) {
            Some(existing) if existing != &value => {
                tracing::debug!(
                    "Ignoring {} '{}': record already has '{}'",
                    kind,
                    value,
                    existing
                );
            }
            Some(_) => {}
            None => {
                self.record.identifiers.insert(kind, value);
            }
        }
        self
    }

    pub fn identifier_opt(self, kind: IdentifierKind, value: Option<String>) -> Self {
        match value {
            Some(value) => self.identifier(kind, value),
            None => self,
        }
    }

    /// Record a style-specific field. The first value stored for a key wins.
    pub fn extra(mut self, key: &str, value: impl Into<String>) -> Self {
        self.record
            .extra
            .entry(key.to_string())
            .or_insert_with(|| value.into());
        self
    }

    pub fn extra_opt(self, key: &str, value: Option<String>) -> Self {
        match value {
            Some(value) => self.extra(key, value),
            None => self,
        }
    }

    pub fn build(self) -> CanonicalRecord {
        self.record
    }
}
