//! UK neutral citation parser: `Case Name [YYYY] COURT N (Division)`.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{extra, CanonicalRecord, LookupQuery, ProviderResult, ReferenceType};
use crate::sources::{Source, SourceCapabilities, SourceError};

static NEUTRAL_CITATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[(\d{4})\]\s+([A-Za-z]+(?:\s+[A-Za-z]+)?)\s+(\d+)(\s*\([A-Za-z]+\))?").unwrap()
});

/// Confidence for a well-formed neutral citation with a case name
const PARSE_CONFIDENCE: f64 = 0.9;

/// Parse a neutral citation out of `text`
pub fn parse_neutral_citation(text: &str) -> Option<CanonicalRecord> {
    let caps = NEUTRAL_CITATION.captures(text)?;
    let whole = caps.get(0)?;
    let year: i32 = caps.get(1)?.as_str().parse().ok()?;
    let court = caps.get(2)?.as_str();
    let number = caps.get(3)?.as_str();
    let division = caps.get(4).map(|m| m.as_str().trim()).unwrap_or("");

    let case_name = text[..whole.start()]
        .trim()
        .trim_end_matches(',')
        .trim();
    if case_name.is_empty() {
        return None;
    }

    let mut citation = format!("[{}] {} {}", year, court, number);
    if !division.is_empty() {
        citation.push(' ');
        citation.push_str(division);
    }

    Some(
        CanonicalRecord::builder(ReferenceType::Legal)
            .title(case_name)
            .court(court)
            .year(year)
            .extra(extra::NEUTRAL_CITATION, citation)
            .extra(extra::JURISDICTION, "UK")
            .build(),
    )
}

/// Offline provider for UK neutral citations
#[derive(Debug, Clone, Default)]
pub struct UkNeutralCitationSource;

impl UkNeutralCitationSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Source for UkNeutralCitationSource {
    fn id(&self) -> &str {
        "uk_neutral"
    }

    fn name(&self) -> &str {
        "UK Neutral Citation"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::SEARCH | SourceCapabilities::OFFLINE
    }

    async fn search(&self, query: &LookupQuery) -> Result<ProviderResult, SourceError> {
        Ok(match parse_neutral_citation(&query.text) {
            Some(record) => ProviderResult::matched(self.id(), record, PARSE_CONFIDENCE),
            None => ProviderResult::no_match(self.id()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_division() {
        let record = parse_neutral_citation("Smith v Jones [2022] EWHC 456 (QB)").unwrap();
        assert_eq!(record.title(), Some("Smith v Jones"));
        assert_eq!(record.year(), Some(2022));
        assert_eq!(record.court(), Some("EWHC"));
        assert_eq!(
            record.extra(extra::NEUTRAL_CITATION),
            Some("[2022] EWHC 456 (QB)")
        );
        assert_eq!(record.extra(extra::JURISDICTION), Some("UK"));
    }

    #[test]
    fn test_parse_two_word_court() {
        let record =
            parse_neutral_citation("R (Miller) v Secretary of State, [2017] UKSC 5").unwrap();
        assert_eq!(record.title(), Some("R (Miller) v Secretary of State"));
        assert_eq!(record.extra(extra::NEUTRAL_CITATION), Some("[2017] UKSC 5"));

        let record = parse_neutral_citation("Re B [2013] EWCA Civ 123").unwrap();
        assert_eq!(record.court(), Some("EWCA Civ"));
    }

    #[test]
    fn test_requires_case_name_and_citation() {
        assert!(parse_neutral_citation("[2024] UKSC 12").is_none());
        assert!(parse_neutral_citation("Loving v. Virginia").is_none());
    }
}
