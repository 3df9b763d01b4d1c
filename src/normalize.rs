//! Helpers every provider uses to map its payload into a [`CanonicalRecord`].
//!
//! Providers own their field mapping; these functions keep the shared rules in one
//! place: author names become `{given, family}`, years become integers or nothing,
//! blank strings become `None`, and identifiers are pulled out by scheme.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;

use crate::config::tables;
use crate::models::{Author, CanonicalRecord, IdentifierKind};

/// Highest confidence a network provider may report for a search match
pub const MAX_MATCH_CONFIDENCE: f64 = 0.95;

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(1[5-9]\d{2}|20\d{2})\b").unwrap());

static DOI_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\b10\.\d{4,9}/[^\s"<>]+"#).unwrap());

static ISBN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:97[89][-\s]?)?(?:\d[-\s]?){9}[\dX]\b").unwrap());

static PMID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:\bpmid:?\s*|pubmed\.ncbi\.nlm\.nih\.gov/)(\d{1,9})\b").unwrap()
});

const NAME_PARTICLES: &[&str] = &[
    "van", "von", "de", "del", "della", "der", "den", "di", "da", "du", "dos", "das", "le",
    "la", "ten", "ter", "bin", "al",
];

const NAME_SUFFIXES: &[&str] = &["jr", "jr.", "sr", "sr.", "ii", "iii", "iv"];

const STOPWORDS: &[&str] = &[
    "a", "an", "the", "of", "and", "in", "on", "for", "to", "by", "with", "at", "from", "v",
    "vs", "et", "al",
];

/// Trimmed text, or `None` when blank
pub fn non_empty(value: impl AsRef<str>) -> Option<String> {
    let trimmed = value.as_ref().trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// A JSON string or number as non-blank text
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_empty(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// First plausible four-digit year in `text`
pub fn coerce_year(text: &str) -> Option<i32> {
    YEAR_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Year from a JSON number or string
pub fn year_from_value(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .and_then(|y| i32::try_from(y).ok())
            .filter(|y| (1500..=2099).contains(y)),
        Value::String(s) => coerce_year(s),
        _ => None,
    }
}

/// Expand PubMed-style initials: "JA" -> "J. A."
fn expand_initials(initials: &str) -> String {
    initials
        .chars()
        .map(|c| format!("{c}."))
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_initials(token: &str) -> bool {
    (1..=3).contains(&token.len())
        && token.chars().all(|c| c.is_ascii_uppercase())
        && !NAME_SUFFIXES.contains(&token.to_lowercase().as_str())
}

/// Parse a display name into `{given, family}`
///
/// Handles "Family, Given", "Given Family", PubMed's "Smith JA", lowercase particles
/// ("Ludwig van Beethoven") and generational suffixes. Single-word names become
/// institutional authors.
pub fn parse_person_name(name: &str) -> Option<Author> {
    let name = name.split_whitespace().collect::<Vec<_>>().join(" ");
    if name.is_empty() {
        return None;
    }

    if let Some((family, given)) = name.split_once(',') {
        let family = family.trim();
        let given = given.trim();
        if family.is_empty() {
            return non_empty(given).map(Author::institutional);
        }
        return Some(Author::new(given, family));
    }

    let tokens: Vec<&str> = name.split(' ').collect();
    if tokens.len() == 1 {
        return Some(Author::institutional(name));
    }

    // PubMed: "Smith JA", "van der Berg H"
    if let Some(last) = tokens.last() {
        if is_initials(last) {
            let family = tokens[..tokens.len() - 1].join(" ");
            return Some(Author::new(expand_initials(last), family));
        }
    }

    let (body, suffix) = match tokens.last() {
        Some(last) if tokens.len() > 2 && NAME_SUFFIXES.contains(&last.to_lowercase().as_str()) => {
            (&tokens[..tokens.len() - 1], Some(*last))
        }
        _ => (&tokens[..], None),
    };

    let family_start = body
        .iter()
        .enumerate()
        .skip(1)
        .find(|(i, token)| {
            *i < body.len() - 1 && NAME_PARTICLES.contains(&token.to_lowercase().as_str())
        })
        .map(|(i, _)| i)
        .unwrap_or(body.len() - 1);

    let given = body[..family_start].join(" ");
    let mut family = body[family_start..].join(" ");
    if let Some(suffix) = suffix {
        family = format!("{family} {suffix}");
    }

    Some(Author::new(given, family))
}

/// First DOI in `text`, without trailing punctuation
pub fn extract_doi(text: &str) -> Option<String> {
    DOI_RE.find(text).map(|m| {
        m.as_str()
            .trim_end_matches(['.', ',', ';', ':', ')', ']'])
            .to_string()
    })
}

fn isbn10_valid(digits: &[u32]) -> bool {
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, d)| (10 - i as u32) * d)
        .sum();
    sum % 11 == 0
}

fn isbn13_valid(digits: &[u32]) -> bool {
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, d)| if i % 2 == 0 { *d } else { d * 3 })
        .sum();
    sum % 10 == 0
}

/// First checksum-valid ISBN-10 or ISBN-13 in `text`, digits only
pub fn extract_isbn(text: &str) -> Option<String> {
    ISBN_RE.find_iter(text).find_map(|m| {
        let compact: String = m
            .as_str()
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == 'X' || *c == 'x')
            .map(|c| c.to_ascii_uppercase())
            .collect();

        let digits: Vec<u32> = compact
            .chars()
            .map(|c| if c == 'X' { 10 } else { c.to_digit(10).unwrap_or(0) })
            .collect();

        let valid = match digits.len() {
            10 => isbn10_valid(&digits),
            13 => !compact.contains('X') && isbn13_valid(&digits),
            _ => false,
        };
        valid.then_some(compact)
    })
}

/// PubMed id from "PMID: 123" or a pubmed.ncbi.nlm.nih.gov URL
pub fn extract_pmid(text: &str) -> Option<String> {
    PMID_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Place of publication for a publisher, unless one is already known
pub fn publisher_place(publisher: Option<&str>, current: Option<&str>) -> Option<String> {
    if let Some(current) = current.and_then(non_empty) {
        return Some(current);
    }
    publisher
        .and_then(tables::publisher_place)
        .map(str::to_string)
}

/// Lowercase alphanumeric words, for comparing titles across providers
pub fn normalize_title(title: &str) -> String {
    title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

fn content_tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|t| !t.is_empty() && !STOPWORDS.contains(&t.as_str()))
        .collect()
}

/// How well a candidate record answers a free-text query
///
/// The share of the query's content words found in the record's title, author
/// family names, year and venue, scaled to at most [`MAX_MATCH_CONFIDENCE`]. A record
/// whose DOI appears in the query scores the maximum outright.
pub fn match_confidence(query: &str, record: &CanonicalRecord) -> f64 {
    if let (Some(query_doi), Some(record_doi)) =
        (extract_doi(query), record.identifier(IdentifierKind::Doi))
    {
        if query_doi.eq_ignore_ascii_case(record_doi) {
            return MAX_MATCH_CONFIDENCE;
        }
    }

    let query_tokens = content_tokens(query);
    if query_tokens.is_empty() {
        return 0.0;
    }

    let mut haystack: HashSet<String> = HashSet::new();
    for field in [record.title(), record.venue(), record.court()]
        .into_iter()
        .flatten()
    {
        haystack.extend(content_tokens(field));
    }
    for author in record.authors() {
        haystack.extend(content_tokens(&author.family));
    }
    if let Some(year) = record.year() {
        haystack.insert(year.to_string());
    }

    let found = query_tokens
        .iter()
        .filter(|token| haystack.contains(token.as_str()))
        .count();

    let coverage = found as f64 / query_tokens.len() as f64;
    (coverage * MAX_MATCH_CONFIDENCE).min(MAX_MATCH_CONFIDENCE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReferenceType;

    #[test]
    fn test_parse_person_name_forms() {
        let a = parse_person_name("Caplan, Bryan").unwrap();
        assert_eq!((a.given.as_deref(), a.family.as_str()), (Some("Bryan"), "Caplan"));

        let b = parse_person_name("Bryan Douglas Caplan").unwrap();
        assert_eq!((b.given.as_deref(), b.family.as_str()), (Some("Bryan Douglas"), "Caplan"));

        let c = parse_person_name("Smith JA").unwrap();
        assert_eq!((c.given.as_deref(), c.family.as_str()), (Some("J. A."), "Smith"));

        let d = parse_person_name("Ludwig van Beethoven").unwrap();
        assert_eq!((d.given.as_deref(), d.family.as_str()), (Some("Ludwig"), "van Beethoven"));

        let e = parse_person_name("Martin Luther King Jr.").unwrap();
        assert_eq!(e.family, "King Jr.");

        let g = parse_person_name("John Smith III").unwrap();
        assert_eq!((g.given.as_deref(), g.family.as_str()), (Some("John"), "Smith III"));

        let f = parse_person_name("UNESCO").unwrap();
        assert_eq!((f.given, f.family.as_str()), (None, "UNESCO"));

        assert!(parse_person_name("   ").is_none());
    }

    #[test]
    fn test_coerce_year() {
        assert_eq!(coerce_year("2018-05-01"), Some(2018));
        assert_eq!(coerce_year("Spring 1967 issue"), Some(1967));
        assert_eq!(coerce_year("n.d."), None);
        assert_eq!(year_from_value(&serde_json::json!(2020)), Some(2020));
        assert_eq!(year_from_value(&serde_json::json!("1999 Mar")), Some(1999));
        assert_eq!(year_from_value(&serde_json::json!(null)), None);
    }

    #[test]
    fn test_extract_identifiers() {
        assert_eq!(
            extract_doi("see https://doi.org/10.1037/0003-066X.59.1.29."),
            Some("10.1037/0003-066X.59.1.29".to_string())
        );
        assert_eq!(extract_doi("no identifier here"), None);

        assert_eq!(
            extract_isbn("ISBN 978-0-691-17465-5"),
            Some("9780691174655".to_string())
        );
        assert_eq!(extract_isbn("ISBN 0-306-40615-2"), Some("0306406152".to_string()));
        assert_eq!(extract_isbn("phone 123-456-7890"), None);

        assert_eq!(extract_pmid("PMID: 31978945"), Some("31978945".to_string()));
        assert_eq!(
            extract_pmid("https://pubmed.ncbi.nlm.nih.gov/31978945/"),
            Some("31978945".to_string())
        );
    }

    #[test]
    fn test_publisher_place() {
        assert_eq!(
            publisher_place(Some("Princeton University Press"), None),
            Some("Princeton".to_string())
        );
        assert_eq!(
            publisher_place(Some("Princeton University Press"), Some("Oxford")),
            Some("Oxford".to_string())
        );
        assert_eq!(publisher_place(None, None), None);
    }

    #[test]
    fn test_match_confidence() {
        let record = CanonicalRecord::builder(ReferenceType::Journal)
            .title("Trains, Brains, and Sprains")
            .author(Author::new("Bryan", "Caplan"))
            .year(2018)
            .build();

        let full = match_confidence("caplan trains brains", &record);
        assert!((full - MAX_MATCH_CONFIDENCE).abs() < f64::EPSILON);

        let partial = match_confidence("caplan unrelated words here", &record);
        assert!(partial < 0.5);

        assert_eq!(match_confidence("", &record), 0.0);
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(
            normalize_title("Trains, Brains -- and Sprains!"),
            "trains brains and sprains"
        );
    }
}
