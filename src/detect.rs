//! Pattern-based reference type detection.
//!
//! Rules run in a fixed priority order and the first one that matches decides the
//! type. Nothing here performs I/O.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::tables;
use crate::models::{DetectionResult, ReferenceType};

static INTERVIEW_STRONG: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\boral history\b",
        r"(?i)\bpersonal communication\b",
        r"(?i)\bconversation with\b",
        r"(?i)\binterviewed?\s+by\b",
        r"(?i)\binterview\s+with\b",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static INTERVIEW_NEGATIVE: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\bhistory of interviews?\b",
        r"(?i)\binterview (?:process|technique|question|skill|method)s?\b",
        r"(?i)\bjob interviews?\b",
        r"(?i)\binterviews?\s+(?:in|about|on|of)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static INTERVIEW_WEAK: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // "interview, Alexandria" / "Interview Smith"
        r"\b[Ii]nterview[,\s]+[A-Z]",
        // "Smith interview"
        r"(?i)^[a-z\s]+interview\b",
        // interview ... 1998
        r"(?i)interview.*\d{4}",
        // interview ... Alexandria, VA
        r"[Ii]nterview.*[A-Z][a-z]+,\s*[A-Z]{2}",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static BRACKET_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\d{4}\]").unwrap());

static CASE_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s(?:v|vs|versus)\.?\s").unwrap());

/// Volume, reporter abbreviation (with at least one full stop), optional series, page
static REPORTER_CITATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b\d+\s+((?:[A-Z][A-Za-z]*\.\s?)+)(?:\d+(?:st|nd|rd|th|d)\s+)?\d+\b").unwrap()
});

static GOV_HOST: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.gov(?:/|$)").unwrap());

static FEDERAL_REGISTER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b\d+\s+(?:FR|federal\s+register)\s+\d+\b").unwrap()
});

static PMID_MENTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)pmid:?\s*\d+|pubmed\s*id:?\s*\d+|pubmed:\s*\d+").unwrap());

const MEDICAL_STRONG: &[&str] = &[
    "randomized controlled trial",
    "double-blind",
    "placebo-controlled",
    "meta-analysis",
    "systematic review",
    "clinical trial",
    "clinical efficacy",
    "treatment-resistant",
];

static JOURNAL_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"10\.\d{4,}/",
        r"\b\d+\s*\(\d+\)",
        r"(?i)\bvol\.?\s*\d+",
        r"(?i)\bpp\.?\s*\d+\s*[-–]\s*\d+",
        r"(?i)\bpages?\s*\d+\s*[-–]\s*\d+",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static BOOK_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\b(?:97[89][-\s]?)?(?:\d[-\s]?){9}[\dX]\b",
        r"(?i)\bisbn\b",
        r"(?i)\b\d+(?:st|nd|rd|th)\s+(?:ed|edition)\b",
        r"(?i)\bedition\b",
        r"(?i)\b(?:press|publishers|publishing|books)\b",
        r"(?i)\bbook\b",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// One detection rule
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub reference_type: ReferenceType,
    pub confidence: f64,
    matches: fn(&str) -> bool,
}

impl Rule {
    pub fn matches(&self, text: &str) -> bool {
        (self.matches)(text)
    }
}

/// Detection rules in priority order
pub const RULES: &[Rule] = &[
    Rule {
        reference_type: ReferenceType::Interview,
        confidence: 0.95,
        matches: is_interview,
    },
    Rule {
        reference_type: ReferenceType::Legal,
        confidence: 0.9,
        matches: is_legal,
    },
    Rule {
        reference_type: ReferenceType::Government,
        confidence: 0.95,
        matches: is_government,
    },
    Rule {
        reference_type: ReferenceType::Newspaper,
        confidence: 0.95,
        matches: is_newspaper,
    },
    Rule {
        reference_type: ReferenceType::Medical,
        confidence: 0.8,
        matches: is_medical,
    },
    Rule {
        reference_type: ReferenceType::Journal,
        confidence: 0.85,
        matches: is_journal,
    },
    Rule {
        reference_type: ReferenceType::Book,
        confidence: 0.8,
        matches: is_book,
    },
];

/// Classify a query by pattern
///
/// Blank input and input no rule recognises (generic URLs included) come back as
/// `unknown` with confidence 0.0.
pub fn detect_type(query: &str) -> DetectionResult {
    let text = query.trim();
    if text.is_empty() {
        return DetectionResult::unknown();
    }

    RULES
        .iter()
        .find(|rule| rule.matches(text))
        .map(|rule| DetectionResult::pattern(rule.reference_type, rule.confidence))
        .unwrap_or_else(DetectionResult::unknown)
}

/// Whether `text` is an http(s) URL
pub fn is_url(text: &str) -> bool {
    let text = text.trim();
    text.starts_with("http://") || text.starts_with("https://")
}

/// Host of an http(s) URL, lowercased
pub fn url_host(text: &str) -> Option<String> {
    if !is_url(text) {
        return None;
    }
    url::Url::parse(text.trim())
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
}

fn is_interview(text: &str) -> bool {
    if INTERVIEW_STRONG.iter().any(|re| re.is_match(text)) {
        return true;
    }
    if !text.to_lowercase().contains("interview") {
        return false;
    }
    if INTERVIEW_NEGATIVE.iter().any(|re| re.is_match(text)) {
        return false;
    }
    INTERVIEW_WEAK.iter().any(|re| re.is_match(text))
}

/// Reporter citations in `text` ("388 U.S. 1", "17 Cal. 3d 425")
///
/// Only abbreviations listed in [`tables::REPORTERS`] count, so journal citations of
/// the same shape ("31 Am. Econ. Rev. 45") and dates ("1 Mar. 2024") are skipped.
pub fn reporter_citations(text: &str) -> Vec<String> {
    REPORTER_CITATION
        .captures_iter(text)
        .filter(|caps| {
            caps.get(1)
                .is_some_and(|reporter| tables::is_reporter(reporter.as_str()))
        })
        .filter_map(|caps| caps.get(0).map(|m| m.as_str().to_string()))
        .collect()
}

/// `text` with any reporter citations removed
pub fn strip_reporter_citations(text: &str) -> String {
    let mut stripped = text.to_string();
    for citation in reporter_citations(text) {
        stripped = stripped.replace(&citation, " ");
    }
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_legal(text: &str) -> bool {
    if BRACKET_YEAR.is_match(text) {
        return true;
    }
    if url_host(text).is_some_and(|host| tables::is_legal_host(&host)) {
        return true;
    }
    if CASE_NAME.is_match(text) {
        return true;
    }
    !reporter_citations(text).is_empty()
}

fn is_government(text: &str) -> bool {
    let clean = text
        .trim_end_matches(['.', ',', ';', ':', ')'])
        .to_lowercase();
    GOV_HOST.is_match(&clean) || FEDERAL_REGISTER.is_match(&clean)
}

fn is_newspaper(text: &str) -> bool {
    url_host(text).is_some_and(|host| tables::newspaper_name(&host).is_some())
}

fn is_medical(text: &str) -> bool {
    let lower = text.to_lowercase();
    if PMID_MENTION.is_match(&lower) {
        return true;
    }
    if MEDICAL_STRONG.iter().any(|phrase| lower.contains(phrase)) {
        return true;
    }
    tables::MEDICAL_TERMS
        .iter()
        .filter(|term| lower.contains(*term))
        .count()
        >= 2
}

fn is_journal(text: &str) -> bool {
    JOURNAL_PATTERNS.iter().any(|re| re.is_match(text))
}

fn is_book(text: &str) -> bool {
    BOOK_PATTERNS.iter().any(|re| re.is_match(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detected(query: &str) -> (ReferenceType, f64) {
        let result = detect_type(query);
        (result.reference_type, result.confidence)
    }

    #[test]
    fn test_blank_input_is_unknown() {
        assert_eq!(detected(""), (ReferenceType::Unknown, 0.0));
        assert_eq!(detected("   \t\n"), (ReferenceType::Unknown, 0.0));
    }

    #[test]
    fn test_interview_detection() {
        assert_eq!(detected("Oral history of Jane Doe, 1998").0, ReferenceType::Interview);
        assert_eq!(detected("Interview with John Smith, May 7, 2019").0, ReferenceType::Interview);
        assert_eq!(detected("Smith interview 2019").0, ReferenceType::Interview);
        assert_eq!(detected("Smith interview, Alexandria, VA").0, ReferenceType::Interview);
        assert_eq!(detected("interviewed by the author").0, ReferenceType::Interview);
    }

    #[test]
    fn test_interview_negatives() {
        assert_ne!(detected("job interview tips 2020").0, ReferenceType::Interview);
        assert_ne!(detected("interview process in hiring 2021").0, ReferenceType::Interview);
        assert_ne!(detected("The history of interviews").0, ReferenceType::Interview);
        assert_ne!(detected("interviews in journalism 1990").0, ReferenceType::Interview);
    }

    #[test]
    fn test_legal_detection() {
        assert_eq!(detected("Loving v. Virginia"), (ReferenceType::Legal, 0.9));
        assert_eq!(detected("roe vs wade").0, ReferenceType::Legal);
        assert_eq!(detected("Donoghue v Stevenson [1932] UKHL 100").0, ReferenceType::Legal);
        assert_eq!(detected("388 U.S. 1").0, ReferenceType::Legal);
        assert_eq!(detected("159 F.2d 169").0, ReferenceType::Legal);
        assert_eq!(detected("400 F. Supp. 2d 707").0, ReferenceType::Legal);
        assert_eq!(detected("17 Cal. 3d 425").0, ReferenceType::Legal);
        assert_eq!(
            detected("https://www.law.cornell.edu/supremecourt/text/388/1").0,
            ReferenceType::Legal
        );
    }

    #[test]
    fn test_dates_are_not_reporters() {
        assert!(reporter_citations("published 12 May 2020").is_empty());
        assert!(reporter_citations("Vol. 23 No. 4").is_empty());
        assert_eq!(reporter_citations("Palsgraf, 248 N.Y. 339 (1928)"), vec!["248 N.Y. 339"]);
    }

    #[test]
    fn test_journal_abbreviations_are_not_reporters() {
        assert!(reporter_citations("31 Am. Econ. Rev. 45").is_empty());
        assert_ne!(detected("31 Am. Econ. Rev. 45").0, ReferenceType::Legal);
        assert_ne!(detected("Accessed 1 Mar. 2024").0, ReferenceType::Legal);
        assert_eq!(
            reporter_citations("Tarasoff, 17 Cal. 3d 425, 551 P.2d 334 (1976)"),
            vec!["17 Cal. 3d 425", "551 P.2d 334"]
        );
        assert_eq!(detected("129 S. Ct. 2252").0, ReferenceType::Legal);
    }

    #[test]
    fn test_strip_reporter_citations() {
        assert_eq!(
            strip_reporter_citations("Loving v. Virginia, 388 U.S. 1 (1967)"),
            "Loving v. Virginia, (1967)"
        );
    }

    #[test]
    fn test_government_detection() {
        assert_eq!(
            detected("https://www.cdc.gov/flu/about/index.html"),
            (ReferenceType::Government, 0.95)
        );
        assert_eq!(detected("https://www.fda.gov").0, ReferenceType::Government);
        assert_eq!(detected("88 FR 12345").0, ReferenceType::Government);
        assert_eq!(detected("87 Federal Register 11111").0, ReferenceType::Government);
    }

    #[test]
    fn test_newspaper_detection() {
        assert_eq!(
            detected("https://www.nytimes.com/2024/01/15/us/politics/court-ruling.html"),
            (ReferenceType::Newspaper, 0.95)
        );
    }

    #[test]
    fn test_medical_detection() {
        assert_eq!(detected("PMID: 31978945"), (ReferenceType::Medical, 0.8));
        assert_eq!(
            detected("a randomized controlled trial of ketamine").0,
            ReferenceType::Medical
        );
        assert_eq!(detected("chronic patient outcomes").0, ReferenceType::Medical);
    }

    #[test]
    fn test_journal_detection() {
        assert_eq!(detected("10.1037/0003-066X.59.1.29"), (ReferenceType::Journal, 0.85));
        assert_eq!(detected("American Psychologist 59(1)").0, ReferenceType::Journal);
        assert_eq!(detected("Econ Journal Watch vol. 15").0, ReferenceType::Journal);
        assert_eq!(detected("pp. 45-67").0, ReferenceType::Journal);
    }

    #[test]
    fn test_book_detection() {
        assert_eq!(detected("ISBN 978-0-691-17465-5"), (ReferenceType::Book, 0.8));
        assert_eq!(detected("The Case Against Education, 2nd edition").0, ReferenceType::Book);
        assert_eq!(detected("Princeton University Press").0, ReferenceType::Book);
        assert_ne!(detected("exercise and depression").0, ReferenceType::Book);
    }

    #[test]
    fn test_unmatched_is_unknown() {
        assert_eq!(detected("caplan trains brains"), (ReferenceType::Unknown, 0.0));
        assert_eq!(detected("https://example.com/some/page"), (ReferenceType::Unknown, 0.0));
    }

    #[test]
    fn test_priority_order() {
        // A .gov URL on a legal site still counts as legal: legal outranks government
        assert_eq!(
            detected("https://www.supremecourt.gov/opinions/22pdf/19-1392_6j37.pdf").0,
            ReferenceType::Legal
        );
        // An interview phrase outranks a case-name pattern
        assert_eq!(
            detected("Interview with Smith v. Jones counsel").0,
            ReferenceType::Interview
        );
    }

    #[test]
    fn test_detection_is_deterministic() {
        for query in ["Loving v. Virginia", "caplan trains brains", "PMID: 1"] {
            assert_eq!(detect_type(query), detect_type(query));
        }
    }
}
