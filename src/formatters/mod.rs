//! Citation formatting in five styles.
//!
//! Each style lives in its own module and exposes two pure functions over a
//! [`CanonicalRecord`]: a full citation and a short (subsequent-note) form. Italics are
//! marked with `<i>…</i>`; absent fields are left out, never rendered as placeholders.
//!
//! ```
//! use citeflex::formatters::format_citation;
//! use citeflex::models::{extra, CanonicalRecord, CitationStyle, ReferenceType};
//!
//! let record = CanonicalRecord::builder(ReferenceType::Legal)
//!     .title("Loving v. Virginia")
//!     .court("Supreme Court of the United States")
//!     .year(1967)
//!     .extra(extra::REPORTER_CITATION, "388 U.S. 1")
//!     .build();
//!
//! let citation = format_citation(&record, CitationStyle::Bluebook);
//! assert_eq!(citation.plain_text(), "Loving v. Virginia, 388 U.S. 1 (1967).");
//! ```

mod apa;
mod bluebook;
mod chicago;
mod mla;
mod oscola;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::tables;
use crate::models::{extra, Author, CanonicalRecord, Citation, CitationStyle, IdentifierKind};

/// Format `record` as a full citation in `style`
pub fn format_citation(record: &CanonicalRecord, style: CitationStyle) -> Citation {
    let text = match style {
        CitationStyle::Chicago => chicago::format(record),
        CitationStyle::Apa7 => apa::format(record),
        CitationStyle::Mla9 => mla::format(record),
        CitationStyle::Bluebook => bluebook::format(record),
        CitationStyle::Oscola => oscola::format(record),
    };
    Citation::new(style, tidy(&text))
}

/// Format `record` as a short, subsequent-reference citation, optionally pinpointed
pub fn format_short(record: &CanonicalRecord, style: CitationStyle, pinpoint: Option<&str>) -> Citation {
    let pinpoint = pinpoint.map(str::trim).filter(|p| !p.is_empty());
    let text = match style {
        CitationStyle::Chicago => chicago::short(record, pinpoint),
        CitationStyle::Apa7 => apa::short(record, pinpoint),
        CitationStyle::Mla9 => mla::short(record, pinpoint),
        CitationStyle::Bluebook => bluebook::short(record, pinpoint),
        CitationStyle::Oscola => oscola::short(record, pinpoint),
    };
    Citation::new(style, tidy(&text))
}

/// Collapse doubled spaces left by omitted elements
fn tidy(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ===== Shared element helpers =====

pub(crate) fn italic(text: &str) -> String {
    format!("<i>{}</i>", text)
}

/// Whether `text` already ends in terminal punctuation (ignoring closing markup and quotes)
fn ends_with_stop(text: &str) -> bool {
    let mut text = text.trim_end();
    loop {
        let trimmed = text
            .trim_end_matches("</i>")
            .trim_end_matches(['"', '\'', '\u{201d}']);
        if trimmed.len() == text.len() {
            break;
        }
        text = trimmed;
    }
    text.ends_with(['.', '?', '!'])
}

/// `text` with a full stop unless it already ends in one
pub(crate) fn sentence(text: &str) -> String {
    let text = text.trim();
    if text.is_empty() || ends_with_stop(text) {
        text.to_string()
    } else {
        format!("{}.", text)
    }
}

/// `"Title."` with the full stop inside the quotation marks
pub(crate) fn quoted_sentence(title: &str) -> String {
    if ends_with_stop(title) {
        format!("\"{}\"", title)
    } else {
        format!("\"{}.\"", title)
    }
}

/// Comma-separated citation elements, with commas and full stops placed inside a
/// closing double quotation mark.
#[derive(Debug, Default)]
pub(crate) struct Elements {
    text: String,
    open_quote: bool,
}

impl Elements {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, element: impl AsRef<str>) -> &mut Self {
        let element = element.as_ref().trim();
        if element.is_empty() {
            return self;
        }
        if !self.text.is_empty() {
            if self.open_quote {
                self.text.pop();
                self.text.push_str(",\" ");
            } else {
                self.text.push_str(", ");
            }
        }
        self.text.push_str(element);
        self.open_quote = false;
        self
    }

    pub(crate) fn push_opt(&mut self, element: Option<impl AsRef<str>>) -> &mut Self {
        if let Some(element) = element {
            self.push(element);
        }
        self
    }

    /// Push a double-quoted title
    pub(crate) fn push_quoted(&mut self, title: &str) -> &mut Self {
        if title.trim().is_empty() {
            return self;
        }
        self.push(format!("\"{}\"", title.trim()));
        self.open_quote = !ends_with_stop(title);
        self
    }

    /// Attach to the previous element with a space instead of a comma
    pub(crate) fn append(&mut self, tail: impl AsRef<str>) -> &mut Self {
        let tail = tail.as_ref().trim();
        if tail.is_empty() {
            return self;
        }
        if self.text.is_empty() {
            self.text.push_str(tail);
        } else {
            self.text.push(' ');
            self.text.push_str(tail);
        }
        self.open_quote = false;
        self
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// The elements followed by a full stop
    pub(crate) fn finish(&self) -> String {
        if self.open_quote {
            let mut text = self.text.clone();
            text.pop();
            text.push_str(".\"");
            return text;
        }
        sentence(&self.text)
    }

    /// The elements with no closing punctuation
    pub(crate) fn bare(&self) -> String {
        self.text.clone()
    }
}

// ===== Record field helpers =====

pub(crate) fn nonblank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub(crate) fn title(record: &CanonicalRecord) -> Option<&str> {
    nonblank(record.title())
}

pub(crate) fn field<'a>(record: &'a CanonicalRecord, key: &str) -> Option<&'a str> {
    nonblank(record.extra(key))
}

/// DOI as a resolver URL
pub(crate) fn doi_url(doi: &str) -> String {
    if doi.starts_with("http") {
        doi.to_string()
    } else {
        format!("https://doi.org/{}", doi)
    }
}

/// DOI URL when the record has one, otherwise its URL
pub(crate) fn link(record: &CanonicalRecord) -> Option<String> {
    nonblank(record.identifier(IdentifierKind::Doi))
        .map(doi_url)
        .or_else(|| nonblank(record.url()).map(str::to_string))
}

/// First page of a range ("45-67" -> "45")
pub(crate) fn first_page(pages: &str) -> &str {
    pages
        .split(['-', '\u{2013}', '\u{2014}'])
        .next()
        .unwrap_or(pages)
        .trim()
}

static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(1[5-9]\d{2}|20\d{2})\b").unwrap());

static LONG_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Z][a-z]+) (\d{1,2}), (\d{4})$").unwrap());

/// The record's year, or one read from its date
pub(crate) fn year(record: &CanonicalRecord) -> Option<String> {
    record.year().map(|y| y.to_string()).or_else(|| {
        field(record, extra::DATE)
            .and_then(|date| YEAR.find(date))
            .map(|m| m.as_str().to_string())
    })
}

/// The record's date, falling back to its year
pub(crate) fn date_or_year(record: &CanonicalRecord) -> Option<String> {
    field(record, extra::DATE)
        .map(str::to_string)
        .or_else(|| record.year().map(|y| y.to_string()))
}

/// Split "July 21, 2024" into ("July", "21", "2024")
pub(crate) fn long_date_parts(date: &str) -> Option<(&str, &str, &str)> {
    let caps = LONG_DATE.captures(date.trim())?;
    Some((
        caps.get(1)?.as_str(),
        caps.get(2)?.as_str(),
        caps.get(3)?.as_str(),
    ))
}

/// Month abbreviation shared by MLA and Bluebook: "September" -> "Sept."
pub(crate) fn abbreviated_month(month: &str) -> &str {
    match month {
        "January" => "Jan.",
        "February" => "Feb.",
        "March" => "Mar.",
        "April" => "Apr.",
        "August" => "Aug.",
        "September" => "Sept.",
        "October" => "Oct.",
        "November" => "Nov.",
        "December" => "Dec.",
        other => other,
    }
}

/// Edition reduced to its ordinal: "2nd edition" -> "2nd", "3" -> "3rd"
pub(crate) fn edition(record: &CanonicalRecord) -> Option<String> {
    let raw = field(record, extra::EDITION)?;
    let mut words: Vec<&str> = raw.split_whitespace().collect();
    if words.len() > 1
        && matches!(
            words.last().map(|w| w.to_lowercase()).as_deref(),
            Some("edition" | "edn" | "ed." | "ed")
        )
    {
        words.pop();
    }

    let stem = words.join(" ");
    match stem.parse::<u32>() {
        Ok(n) => Some(ordinal(n)),
        Err(_) => Some(stem),
    }
}

pub(crate) fn ordinal(n: u32) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", n, suffix)
}

/// The citation a legal record is found under: reporter citation, else neutral citation
pub(crate) fn case_citation(record: &CanonicalRecord) -> Option<&str> {
    field(record, extra::REPORTER_CITATION).or_else(|| field(record, extra::NEUTRAL_CITATION))
}

/// Whether the record is cited by a bracketed neutral citation rather than a reporter
pub(crate) fn is_neutral(record: &CanonicalRecord) -> bool {
    field(record, extra::REPORTER_CITATION).is_none() && field(record, extra::NEUTRAL_CITATION).is_some()
}

/// "Name, 388 U.S. 1 (Court Year)." with the court abbreviated and omitted for U.S. Reports
///
/// Shared by the styles that defer to Bluebook for cases.
pub(crate) fn us_case(record: &CanonicalRecord) -> String {
    let name = title(record).map(italic).unwrap_or_default();

    if is_neutral(record) {
        let neutral = field(record, extra::NEUTRAL_CITATION).unwrap_or_default();
        return sentence(&format!("{} {}", name, neutral));
    }

    let citation = case_citation(record)
        .map(str::to_string)
        .or_else(|| nonblank(record.identifier(IdentifierKind::DocketNumber)).map(|d| format!("No. {}", d)));

    let mut parenthetical = Vec::new();
    let us_reports = citation.as_deref().is_some_and(|c| c.contains("U.S."));
    if let Some(court) = nonblank(record.court()).filter(|_| !us_reports) {
        let court = tables::court_abbreviation(court).unwrap_or(court);
        if !court.is_empty() {
            parenthetical.push(court.to_string());
        }
    }
    if let Some(year) = record.year() {
        parenthetical.push(year.to_string());
    }

    let mut text = name;
    if let Some(citation) = citation {
        if text.is_empty() {
            text = citation;
        } else {
            text = format!("{}, {}", text, citation);
        }
    }
    if !parenthetical.is_empty() {
        text = format!("{} ({})", text, parenthetical.join(" "));
    }
    sentence(&text)
}

/// Parties that name the government rather than the case
const GOVERNMENT_PARTIES: &[&str] = &["united states", "state", "people", "commonwealth", "r", "regina", "rex"];

/// Short case name: the first party, unless it is the government
pub(crate) fn short_case_name(case_name: &str) -> &str {
    let separators = [" v. ", " v ", " vs. ", " vs "];
    let Some((first, second)) = separators
        .iter()
        .find_map(|sep| case_name.split_once(sep))
    else {
        return case_name.trim();
    };

    let first_party = first.trim();
    let normalized = first_party.trim_end_matches('.').to_lowercase();
    let is_government = GOVERNMENT_PARTIES.contains(&normalized.as_str())
        || normalized.starts_with("state of ")
        || normalized.starts_with("people of ");
    if is_government {
        second.split(',').next().unwrap_or(second).trim()
    } else {
        first_party.split(',').next().unwrap_or(first_party).trim()
    }
}

/// Title up to its subtitle, at most four words
pub(crate) fn short_title(title: &str) -> String {
    let main = title.split([':', '?', '!']).next().unwrap_or(title);
    let words: Vec<&str> = main.split_whitespace().collect();
    if words.len() <= 4 {
        main.trim().to_string()
    } else {
        words[..4].join(" ")
    }
}

/// Family names for in-text references: "Smith", "Watson and Crick", "Smith et al."
pub(crate) fn short_authors(authors: &[Author], conjunction: &str) -> Option<String> {
    match authors {
        [] => None,
        [only] => Some(only.family.clone()),
        [first, second] => Some(format!("{} {} {}", first.family, conjunction, second.family)),
        [first, ..] => Some(format!("{} et al.", first.family)),
    }
}

/// Agency name, shortened to an acronym when long
pub(crate) fn short_agency(agency: &str) -> String {
    let words: Vec<&str> = agency.split_whitespace().collect();
    if words.len() <= 3 {
        return agency.to_string();
    }
    let acronym: String = words
        .iter()
        .filter(|w| w.starts_with(|c: char| c.is_uppercase()))
        .filter_map(|w| w.chars().next())
        .collect();
    if acronym.len() >= 2 {
        acronym
    } else {
        agency.to_string()
    }
}

/// Last word of a personal name
pub(crate) fn family_name(name: &str) -> &str {
    name.split_whitespace().last().unwrap_or(name)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::models::{extra, Author, CanonicalRecord, IdentifierKind, ReferenceType};

    pub(crate) fn loving() -> CanonicalRecord {
        CanonicalRecord::builder(ReferenceType::Legal)
            .title("Loving v. Virginia")
            .court("Supreme Court of the United States")
            .year(1967)
            .extra(extra::REPORTER_CITATION, "388 U.S. 1")
            .extra(extra::JURISDICTION, "US")
            .build()
    }

    pub(crate) fn article() -> CanonicalRecord {
        CanonicalRecord::builder(ReferenceType::Journal)
            .title("Trains, Brains, and Sprains")
            .author(Author::new("Bryan", "Caplan"))
            .author(Author::new("Jane", "Doe"))
            .year(2017)
            .venue("Journal of Economic Perspectives")
            .volume("31")
            .issue("2")
            .pages("45-67")
            .identifier(IdentifierKind::Doi, "10.1257/jep.31.2.45")
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{article, loving};
    use super::*;
    use crate::models::ReferenceType;

    #[test]
    fn test_elements_quote_punctuation() {
        let mut elements = Elements::new();
        elements.push("Caplan").push_quoted("Trains").push("Journal");
        assert_eq!(elements.finish(), "Caplan, \"Trains,\" Journal.");

        let mut ending = Elements::new();
        ending.push("Caplan").push_quoted("Trains");
        assert_eq!(ending.finish(), "Caplan, \"Trains.\"");

        let mut question = Elements::new();
        question.push_quoted("Why?").push("Journal");
        assert_eq!(question.finish(), "\"Why?\", Journal.");
    }

    #[test]
    fn test_sentence_does_not_double_stops() {
        assert_eq!(sentence("Smith, J. A."), "Smith, J. A.");
        assert_eq!(sentence("<i>Who Am I?</i>"), "<i>Who Am I?</i>");
        assert_eq!(sentence("Title"), "Title.");
        assert_eq!(quoted_sentence("Title"), "\"Title.\"");
    }

    #[test]
    fn test_edition_normalization() {
        let with = |e: &str| {
            CanonicalRecord::builder(ReferenceType::Book)
                .title("T")
                .extra(extra::EDITION, e)
                .build()
        };
        assert_eq!(edition(&with("2nd edition")).as_deref(), Some("2nd"));
        assert_eq!(edition(&with("3")).as_deref(), Some("3rd"));
        assert_eq!(edition(&with("11")).as_deref(), Some("11th"));
        assert_eq!(edition(&with("Rev. ed.")).as_deref(), Some("Rev."));
    }

    #[test]
    fn test_short_case_name() {
        assert_eq!(short_case_name("Loving v. Virginia"), "Loving");
        assert_eq!(short_case_name("United States v. Nixon"), "Nixon");
        assert_eq!(short_case_name("R v Brown"), "Brown");
        assert_eq!(short_case_name("In re Gault"), "In re Gault");
    }

    #[test]
    fn test_short_helpers() {
        assert_eq!(short_title("The Myth of the Rational Voter: Why Democracies"), "The Myth of the");
        assert_eq!(short_title("Walden"), "Walden");
        assert_eq!(short_agency("National Institute of Mental Health"), "NIMH");
        assert_eq!(short_agency("Federal Reserve"), "Federal Reserve");
        assert_eq!(first_page("45\u{2013}67"), "45");
        assert_eq!(
            short_authors(&article().authors()[..], "&").as_deref(),
            Some("Caplan & Doe")
        );
    }

    #[test]
    fn test_us_case_omits_court_for_us_reports() {
        assert_eq!(
            Citation::new(CitationStyle::Bluebook, us_case(&loving())).plain_text(),
            "Loving v. Virginia, 388 U.S. 1 (1967)."
        );

        let state = CanonicalRecord::builder(ReferenceType::Legal)
            .title("Palsgraf v. Long Island R.R. Co.")
            .court("Court of Appeals of New York")
            .year(1928)
            .extra(extra::REPORTER_CITATION, "248 N.Y. 339")
            .build();
        assert_eq!(
            us_case(&state),
            "<i>Palsgraf v. Long Island R.R. Co.</i>, 248 N.Y. 339 (N.Y. 1928)."
        );
    }

    #[test]
    fn test_every_style_is_deterministic_and_placeholder_free() {
        let sparse = [
            CanonicalRecord::builder(ReferenceType::Journal).title("Only A Title").build(),
            CanonicalRecord::builder(ReferenceType::Book).title("Only A Title").build(),
            CanonicalRecord::builder(ReferenceType::Legal).title("Doe v. Roe").build(),
            CanonicalRecord::builder(ReferenceType::Interview)
                .extra(extra::INTERVIEWEE, "John Smith")
                .build(),
            CanonicalRecord::builder(ReferenceType::Newspaper)
                .url("https://www.nytimes.com/2024/07/21/us/story.html")
                .build(),
            CanonicalRecord::builder(ReferenceType::Government).title("Only A Title").build(),
            CanonicalRecord::builder(ReferenceType::Unknown).title("Only A Title").build(),
        ];

        for record in sparse.iter().chain([loving(), article()].iter()) {
            for style in CitationStyle::ALL {
                let first = format_citation(record, style);
                assert_eq!(first, format_citation(record, style));
                let short = format_short(record, style, Some("12"));
                assert_eq!(short, format_short(record, style, Some("12")));

                for text in [first.text.as_str(), short.text.as_str()] {
                    for placeholder in ["None", "null", "()", "(, ", "<i></i>", "\"\"", "''", ",,", " ,", "..", "accessed date"] {
                        assert!(
                            !text.contains(placeholder),
                            "{style} rendered {placeholder:?} in {text:?}"
                        );
                    }
                    assert!(!text.trim().is_empty());
                }
            }
        }
    }
}
