//! MLA 9th edition works-cited entries.

use super::{
    abbreviated_month, edition, field, italic, link, long_date_parts, nonblank, quoted_sentence,
    sentence, short_agency, short_authors, short_title, title, us_case,
};
use crate::models::{extra, Author, CanonicalRecord, ReferenceType};
use crate::normalize::parse_person_name;

/// "Family, Given", "Family, Given, and Given Family", "Family, Given, et al."
fn authors(authors: &[Author]) -> Option<String> {
    match authors {
        [] => None,
        [only] => Some(only.inverted_name()),
        [first, second] => Some(format!("{}, and {}", first.inverted_name(), second.full_name())),
        [first, ..] => Some(format!("{}, et al.", first.inverted_name())),
    }
}

/// "July 21, 2024" -> "21 July 2024"; other shapes are kept
fn date(text: &str) -> String {
    match long_date_parts(text) {
        Some((month, day, year)) => format!("{} {} {}", day, abbreviated_month(month), year),
        None => text.to_string(),
    }
}

fn date_or_year(record: &CanonicalRecord) -> Option<String> {
    field(record, extra::DATE)
        .map(date)
        .or_else(|| record.year().map(|y| y.to_string()))
}

/// Entry assembled from MLA's core elements, each closed by a full stop
#[derive(Default)]
struct Entry {
    parts: Vec<String>,
}

impl Entry {
    fn sentence(mut self, part: Option<String>) -> Self {
        if let Some(part) = part.filter(|p| !p.trim().is_empty()) {
            self.parts.push(sentence(&part));
        }
        self
    }

    /// Container elements joined by commas into one sentence
    fn container(self, elements: Vec<Option<String>>) -> Self {
        let joined: Vec<String> = elements
            .into_iter()
            .flatten()
            .filter(|e| !e.trim().is_empty())
            .collect();
        if joined.is_empty() {
            self
        } else {
            self.sentence(Some(joined.join(", ")))
        }
    }

    fn build(self) -> String {
        self.parts.join(" ")
    }
}

pub(super) fn format(record: &CanonicalRecord) -> String {
    match record.reference_type() {
        ReferenceType::Journal | ReferenceType::Medical => article(record),
        ReferenceType::Book => book(record),
        ReferenceType::Legal => us_case(record),
        ReferenceType::Interview => interview(record),
        ReferenceType::Newspaper => newspaper(record),
        ReferenceType::Government => government(record),
        ReferenceType::Unknown => web_page(record),
    }
}

/// Last, First. "Title." Journal, vol. 31, no. 2, 2017, pp. 45-67. https://doi.org/...
fn article(record: &CanonicalRecord) -> String {
    Entry::default()
        .sentence(authors(record.authors()))
        .sentence(title(record).map(quoted_sentence))
        .container(vec![
            nonblank(record.venue()).map(italic),
            nonblank(record.volume()).map(|v| format!("vol. {}", v)),
            nonblank(record.issue()).map(|i| format!("no. {}", i)),
            record.year().map(|y| y.to_string()),
            nonblank(record.pages()).map(pages),
        ])
        .sentence(link(record))
        .build()
}

/// "p. 5" for one page, "pp. 45-67" for a range
fn pages(pages: &str) -> String {
    if pages.contains(['-', '\u{2013}']) {
        format!("pp. {}", pages)
    } else {
        format!("p. {}", pages)
    }
}

/// Last, First. Title. 2nd ed., Publisher, Year.
fn book(record: &CanonicalRecord) -> String {
    Entry::default()
        .sentence(authors(record.authors()))
        .sentence(title(record).map(italic))
        .container(vec![
            edition(record).map(|e| format!("{} ed.", e)),
            nonblank(record.publisher()).map(str::to_string),
            record.year().map(|y| y.to_string()),
        ])
        .build()
}

/// Last, First. Interview. Conducted by Interviewer, 27 Nov. 1981.
fn interview(record: &CanonicalRecord) -> String {
    let interviewee = field(record, extra::INTERVIEWEE).map(|raw| {
        parse_person_name(raw)
            .map(|author| author.inverted_name())
            .unwrap_or_else(|| raw.to_string())
    });
    let conducted_by = field(record, extra::INTERVIEWER).map(|interviewer| {
        if interviewer.eq_ignore_ascii_case("author") {
            "Conducted by the author".to_string()
        } else {
            format!("Conducted by {}", interviewer)
        }
    });

    Entry::default()
        .sentence(interviewee)
        .sentence(Some("Interview".to_string()))
        .container(vec![
            conducted_by,
            field(record, extra::LOCATION).map(str::to_string),
            date_or_year(record),
        ])
        .build()
}

/// Last, First. "Title." Newspaper, 21 July 2024, URL.
fn newspaper(record: &CanonicalRecord) -> String {
    Entry::default()
        .sentence(authors(record.authors()))
        .sentence(title(record).map(quoted_sentence))
        .container(vec![
            nonblank(record.venue()).map(italic),
            date_or_year(record),
            nonblank(record.url()).map(str::to_string),
        ])
        .build()
}

/// Agency. Title. Document number, Year, URL.
fn government(record: &CanonicalRecord) -> String {
    Entry::default()
        .sentence(field(record, extra::AGENCY).map(str::to_string))
        .sentence(title(record).map(italic))
        .container(vec![
            field(record, extra::DOCUMENT_NUMBER).map(str::to_string),
            date_or_year(record),
            nonblank(record.url()).map(str::to_string),
        ])
        .build()
}

/// Last, First. "Title." Website, Year, URL. Accessed Date.
fn web_page(record: &CanonicalRecord) -> String {
    Entry::default()
        .sentence(authors(record.authors()))
        .sentence(title(record).map(quoted_sentence))
        .container(vec![
            nonblank(record.venue()).map(italic),
            date_or_year(record),
            link(record),
        ])
        .sentence(field(record, extra::ACCESS_DATE).map(|d| format!("Accessed {}", date(d))))
        .build()
}

/// Author-page reference: Caplan and Doe 50.
pub(super) fn short(record: &CanonicalRecord, pinpoint: Option<&str>) -> String {
    let who = match record.reference_type() {
        ReferenceType::Legal => title(record).map(italic),
        ReferenceType::Interview => field(record, extra::INTERVIEWEE)
            .map(super::family_name)
            .map(str::to_string),
        ReferenceType::Government => field(record, extra::AGENCY).map(short_agency),
        _ => short_authors(record.authors(), "and"),
    };
    let who = who.or_else(|| {
        title(record).map(|t| match record.reference_type() {
            ReferenceType::Book | ReferenceType::Government => italic(&short_title(t)),
            _ => format!("\"{}\"", short_title(t)),
        })
    });
    let who = who.or_else(|| nonblank(record.url()).map(str::to_string));

    let text = [who, pinpoint.map(str::to_string)]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    if text.is_empty() {
        sentence(nonblank(record.url()).unwrap_or("Interview"))
    } else {
        sentence(&text)
    }
}
