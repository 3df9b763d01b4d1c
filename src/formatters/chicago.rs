//! Chicago Manual of Style, notes-bibliography (full and short notes).

use super::{
    date_or_year, edition, field, italic, link, nonblank, short_agency, short_authors,
    short_case_name, short_title, title, us_case, Elements,
};
use crate::models::{extra, Author, CanonicalRecord, ReferenceType};

/// "A", "A and B", "A, B, and C", "A et al."
fn authors(authors: &[Author]) -> Option<String> {
    let names: Vec<String> = authors.iter().map(Author::full_name).collect();
    match names.as_slice() {
        [] => None,
        [one] => Some(one.clone()),
        [a, b] => Some(format!("{} and {}", a, b)),
        [a, b, c] => Some(format!("{}, {}, and {}", a, b, c)),
        [a, ..] => Some(format!("{} et al.", a)),
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

/// Author, "Title," Journal 12, no. 3 (2020): 45-67, https://doi.org/...
fn article(record: &CanonicalRecord) -> String {
    let mut source = String::new();
    if let Some(venue) = nonblank(record.venue()) {
        source.push_str(&italic(venue));
    }
    if let Some(volume) = nonblank(record.volume()) {
        source.push(' ');
        source.push_str(volume);
    }
    if let Some(issue) = nonblank(record.issue()) {
        if source.is_empty() {
            source.push_str(&format!("no. {}", issue));
        } else {
            source.push_str(&format!(", no. {}", issue));
        }
    }
    if let Some(year) = record.year() {
        source.push_str(&format!(" ({})", year));
    }
    if let Some(pages) = nonblank(record.pages()) {
        source.push_str(&format!(": {}", pages));
    }

    let mut elements = Elements::new();
    elements
        .push_opt(authors(record.authors()))
        .push_quoted(title(record).unwrap_or_default())
        .push(source.trim())
        .push_opt(link(record));
    elements.finish()
}

/// Author, Title, 2nd ed. (Place: Publisher, Year).
fn book(record: &CanonicalRecord) -> String {
    let place = field(record, extra::PLACE);
    let publisher = nonblank(record.publisher());
    let imprint = match (place, publisher) {
        (Some(place), Some(publisher)) => Some(format!("{}: {}", place, publisher)),
        (None, Some(publisher)) => Some(publisher.to_string()),
        (Some(place), None) => Some(place.to_string()),
        (None, None) => None,
    };
    let publication: Vec<String> = imprint
        .into_iter()
        .chain(record.year().map(|y| y.to_string()))
        .collect();

    let mut elements = Elements::new();
    elements
        .push_opt(authors(record.authors()))
        .push_opt(title(record).map(italic))
        .push_opt(edition(record).map(|e| format!("{} ed.", e)));
    if !publication.is_empty() {
        elements.append(format!("({})", publication.join(", ")));
    }
    elements.finish()
}

/// Interviewee, interview by Interviewer, Location, Date.
fn interview(record: &CanonicalRecord) -> String {
    let by = match field(record, extra::INTERVIEWER) {
        Some(interviewer) => format!("interview by {}", interviewer),
        None => "interview by author".to_string(),
    };

    let mut elements = Elements::new();
    match field(record, extra::INTERVIEWEE) {
        Some(interviewee) => elements.push(interviewee).push(by),
        None => elements.push(capitalize(&by)),
    };
    elements
        .push_opt(field(record, extra::LOCATION))
        .push_opt(date_or_year(record));
    elements.finish()
}

/// Author, "Title," Newspaper, Date, URL.
fn newspaper(record: &CanonicalRecord) -> String {
    let mut elements = Elements::new();
    elements
        .push_opt(authors(record.authors()))
        .push_quoted(title(record).unwrap_or_default())
        .push_opt(nonblank(record.venue()).map(italic))
        .push_opt(date_or_year(record))
        .push_opt(nonblank(record.url()));
    elements.finish()
}

/// Agency, Title, Document Number, Date, URL.
fn government(record: &CanonicalRecord) -> String {
    let mut elements = Elements::new();
    elements
        .push_opt(field(record, extra::AGENCY))
        .push_opt(title(record).map(italic))
        .push_opt(field(record, extra::DOCUMENT_NUMBER))
        .push_opt(date_or_year(record))
        .push_opt(nonblank(record.url()));
    elements.finish()
}

/// Author, "Title," Website, accessed Date, URL.
fn web_page(record: &CanonicalRecord) -> String {
    let mut elements = Elements::new();
    elements
        .push_opt(authors(record.authors()))
        .push_quoted(title(record).unwrap_or_default())
        .push_opt(nonblank(record.venue()))
        .push_opt(record.year().map(|y| y.to_string()))
        .push_opt(field(record, extra::ACCESS_DATE).map(|d| format!("accessed {}", d)))
        .push_opt(link(record));
    elements.finish()
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Shortened note: Family, Short Title, page.
pub(super) fn short(record: &CanonicalRecord, pinpoint: Option<&str>) -> String {
    let mut elements = Elements::new();
    match record.reference_type() {
        ReferenceType::Legal => {
            let name = title(record).map(short_case_name).map(italic);
            let citation = super::case_citation(record).filter(|_| !super::is_neutral(record));
            match (citation.and_then(reporter_volume), pinpoint) {
                (Some(volume), Some(page)) => {
                    elements.push_opt(name).push(format!("{} at {}", volume, page));
                }
                _ => {
                    elements.push_opt(name).push_opt(pinpoint);
                }
            }
        }
        ReferenceType::Interview => {
            let who = field(record, extra::INTERVIEWEE)
                .map(super::family_name)
                .map(|name| format!("{}, interview", name))
                .unwrap_or_else(|| "Interview".to_string());
            elements.push(who).push_opt(pinpoint);
        }
        ReferenceType::Government => {
            elements
                .push_opt(field(record, extra::AGENCY).map(short_agency))
                .push_opt(title(record).map(short_title).map(|t| italic(&t)))
                .push_opt(pinpoint);
        }
        ReferenceType::Book => {
            elements
                .push_opt(short_authors(record.authors(), "and"))
                .push_opt(title(record).map(short_title).map(|t| italic(&t)))
                .push_opt(pinpoint);
        }
        _ => {
            elements
                .push_opt(short_authors(record.authors(), "and"))
                .push_quoted(&title(record).map(short_title).unwrap_or_default());
            if elements.is_empty() {
                elements.push_opt(nonblank(record.url()));
            }
            elements.push_opt(pinpoint);
        }
    }
    elements.finish()
}

/// "388 U.S. 1" -> "388 U.S."
pub(super) fn reporter_volume(citation: &str) -> Option<&str> {
    let (volume, page) = citation.trim().rsplit_once(' ')?;
    page.chars().all(|c| c.is_ascii_digit()).then_some(volume)
}
