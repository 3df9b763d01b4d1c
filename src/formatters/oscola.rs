//! OSCOLA (4th ed.) footnote citations.
//!
//! OSCOLA drops full stops from abbreviations, writes "v" without a stop, gives URLs in
//! angle brackets, and never abbreviates court names.

use super::{
    case_citation, date_or_year, edition, field, first_page, is_neutral, italic, nonblank,
    short_case_name, short_title, title, Elements,
};
use crate::models::{extra, Author, CanonicalRecord, IdentifierKind, ReferenceType};

/// "A", "A and B", "A, B and C", "A and others"
fn authors(authors: &[Author]) -> Option<String> {
    let names: Vec<String> = authors.iter().map(Author::full_name).collect();
    match names.as_slice() {
        [] => None,
        [one] => Some(one.clone()),
        [a, b] => Some(format!("{} and {}", a, b)),
        [a, b, c] => Some(format!("{}, {} and {}", a, b, c)),
        [a, ..] => Some(format!("{} and others", a)),
    }
}

/// "Loving v. Virginia" -> "Loving v Virginia"
fn case_name(name: &str) -> String {
    name.replace(" v. ", " v ").replace(" vs. ", " v ").replace(" vs ", " v ")
}

/// Remove full stops from abbreviations: "388 U.S. 1" -> "388 US 1"
fn without_stops(text: &str) -> String {
    text.replace(". ", " ").replace('.', "")
}

/// "<URL> accessed 1 March 2024", or just the bracketed URL when no access date is known
fn online(record: &CanonicalRecord) -> Option<String> {
    let url = nonblank(record.url())?;
    Some(match field(record, extra::ACCESS_DATE) {
        Some(accessed) => format!("<{}> accessed {}", url, day_month_year(accessed)),
        None => format!("<{}>", url),
    })
}

/// "March 1, 2024" -> "1 March 2024"
fn day_month_year(date: &str) -> String {
    match super::long_date_parts(date) {
        Some((month, day, year)) => format!("{} {} {}", day, month, year),
        None => date.to_string(),
    }
}

fn parenthetical(parts: &[Option<String>]) -> Option<String> {
    let parts: Vec<&str> = parts.iter().flatten().map(String::as_str).collect();
    if parts.is_empty() {
        None
    } else {
        Some(format!("({})", parts.join(", ")))
    }
}

/// Space-separated elements with no closing full stop
fn spaced(parts: Vec<Option<String>>) -> String {
    parts
        .into_iter()
        .flatten()
        .filter(|p| !p.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

pub(super) fn format(record: &CanonicalRecord) -> String {
    match record.reference_type() {
        ReferenceType::Journal | ReferenceType::Medical => article(record),
        ReferenceType::Book => book(record),
        ReferenceType::Legal => case(record),
        ReferenceType::Interview => interview(record),
        ReferenceType::Newspaper => newspaper(record),
        ReferenceType::Government => government(record),
        ReferenceType::Unknown => web_page(record),
    }
}

/// With an author: "Author, rest"; otherwise just the rest
fn attributed(author: Option<String>, rest: String) -> String {
    match author {
        Some(author) if rest.is_empty() => author,
        Some(author) => format!("{}, {}", author, rest),
        None => rest,
    }
}

/// Donoghue v Stevenson [1932] UKHL 100, or Loving v Virginia 388 US 1 (1967)
fn case(record: &CanonicalRecord) -> String {
    let name = title(record).map(|t| italic(&case_name(t)));

    if is_neutral(record) {
        return spaced(vec![name, case_citation(record).map(str::to_string)]);
    }

    match case_citation(record) {
        Some(citation) => {
            let year = record
                .year()
                .map(|y| y.to_string())
                .filter(|y| !citation.contains(y.as_str()))
                .map(|y| format!("({})", y));
            spaced(vec![name, Some(without_stops(citation)), year])
        }
        None => {
            let docket = nonblank(record.identifier(IdentifierKind::DocketNumber))
                .map(|d| format!("No {}", d));
            spaced(vec![
                name,
                docket,
                parenthetical(&[
                    nonblank(record.court()).map(str::to_string),
                    record.year().map(|y| y.to_string()),
                ]),
            ])
        }
    }
}

/// Author, 'Title' (2017) 31 Journal 45
fn article(record: &CanonicalRecord) -> String {
    let year = record.year().map(|y| y.to_string());
    let dated = match (nonblank(record.volume()), year) {
        (Some(volume), Some(year)) => Some(format!("({}) {}", year, volume)),
        (Some(volume), None) => Some(volume.to_string()),
        (None, Some(year)) => Some(format!("[{}]", year)),
        (None, None) => None,
    };

    let rest = spaced(vec![
        title(record).map(|t| format!("'{}'", t)),
        dated,
        nonblank(record.venue()).map(str::to_string),
        nonblank(record.pages()).map(|p| first_page(p).to_string()),
    ]);
    attributed(authors(record.authors()), rest)
}

/// Author, Title (2nd edn, Publisher 2020)
fn book(record: &CanonicalRecord) -> String {
    let imprint = spaced(vec![
        nonblank(record.publisher()).map(str::to_string),
        record.year().map(|y| y.to_string()),
    ]);
    let rest = spaced(vec![
        title(record).map(italic),
        parenthetical(&[
            edition(record).map(|e| format!("{} edn", e)),
            Some(imprint).filter(|i| !i.is_empty()),
        ]),
    ]);
    attributed(authors(record.authors()), rest)
}

/// Interview with Name (Location, Date)
fn interview(record: &CanonicalRecord) -> String {
    let lead = match (
        field(record, extra::INTERVIEWEE),
        field(record, extra::INTERVIEWER),
    ) {
        (Some(interviewee), Some(interviewer)) => {
            format!("Interview with {} by {}", interviewee, interviewer)
        }
        (Some(interviewee), None) => format!("Interview with {}", interviewee),
        (None, Some(interviewer)) => format!("Interview by {}", interviewer),
        (None, None) => "Interview".to_string(),
    };
    spaced(vec![
        Some(lead),
        parenthetical(&[
            field(record, extra::LOCATION).map(str::to_string),
            field(record, extra::DATE)
                .map(day_month_year)
                .or_else(|| record.year().map(|y| y.to_string())),
        ]),
    ])
}

/// Author, 'Title' Newspaper (Location, Date) <URL> accessed Date
fn newspaper(record: &CanonicalRecord) -> String {
    let rest = spaced(vec![
        title(record).map(|t| format!("'{}'", t)),
        nonblank(record.venue()).map(italic),
        parenthetical(&[
            field(record, extra::LOCATION).map(str::to_string),
            field(record, extra::DATE)
                .map(day_month_year)
                .or_else(|| record.year().map(|y| y.to_string())),
        ]),
        online(record),
    ]);
    attributed(authors(record.authors()), rest)
}

/// Agency, Title (Document number, Year) <URL> accessed Date
fn government(record: &CanonicalRecord) -> String {
    let rest = spaced(vec![
        title(record).map(italic),
        parenthetical(&[
            field(record, extra::DOCUMENT_NUMBER).map(str::to_string),
            date_or_year(record).map(|d| day_month_year(&d)),
        ]),
        online(record),
    ]);
    attributed(field(record, extra::AGENCY).map(str::to_string), rest)
}

/// Author, 'Title' (Website, Year) <URL> accessed Date
fn web_page(record: &CanonicalRecord) -> String {
    let rest = spaced(vec![
        title(record).map(|t| format!("'{}'", t)),
        parenthetical(&[
            nonblank(record.venue()).map(str::to_string),
            record.year().map(|y| y.to_string()),
        ]),
        online(record),
    ]);
    attributed(authors(record.authors()), rest)
}

/// Subsequent citation: short case name or author with short title, then the pinpoint
///
/// Pinpoints to neutral citations are paragraph numbers and go in square brackets.
pub(super) fn short(record: &CanonicalRecord, pinpoint: Option<&str>) -> String {
    if record.reference_type() == ReferenceType::Legal {
        let name = title(record).map(|t| italic(&case_name(short_case_name(t))));
        let pinpoint = pinpoint.map(|p| {
            if is_neutral(record) {
                format!("[{}]", p.trim_matches(['[', ']']))
            } else {
                p.to_string()
            }
        });
        return spaced(vec![name, pinpoint]);
    }

    let short = title(record).map(|t| match record.reference_type() {
        ReferenceType::Book | ReferenceType::Government => italic(&short_title(t)),
        _ => format!("'{}'", short_title(t)),
    });
    let author = match record.reference_type() {
        ReferenceType::Interview => field(record, extra::INTERVIEWEE)
            .map(|name| format!("Interview with {}", name)),
        ReferenceType::Government => field(record, extra::AGENCY).map(str::to_string),
        _ => record.authors().first().map(|a| a.family.clone()),
    };

    let mut elements = Elements::new();
    elements.push_opt(author).push_opt(short);
    if elements.is_empty() {
        elements.push_opt(nonblank(record.url()).map(|u| format!("<{}>", u)));
    }
    spaced(vec![Some(elements.bare()), pinpoint.map(str::to_string)])
}
