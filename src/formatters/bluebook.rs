//! Bluebook (21st ed.) citations, including short forms with `supra` and `at`.

use once_cell::sync::Lazy;
use regex::Regex;

use super::chicago::reporter_volume;
use super::{
    abbreviated_month, case_citation, edition, field, first_page, is_neutral, italic,
    long_date_parts, nonblank, sentence, short_case_name, short_title, title, us_case, Elements,
};
use crate::config::tables;
use crate::models::{extra, Author, CanonicalRecord, ReferenceType};

/// "A", "A & B", "A et al."
fn authors(authors: &[Author]) -> Option<String> {
    match authors {
        [] => None,
        [only] => Some(only.full_name()),
        [first, second] => Some(format!("{} & {}", first.full_name(), second.full_name())),
        [first, ..] => Some(format!("{} et al.", first.full_name())),
    }
}

/// "September 3, 2020" -> "Sept. 3, 2020"
fn date(text: &str) -> String {
    match long_date_parts(text) {
        Some((month, day, year)) => format!("{} {}, {}", abbreviated_month(month), day, year),
        None => text.to_string(),
    }
}

fn date_or_year(record: &CanonicalRecord) -> Option<String> {
    field(record, extra::DATE)
        .map(date)
        .or_else(|| record.year().map(|y| y.to_string()))
}

/// Bluebook ordinals: 2d and 3d rather than 2nd and 3rd
fn bluebook_edition(record: &CanonicalRecord) -> Option<String> {
    edition(record).map(|e| e.replace("2nd", "2d").replace("3rd", "3d"))
}

static FEDERAL_REGISTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)\s+(?:FR|Fed\.?\s*Reg\.?)\s+(\d+)$").unwrap());

/// "88 FR 12345" -> "88 Fed. Reg. 12345"
fn federal_register(number: &str) -> String {
    match FEDERAL_REGISTER.captures(number.trim()) {
        Some(caps) => format!("{} Fed. Reg. {}", &caps[1], &caps[2]),
        None => number.to_string(),
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

/// Author, Title, 31 Journal 45 (2017).
fn article(record: &CanonicalRecord) -> String {
    let source: Vec<&str> = [
        nonblank(record.volume()),
        nonblank(record.venue()),
        nonblank(record.pages()).map(first_page),
    ]
    .into_iter()
    .flatten()
    .collect();

    let mut elements = Elements::new();
    elements
        .push_opt(authors(record.authors()))
        .push_opt(title(record).map(italic))
        .push(source.join(" "));
    if let Some(year) = record.year() {
        elements.append(format!("({})", year));
    }
    elements.finish()
}

/// Author, Title (2d ed. 2018).
fn book(record: &CanonicalRecord) -> String {
    let parenthetical: Vec<String> = [
        bluebook_edition(record).map(|e| format!("{} ed.", e)),
        record.year().map(|y| y.to_string()),
    ]
    .into_iter()
    .flatten()
    .collect();

    let mut elements = Elements::new();
    elements
        .push_opt(authors(record.authors()))
        .push_opt(title(record).map(italic));
    if !parenthetical.is_empty() {
        elements.append(format!("({})", parenthetical.join(" ")));
    }
    elements.finish()
}

/// Interview with Name (Location, Date).
fn interview(record: &CanonicalRecord) -> String {
    let lead = match (
        field(record, extra::INTERVIEWEE),
        field(record, extra::INTERVIEWER),
    ) {
        (Some(interviewee), _) => format!("Interview with {}", interviewee),
        (None, Some(interviewer)) => format!("Interview by {}", interviewer),
        (None, None) => "Interview".to_string(),
    };
    let parenthetical: Vec<String> = [
        field(record, extra::LOCATION).map(str::to_string),
        date_or_year(record),
    ]
    .into_iter()
    .flatten()
    .collect();

    if parenthetical.is_empty() {
        sentence(&lead)
    } else {
        sentence(&format!("{} ({})", lead, parenthetical.join(", ")))
    }
}

/// Author, Title, N.Y. Times, July 21, 2024, URL.
fn newspaper(record: &CanonicalRecord) -> String {
    let venue = nonblank(record.venue())
        .map(|v| tables::newspaper_abbreviation(v).unwrap_or(v).to_string());

    let mut elements = Elements::new();
    elements
        .push_opt(authors(record.authors()))
        .push_opt(title(record).map(italic))
        .push_opt(venue)
        .push_opt(date_or_year(record))
        .push_opt(nonblank(record.url()));
    elements.finish()
}

/// Title, 88 Fed. Reg. 12345 (Date). or Agency, Title (Year), URL.
fn government(record: &CanonicalRecord) -> String {
    let mut elements = Elements::new();
    match field(record, extra::DOCUMENT_NUMBER) {
        Some(number) => {
            elements
                .push_opt(title(record))
                .push(federal_register(number));
        }
        None => {
            elements
                .push_opt(field(record, extra::AGENCY))
                .push_opt(title(record).map(italic));
        }
    }
    if let Some(when) = date_or_year(record) {
        elements.append(format!("({})", when));
    }
    elements.push_opt(nonblank(record.url()));
    elements.finish()
}

/// Author, Title, Website (Date), URL.
fn web_page(record: &CanonicalRecord) -> String {
    let mut elements = Elements::new();
    elements
        .push_opt(authors(record.authors()))
        .push_opt(title(record).map(italic))
        .push_opt(nonblank(record.venue()));
    if let Some(when) = date_or_year(record) {
        elements.append(format!("({})", when));
    }
    elements.push_opt(nonblank(record.url()));
    elements.finish()
}

/// Short form: "Loving, 388 U.S. at 12." for cases, "Caplan, supra, at 50." otherwise
pub(super) fn short(record: &CanonicalRecord, pinpoint: Option<&str>) -> String {
    let mut elements = Elements::new();

    if record.reference_type() == ReferenceType::Legal {
        elements.push_opt(title(record).map(short_case_name).map(italic));
        let citation = case_citation(record);
        match (citation, pinpoint) {
            (Some(neutral), Some(page)) if is_neutral(record) => {
                elements.push(format!("{} [{}]", neutral, page));
            }
            (Some(citation), Some(page)) => {
                let volume = reporter_volume(citation).unwrap_or(citation);
                elements.push(format!("{} at {}", volume, page));
            }
            (Some(citation), None) => {
                elements.push(citation);
            }
            (None, Some(page)) => {
                elements.push(format!("at {}", page));
            }
            (None, None) => {}
        }
        return elements.finish();
    }

    let lead = match record.reference_type() {
        ReferenceType::Interview => field(record, extra::INTERVIEWEE)
            .map(|name| format!("{} Interview", super::family_name(name))),
        ReferenceType::Government => title(record).map(short_title),
        _ => record
            .authors()
            .first()
            .map(|author| author.family.clone())
            .or_else(|| title(record).map(short_title)),
    };
    elements
        .push_opt(lead.or_else(|| nonblank(record.url()).map(str::to_string)))
        .push(italic("supra"))
        .push_opt(pinpoint.map(|page| format!("at {}", page)));
    elements.finish()
}
