//! APA 7th edition reference-list entries and in-text citations.

use super::{
    edition, field, italic, link, long_date_parts, nonblank, sentence, short_agency,
    short_authors, short_title, title, us_case, year,
};
use crate::models::{extra, Author, CanonicalRecord, ReferenceType};
use crate::normalize::parse_person_name;

/// "Caplan, B." (institutions keep their full name)
fn name(author: &Author) -> String {
    match author.initials() {
        Some(initials) => format!("{}, {}", author.family, initials),
        None => author.family.clone(),
    }
}

/// Up to 20 authors joined with "&"; longer lists keep the first 19 and the last
fn authors(authors: &[Author]) -> Option<String> {
    let names: Vec<String> = authors.iter().map(name).collect();
    match names.len() {
        0 => None,
        1 => Some(names[0].clone()),
        2 => Some(format!("{}, & {}", names[0], names[1])),
        n if n <= 20 => Some(format!("{}, & {}", names[..n - 1].join(", "), names[n - 1])),
        n => Some(format!("{}, . . . {}", names[..19].join(", "), names[n - 1])),
    }
}

/// "(2017)", "(2024, July 21)" or "(n.d.)"
fn date(record: &CanonicalRecord, with_day: bool) -> String {
    if with_day {
        if let Some((month, day, year)) = field(record, extra::DATE).and_then(long_date_parts) {
            return format!("({}, {} {})", year, month, day);
        }
    }
    format!("({})", year(record).unwrap_or_else(|| "n.d.".to_string()))
}

/// Reference entry assembled from sentences
///
/// When there is no author, the title moves into the author position ahead of the date.
struct Entry {
    parts: Vec<String>,
}

impl Entry {
    fn new(author: Option<String>, title: Option<String>, date: String) -> Self {
        let parts = match (author, title) {
            (Some(author), title) => vec![sentence(&author), sentence(&date)]
                .into_iter()
                .chain(title.map(|t| sentence(&t)))
                .collect(),
            (None, Some(title)) => vec![sentence(&title), sentence(&date)],
            (None, None) => vec![sentence(&date)],
        };
        Self { parts }
    }

    fn then(mut self, part: Option<String>) -> Self {
        if let Some(part) = part.filter(|p| !p.trim().is_empty()) {
            self.parts.push(sentence(&part));
        }
        self
    }

    /// URLs and DOIs close the entry without a full stop
    fn link(mut self, link: Option<String>) -> String {
        if let Some(link) = link {
            self.parts.push(link);
        }
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

/// Author, A. A., & Author, B. B. (Year). Title. Journal, 12(3), 45-67. https://doi.org/...
fn article(record: &CanonicalRecord) -> String {
    let mut source = nonblank(record.venue()).map(italic).unwrap_or_default();
    if let Some(volume) = nonblank(record.volume()) {
        if !source.is_empty() {
            source.push_str(", ");
        }
        source.push_str(&italic(volume));
        if let Some(issue) = nonblank(record.issue()) {
            source.push_str(&format!("({})", issue));
        }
    }
    if let Some(pages) = nonblank(record.pages()) {
        if !source.is_empty() {
            source.push_str(", ");
        }
        source.push_str(pages);
    }

    Entry::new(
        authors(record.authors()),
        title(record).map(str::to_string),
        date(record, false),
    )
    .then(Some(source))
    .link(link(record))
}

/// Author, A. A. (Year). Title (2nd ed.). Publisher. https://doi.org/...
fn book(record: &CanonicalRecord) -> String {
    let title = title(record).map(|t| match edition(record) {
        Some(edition) => format!("{} ({} ed.)", italic(t), edition),
        None => italic(t),
    });
    let doi = record
        .identifier(crate::models::IdentifierKind::Doi)
        .map(super::doi_url);

    Entry::new(authors(record.authors()), title, date(record, false))
        .then(nonblank(record.publisher()).map(str::to_string))
        .link(doi)
}

/// Interviewee, A. (Year, Month Day). [Interview by Interviewer, Location].
fn interview(record: &CanonicalRecord) -> String {
    let interviewee = field(record, extra::INTERVIEWEE)
        .map(|raw| parse_person_name(raw).unwrap_or_else(|| Author::institutional(raw)))
        .map(|author| name(&author));

    let mut description = "Interview".to_string();
    if let Some(interviewer) = field(record, extra::INTERVIEWER) {
        description.push_str(&format!(" by {}", interviewer));
    }
    if let Some(location) = field(record, extra::LOCATION) {
        description.push_str(&format!(", {}", location));
    }

    Entry::new(interviewee, None, date(record, true))
        .then(Some(format!("[{}]", description)))
        .link(None)
}

/// Author, A. A. (Year, Month Day). Title. Newspaper. URL
fn newspaper(record: &CanonicalRecord) -> String {
    let venue = nonblank(record.venue()).map(italic);
    let (lead, venue) = match authors(record.authors()) {
        Some(author) => (Some(author), venue),
        None if title(record).is_none() => (venue, None),
        None => (None, venue),
    };
    Entry::new(lead, title(record).map(str::to_string), date(record, true))
        .then(venue)
        .link(nonblank(record.url()).map(str::to_string))
}

/// Agency. (Year). Title (Document number). URL
fn government(record: &CanonicalRecord) -> String {
    let title = title(record).map(|t| match field(record, extra::DOCUMENT_NUMBER) {
        Some(number) => format!("{} ({})", italic(t), number),
        None => italic(t),
    });
    Entry::new(
        field(record, extra::AGENCY).map(str::to_string),
        title,
        date(record, false),
    )
    .link(nonblank(record.url()).map(str::to_string))
}

/// Author. (Year). Title. Site Name. URL
fn web_page(record: &CanonicalRecord) -> String {
    Entry::new(
        authors(record.authors()),
        title(record).map(italic),
        date(record, true),
    )
    .then(nonblank(record.venue()).map(str::to_string))
    .link(link(record))
}

/// "p. 12" or "pp. 12-14"; pinpoints that already carry a label are kept
fn page_label(pinpoint: &str) -> String {
    if pinpoint.starts_with(|c: char| c.is_ascii_digit()) {
        if pinpoint.contains(['-', '\u{2013}']) {
            format!("pp. {}", pinpoint)
        } else {
            format!("p. {}", pinpoint)
        }
    } else {
        pinpoint.to_string()
    }
}

/// Narrative in-text citation: Caplan & Doe (2017, p. 50).
pub(super) fn short(record: &CanonicalRecord, pinpoint: Option<&str>) -> String {
    let who = match record.reference_type() {
        ReferenceType::Legal => title(record).map(italic),
        ReferenceType::Interview => field(record, extra::INTERVIEWEE)
            .map(super::family_name)
            .map(str::to_string),
        ReferenceType::Government => field(record, extra::AGENCY).map(short_agency),
        _ => short_authors(record.authors(), "&"),
    };
    let who = who.or_else(|| {
        title(record).map(|t| match record.reference_type() {
            ReferenceType::Book | ReferenceType::Government | ReferenceType::Unknown => {
                italic(&short_title(t))
            }
            _ => format!("\"{}\"", short_title(t)),
        })
    });

    let year = year(record).unwrap_or_else(|| "n.d.".to_string());
    let parenthetical = match pinpoint {
        Some(pinpoint) => format!("({}, {})", year, page_label(pinpoint)),
        None => format!("({})", year),
    };

    match who {
        Some(who) => format!("{} {}.", who, parenthetical),
        None => format!("{}.", parenthetical),
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::{article, loving};
    use super::*;

    #[test]
    fn test_journal_reference() {
        assert_eq!(
            format(&article()),
            "Caplan, B., & Doe, J. (2017). Trains, Brains, and Sprains. <i>Journal of Economic Perspectives</i>, <i>31</i>(2), 45-67. https://doi.org/10.1257/jep.31.2.45"
        );
    }

    #[test]
    fn test_author_lists() {
        let many: Vec<Author> = (1..=22)
            .map(|i| Author::new("Ann", format!("Author{}", i)))
            .collect();
        let list = authors(&many).unwrap();
        assert!(list.starts_with("Author1, A., Author2, A."));
        assert!(list.contains("Author19, A., . . . Author22, A."));
        assert!(!list.contains("Author20"));

        let three = authors(&many[..3]).unwrap();
        assert_eq!(three, "Author1, A., Author2, A., & Author3, A.");
    }

    #[test]
    fn test_book_without_author_leads_with_title() {
        let record = CanonicalRecord::builder(ReferenceType::Book)
            .title("Dictionary of Economics")
            .publisher("Oxford University Press")
            .extra(extra::EDITION, "2nd edition")
            .build();
        assert_eq!(
            format(&record),
            "<i>Dictionary of Economics</i> (2nd ed.). (n.d.). Oxford University Press."
        );
    }

    #[test]
    fn test_newspaper_uses_full_date() {
        let record = CanonicalRecord::builder(ReferenceType::Newspaper)
            .title("Senate Passes Bill")
            .author(Author::new("Adam", "Liptak"))
            .venue("The New York Times")
            .url("https://www.nytimes.com/2024/07/21/us/senate.html")
            .extra(extra::DATE, "July 21, 2024")
            .build();
        assert_eq!(
            format(&record),
            "Liptak, A. (2024, July 21). Senate Passes Bill. <i>The New York Times</i>. https://www.nytimes.com/2024/07/21/us/senate.html"
        );
    }

    #[test]
    fn test_interview_reference() {
        let record = CanonicalRecord::builder(ReferenceType::Interview)
            .extra(extra::INTERVIEWEE, "William Jones")
            .extra(extra::INTERVIEWER, "Kevin Smith")
            .extra(extra::DATE, "November 27, 1981")
            .build();
        assert_eq!(
            format(&record),
            "Jones, W. (1981, November 27). [Interview by Kevin Smith]."
        );
    }

    #[test]
    fn test_in_text() {
        assert_eq!(short(&article(), Some("50")), "Caplan & Doe (2017, p. 50).");
        assert_eq!(short(&article(), Some("50-52")), "Caplan & Doe (2017, pp. 50-52).");
        assert_eq!(short(&loving(), None), "<i>Loving v. Virginia</i> (1967).");
    }
}
