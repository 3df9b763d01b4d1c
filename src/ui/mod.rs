//! Terminal output for the CLI: coloured status lines, result tables and batch progress.

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use owo_colors::OwoColorize;
use std::io::IsTerminal;
use std::time::Duration;

use crate::cascade::{AttemptOutcome, ProviderAttempt};
use crate::models::{CanonicalRecord, Citation, CitationStyle, DetectionSource};
use crate::pipeline::{BatchItem, Candidate, Resolution};
use crate::router::Routing;
use crate::sources::FamousCase;

/// Check if stdout is a terminal.
pub fn is_terminal() -> bool {
    std::io::stdout().is_terminal()
}

/// Status icons for different operations.
pub fn status_icon(status: Status) -> &'static str {
    match status {
        Status::Success => "✓",
        Status::Error => "✗",
        Status::Warning => "⚠",
        Status::Info => "ℹ",
        Status::Skipped => "○",
    }
}

/// Status types for colored output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Error,
    Warning,
    Info,
    Skipped,
}

/// Print a status line with a coloured icon.
pub fn print_status(status: Status, msg: &str) {
    let icon = status_icon(status);
    match status {
        Status::Success => println!("{} {}", icon.green().bold(), msg),
        Status::Error => eprintln!("{} {}", icon.red().bold(), msg),
        Status::Warning => eprintln!("{} {}", icon.yellow().bold(), msg),
        Status::Info => println!("{} {}", icon.cyan().bold(), msg),
        Status::Skipped => println!("{} {}", icon.white().dimmed(), msg),
    }
}

/// Print a section header.
pub fn print_section(title: &str) {
    println!();
    println!("{}", format!("━━━ {} ━━━", title).bold().cyan());
}

/// Print a divider line.
pub fn print_divider() {
    println!("{}", "─".repeat(72).dimmed());
}

/// Citation markup rendered for a terminal: `<i>` spans become ANSI italics.
pub fn render_citation(citation: &Citation, color: bool) -> String {
    if !color {
        return citation.plain_text();
    }

    let mut out = String::new();
    let mut rest = citation.text.as_str();
    while let Some(start) = rest.find("<i>") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 3..];
        match after.find("</i>") {
            Some(end) => {
                let span: &str = &after[..end];
                out.push_str(&span.italic().to_string());
                rest = &after[end + 4..];
            }
            None => {
                out.push_str(after);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Colour for a confidence value: green when strong, yellow when middling, red otherwise.
fn confidence_cell(confidence: f64) -> Cell {
    let color = if confidence >= 0.9 {
        Color::Green
    } else if confidence >= 0.6 {
        Color::Yellow
    } else {
        Color::Red
    };
    Cell::new(format!("{:.2}", confidence)).fg(color)
}

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Print one resolution: the citation, then the record and the cascade trail.
pub fn print_resolution(resolution: &Resolution, verbose: bool) {
    println!("{}", render_citation(&resolution.citation, is_terminal()));
    println!(
        "{} {} via {} ({})",
        "└".dimmed(),
        resolution.record.reference_type().to_string().cyan(),
        resolution.provider.green(),
        format!("{:.2}", resolution.confidence).yellow()
    );

    if verbose {
        print_record(&resolution.record);
        print_attempts(&resolution.attempts);
    }
}

/// Key/value table of a record's populated fields.
pub fn print_record(record: &CanonicalRecord) {
    let mut table = new_table();
    table.set_header(vec!["Field", "Value"]);

    let mut row = |name: &str, value: Option<String>| {
        if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
            table.add_row(vec![Cell::new(name).add_attribute(Attribute::Bold), Cell::new(value)]);
        }
    };

    row("Type", Some(record.reference_type().to_string()));
    row("Title", record.title().map(str::to_string));
    let authors: Vec<String> = record.authors().iter().map(|a| a.full_name()).collect();
    row("Authors", Some(authors.join("; ")));
    row("Year", record.year().map(|y| y.to_string()));
    row("Venue", record.venue().map(str::to_string));
    row("Publisher", record.publisher().map(str::to_string));
    row("Court", record.court().map(str::to_string));
    row("Volume", record.volume().map(str::to_string));
    row("Issue", record.issue().map(str::to_string));
    row("Pages", record.pages().map(str::to_string));
    row("URL", record.url().map(str::to_string));
    for (kind, value) in record.identifiers() {
        row(&kind.to_string(), Some(value.clone()));
    }
    for (key, value) in record.extras() {
        row(key, Some(value.clone()));
    }

    println!("{table}");
}

/// The cascade's audit trail.
pub fn print_attempts(attempts: &[ProviderAttempt]) {
    let mut table = new_table();
    table.set_header(vec!["Provider", "Outcome", "Confidence", "Time"]);

    for attempt in attempts {
        let (outcome, confidence) = match &attempt.outcome {
            AttemptOutcome::Accepted { confidence } | AttemptOutcome::Cached { confidence } => {
                (Cell::new(attempt.outcome.label()).fg(Color::Green), Some(*confidence))
            }
            AttemptOutcome::BelowThreshold { confidence, minimum } => (
                Cell::new(format!("below {:.2}", minimum)).fg(Color::Yellow),
                Some(*confidence),
            ),
            AttemptOutcome::Failed { error } => (
                Cell::new(format!("failed: {}", truncate_with_ellipsis(error, 40))).fg(Color::Red),
                None,
            ),
            other => (Cell::new(other.label()).fg(Color::DarkGrey), None),
        };
        table.add_row(vec![
            Cell::new(&attempt.provider),
            outcome,
            confidence.map(confidence_cell).unwrap_or_else(|| Cell::new("-")),
            Cell::new(format!("{} ms", attempt.elapsed_ms)),
        ]);
    }

    println!("{table}");
}

/// Router decision, pattern and final.
pub fn print_routing(query: &str, routing: &Routing) {
    let mut table = new_table();
    table.set_header(vec!["Layer", "Type", "Confidence"]);
    table.add_row(vec![
        Cell::new("pattern"),
        Cell::new(routing.pattern.reference_type.to_string()),
        confidence_cell(routing.pattern.confidence),
    ]);
    if routing.escalated {
        let layer = match routing.detection.source {
            DetectionSource::Ai => "ai",
            DetectionSource::Pattern => "ai (fallback to pattern)",
        };
        table.add_row(vec![
            Cell::new(layer),
            Cell::new(routing.detection.reference_type.to_string()),
            confidence_cell(routing.detection.confidence),
        ]);
    }

    println!("{} {}", "Query:".bold(), query);
    println!("{table}");
    println!(
        "{} {}",
        "Routed as:".bold(),
        routing.detection.reference_type.to_string().cyan().bold()
    );
}

/// Ranked candidates as a table.
pub fn print_candidates(candidates: &[Candidate]) {
    let mut table = new_table();
    table.set_header(vec!["#", "Provider", "Confidence", "Citation"]);
    for (i, candidate) in candidates.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&candidate.provider),
            confidence_cell(candidate.confidence),
            Cell::new(candidate.citation.plain_text()),
        ]);
    }
    println!("{table}");
}

/// Batch results, one row per input query in order.
pub fn print_batch(items: &[BatchItem]) {
    let mut table = new_table();
    table.set_header(vec!["#", "Query", "Result"]);
    for (i, item) in items.iter().enumerate() {
        let result = match &item.result {
            Ok(resolution) => Cell::new(resolution.citation.plain_text()),
            Err(e) => Cell::new(e.to_string()).fg(Color::Red),
        };
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(truncate_with_ellipsis(&item.query, 40)),
            result,
        ]);
    }
    println!("{table}");

    let resolved = items.iter().filter(|item| item.is_ok()).count();
    let status = if resolved == items.len() {
        Status::Success
    } else {
        Status::Warning
    };
    print_status(status, &format!("{}/{} resolved", resolved, items.len()));
}

/// Supported styles with descriptions.
pub fn print_styles() {
    let mut table = new_table();
    table.set_header(vec!["Style", "Description"]);
    for style in CitationStyle::ALL {
        table.add_row(vec![
            Cell::new(style.name()).add_attribute(Attribute::Bold),
            Cell::new(style.description()),
        ]);
    }
    println!("{table}");
}

/// The famous-case table.
pub fn print_cases(cases: &[FamousCase]) {
    let mut table = new_table();
    table.set_header(vec!["Case", "Citation", "Year", "Court"]);
    for case in cases {
        table.add_row(vec![
            Cell::new(case.case_name).add_attribute(Attribute::Bold),
            Cell::new(case.citation),
            Cell::new(case.year),
            Cell::new(case.court),
        ]);
    }
    println!("{table}");
}

/// Truncate text to `max_chars` characters, ending with "..." when cut.
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if max_chars <= 3 {
        return "...".to_string();
    }
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars - 3).collect();
    format!("{}...", kept.trim_end())
}

/// Progress bar for bulk resolution.
pub struct BatchProgress {
    pb: indicatif::ProgressBar,
}

impl BatchProgress {
    pub fn new(len: u64) -> Self {
        let pb = indicatif::ProgressBar::new(len);
        let style = indicatif::ProgressStyle::with_template(
            "{spinner:.cyan} {msg} {bar:40.cyan/blue} {pos}/{len}",
        )
        .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar())
        .progress_chars("█▓▒░ ");
        pb.set_style(style);
        pb.set_message("Resolving");
        pb.enable_steady_tick(Duration::from_millis(120));
        Self { pb }
    }

    /// Hidden bar for non-interactive output
    pub fn hidden() -> Self {
        Self {
            pb: indicatif::ProgressBar::hidden(),
        }
    }

    pub fn set_position(&self, pos: u64) {
        self.pb.set_position(pos);
    }

    pub fn finish(&self) {
        self.pb.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_icon() {
        assert_eq!(status_icon(Status::Success), "✓");
        assert_eq!(status_icon(Status::Error), "✗");
        assert_eq!(status_icon(Status::Skipped), "○");
    }

    #[test]
    fn test_truncate_with_ellipsis() {
        assert_eq!(truncate_with_ellipsis("Hello", 10), "Hello");
        assert_eq!(truncate_with_ellipsis("Hello World", 8), "Hello...");
        assert_eq!(truncate_with_ellipsis("", 10), "");
        assert_eq!(truncate_with_ellipsis("Hello", 3), "...");
        assert_eq!(truncate_with_ellipsis("Ünïcödé text", 8), "Ünïcö...");
    }

    #[test]
    fn test_render_citation_without_color() {
        let citation = Citation::new(
            CitationStyle::Bluebook,
            "<i>Loving v. Virginia</i>, 388 U.S. 1 (1967).",
        );
        assert_eq!(
            render_citation(&citation, false),
            "Loving v. Virginia, 388 U.S. 1 (1967)."
        );
        let colored = render_citation(&citation, true);
        assert!(colored.contains("Loving v. Virginia"));
        assert!(!colored.contains("<i>"));
    }

    #[test]
    fn test_render_citation_with_color() {
        let citation = Citation::new(
            CitationStyle::Oscola,
            "<i>Donoghue v Stevenson</i> [1932] UKHL 100; <i>R v Brown",
        );
        let rendered = render_citation(&citation, true);
        assert!(rendered.starts_with("\u{1b}[3mDonoghue v Stevenson\u{1b}[0m [1932] UKHL 100; "));
        // an unclosed span is kept as text
        assert!(rendered.ends_with("R v Brown"));
    }
}
