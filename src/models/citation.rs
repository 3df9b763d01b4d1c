//! Citation styles and rendered citations.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of supported citation styles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CitationStyle {
    #[serde(rename = "Chicago")]
    Chicago,
    #[serde(rename = "APA 7")]
    Apa7,
    #[serde(rename = "MLA 9")]
    Mla9,
    #[serde(rename = "Bluebook")]
    Bluebook,
    #[serde(rename = "OSCOLA")]
    Oscola,
}

impl CitationStyle {
    pub const ALL: [CitationStyle; 5] = [
        CitationStyle::Chicago,
        CitationStyle::Apa7,
        CitationStyle::Mla9,
        CitationStyle::Bluebook,
        CitationStyle::Oscola,
    ];

    /// Canonical display name
    pub fn name(&self) -> &'static str {
        match self {
            CitationStyle::Chicago => "Chicago",
            CitationStyle::Apa7 => "APA 7",
            CitationStyle::Mla9 => "MLA 9",
            CitationStyle::Bluebook => "Bluebook",
            CitationStyle::Oscola => "OSCOLA",
        }
    }

    /// One-line description used by `styles` listings
    pub fn description(&self) -> &'static str {
        match self {
            CitationStyle::Chicago => "Chicago Manual of Style, notes-bibliography",
            CitationStyle::Apa7 => "American Psychological Association, 7th edition",
            CitationStyle::Mla9 => "Modern Language Association, 9th edition",
            CitationStyle::Bluebook => "The Bluebook: A Uniform System of Citation (US legal)",
            CitationStyle::Oscola => "Oxford University Standard for Citation of Legal Authorities",
        }
    }
}

impl fmt::Display for CitationStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A style name that does not map to a supported style
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported citation style: '{0}'")]
pub struct UnsupportedStyle(pub String);

const FILLER_WORDS: &[&str] = &["style", "edition", "ed", "manual", "of", "the", "format"];

/// Reduce a style name to a compact key: "APA 7th edition" -> "apa7"
fn style_key(name: &str) -> String {
    name.split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|token| !token.is_empty() && !FILLER_WORDS.contains(&token.as_str()))
        .map(|token| strip_ordinal(&token))
        .collect()
}

/// "7th" -> "7", "mla9th" -> "mla9"
fn strip_ordinal(token: &str) -> String {
    for suffix in ["st", "nd", "rd", "th"] {
        if let Some(stem) = token.strip_suffix(suffix) {
            if stem.ends_with(|c: char| c.is_ascii_digit()) {
                return stem.to_string();
            }
        }
    }
    token.to_string()
}

impl FromStr for CitationStyle {
    type Err = UnsupportedStyle;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match style_key(s).as_str() {
            "chicago" | "cms" | "chicago17" | "chicago18" => Ok(CitationStyle::Chicago),
            "apa" | "apa7" => Ok(CitationStyle::Apa7),
            "mla" | "mla9" => Ok(CitationStyle::Mla9),
            "bluebook" | "bluebook21" => Ok(CitationStyle::Bluebook),
            "oscola" | "oscola4" => Ok(CitationStyle::Oscola),
            _ => Err(UnsupportedStyle(s.trim().to_string())),
        }
    }
}

/// A rendered citation
///
/// `text` marks italics with `<i>…</i>`. Citations are derived from a record on demand
/// and are not cached across styles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub style: CitationStyle,
    pub text: String,
}

impl Citation {
    pub fn new(style: CitationStyle, text: impl Into<String>) -> Self {
        Self {
            style,
            text: text.into(),
        }
    }

    /// The citation with italic markup removed
    pub fn plain_text(&self) -> String {
        self.text.replace("<i>", "").replace("</i>", "")
    }
}

impl fmt::Display for Citation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
