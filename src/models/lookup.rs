//! Provider request and response shapes.

use serde::{Deserialize, Serialize};

use super::{CanonicalRecord, ReferenceType};

/// What the cascade hands to each provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupQuery {
    /// The raw query text, untouched
    pub text: String,

    /// The type the router settled on
    pub reference_type: ReferenceType,
}

impl LookupQuery {
    pub fn new(text: impl Into<String>, reference_type: ReferenceType) -> Self {
        Self {
            text: text.into(),
            reference_type,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// A provider's single best answer for a query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderResult {
    pub matched: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<CanonicalRecord>,

    pub confidence: f64,

    pub provider: String,
}

impl ProviderResult {
    pub fn matched(provider: impl Into<String>, record: CanonicalRecord, confidence: f64) -> Self {
        Self {
            matched: true,
            record: Some(record),
            confidence: confidence.clamp(0.0, 1.0),
            provider: provider.into(),
        }
    }

    pub fn no_match(provider: impl Into<String>) -> Self {
        Self {
            matched: false,
            record: None,
            confidence: 0.0,
            provider: provider.into(),
        }
    }

    /// Matched, carries a usable record, and meets `min_confidence`
    pub fn is_acceptable(&self, min_confidence: f64) -> bool {
        self.matched
            && self.confidence >= min_confidence
            && self
                .record
                .as_ref()
                .is_some_and(CanonicalRecord::has_minimum_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acceptability() {
        let record = CanonicalRecord::builder(ReferenceType::Journal)
            .title("Some Title")
            .build();

        let good = ProviderResult::matched("crossref", record.clone(), 0.8);
        assert!(good.is_acceptable(0.5));
        assert!(!good.is_acceptable(0.9));

        let empty = ProviderResult::matched(
            "crossref",
            CanonicalRecord::builder(ReferenceType::Journal).build(),
            0.9,
        );
        assert!(!empty.is_acceptable(0.5));

        assert!(!ProviderResult::no_match("crossref").is_acceptable(0.0));
    }

    #[test]
    fn test_blank_query() {
        assert!(LookupQuery::new("  \t", ReferenceType::Unknown).is_blank());
        assert!(!LookupQuery::new("x", ReferenceType::Unknown).is_blank());
    }
}
