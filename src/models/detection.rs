//! Type classification results.

use serde::{Deserialize, Serialize};

use super::ReferenceType;

/// Highest confidence a pattern or AI classification may report.
/// A confidence of exactly 1.0 is reserved for famous-case cache hits.
pub const MAX_CLASSIFIER_CONFIDENCE: f64 = 0.99;

/// Which layer produced a classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionSource {
    Pattern,
    Ai,
}

/// A reference type with the confidence of whichever layer produced it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    #[serde(rename = "type")]
    pub reference_type: ReferenceType,
    pub confidence: f64,
    pub source: DetectionSource,
}

impl DetectionResult {
    pub fn pattern(reference_type: ReferenceType, confidence: f64) -> Self {
        Self {
            reference_type,
            confidence: clamp(confidence),
            source: DetectionSource::Pattern,
        }
    }

    pub fn ai(reference_type: ReferenceType, confidence: f64) -> Self {
        Self {
            reference_type,
            confidence: clamp(confidence),
            source: DetectionSource::Ai,
        }
    }

    /// Pattern result used when nothing matched
    pub fn unknown() -> Self {
        Self::pattern(ReferenceType::Unknown, 0.0)
    }
}

fn clamp(confidence: f64) -> f64 {
    if confidence.is_nan() {
        return 0.0;
    }
    confidence.clamp(0.0, MAX_CLASSIFIER_CONFIDENCE)
}
