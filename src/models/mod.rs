//! Core data models for references, detections and citations.

mod citation;
mod detection;
mod lookup;
mod record;

pub use citation::{Citation, CitationStyle, UnsupportedStyle};
pub use detection::{DetectionResult, DetectionSource, MAX_CLASSIFIER_CONFIDENCE};
pub use lookup::{LookupQuery, ProviderResult};
pub use record::{
    extra, Author, CanonicalRecord, CanonicalRecordBuilder, IdentifierKind, ReferenceType,
    UnknownReferenceType,
};
