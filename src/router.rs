//! Confidence router: pattern detection first, AI classification only when unsure.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::classifier::Classifier;
use crate::config::RoutingConfig;
use crate::detect::detect_type;
use crate::models::DetectionResult;

/// The routing decision for one query
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Routing {
    /// The detection the cascade will use
    pub detection: DetectionResult,

    /// What the pattern detector said on its own
    pub pattern: DetectionResult,

    /// Whether the AI classifier was consulted
    pub escalated: bool,
}

/// Decides between pattern-only and pattern + AI classification
#[derive(Debug, Clone)]
pub struct ConfidenceRouter {
    classifier: Option<Arc<dyn Classifier>>,
    threshold: f64,
    ai_timeout: Duration,
}

impl Default for ConfidenceRouter {
    fn default() -> Self {
        Self::from_config(&RoutingConfig::default(), None)
    }
}

impl ConfidenceRouter {
    pub fn new(threshold: f64, ai_timeout: Duration) -> Self {
        Self {
            classifier: None,
            threshold,
            ai_timeout,
        }
    }

    /// Router with the configured threshold; the classifier is dropped when AI routing is off
    pub fn from_config(config: &RoutingConfig, classifier: Option<Arc<dyn Classifier>>) -> Self {
        Self {
            classifier: classifier.filter(|_| config.ai_enabled),
            threshold: config.confidence_threshold,
            ai_timeout: config.ai_timeout(),
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn has_classifier(&self) -> bool {
        self.classifier.is_some()
    }

    /// Pick the reference type for `query`
    ///
    /// Never fails: a missing, failing, slow or unconvinced classifier leaves the
    /// pattern result in place.
    pub async fn route(&self, query: &str) -> Routing {
        let pattern = detect_type(query);
        let pattern_only = Routing {
            detection: pattern,
            pattern,
            escalated: false,
        };

        if pattern.confidence >= self.threshold || query.trim().is_empty() {
            return pattern_only;
        }
        let Some(classifier) = &self.classifier else {
            return pattern_only;
        };

        tracing::debug!(
            "Pattern confidence {:.2} below {:.2}, asking classifier",
            pattern.confidence,
            self.threshold
        );

        let answer = tokio::time::timeout(
            self.ai_timeout,
            classifier.classify(query, pattern.reference_type),
        )
        .await;

        let detection = match answer {
            Ok(Ok(ai)) if ai.confidence >= self.threshold => {
                tracing::debug!(
                    "Classifier chose {} ({:.2})",
                    ai.reference_type,
                    ai.confidence
                );
                ai
            }
            Ok(Ok(ai)) => {
                tracing::debug!(
                    "Classifier answer {} ({:.2}) below threshold, keeping pattern result",
                    ai.reference_type,
                    ai.confidence
                );
                pattern
            }
            Ok(Err(e)) => {
                tracing::warn!("Classifier failed, using pattern result: {}", e);
                pattern
            }
            Err(_) => {
                tracing::warn!("Classifier timed out after {:?}, using pattern result", self.ai_timeout);
                pattern
            }
        };

        Routing {
            detection,
            pattern,
            escalated: true,
        }
    }
}
