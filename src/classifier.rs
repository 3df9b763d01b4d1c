//! AI reference-type classifier, consulted only for low-confidence detections.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::models::{DetectionResult, ReferenceType};
use crate::utils::HttpClient;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Something that can classify a query when pattern detection is unsure
#[async_trait]
pub trait Classifier: Send + Sync + std::fmt::Debug {
    /// Classify `query`; `hint` is the pattern detector's (low-confidence) guess
    async fn classify(
        &self,
        query: &str,
        hint: ReferenceType,
    ) -> Result<DetectionResult, ClassifierError>;
}

/// Why the classifier produced no answer
///
/// The router absorbs every variant and falls back to the pattern result.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("classifier request failed: {0}")]
    Network(String),

    #[error("classifier rejected the credentials ({0})")]
    Unauthorized(u16),

    #[error("classifier returned status {0}")]
    Status(u16),

    #[error("malformed classifier reply: {0}")]
    Malformed(String),

    #[error("classifier timed out")]
    Timeout,
}

impl From<reqwest::Error> for ClassifierError {
    fn from(err: reqwest::Error) -> Self {
        ClassifierError::Network(err.to_string())
    }
}

/// Classifier backed by the Gemini `generateContent` API
///
/// One request per call and no retries; the router bounds the call with a timeout.
#[derive(Debug, Clone)]
pub struct GeminiClassifier {
    client: Arc<HttpClient>,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClassifier {
    pub fn new(client: Arc<HttpClient>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: GEMINI_API_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn prompt(query: &str, hint: ReferenceType) -> String {
        format!(
            r#"You are a citation classifier. Decide what kind of source this query refers to.

Query: "{query}"
Pattern detection guessed (low confidence): {hint}

Answer with exactly one of these types:
- journal: academic journal article, research paper
- book: book, monograph, edited volume
- legal: court case, legal opinion, statute
- interview: oral interview, personal communication
- newspaper: news or magazine article
- government: government document or report
- medical: medical or clinical article
- unknown: generic website, or cannot tell

Respond with JSON only:
{{"type": "<type>", "confidence": <0.0-1.0>, "reasoning": "<one sentence>"}}"#
        )
    }
}

/// Parse the model's JSON answer into a detection
fn parse_reply(text: &str) -> Result<DetectionResult, ClassifierError> {
    let text = text
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    let reply: ClassifierReply =
        serde_json::from_str(text).map_err(|e| ClassifierError::Malformed(e.to_string()))?;

    let reference_type: ReferenceType = reply
        .reference_type
        .parse()
        .map_err(|e: crate::models::UnknownReferenceType| ClassifierError::Malformed(e.to_string()))?;

    if !reply.confidence.is_finite() {
        return Err(ClassifierError::Malformed("confidence is not a number".into()));
    }
    if let Some(reasoning) = reply.reasoning.as_deref() {
        tracing::debug!("Classifier reasoning: {}", reasoning);
    }

    // DetectionResult::ai caps the confidence below 1.0
    Ok(DetectionResult::ai(reference_type, reply.confidence))
}

#[async_trait]
impl Classifier for GeminiClassifier {
    async fn classify(
        &self,
        query: &str,
        hint: ReferenceType,
    ) -> Result<DetectionResult, ClassifierError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url,
            self.model,
            urlencoding::encode(&self.api_key)
        );
        let body = json!({
            "contents": [{"parts": [{"text": Self::prompt(query, hint)}]}],
            "generationConfig": {
                "temperature": 0.1,
                "maxOutputTokens": 256,
                "responseMimeType": "application/json"
            }
        });

        let response = self.client.post(&url).await.json(&body).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ClassifierError::Unauthorized(status.as_u16()));
        }
        if !status.is_success() {
            return Err(ClassifierError::Status(status.as_u16()));
        }

        let data: GeminiResponse = response
            .json()
            .await
            .map_err(|e| ClassifierError::Malformed(e.to_string()))?;
        let text = data
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().find_map(|p| p.text))
            .ok_or_else(|| ClassifierError::Malformed("no candidate text".into()))?;

        parse_reply(&text)
    }
}

// ===== Gemini API Types =====

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ClassifierReply {
    #[serde(rename = "type")]
    reference_type: String,
    confidence: f64,
    #[serde(default)]
    reasoning: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DetectionSource;
    use mockito::Matcher;

    fn reply_body(text: &str) -> String {
        json!({"candidates": [{"content": {"parts": [{"text": text}]}}]}).to_string()
    }

    fn classifier(server: &mockito::ServerGuard) -> GeminiClassifier {
        GeminiClassifier::new(Arc::new(HttpClient::new().unwrap()), "key", "gemini-2.0-flash")
            .with_base_url(server.url())
    }

    #[test]
    fn test_parse_reply() {
        let result = parse_reply(r#"{"type": "BOOK", "confidence": 0.9, "reasoning": "x"}"#).unwrap();
        assert_eq!(result.reference_type, ReferenceType::Book);
        assert_eq!(result.confidence, 0.9);
        assert_eq!(result.source, DetectionSource::Ai);

        let capped = parse_reply("```json\n{\"type\": \"legal\", \"confidence\": 1.0}\n```").unwrap();
        assert_eq!(capped.confidence, 0.99);

        let url = parse_reply(r#"{"type": "URL", "confidence": 0.8}"#).unwrap();
        assert_eq!(url.reference_type, ReferenceType::Unknown);
    }

    #[test]
    fn test_parse_reply_rejects_garbage() {
        assert!(matches!(parse_reply("not json"), Err(ClassifierError::Malformed(_))));
        assert!(matches!(
            parse_reply(r#"{"type": "poem", "confidence": 0.9}"#),
            Err(ClassifierError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_classify_against_server() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-2.0-flash:generateContent")
            .match_query(Matcher::UrlEncoded("key".into(), "key".into()))
            .match_body(Matcher::Regex("temperature".into()))
            .with_status(200)
            .with_body(reply_body(r#"{"type": "newspaper", "confidence": 0.85}"#))
            .create_async()
            .await;

        let result = classifier(&server)
            .classify("Smith, city council vote, March 3", ReferenceType::Unknown)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(result.reference_type, ReferenceType::Newspaper);
        assert_eq!(result.confidence, 0.85);
    }

    #[tokio::test]
    async fn test_classify_auth_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", Matcher::Any)
            .with_status(403)
            .create_async()
            .await;

        let err = classifier(&server)
            .classify("anything", ReferenceType::Unknown)
            .await
            .unwrap_err();
        assert!(matches!(err, ClassifierError::Unauthorized(403)));
    }
}
