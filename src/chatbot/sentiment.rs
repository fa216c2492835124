//! Sentiment classification.
//!
//! The primary classifier is a hosted Hugging Face text-classification model.
//! A small lexical scorer can stand in when the hosted model is unavailable.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub const HF_INFERENCE_URL: &str = "https://router.huggingface.co/hf-inference/models";
pub const DEFAULT_MODEL: &str = "distilbert/distilbert-base-uncased-finetuned-sst-2-english";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
    /// Classification failed and no fallback produced a label.
    Unknown,
    /// Any other label a model emits, kept verbatim.
    Other(String),
}

impl SentimentLabel {
    pub fn from_label(label: &str) -> Self {
        match label.to_ascii_uppercase().as_str() {
            "POSITIVE" => Self::Positive,
            "NEGATIVE" => Self::Negative,
            "NEUTRAL" => Self::Neutral,
            _ => Self::Other(label.to_string()),
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Positive => write!(f, "POSITIVE"),
            Self::Negative => write!(f, "NEGATIVE"),
            Self::Neutral => write!(f, "NEUTRAL"),
            Self::Unknown => write!(f, "UNKNOWN"),
            Self::Other(label) => write!(f, "{label}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SentimentResult {
    pub label: SentimentLabel,
    /// Confidence in [0, 1].
    pub score: f64,
}

impl SentimentResult {
    pub fn new(label: SentimentLabel, score: f64) -> Self {
        let score = if score.is_nan() { 0.0 } else { score.clamp(0.0, 1.0) };
        Self { label, score }
    }

    pub fn unknown() -> Self {
        Self::new(SentimentLabel::Unknown, 0.0)
    }

    /// Score rounded to two decimals, as shown to users and stored.
    pub fn rounded_score(&self) -> f64 {
        (self.score * 100.0).round() / 100.0
    }
}

#[derive(Debug, Error)]
pub enum SentimentError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("classifier error: {0}")]
    Model(String),
    #[error("classifier returned no labels")]
    Empty,
}

#[async_trait]
pub trait SentimentClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<SentimentResult, SentimentError>;
}

/// Hugging Face Inference API text-classification client.
pub struct HuggingFaceClassifier {
    token: Option<String>,
    url: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
}

#[derive(Deserialize, Debug)]
struct LabelScore {
    label: String,
    score: f64,
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum InferenceResponse {
    Nested(Vec<Vec<LabelScore>>),
    Flat(Vec<LabelScore>),
    Error { error: String },
}

impl HuggingFaceClassifier {
    pub fn new(
        endpoint: &str,
        model: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, SentimentError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let url = format!("{}/{}", endpoint.trim_end_matches('/'), model);

        Ok(Self { token, url, client })
    }
}

#[async_trait]
impl SentimentClassifier for HuggingFaceClassifier {
    async fn classify(&self, text: &str) -> Result<SentimentResult, SentimentError> {
        let mut request = self.client.post(&self.url).json(&InferenceRequest { inputs: text });
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(SentimentError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let result = parse_response(&body)?;
        debug!("Sentiment: {} ({:.2})", result.label, result.score);
        Ok(result)
    }
}

/// Pick the highest-scoring label from an inference response.
fn parse_response(body: &str) -> Result<SentimentResult, SentimentError> {
    let labels = match serde_json::from_str::<InferenceResponse>(body)? {
        InferenceResponse::Nested(batches) => batches.into_iter().next().unwrap_or_default(),
        InferenceResponse::Flat(labels) => labels,
        InferenceResponse::Error { error } => return Err(SentimentError::Model(error)),
    };

    labels
        .into_iter()
        .max_by(|a, b| a.score.total_cmp(&b.score))
        .map(|best| SentimentResult::new(SentimentLabel::from_label(&best.label), best.score))
        .ok_or(SentimentError::Empty)
}

/// Wraps a classifier and answers with the lexical scorer when it fails.
pub struct LexicalFallback {
    inner: Arc<dyn SentimentClassifier>,
}

impl LexicalFallback {
    pub fn new(inner: Arc<dyn SentimentClassifier>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl SentimentClassifier for LexicalFallback {
    async fn classify(&self, text: &str) -> Result<SentimentResult, SentimentError> {
        match self.inner.classify(text).await {
            Ok(result) => Ok(result),
            Err(e) => {
                warn!("Sentiment classifier failed, using lexical fallback: {e}");
                Ok(lexical_sentiment(text))
            }
        }
    }
}

const POSITIVE_WORDS: &[(&str, f64)] = &[
    ("amazing", 0.6),
    ("awesome", 1.0),
    ("beautiful", 0.85),
    ("best", 1.0),
    ("brilliant", 0.9),
    ("cool", 0.35),
    ("enjoy", 0.4),
    ("excellent", 1.0),
    ("fantastic", 0.4),
    ("fine", 0.4),
    ("fun", 0.3),
    ("glad", 0.5),
    ("good", 0.7),
    ("great", 0.8),
    ("happy", 0.8),
    ("helpful", 0.5),
    ("like", 0.2),
    ("love", 0.5),
    ("nice", 0.6),
    ("perfect", 1.0),
    ("thank", 0.4),
    ("thanks", 0.4),
    ("wonderful", 1.0),
];

const NEGATIVE_WORDS: &[(&str, f64)] = &[
    ("angry", -0.5),
    ("annoying", -0.8),
    ("awful", -1.0),
    ("bad", -0.7),
    ("boring", -1.0),
    ("broken", -0.4),
    ("hate", -0.8),
    ("horrible", -1.0),
    ("lonely", -0.5),
    ("poor", -0.4),
    ("sad", -0.5),
    ("sick", -0.7),
    ("stupid", -0.8),
    ("terrible", -1.0),
    ("tired", -0.4),
    ("upset", -0.5),
    ("useless", -0.5),
    ("worst", -1.0),
    ("wrong", -0.5),
];

const NEGATIONS: &[&str] = &["not", "no", "never", "dont", "don't", "isnt", "isn't", "cant", "can't"];

/// Word-list polarity scorer.
///
/// Averages the polarity of every known word; a negation flips and dampens
/// the next known word. Polarity above 0.1 is positive, below -0.1 negative.
pub fn lexical_sentiment(text: &str) -> SentimentResult {
    let lowered = text.to_lowercase();
    let words = lowered
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|w| !w.is_empty());

    let mut total = 0.0;
    let mut matched = 0usize;
    let mut negate = false;

    for word in words {
        if NEGATIONS.contains(&word) {
            negate = true;
            continue;
        }
        let polarity = POSITIVE_WORDS
            .iter()
            .chain(NEGATIVE_WORDS)
            .find(|(w, _)| *w == word)
            .map(|(_, p)| *p);

        if let Some(mut p) = polarity {
            if negate {
                p *= -0.5;
                negate = false;
            }
            total += p;
            matched += 1;
        }
    }

    let polarity = if matched == 0 { 0.0 } else { total / matched as f64 };
    let label = if polarity > 0.1 {
        SentimentLabel::Positive
    } else if polarity < -0.1 {
        SentimentLabel::Negative
    } else {
        SentimentLabel::Neutral
    };

    SentimentResult::new(label, polarity.abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    #[async_trait]
    impl SentimentClassifier for Failing {
        async fn classify(&self, _text: &str) -> Result<SentimentResult, SentimentError> {
            Err(SentimentError::Empty)
        }
    }

    #[test]
    fn test_label_parsing() {
        assert_eq!(SentimentLabel::from_label("POSITIVE"), SentimentLabel::Positive);
        assert_eq!(SentimentLabel::from_label("negative"), SentimentLabel::Negative);
        assert_eq!(SentimentLabel::from_label("Neutral"), SentimentLabel::Neutral);
        assert_eq!(
            SentimentLabel::from_label("LABEL_2"),
            SentimentLabel::Other("LABEL_2".to_string())
        );
        assert_eq!(SentimentLabel::Other("LABEL_2".into()).to_string(), "LABEL_2");
    }

    #[test]
    fn test_score_clamped_and_rounded() {
        assert_eq!(SentimentResult::new(SentimentLabel::Positive, 1.7).score, 1.0);
        assert_eq!(SentimentResult::new(SentimentLabel::Positive, f64::NAN).score, 0.0);
        assert_eq!(
            SentimentResult::new(SentimentLabel::Positive, 0.99871).rounded_score(),
            1.0
        );
        assert_eq!(
            SentimentResult::new(SentimentLabel::Negative, 0.9649).rounded_score(),
            0.96
        );
    }

    #[test]
    fn test_parse_nested_response() {
        let body = r#"[[{"label":"NEGATIVE","score":0.0012},{"label":"POSITIVE","score":0.9988}]]"#;
        let result = parse_response(body).unwrap();
        assert_eq!(result.label, SentimentLabel::Positive);
        assert!((result.score - 0.9988).abs() < 1e-9);
    }

    #[test]
    fn test_parse_flat_response() {
        let body = r#"[{"label":"NEGATIVE","score":0.91},{"label":"POSITIVE","score":0.09}]"#;
        assert_eq!(parse_response(body).unwrap().label, SentimentLabel::Negative);
    }

    #[test]
    fn test_parse_model_loading_error() {
        let body = r#"{"error":"Model is currently loading","estimated_time":20.0}"#;
        assert!(matches!(parse_response(body), Err(SentimentError::Model(_))));
    }

    #[test]
    fn test_parse_empty() {
        assert!(matches!(parse_response("[[]]"), Err(SentimentError::Empty)));
    }

    #[test]
    fn test_lexical_positive() {
        let result = lexical_sentiment("This is a great day, thanks!");
        assert_eq!(result.label, SentimentLabel::Positive);
        assert!(result.score > 0.1);
    }

    #[test]
    fn test_lexical_negative() {
        assert_eq!(lexical_sentiment("I hate this terrible bug").label, SentimentLabel::Negative);
    }

    #[test]
    fn test_lexical_negation() {
        assert_eq!(lexical_sentiment("this is not good").label, SentimentLabel::Negative);
    }

    #[test]
    fn test_lexical_neutral() {
        let result = lexical_sentiment("the train leaves at noon");
        assert_eq!(result.label, SentimentLabel::Neutral);
        assert_eq!(result.score, 0.0);
    }

    #[tokio::test]
    async fn test_fallback_used_on_failure() {
        let classifier = LexicalFallback::new(Arc::new(Failing));
        let result = classifier.classify("what a wonderful morning").await.unwrap();
        assert_eq!(result.label, SentimentLabel::Positive);
    }
}
