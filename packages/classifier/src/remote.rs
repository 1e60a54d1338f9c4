//! Remote text classification over HTTP.

use async_trait::async_trait;
use safe_route_risk_models::{Classification, HazardLabel};
use serde::{Deserialize, Serialize};

use crate::{ClassifierError, TextClassifier, validate_prediction};

/// Text classifier backed by an inference endpoint.
///
/// The endpoint accepts `{"text": ...}` and responds with
/// `{"label": "BLOCKED", "confidence": 0.93}`.
pub struct HttpTextClassifier {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpTextClassifier {
    /// Creates a classifier posting to `endpoint`.
    #[must_use]
    pub fn new(endpoint: String) -> Self {
        Self {
            endpoint,
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Serialize)]
struct InferenceRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct InferenceResponse {
    label: String,
    confidence: f64,
}

/// Converts an endpoint response into a validated [`Classification`]
/// whose score is the endpoint's confidence in the label.
fn parse_response(body: &str) -> Result<Classification, ClassifierError> {
    let response: InferenceResponse =
        serde_json::from_str(body).map_err(|e| ClassifierError::InvalidPrediction {
            message: format!("malformed response: {e}"),
        })?;

    let label: HazardLabel =
        response
            .label
            .parse()
            .map_err(|_| ClassifierError::InvalidPrediction {
                message: format!("unknown label '{}'", response.label),
            })?;

    validate_prediction(Classification {
        score: response.confidence,
        label,
        fallback_used: false,
    })
}

#[async_trait]
impl TextClassifier for HttpTextClassifier {
    fn name(&self) -> &str {
        "http-text"
    }

    async fn classify(&self, text: &str) -> Result<Classification, ClassifierError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .header("content-type", "application/json")
            .json(&InferenceRequest { text })
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(ClassifierError::InvalidPrediction {
                message: format!("HTTP {status}: {body}"),
            });
        }

        parse_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_response() {
        let c = parse_response(r#"{"label":"blocked","confidence":0.93}"#).unwrap();
        assert_eq!(c.label, HazardLabel::Blocked);
        assert!((c.score - 0.93).abs() < 1e-12);
        assert!(!c.fallback_used);
    }

    #[test]
    fn rejects_unknown_label() {
        assert!(parse_response(r#"{"label":"LAVA","confidence":0.5}"#).is_err());
    }

    #[test]
    fn rejects_out_of_range_confidence() {
        assert!(parse_response(r#"{"label":"CLEAR","confidence":1.5}"#).is_err());
    }

    #[test]
    fn rejects_malformed_body() {
        assert!(parse_response("not json").is_err());
    }
}
