//! Timeout-guarded classifier selection with automatic fallback.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use safe_route_risk_models::{Classification, TabularFeatures};
use serde::Deserialize;

use crate::fallback::{heuristic_classification, keyword_classification, text_risk_score};
use crate::logistic::LogisticModel;
use crate::remote::HttpTextClassifier;
use crate::{ClassifierError, TabularClassifier, TextClassifier};

const fn default_timeout_ms() -> u64 {
    2_000
}

/// Classifier section of the service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Upper bound on a single primary classifier call.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Inference endpoint for the text classifier. Unset disables it.
    pub text_endpoint: Option<String>,
    /// Path to a logistic model TOML file. Unset disables it.
    pub tabular_model_path: Option<PathBuf>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            text_endpoint: None,
            tabular_model_path: None,
        }
    }
}

/// Chooses between primary and fallback classifiers.
///
/// Primaries are fixed at construction. A call that errors, times out, or
/// returns an invalid score is answered by the deterministic fallback and
/// flagged with `fallback_used = true`. Neither method can fail.
#[derive(Clone)]
pub struct ClassifierGate {
    tabular: Option<Arc<dyn TabularClassifier>>,
    text: Option<Arc<dyn TextClassifier>>,
    timeout: Duration,
}

impl std::fmt::Debug for ClassifierGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierGate")
            .field("tabular", &self.tabular.as_ref().map(|c| c.name().to_string()))
            .field("text", &self.text.as_ref().map(|c| c.name().to_string()))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ClassifierGate {
    /// Creates a gate over the given primaries.
    #[must_use]
    pub fn new(
        tabular: Option<Arc<dyn TabularClassifier>>,
        text: Option<Arc<dyn TextClassifier>>,
        timeout: Duration,
    ) -> Self {
        Self {
            tabular,
            text,
            timeout,
        }
    }

    /// A gate with no primaries; every call uses the fallback.
    #[must_use]
    pub fn fallback_only() -> Self {
        Self::new(None, None, Duration::from_millis(default_timeout_ms()))
    }

    /// Builds the primaries described by `config`.
    ///
    /// A model file that cannot be loaded is logged and left out, so the
    /// gate starts in fallback mode for that capability.
    #[must_use]
    pub fn from_config(config: &ClassifierConfig) -> Self {
        let tabular: Option<Arc<dyn TabularClassifier>> =
            config
                .tabular_model_path
                .as_ref()
                .and_then(|path| match LogisticModel::load(path) {
                    Ok(model) => Some(Arc::new(model) as Arc<dyn TabularClassifier>),
                    Err(e) => {
                        log::warn!(
                            "Tabular model {} unavailable, using fallback: {e}",
                            path.display()
                        );
                        None
                    }
                });

        let text: Option<Arc<dyn TextClassifier>> = config.text_endpoint.as_ref().map(|url| {
            log::info!("Text classifier endpoint: {url}");
            Arc::new(HttpTextClassifier::new(url.clone())) as Arc<dyn TextClassifier>
        });

        Self::new(tabular, text, Duration::from_millis(config.timeout_ms))
    }

    /// Whether a primary tabular classifier is installed.
    #[must_use]
    pub fn has_tabular_primary(&self) -> bool {
        self.tabular.is_some()
    }

    /// Whether a primary text classifier is installed.
    #[must_use]
    pub fn has_text_primary(&self) -> bool {
        self.text.is_some()
    }

    /// Classifies a tabular feature vector.
    pub async fn classify_features(&self, features: &TabularFeatures) -> Classification {
        let Some(primary) = &self.tabular else {
            return heuristic_classification(features);
        };

        let result = tokio::time::timeout(self.timeout, primary.classify(features)).await;
        match flatten(result, self.timeout) {
            Ok(classification) => classification,
            Err(e) => {
                log::warn!("Tabular classifier '{}' failed, using fallback: {e}", primary.name());
                heuristic_classification(features)
            }
        }
    }

    /// Classifies a free-text hazard description.
    ///
    /// The primary's label confidence is converted to a risk score, so a
    /// confident `CLEAR` lowers risk instead of raising it.
    pub async fn classify_text(&self, text: &str) -> Classification {
        let Some(primary) = &self.text else {
            return keyword_classification(text);
        };

        let result = tokio::time::timeout(self.timeout, primary.classify(text)).await;
        match flatten(result, self.timeout) {
            Ok(classification) => Classification {
                score: text_risk_score(classification.label, classification.score),
                ..classification
            },
            Err(e) => {
                log::warn!("Text classifier '{}' failed, using fallback: {e}", primary.name());
                keyword_classification(text)
            }
        }
    }
}

fn flatten(
    result: Result<Result<Classification, ClassifierError>, tokio::time::error::Elapsed>,
    timeout: Duration,
) -> Result<Classification, ClassifierError> {
    result.map_err(|_| ClassifierError::Timeout {
        timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
    })?
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use safe_route_risk_models::HazardLabel;

    use super::*;

    struct Failing;

    #[async_trait]
    impl TextClassifier for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        async fn classify(&self, _text: &str) -> Result<Classification, ClassifierError> {
            Err(ClassifierError::InvalidPrediction {
                message: "boom".to_string(),
            })
        }
    }

    struct Slow;

    #[async_trait]
    impl TabularClassifier for Slow {
        fn name(&self) -> &str {
            "slow"
        }

        async fn classify(&self, _f: &TabularFeatures) -> Result<Classification, ClassifierError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Classification {
                score: 0.5,
                label: HazardLabel::Caution,
                fallback_used: false,
            })
        }
    }

    struct Fixed;

    #[async_trait]
    impl TextClassifier for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn classify(&self, _text: &str) -> Result<Classification, ClassifierError> {
            Ok(Classification {
                score: 0.6,
                label: HazardLabel::Caution,
                fallback_used: false,
            })
        }
    }

    #[tokio::test]
    async fn absent_primary_uses_fallback() {
        let gate = ClassifierGate::fallback_only();
        let c = gate.classify_text("bridge collapse").await;
        assert!(c.fallback_used);
        assert_eq!(c.label, HazardLabel::Blocked);
    }

    #[tokio::test]
    async fn failing_primary_uses_fallback() {
        let gate = ClassifierGate::new(None, Some(Arc::new(Failing)), Duration::from_secs(1));
        let c = gate.classify_text("light rain").await;
        assert!(c.fallback_used);
        assert_eq!(c.label, HazardLabel::Caution);
    }

    #[tokio::test]
    async fn slow_primary_times_out() {
        let gate = ClassifierGate::new(Some(Arc::new(Slow)), None, Duration::from_millis(20));
        let c = gate.classify_features(&TabularFeatures::default()).await;
        assert!(c.fallback_used);
        assert_eq!(c.label, HazardLabel::Clear);
    }

    #[tokio::test]
    async fn healthy_primary_is_used() {
        let gate = ClassifierGate::new(None, Some(Arc::new(Fixed)), Duration::from_secs(1));
        let c = gate.classify_text("anything").await;
        assert!(!c.fallback_used);
        assert_eq!(c.label, HazardLabel::Caution);
        // 0.75 * 0.6
        assert!((c.score - 0.45).abs() < 1e-12);
    }

    struct ConfidentClear;

    #[async_trait]
    impl TextClassifier for ConfidentClear {
        fn name(&self) -> &str {
            "confident-clear"
        }

        async fn classify(&self, _text: &str) -> Result<Classification, ClassifierError> {
            Ok(Classification {
                score: 0.95,
                label: HazardLabel::Clear,
                fallback_used: false,
            })
        }
    }

    #[tokio::test]
    async fn confident_clear_primary_scores_below_fallback() {
        let text = "road is all clear";
        let gate = ClassifierGate::new(
            None,
            Some(Arc::new(ConfidentClear)),
            Duration::from_secs(1),
        );
        let primary = gate.classify_text(text).await;
        let fallback = ClassifierGate::fallback_only().classify_text(text).await;

        assert_eq!(primary.label, HazardLabel::Clear);
        assert_eq!(fallback.label, HazardLabel::Clear);
        assert!(primary.score < fallback.score);
    }

    #[tokio::test]
    async fn elapsed_timeout_maps_to_timeout_error() {
        let elapsed = tokio::time::timeout(
            Duration::from_millis(1),
            std::future::pending::<Result<Classification, ClassifierError>>(),
        )
        .await;
        let err = flatten(elapsed, Duration::from_millis(1)).unwrap_err();
        assert!(matches!(err, ClassifierError::Timeout { timeout_ms: 1 }));
        assert_eq!(err.to_string(), "Timed out after 1ms");
    }

    #[test]
    fn missing_model_file_starts_in_fallback() {
        let config = ClassifierConfig {
            tabular_model_path: Some(PathBuf::from("/nonexistent/model.toml")),
            ..ClassifierConfig::default()
        };
        let gate = ClassifierGate::from_config(&config);
        assert!(!gate.has_tabular_primary());
        assert!(!gate.has_text_primary());
    }

    #[test]
    fn config_defaults() {
        let config: ClassifierConfig = toml::from_str("").unwrap();
        assert_eq!(config.timeout_ms, 2_000);
        assert!(config.text_endpoint.is_none());
    }
}
