#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Pluggable hazard classifiers with a deterministic rule-based fallback.
//!
//! Two capabilities are modelled as traits:
//!
//! 1. [`TabularClassifier`]: rainfall/slope/soil features to a probability.
//! 2. [`TextClassifier`]: free-form hazard descriptions to a
//!    [`HazardLabel`](safe_route_risk_models::HazardLabel) with confidence.
//!
//! Each has a primary implementation ([`logistic::LogisticModel`],
//! [`remote::HttpTextClassifier`]) and a Null implementation in
//! [`fallback`]. The [`gate::ClassifierGate`] picks the variant at
//! construction time and substitutes the fallback whenever the primary is
//! absent, errors, or times out, so callers never see a classifier error.

pub mod fallback;
pub mod gate;
pub mod logistic;
pub mod remote;

use async_trait::async_trait;
use safe_route_risk_models::{Classification, TabularFeatures};
use thiserror::Error;

pub use gate::{ClassifierConfig, ClassifierGate};

/// Errors raised by primary classifier implementations.
///
/// These never reach callers of [`ClassifierGate`]; they trigger the
/// fallback and are logged.
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// HTTP request to the inference endpoint failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Model file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Model file is not valid TOML.
    #[error("Model parse error: {0}")]
    ModelParse(#[from] toml::de::Error),

    /// The primary did not answer within the configured bound.
    #[error("Timed out after {timeout_ms}ms")]
    Timeout {
        /// The bound that elapsed.
        timeout_ms: u64,
    },

    /// The classifier returned something unusable.
    #[error("Invalid prediction: {message}")]
    InvalidPrediction {
        /// Description of what was wrong.
        message: String,
    },
}

/// Classifies a tabular feature vector.
#[async_trait]
pub trait TabularClassifier: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Produces a risk probability for `features`.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifierError`] if inference fails.
    async fn classify(&self, features: &TabularFeatures) -> Result<Classification, ClassifierError>;
}

/// Classifies a free-form hazard description.
#[async_trait]
pub trait TextClassifier: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Produces a label and the confidence in that label for `text`.
    ///
    /// The returned `score` is a confidence, not a risk. The gate turns it
    /// into a risk score with [`fallback::text_risk_score`].
    ///
    /// # Errors
    ///
    /// Returns [`ClassifierError`] if inference fails.
    async fn classify(&self, text: &str) -> Result<Classification, ClassifierError>;
}

/// Checks that a primary prediction is usable, clamping nothing.
///
/// # Errors
///
/// Returns [`ClassifierError::InvalidPrediction`] if the score is not a
/// finite value in `[0, 1]`.
pub fn validate_prediction(prediction: Classification) -> Result<Classification, ClassifierError> {
    if prediction.score.is_finite() && (0.0..=1.0).contains(&prediction.score) {
        Ok(prediction)
    } else {
        Err(ClassifierError::InvalidPrediction {
            message: format!("score {} outside [0, 1]", prediction.score),
        })
    }
}
