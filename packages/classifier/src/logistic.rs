//! In-process logistic regression over tabular hazard features.
//!
//! Coefficients are exported by the training pipeline as a small TOML
//! file:
//!
//! ```toml
//! name = "ne-landslide-v3"
//!
//! [coefficients]
//! intercept = -6.1
//! rainfall_mm = 0.018
//! slope_deg = 0.07
//! soil_moisture_pct = 0.025
//! prior_incident = 1.2
//! ```

use std::path::Path;

use async_trait::async_trait;
use safe_route_risk_models::{Classification, TabularFeatures};
use serde::Deserialize;

use crate::fallback::label_for_probability;
use crate::{ClassifierError, TabularClassifier, validate_prediction};

/// Logistic model coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Coefficients {
    /// Bias term.
    pub intercept: f64,
    /// Weight per mm of rainfall.
    pub rainfall_mm: f64,
    /// Weight per degree of slope.
    pub slope_deg: f64,
    /// Weight per percent of soil moisture.
    pub soil_moisture_pct: f64,
    /// Weight applied when a prior incident is recorded.
    #[serde(default)]
    pub prior_incident: f64,
}

/// A trained logistic model loaded from TOML.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LogisticModel {
    /// Model identifier, used in logs.
    pub name: String,
    /// Learned coefficients.
    pub coefficients: Coefficients,
}

impl LogisticModel {
    /// Parses a model from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifierError::ModelParse`] if the TOML is malformed.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ClassifierError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Reads and parses a model file.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifierError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ClassifierError> {
        let contents = std::fs::read_to_string(path)?;
        let model = Self::from_toml_str(&contents)?;
        log::info!("Loaded tabular model '{}' from {}", model.name, path.display());
        Ok(model)
    }

    /// Raw probability for `features`.
    #[must_use]
    pub fn probability(&self, features: &TabularFeatures) -> f64 {
        let c = &self.coefficients;
        let prior = if features.prior_incident { 1.0 } else { 0.0 };
        let z = c.intercept
            + c.rainfall_mm * features.rainfall_mm
            + c.slope_deg * features.slope_deg
            + c.soil_moisture_pct * features.soil_moisture_pct
            + c.prior_incident * prior;
        1.0 / (1.0 + (-z).exp())
    }
}

#[async_trait]
impl TabularClassifier for LogisticModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn classify(&self, features: &TabularFeatures) -> Result<Classification, ClassifierError> {
        let score = self.probability(features);
        validate_prediction(Classification {
            score,
            label: label_for_probability(score),
            fallback_used: false,
        })
    }
}
