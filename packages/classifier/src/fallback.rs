//! Deterministic rule-based classifiers used when no model is available.
//!
//! Both Null classifiers are pure functions of their input and always mark
//! their output with `fallback_used = true`.

use async_trait::async_trait;
use safe_route_risk_models::{Classification, HazardLabel, TabularFeatures};

use crate::{ClassifierError, TabularClassifier, TextClassifier};

/// Rainfall (mm) at which the rain term saturates.
const RAIN_CEILING_MM: f64 = 300.0;
/// Slope (degrees) at which the slope term saturates.
const SLOPE_CEILING_DEG: f64 = 60.0;
/// Moisture (%) at which the moisture term saturates.
const MOISTURE_CEILING_PCT: f64 = 100.0;

/// Rain above this combined with slope above [`COMBO_SLOPE_DEG`] adds
/// [`COMBO_BOOST`].
const COMBO_RAIN_MM: f64 = 150.0;
const COMBO_SLOPE_DEG: f64 = 30.0;
const COMBO_BOOST: f64 = 0.2;

const MIN_SCORE: f64 = 0.01;
const MAX_SCORE: f64 = 0.99;

/// Tokens that mark a road as impassable. Checked before caution tokens.
const BLOCKED_TOKENS: &[&str] = &["flood", "block", "collapse", "stuck"];
/// Tokens that mark a road as slow or difficult.
const CAUTION_TOKENS: &[&str] = &["rain", "mud", "slow"];

/// Risk carried by each text label at full confidence.
const BLOCKED_RISK: f64 = 0.95;
const CAUTION_RISK: f64 = 0.75;
const CLEAR_RISK: f64 = 0.10;

/// Tabular probability at or above which the label is `BLOCKED`.
pub const BLOCKED_PROBABILITY: f64 = 0.75;
/// Tabular probability at or above which the label is `CAUTION`.
pub const CAUTION_PROBABILITY: f64 = 0.4;

/// Maps a tabular probability onto a hazard label.
#[must_use]
pub fn label_for_probability(score: f64) -> HazardLabel {
    if score >= BLOCKED_PROBABILITY {
        HazardLabel::Blocked
    } else if score >= CAUTION_PROBABILITY {
        HazardLabel::Caution
    } else {
        HazardLabel::Clear
    }
}

/// Scales `value` into `[0, 1]` against `ceiling`. NaN and negatives map to 0.
fn unit(value: f64, ceiling: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, ceiling) / ceiling
}

/// Weighted heuristic score for a feature vector, clamped to
/// `[0.01, 0.99]`.
#[must_use]
pub fn heuristic_score(features: &TabularFeatures) -> f64 {
    let mut score = 0.5 * unit(features.rainfall_mm, RAIN_CEILING_MM)
        + 0.3 * unit(features.slope_deg, SLOPE_CEILING_DEG)
        + 0.2 * unit(features.soil_moisture_pct, MOISTURE_CEILING_PCT);

    if features.rainfall_mm > COMBO_RAIN_MM && features.slope_deg > COMBO_SLOPE_DEG {
        score += COMBO_BOOST;
    }

    score.clamp(MIN_SCORE, MAX_SCORE)
}

/// Converts a text label and the model's confidence in it into a risk
/// score in `[0, 1]`.
///
/// Confidence in `BLOCKED` or `CAUTION` scales that label's risk up from
/// zero. Confidence in `CLEAR` scales risk down, so a confident `CLEAR`
/// scores lower than an unsure one. At full confidence the result equals
/// the keyword fallback's score for the same label.
#[must_use]
pub fn text_risk_score(label: HazardLabel, confidence: f64) -> f64 {
    let confidence = if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    };
    match label {
        HazardLabel::Blocked => BLOCKED_RISK * confidence,
        HazardLabel::Caution => CAUTION_RISK * confidence,
        HazardLabel::Clear => CLEAR_RISK * (1.0 - confidence),
    }
}

/// Keyword classification of free text.
#[must_use]
pub fn keyword_classification(text: &str) -> Classification {
    let lowered = text.to_lowercase();

    let label = if BLOCKED_TOKENS.iter().any(|t| lowered.contains(t)) {
        HazardLabel::Blocked
    } else if CAUTION_TOKENS.iter().any(|t| lowered.contains(t)) {
        HazardLabel::Caution
    } else {
        HazardLabel::Clear
    };

    Classification {
        score: match label {
            HazardLabel::Blocked => BLOCKED_RISK,
            HazardLabel::Caution => CAUTION_RISK,
            HazardLabel::Clear => CLEAR_RISK,
        },
        label,
        fallback_used: true,
    }
}

/// Heuristic tabular classification.
#[must_use]
pub fn heuristic_classification(features: &TabularFeatures) -> Classification {
    let score = heuristic_score(features);
    Classification {
        score,
        label: label_for_probability(score),
        fallback_used: true,
    }
}

/// Null tabular classifier backed by [`heuristic_score`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTabularClassifier;

#[async_trait]
impl TabularClassifier for NullTabularClassifier {
    fn name(&self) -> &str {
        "null-tabular"
    }

    async fn classify(&self, features: &TabularFeatures) -> Result<Classification, ClassifierError> {
        Ok(heuristic_classification(features))
    }
}

/// Null text classifier backed by [`keyword_classification`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTextClassifier;

#[async_trait]
impl TextClassifier for NullTextClassifier {
    fn name(&self) -> &str {
        "null-text"
    }

    async fn classify(&self, text: &str) -> Result<Classification, ClassifierError> {
        Ok(keyword_classification(text))
    }
}
