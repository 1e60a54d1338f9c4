#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Risk levels, hazard reports, sensor readings, and composite risk types.
//!
//! This crate defines the data model shared by the classifier, crowd,
//! sensor, fusion, and routing crates. Scores live on a common `[0, 100]`
//! scale and map onto the totally ordered [`RiskLevel`] ladder.

use chrono::{DateTime, Utc};
use safe_route_geography_models::GeoPoint;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Score at or above which a composite score is [`RiskLevel::Critical`].
pub const CRITICAL_SCORE: f64 = 75.0;
/// Score at or above which a composite score is [`RiskLevel::High`].
pub const HIGH_SCORE: f64 = 60.0;
/// Score at or above which a composite score is [`RiskLevel::Moderate`].
pub const MODERATE_SCORE: f64 = 40.0;

/// Overall hazard level, ordered from least to most severe.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    /// No meaningful hazard.
    Safe,
    /// Elevated hazard; travel with care.
    Moderate,
    /// Serious hazard; avoid where possible.
    High,
    /// Imminent danger.
    Critical,
}

impl RiskLevel {
    /// Maps a `[0, 100]` score onto a level using the fixed breakpoints.
    ///
    /// NaN maps to [`RiskLevel::Safe`].
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= CRITICAL_SCORE {
            Self::Critical
        } else if score >= HIGH_SCORE {
            Self::High
        } else if score >= MODERATE_SCORE {
            Self::Moderate
        } else {
            Self::Safe
        }
    }

    /// Returns all variants of this enum in ascending severity.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Safe, Self::Moderate, Self::High, Self::Critical]
    }
}

/// Where a hazard report originated.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum HazardSource {
    /// Citizen report.
    Crowd,
    /// Raised from a sensor reading.
    Sensor,
    /// Emitted by a machine classifier.
    Ml,
    /// Synthetic report injected by an administrator.
    AdminOverride,
}

/// Tabular feature vector for hazard classification.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabularFeatures {
    /// Rainfall in millimetres.
    pub rainfall_mm: f64,
    /// Terrain slope in degrees.
    pub slope_deg: f64,
    /// Soil moisture percentage.
    pub soil_moisture_pct: f64,
    /// Whether an incident was previously recorded near this point.
    #[serde(default)]
    pub prior_incident: bool,
}

/// Body of a hazard report: either free text or a feature vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum HazardPayload {
    /// Free-form hazard description.
    Text(String),
    /// Structured measurements.
    Features(TabularFeatures),
}

/// A single hazard report held in the crowd log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HazardReport {
    /// Unique report ID.
    pub id: String,
    /// Where the hazard was observed.
    pub point: GeoPoint,
    /// Report body.
    pub payload: HazardPayload,
    /// Origin of the report.
    pub source: HazardSource,
    /// Short hazard type tag (e.g. `"FLOOD"`, `"ADMIN_OVERRIDE_CRITICAL"`).
    pub hazard_type: String,
    /// When the report was ingested.
    pub timestamp: DateTime<Utc>,
    /// Whether the report has been verified. The only mutable field.
    pub verified: bool,
}

impl HazardReport {
    /// Creates an unverified text report stamped with the current time.
    #[must_use]
    pub fn text(point: GeoPoint, text: impl Into<String>, source: HazardSource) -> Self {
        let text = text.into();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            point,
            hazard_type: text.clone(),
            payload: HazardPayload::Text(text),
            source,
            timestamp: Utc::now(),
            verified: false,
        }
    }

    /// Returns the text used for classification: the payload text, or the
    /// hazard type tag for feature reports.
    #[must_use]
    pub fn classification_text(&self) -> &str {
        match &self.payload {
            HazardPayload::Text(text) => text,
            HazardPayload::Features(_) => &self.hazard_type,
        }
    }
}

/// Kind of physical sensor.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SensorKind {
    /// Rain gauge (mm).
    RainGauge,
    /// River level gauge (cm).
    RiverLevel,
    /// Seismometer (Richter magnitude).
    Seismic,
    /// Soil moisture probe (%).
    SoilMoisture,
}

/// Status reported alongside a sensor value.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SensorStatus {
    /// Within normal operating range.
    Normal,
    /// Elevated but below the breach threshold.
    Warning,
    /// Above the breach threshold.
    Critical,
}

/// Latest reading from one sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorReading {
    /// Sensor ID (e.g. `"SENS-01"`).
    pub id: String,
    /// Sensor kind.
    pub kind: SensorKind,
    /// Human-readable station name.
    pub label: String,
    /// Sensor location.
    pub point: GeoPoint,
    /// Measured value.
    pub value: f64,
    /// Unit of `value`.
    pub unit: String,
    /// Status as reported by the feed.
    pub status: SensorStatus,
}

/// Measurement channel feeding the fusion blend.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalKind {
    /// Rainfall in mm.
    Rainfall,
    /// Terrain slope in degrees.
    Slope,
    /// Soil moisture in percent.
    SoilMoisture,
    /// River level in cm.
    RiverLevel,
    /// Seismic magnitude.
    Seismic,
    /// Classifier probability in `[0, 1]`.
    Classifier,
}

impl SignalKind {
    /// Human-readable channel name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Rainfall => "Rainfall",
            Self::Slope => "Slope",
            Self::SoilMoisture => "SoilMoisture",
            Self::RiverLevel => "RiverLevel",
            Self::Seismic => "Seismic",
            Self::Classifier => "Classifier",
        }
    }
}

/// One normalized measurement. Recomputed per evaluation, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskSignal {
    /// Source channel.
    pub kind: SignalKind,
    /// Sub-score in `[0, 100]`.
    pub subscore: f64,
    /// Level derived from `subscore`.
    pub level: RiskLevel,
}

/// Label produced by text classification.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum HazardLabel {
    /// Road passable.
    Clear,
    /// Road passable with difficulty.
    Caution,
    /// Road impassable.
    Blocked,
}

/// Output of a classifier call, including which implementation produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    /// Probability or confidence in `[0, 1]`.
    pub score: f64,
    /// Discrete label.
    pub label: HazardLabel,
    /// `true` when the deterministic fallback produced this result.
    pub fallback_used: bool,
}

/// Which signal determined a [`CompositeRisk`] level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DominantSource {
    /// Active drill or simulation scenario.
    Simulation,
    /// Live sensor breach.
    Sensor,
    /// Crowd consensus.
    Crowd,
    /// Heaviest weighted channel of the blended score.
    Channel(SignalKind),
    /// Blended score with no contributing channel.
    Fusion,
}

impl std::fmt::Display for DominantSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Simulation => write!(f, "Simulation"),
            Self::Sensor => write!(f, "Sensor"),
            Self::Crowd => write!(f, "Crowd"),
            Self::Channel(kind) => write!(f, "{}", kind.label()),
            Self::Fusion => write!(f, "Fusion"),
        }
    }
}

/// Fused risk verdict for one location. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeRisk {
    /// Blended score in `[0, 100]`, reported even when an override decided
    /// the level.
    pub score: f64,
    /// Final level.
    pub level: RiskLevel,
    /// Human-readable reason.
    pub reason: String,
    /// Which signal determined the level.
    pub dominant_source: DominantSource,
    /// Whether any classifier input came from the fallback.
    pub classifier_fallback_used: bool,
    /// Whether any upstream feed was degraded (stale or default data).
    pub degraded: bool,
}
