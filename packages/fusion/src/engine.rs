//! Composite risk evaluation.
//!
//! Overrides are applied in a fixed order and the first match decides the
//! level:
//!
//! 1. An active drill yields `CRITICAL`.
//! 2. A sensor breach yields `CRITICAL`.
//! 3. A crowd tier of `HIGH` or `CRITICAL` yields that tier.
//! 4. Otherwise the weighted blend of channel sub-scores decides.
//!
//! The blended score is computed and reported in every case.

use safe_route_crowd::CrowdTier;
use safe_route_geography_models::{GeoPoint, ValidationError};
use safe_route_risk_models::{
    Classification, CompositeRisk, DominantSource, RiskLevel, RiskSignal, SensorReading,
    SignalKind,
};
use safe_route_sensor::SensorMonitor;
use serde::{Deserialize, Serialize};

use crate::FusionError;
use crate::normalizer::{ChannelWeights, normalize};
use crate::simulation::ActiveScenario;

/// Tie-break order when two channels contribute equally.
const CHANNEL_ORDER: [SignalKind; 6] = [
    SignalKind::Rainfall,
    SignalKind::Slope,
    SignalKind::SoilMoisture,
    SignalKind::Classifier,
    SignalKind::RiverLevel,
    SignalKind::Seismic,
];

/// Raw channel measurements for one location. Absent channels contribute 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurements {
    /// Rainfall in mm.
    pub rainfall_mm: Option<f64>,
    /// Slope in degrees.
    pub slope_deg: Option<f64>,
    /// Soil moisture in percent.
    pub soil_moisture_pct: Option<f64>,
    /// River level in cm.
    pub river_level_cm: Option<f64>,
    /// Seismic magnitude.
    pub seismic: Option<f64>,
}

impl Measurements {
    fn raw(&self, kind: SignalKind) -> Option<f64> {
        match kind {
            SignalKind::Rainfall => self.rainfall_mm,
            SignalKind::Slope => self.slope_deg,
            SignalKind::SoilMoisture => self.soil_moisture_pct,
            SignalKind::RiverLevel => self.river_level_cm,
            SignalKind::Seismic => self.seismic,
            SignalKind::Classifier => None,
        }
    }
}

/// Everything the engine looks at besides the location.
#[derive(Debug, Clone, Copy, Default)]
pub struct FusionInputs<'a> {
    /// Channel measurements.
    pub measurements: Measurements,
    /// Classifier output, if one was run.
    pub classification: Option<Classification>,
    /// Crowd consensus around the location.
    pub crowd: Option<&'a CrowdTier>,
    /// Current sensor snapshot.
    pub sensors: &'a [SensorReading],
    /// Whether the sensor snapshot is stale.
    pub sensors_degraded: bool,
    /// Running drill, if any.
    pub drill: Option<&'a ActiveScenario>,
}

/// Fuses signals into a [`CompositeRisk`].
#[derive(Debug, Clone, Copy)]
pub struct RiskFusionEngine {
    weights: ChannelWeights,
    monitor: SensorMonitor,
}

impl Default for RiskFusionEngine {
    fn default() -> Self {
        Self {
            weights: ChannelWeights::default(),
            monitor: SensorMonitor::default(),
        }
    }
}

impl RiskFusionEngine {
    /// Creates an engine after validating `weights`.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::InvalidWeights`] if the weights are invalid.
    pub fn new(weights: ChannelWeights, monitor: SensorMonitor) -> Result<Self, FusionError> {
        weights.validate()?;
        Ok(Self { weights, monitor })
    }

    /// Active channel weights.
    #[must_use]
    pub const fn weights(&self) -> &ChannelWeights {
        &self.weights
    }

    /// Normalized signals for every present channel.
    #[must_use]
    pub fn signals(&self, inputs: &FusionInputs<'_>) -> Vec<RiskSignal> {
        CHANNEL_ORDER
            .iter()
            .filter_map(|&kind| {
                let raw = match kind {
                    SignalKind::Classifier => inputs.classification.map(|c| c.score),
                    _ => inputs.measurements.raw(kind),
                }?;
                Some(normalize(kind, raw))
            })
            .collect()
    }

    /// Validates raw coordinates, then evaluates.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if the coordinates are invalid. Nothing
    /// is computed in that case.
    pub fn evaluate(
        &self,
        lat: f64,
        lng: f64,
        inputs: &FusionInputs<'_>,
    ) -> Result<CompositeRisk, ValidationError> {
        let point = GeoPoint::new(lat, lng)?;
        Ok(self.evaluate_at(&point, inputs))
    }

    /// Evaluates a validated point.
    #[must_use]
    pub fn evaluate_at(&self, point: &GeoPoint, inputs: &FusionInputs<'_>) -> CompositeRisk {
        let (score, dominant) = self.blend(&self.signals(inputs));
        let classifier_fallback_used = inputs.classification.is_some_and(|c| c.fallback_used);
        let degraded = inputs.sensors_degraded;

        let (level, reason, dominant_source) = if let Some(drill) = inputs.drill {
            (
                RiskLevel::Critical,
                drill.scenario.description().to_string(),
                DominantSource::Simulation,
            )
        } else if let Some(breach) = self.monitor.check_breach(inputs.sensors) {
            (RiskLevel::Critical, breach.message, DominantSource::Sensor)
        } else if let Some(tier) = inputs.crowd.filter(|t| t.level >= RiskLevel::High) {
            (tier.level, tier.source.clone(), DominantSource::Crowd)
        } else {
            let source = dominant.map_or(DominantSource::Fusion, DominantSource::Channel);
            (
                RiskLevel::from_score(score),
                format!("Composite score {score:.1} at {point} (dominant: {source})"),
                source,
            )
        };

        CompositeRisk {
            score,
            level,
            reason,
            dominant_source,
            classifier_fallback_used,
            degraded,
        }
    }

    /// Weighted sum of sub-scores and the heaviest contributing channel.
    fn blend(&self, signals: &[RiskSignal]) -> (f64, Option<SignalKind>) {
        let mut score = 0.0;
        let mut dominant: Option<(SignalKind, f64)> = None;

        for signal in signals {
            let contribution = self.weights.weight(signal.kind) * signal.subscore;
            score += contribution;
            if contribution > 0.0 && dominant.is_none_or(|(_, best)| contribution > best) {
                dominant = Some((signal.kind, contribution));
            }
        }

        (score.clamp(0.0, 100.0), dominant.map(|(kind, _)| kind))
    }
}
