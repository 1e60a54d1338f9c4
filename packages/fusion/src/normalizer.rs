//! Maps raw channel measurements onto the common `[0, 100]` scale.
//!
//! Each channel has a piecewise-linear breakpoint table. Values between
//! breakpoints are interpolated, values past either end clamp to the end
//! sub-score, and NaN maps to 0.

use safe_route_risk_models::{RiskLevel, RiskSignal, SignalKind};
use serde::{Deserialize, Serialize};

use crate::FusionError;

/// Rainfall (mm) breakpoints.
pub const RAINFALL: &[(f64, f64)] = &[
    (0.0, 0.0),
    (20.0, 15.0),
    (40.0, 35.0),
    (60.0, 55.0),
    (100.0, 80.0),
    (150.0, 100.0),
];

/// Slope (degrees) breakpoints.
pub const SLOPE: &[(f64, f64)] = &[
    (0.0, 0.0),
    (20.0, 20.0),
    (30.0, 40.0),
    (40.0, 65.0),
    (45.0, 80.0),
    (60.0, 100.0),
];

/// Soil moisture (%) breakpoints.
pub const SOIL_MOISTURE: &[(f64, f64)] = &[
    (0.0, 0.0),
    (40.0, 20.0),
    (70.0, 55.0),
    (90.0, 85.0),
    (100.0, 100.0),
];

/// River level (cm) breakpoints.
pub const RIVER_LEVEL: &[(f64, f64)] = &[(0.0, 0.0), (100.0, 30.0), (150.0, 75.0), (200.0, 100.0)];

/// Seismic (Richter) breakpoints.
pub const SEISMIC: &[(f64, f64)] = &[(0.0, 0.0), (2.0, 10.0), (4.0, 50.0), (6.0, 100.0)];

/// Classifier probability breakpoints (linear ×100).
pub const CLASSIFIER: &[(f64, f64)] = &[(0.0, 0.0), (1.0, 100.0)];

/// Breakpoint table for `kind`.
#[must_use]
pub const fn breakpoints(kind: SignalKind) -> &'static [(f64, f64)] {
    match kind {
        SignalKind::Rainfall => RAINFALL,
        SignalKind::Slope => SLOPE,
        SignalKind::SoilMoisture => SOIL_MOISTURE,
        SignalKind::RiverLevel => RIVER_LEVEL,
        SignalKind::Seismic => SEISMIC,
        SignalKind::Classifier => CLASSIFIER,
    }
}

fn interpolate(table: &[(f64, f64)], x: f64) -> f64 {
    if x.is_nan() {
        return 0.0;
    }

    let Some(&(first_x, first_y)) = table.first() else {
        return 0.0;
    };
    if x <= first_x {
        return first_y;
    }

    for pair in table.windows(2) {
        let (x0, y0) = pair[0];
        let (x1, y1) = pair[1];
        if x <= x1 {
            return (x - x0).mul_add((y1 - y0) / (x1 - x0), y0);
        }
    }

    table.last().map_or(0.0, |&(_, y)| y)
}

/// Normalizes a raw measurement into a [`RiskSignal`].
#[must_use]
pub fn normalize(kind: SignalKind, raw_value: f64) -> RiskSignal {
    let subscore = interpolate(breakpoints(kind), raw_value).clamp(0.0, 100.0);
    RiskSignal {
        kind,
        subscore,
        level: RiskLevel::from_score(subscore),
    }
}

const WEIGHT_TOLERANCE: f64 = 1e-6;

const fn default_rainfall() -> f64 {
    0.35
}

const fn default_slope() -> f64 {
    0.25
}

const fn default_classifier() -> f64 {
    0.20
}

const fn default_soil_moisture() -> f64 {
    0.20
}

/// Blend weight per channel. Must sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelWeights {
    /// Rainfall weight.
    #[serde(default = "default_rainfall")]
    pub rainfall: f64,
    /// Slope weight.
    #[serde(default = "default_slope")]
    pub slope: f64,
    /// Classifier weight.
    #[serde(default = "default_classifier")]
    pub classifier: f64,
    /// Soil moisture weight.
    #[serde(default = "default_soil_moisture")]
    pub soil_moisture: f64,
    /// River level weight. Unweighted by default.
    pub river_level: f64,
    /// Seismic weight. Unweighted by default.
    pub seismic: f64,
}

impl Default for ChannelWeights {
    fn default() -> Self {
        Self {
            rainfall: default_rainfall(),
            slope: default_slope(),
            classifier: default_classifier(),
            soil_moisture: default_soil_moisture(),
            river_level: 0.0,
            seismic: 0.0,
        }
    }
}

impl ChannelWeights {
    /// Weight for `kind`.
    #[must_use]
    pub const fn weight(&self, kind: SignalKind) -> f64 {
        match kind {
            SignalKind::Rainfall => self.rainfall,
            SignalKind::Slope => self.slope,
            SignalKind::SoilMoisture => self.soil_moisture,
            SignalKind::RiverLevel => self.river_level,
            SignalKind::Seismic => self.seismic,
            SignalKind::Classifier => self.classifier,
        }
    }

    fn all(&self) -> [f64; 6] {
        [
            self.rainfall,
            self.slope,
            self.classifier,
            self.soil_moisture,
            self.river_level,
            self.seismic,
        ]
    }

    /// Checks that every weight is finite and non-negative and that they
    /// sum to 1.0.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::InvalidWeights`] otherwise.
    pub fn validate(&self) -> Result<(), FusionError> {
        if let Some(bad) = self.all().into_iter().find(|w| !w.is_finite() || *w < 0.0) {
            return Err(FusionError::InvalidWeights {
                message: format!("weight {bad} must be finite and non-negative"),
            });
        }

        let sum: f64 = self.all().iter().sum();
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(FusionError::InvalidWeights {
                message: format!("weights sum to {sum}, expected 1.0"),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [SignalKind; 6] = [
        SignalKind::Rainfall,
        SignalKind::Slope,
        SignalKind::SoilMoisture,
        SignalKind::RiverLevel,
        SignalKind::Seismic,
        SignalKind::Classifier,
    ];

    #[test]
    fn subscores_stay_in_range() {
        let inputs = [
            f64::NAN,
            f64::NEG_INFINITY,
            -50.0,
            0.0,
            0.5,
            3.0,
            42.0,
            99.0,
            1_000.0,
            f64::INFINITY,
        ];
        for kind in ALL {
            for raw in inputs {
                let s = normalize(kind, raw).subscore;
                assert!((0.0..=100.0).contains(&s), "{kind:?}({raw}) -> {s}");
            }
        }
    }

    #[test]
    fn nan_maps_to_zero() {
        for kind in ALL {
            assert!(normalize(kind, f64::NAN).subscore.abs() < 1e-12);
        }
    }

    #[test]
    fn rainfall_is_monotone() {
        let mut prev = 0.0;
        for mm in 0..400 {
            let s = normalize(SignalKind::Rainfall, f64::from(mm) * 0.5).subscore;
            assert!(s >= prev, "{mm}: {s} < {prev}");
            prev = s;
        }
    }

    #[test]
    fn interpolates_between_breakpoints() {
        assert!((normalize(SignalKind::Rainfall, 30.0).subscore - 25.0).abs() < 1e-9);
        assert!((normalize(SignalKind::Rainfall, 150.0).subscore - 100.0).abs() < 1e-9);
        assert!((normalize(SignalKind::Slope, 42.5).subscore - 72.5).abs() < 1e-9);
        assert!((normalize(SignalKind::Classifier, 0.82).subscore - 82.0).abs() < 1e-9);
        assert_eq!(normalize(SignalKind::Seismic, 5.0).level, RiskLevel::Critical);
    }

    #[test]
    fn default_weights_are_valid() {
        assert!(ChannelWeights::default().validate().is_ok());
    }

    #[test]
    fn rejects_bad_weights() {
        let w = ChannelWeights {
            rainfall: 0.5,
            ..ChannelWeights::default()
        };
        assert!(matches!(w.validate(), Err(FusionError::InvalidWeights { .. })));

        let w = ChannelWeights {
            rainfall: -0.1,
            slope: 0.7,
            ..ChannelWeights::default()
        };
        assert!(w.validate().is_err());
    }

    #[test]
    fn weights_load_from_toml() {
        let w: ChannelWeights =
            toml::from_str("rainfall = 0.25\nriver_level = 0.10").unwrap();
        assert!((w.slope - 0.25).abs() < 1e-12);
        assert!(w.validate().is_ok());
    }
}
