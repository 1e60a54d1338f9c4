#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Sensor breach detection, live sensor feeds, and snapshot caching.
//!
//! [`SensorMonitor::check_breach`] scans a snapshot of readings and reports
//! the first one above its per-kind threshold. Readings come from a
//! [`feed::SensorFeed`]; [`cache::SensorSnapshotCache`] keeps the last
//! successful poll so a feed outage degrades to stale data instead of
//! failing the evaluation.

pub mod cache;
pub mod feed;

use safe_route_risk_models::{SensorKind, SensorReading, SensorStatus};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use cache::{SensorSnapshot, SensorSnapshotCache};
pub use feed::{OpenMeteoFeed, SensorFeed, StationConfig};

/// Errors from polling a sensor feed.
#[derive(Debug, Error)]
pub enum SensorError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The feed did not answer in time.
    #[error("Sensor feed timed out after {timeout_ms}ms")]
    Timeout {
        /// Configured timeout.
        timeout_ms: u64,
    },

    /// The feed answered with something unusable.
    #[error("Invalid feed response: {message}")]
    InvalidResponse {
        /// What was wrong.
        message: String,
    },
}

/// Fraction of a threshold at which a reading is reported as a warning.
const WARNING_FRACTION: f64 = 0.8;

const fn default_rain_gauge_mm() -> f64 {
    80.0
}

const fn default_river_level_cm() -> f64 {
    150.0
}

const fn default_seismic() -> f64 {
    4.0
}

const fn default_soil_moisture_pct() -> f64 {
    95.0
}

/// Per-kind breach thresholds. A reading breaches when strictly above.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorThresholds {
    /// Rain gauge threshold in mm.
    #[serde(default = "default_rain_gauge_mm")]
    pub rain_gauge_mm: f64,
    /// River level threshold in cm.
    #[serde(default = "default_river_level_cm")]
    pub river_level_cm: f64,
    /// Seismic threshold in Richter magnitude.
    #[serde(default = "default_seismic")]
    pub seismic: f64,
    /// Soil moisture threshold in percent.
    #[serde(default = "default_soil_moisture_pct")]
    pub soil_moisture_pct: f64,
}

impl Default for SensorThresholds {
    fn default() -> Self {
        Self {
            rain_gauge_mm: default_rain_gauge_mm(),
            river_level_cm: default_river_level_cm(),
            seismic: default_seismic(),
            soil_moisture_pct: default_soil_moisture_pct(),
        }
    }
}

impl SensorThresholds {
    /// Threshold for `kind`.
    #[must_use]
    pub const fn for_kind(&self, kind: SensorKind) -> f64 {
        match kind {
            SensorKind::RainGauge => self.rain_gauge_mm,
            SensorKind::RiverLevel => self.river_level_cm,
            SensorKind::Seismic => self.seismic,
            SensorKind::SoilMoisture => self.soil_moisture_pct,
        }
    }
}

/// A reading that exceeded its threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorBreach {
    /// ID of the breaching sensor.
    pub sensor_id: String,
    /// Kind of the breaching sensor.
    pub kind: SensorKind,
    /// Measured value.
    pub value: f64,
    /// Unit of `value`.
    pub unit: String,
    /// Alert text.
    pub message: String,
}

/// Sensor section of the service configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Breach thresholds.
    pub thresholds: SensorThresholds,
    /// Upper bound on one feed poll.
    pub feed_timeout_ms: u64,
    /// Forecast API base URL.
    pub feed_url: String,
    /// Stations derived from the feed.
    pub stations: Vec<StationConfig>,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            thresholds: SensorThresholds::default(),
            feed_timeout_ms: 2_000,
            feed_url: feed::OPEN_METEO_URL.to_string(),
            stations: Vec::new(),
        }
    }
}

/// Stateless breach detector.
#[derive(Debug, Clone, Copy, Default)]
pub struct SensorMonitor {
    thresholds: SensorThresholds,
}

impl SensorMonitor {
    /// Creates a monitor with the given thresholds.
    #[must_use]
    pub const fn new(thresholds: SensorThresholds) -> Self {
        Self { thresholds }
    }

    /// Active thresholds.
    #[must_use]
    pub const fn thresholds(&self) -> &SensorThresholds {
        &self.thresholds
    }

    /// Returns the first reading whose value exceeds its kind's threshold.
    #[must_use]
    pub fn check_breach(&self, readings: &[SensorReading]) -> Option<SensorBreach> {
        let reading = readings
            .iter()
            .find(|r| r.value > self.thresholds.for_kind(r.kind))?;

        log::warn!(
            "Sensor {} ({}) breached: {} {}",
            reading.id,
            reading.kind,
            reading.value,
            reading.unit
        );

        Some(SensorBreach {
            sensor_id: reading.id.clone(),
            kind: reading.kind,
            value: reading.value,
            unit: reading.unit.clone(),
            message: format!(
                "CRITICAL BREACH AT {} ({}{})",
                reading.label, reading.value, reading.unit
            ),
        })
    }

    /// Status a feed should attach to `value` for a sensor of `kind`.
    #[must_use]
    pub fn status_for(&self, kind: SensorKind, value: f64) -> SensorStatus {
        let threshold = self.thresholds.for_kind(kind);
        if value > threshold {
            SensorStatus::Critical
        } else if value > threshold * WARNING_FRACTION {
            SensorStatus::Warning
        } else {
            SensorStatus::Normal
        }
    }
}
