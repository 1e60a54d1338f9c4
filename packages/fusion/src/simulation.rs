//! Drill and simulation scenarios.
//!
//! An active scenario forces every evaluation to `CRITICAL`, regardless of
//! location, until it is stopped.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use safe_route_geography_models::GeoPoint;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Scripted drill scenario.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum Scenario {
    /// Glacial lake outburst flood.
    FlashFlood,
    /// Slope failure after soil liquefaction.
    Landslide,
}

impl Scenario {
    /// Parses a scenario key, falling back to [`Scenario::FlashFlood`] for
    /// unknown keys.
    #[must_use]
    pub fn from_key(key: &str) -> Self {
        key.parse().unwrap_or(Self::FlashFlood)
    }

    /// Description used as the override reason.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::FlashFlood => "Glacial lake outburst detected upstream of the dam",
            Self::Landslide => "Soil liquefaction and slope instability above 45 degrees",
        }
    }

    /// Nominal score reported by the scenario script.
    #[must_use]
    pub const fn score(self) -> f64 {
        match self {
            Self::FlashFlood => 99.0,
            Self::Landslide => 88.0,
        }
    }

    /// Impact radius in kilometres.
    #[must_use]
    pub const fn impact_radius_km(self) -> f64 {
        match self {
            Self::FlashFlood => 8.0,
            Self::Landslide => 3.0,
        }
    }
}

/// A running drill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveScenario {
    /// Scenario being drilled.
    pub scenario: Scenario,
    /// Nominal epicentre.
    pub target: GeoPoint,
    /// When the drill started.
    pub started_at: DateTime<Utc>,
}

/// Process-wide drill state.
#[derive(Debug, Default)]
pub struct SimulationState {
    active: Mutex<Option<ActiveScenario>>,
}

impl SimulationState {
    fn lock(&self) -> MutexGuard<'_, Option<ActiveScenario>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts (or replaces) a drill.
    pub fn start(&self, key: &str, target: GeoPoint) -> ActiveScenario {
        let scenario = Scenario::from_key(key);
        let active = ActiveScenario {
            scenario,
            target,
            started_at: Utc::now(),
        };
        log::info!("Drill {scenario} started at {target}");
        *self.lock() = Some(active.clone());
        active
    }

    /// Stops the running drill, returning it if there was one.
    pub fn stop(&self) -> Option<ActiveScenario> {
        let previous = self.lock().take();
        if let Some(previous) = &previous {
            log::info!("Drill {} stopped", previous.scenario);
        }
        previous
    }

    /// The running drill, if any.
    #[must_use]
    pub fn current(&self) -> Option<ActiveScenario> {
        self.lock().clone()
    }
}
