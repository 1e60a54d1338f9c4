#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Crowd-sourced hazard reports and proximity consensus.
//!
//! Reports are held in a bounded, append-only log. A zone's tier is
//! derived from how many reports fall inside a small box around the
//! queried point:
//!
//! | Nearby reports | Tier |
//! |---|---|
//! | ≥ 5 | `CRITICAL` |
//! | ≥ 3 | `HIGH` |
//! | ≥ 1 | `MODERATE` |
//! | 0 | none |

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{Duration, Utc};
use safe_route_geography_models::GeoPoint;
use safe_route_risk_models::{HazardPayload, HazardReport, HazardSource, RiskLevel};
use serde::{Deserialize, Serialize};

/// Reports needed for a `CRITICAL` tier.
pub const CRITICAL_REPORTS: usize = 5;
/// Reports needed for a `HIGH` tier.
pub const HIGH_REPORTS: usize = 3;
/// Synthetic reports injected by [`CrowdConsensus::force_override`].
pub const OVERRIDE_BATCH: usize = 10;

/// Half-width of the proximity box in degrees (roughly 1 km).
pub const DEFAULT_EPSILON_DEG: f64 = 0.01;

const fn default_epsilon_deg() -> f64 {
    DEFAULT_EPSILON_DEG
}

const fn default_capacity() -> usize {
    10_000
}

const fn default_max_age_secs() -> u64 {
    24 * 60 * 60
}

/// Crowd section of the service configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CrowdConfig {
    /// Proximity box half-width in degrees.
    #[serde(default = "default_epsilon_deg")]
    pub epsilon_deg: f64,
    /// Maximum number of retained reports.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Reports older than this are evicted.
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,
}

impl Default for CrowdConfig {
    fn default() -> Self {
        Self {
            epsilon_deg: default_epsilon_deg(),
            capacity: default_capacity(),
            max_age_secs: default_max_age_secs(),
        }
    }
}

/// Consensus verdict for a zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrowdTier {
    /// Derived level.
    pub level: RiskLevel,
    /// Number of nearby reports.
    pub count: usize,
    /// Human-readable provenance.
    pub source: String,
}

impl CrowdTier {
    /// Maps a nearby-report count onto a tier. Zero yields `None`.
    #[must_use]
    pub fn from_count(count: usize) -> Option<Self> {
        let (level, source) = if count >= CRITICAL_REPORTS {
            (RiskLevel::Critical, format!("Confirmed by {count} citizens"))
        } else if count >= HIGH_REPORTS {
            (RiskLevel::High, format!("Reported by {count} citizens"))
        } else if count > 0 {
            (RiskLevel::Moderate, "Unverified user report".to_string())
        } else {
            return None;
        };

        Some(Self {
            level,
            count,
            source,
        })
    }
}

/// Thread-safe hazard report log with proximity consensus.
#[derive(Debug)]
pub struct CrowdConsensus {
    config: CrowdConfig,
    reports: Mutex<VecDeque<HazardReport>>,
}

impl Default for CrowdConsensus {
    fn default() -> Self {
        Self::new(CrowdConfig::default())
    }
}

impl CrowdConsensus {
    /// Creates an empty log.
    ///
    /// Capacity is raised to at least [`OVERRIDE_BATCH`] so an override
    /// batch always fits.
    #[must_use]
    pub fn new(mut config: CrowdConfig) -> Self {
        config.capacity = config.capacity.max(OVERRIDE_BATCH);
        Self {
            config,
            reports: Mutex::new(VecDeque::new()),
        }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &CrowdConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<HazardReport>> {
        self.reports.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records a citizen report and returns the zone's resulting tier.
    pub fn submit(&self, point: GeoPoint, hazard_type: &str) -> Option<CrowdTier> {
        let report = HazardReport::text(point, hazard_type, HazardSource::Crowd);
        self.submit_report(report)
    }

    /// Records a pre-built report (e.g. sensor or classifier originated)
    /// and returns the tier around its location.
    pub fn submit_report(&self, report: HazardReport) -> Option<CrowdTier> {
        let point = report.point;
        let mut reports = self.lock();
        log::debug!("Crowd report {} ({}) at {point}", report.id, report.hazard_type);
        reports.push_back(report);
        self.evict(&mut reports);
        let count = self.count_near(&reports, &point);
        drop(reports);
        CrowdTier::from_count(count)
    }

    /// Tier for the zone around `point`, or `None` with no nearby reports.
    ///
    /// Expired reports are evicted before counting.
    #[must_use]
    pub fn evaluate(&self, point: &GeoPoint) -> Option<CrowdTier> {
        let mut reports = self.lock();
        self.evict(&mut reports);
        let count = self.count_near(&reports, point);
        drop(reports);
        CrowdTier::from_count(count)
    }

    /// Forces a zone to `CRITICAL` by injecting [`OVERRIDE_BATCH`] verified
    /// synthetic reports tagged `ADMIN_OVERRIDE_<status>`.
    pub fn force_override(&self, point: GeoPoint, status: RiskLevel) -> Option<CrowdTier> {
        let hazard_type = format!("ADMIN_OVERRIDE_{status}");
        log::info!("Admin override {hazard_type} at {point}");

        let now = Utc::now();
        let mut reports = self.lock();
        for _ in 0..OVERRIDE_BATCH {
            reports.push_back(HazardReport {
                id: uuid::Uuid::new_v4().to_string(),
                point,
                payload: HazardPayload::Text(hazard_type.clone()),
                source: HazardSource::AdminOverride,
                hazard_type: hazard_type.clone(),
                timestamp: now,
                verified: true,
            });
        }
        self.evict(&mut reports);
        let count = self.count_near(&reports, &point);
        drop(reports);
        CrowdTier::from_count(count)
    }

    /// Marks the report with `id` as verified. Returns `false` if absent.
    pub fn mark_verified(&self, id: &str) -> bool {
        let mut reports = self.lock();
        let Some(report) = reports.iter_mut().find(|r| r.id == id) else {
            return false;
        };
        report.verified = true;
        true
    }

    /// Clones the current log, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<HazardReport> {
        self.lock().iter().cloned().collect()
    }

    /// Number of retained reports.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn count_near(&self, reports: &VecDeque<HazardReport>, point: &GeoPoint) -> usize {
        let eps = self.config.epsilon_deg;
        reports
            .iter()
            .filter(|r| r.point.within_box(point, eps))
            .count()
    }

    fn evict(&self, reports: &mut VecDeque<HazardReport>) {
        let before = reports.len();
        let cutoff = i64::try_from(self.config.max_age_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|age| Utc::now().checked_sub_signed(age));
        if let Some(cutoff) = cutoff {
            reports.retain(|r| r.timestamp >= cutoff);
        }

        while reports.len() > self.config.capacity {
            reports.pop_front();
        }

        let evicted = before - reports.len();
        if evicted > 0 {
            log::debug!("Evicted {evicted} crowd reports");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(lat: f64, lng: f64) -> GeoPoint {
        GeoPoint::new(lat, lng).unwrap()
    }

    #[test]
    fn five_reports_confirm_critical_nearby() {
        let crowd = CrowdConsensus::default();
        for _ in 0..5 {
            crowd.submit(pt(26.1300, 91.7200), "FLOOD");
        }
        let tier = crowd.evaluate(&pt(26.1301, 91.7199)).unwrap();
        assert_eq!(tier.level, RiskLevel::Critical);
        assert_eq!(tier.count, 5);
        assert_eq!(tier.source, "Confirmed by 5 citizens");
    }

    #[test]
    fn tier_thresholds() {
        let crowd = CrowdConsensus::default();
        let p = pt(26.0, 91.0);
        assert!(crowd.evaluate(&p).is_none());

        let tier = crowd.submit(p, "MUD").unwrap();
        assert_eq!(tier.level, RiskLevel::Moderate);
        assert_eq!(tier.source, "Unverified user report");

        crowd.submit(p, "MUD");
        let tier = crowd.submit(p, "MUD").unwrap();
        assert_eq!(tier.level, RiskLevel::High);
        assert_eq!(tier.source, "Reported by 3 citizens");
    }

    #[test]
    fn distant_reports_do_not_count() {
        let crowd = CrowdConsensus::default();
        for _ in 0..5 {
            crowd.submit(pt(26.13, 91.72), "FLOOD");
        }
        assert!(crowd.evaluate(&pt(26.15, 91.72)).is_none());
        assert!(crowd.evaluate(&pt(26.13, 91.75)).is_none());
    }

    #[test]
    fn force_override_reaches_critical() {
        let crowd = CrowdConsensus::default();
        let tier = crowd
            .force_override(pt(26.2, 91.8), RiskLevel::Critical)
            .unwrap();
        assert_eq!(tier.level, RiskLevel::Critical);
        assert_eq!(crowd.len(), OVERRIDE_BATCH);

        let snapshot = crowd.snapshot();
        assert!(snapshot.iter().all(|r| r.verified));
        assert!(snapshot.iter().all(|r| r.source == HazardSource::AdminOverride));
        assert_eq!(snapshot[0].hazard_type, "ADMIN_OVERRIDE_CRITICAL");
    }

    #[test]
    fn capacity_evicts_oldest() {
        let crowd = CrowdConsensus::new(CrowdConfig {
            capacity: 12,
            ..CrowdConfig::default()
        });
        let first = HazardReport::text(pt(10.0, 10.0), "first", HazardSource::Crowd);
        let first_id = first.id.clone();
        crowd.submit_report(first);
        for _ in 0..12 {
            crowd.submit(pt(20.0, 20.0), "later");
        }
        assert_eq!(crowd.len(), 12);
        assert!(crowd.snapshot().iter().all(|r| r.id != first_id));
    }

    #[test]
    fn stale_reports_are_evicted() {
        let crowd = CrowdConsensus::default();
        let mut old = HazardReport::text(pt(10.0, 10.0), "old", HazardSource::Sensor);
        old.timestamp = Utc::now() - Duration::days(2);
        assert!(crowd.submit_report(old).is_none());
        assert!(crowd.is_empty());
    }

    #[test]
    fn mark_verified_flips_flag() {
        let crowd = CrowdConsensus::default();
        crowd.submit(pt(1.0, 1.0), "LANDSLIDE");
        let id = crowd.snapshot()[0].id.clone();
        assert!(crowd.mark_verified(&id));
        assert!(crowd.snapshot()[0].verified);
        assert!(!crowd.mark_verified("missing"));
    }

    #[test]
    fn config_parses_with_defaults() {
        let config: CrowdConfig = toml::from_str("capacity = 50").unwrap();
        assert_eq!(config.capacity, 50);
        assert!((config.epsilon_deg - 0.01).abs() < 1e-12);
        assert_eq!(config.max_age_secs, 86_400);
    }
}
