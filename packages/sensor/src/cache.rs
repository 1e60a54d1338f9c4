//! Last-known-good sensor snapshot cache.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use safe_route_risk_models::SensorReading;
use serde::Serialize;

use crate::SensorError;
use crate::feed::SensorFeed;

/// Readings returned by [`SensorSnapshotCache::refresh`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorSnapshot {
    /// Latest reading per sensor, ordered by ID.
    pub readings: Vec<SensorReading>,
    /// `true` when the poll failed and these are stale readings.
    pub degraded: bool,
}

/// Polls a feed and falls back to the previous snapshot on failure.
pub struct SensorSnapshotCache {
    feed: Arc<dyn SensorFeed>,
    timeout: Duration,
    last: Mutex<BTreeMap<String, SensorReading>>,
}

impl SensorSnapshotCache {
    /// Creates an empty cache over `feed`.
    #[must_use]
    pub fn new(feed: Arc<dyn SensorFeed>, timeout: Duration) -> Self {
        Self {
            feed,
            timeout,
            last: Mutex::new(BTreeMap::new()),
        }
    }

    /// Polls the feed once.
    ///
    /// On success the stored snapshot is replaced wholesale. On error or
    /// timeout the previous snapshot is returned with `degraded = true`.
    pub async fn refresh(&self) -> SensorSnapshot {
        match self.poll().await {
            Ok(readings) => {
                let latest: BTreeMap<String, SensorReading> =
                    readings.into_iter().map(|r| (r.id.clone(), r)).collect();
                let snapshot: Vec<SensorReading> = latest.values().cloned().collect();
                *self.last.lock().unwrap_or_else(PoisonError::into_inner) = latest;
                SensorSnapshot {
                    readings: snapshot,
                    degraded: false,
                }
            }
            Err(e) => {
                log::warn!(
                    "Sensor feed '{}' unavailable, serving last-known-good: {e}",
                    self.feed.name()
                );
                SensorSnapshot {
                    readings: self.cached(),
                    degraded: true,
                }
            }
        }
    }

    fn cached(&self) -> Vec<SensorReading> {
        self.last
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    async fn poll(&self) -> Result<Vec<SensorReading>, SensorError> {
        tokio::time::timeout(self.timeout, self.feed.poll())
            .await
            .map_err(|_| SensorError::Timeout {
                timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            })?
    }
}
