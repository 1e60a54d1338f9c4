//! Route outcome records.

use chrono::{DateTime, Utc};
use safe_route_geography_models::GeoPoint;
use safe_route_risk_models::RiskLevel;
use safe_route_routing::NodeId;
use serde::Serialize;

/// One computed route, as handed to a [`RecordSink`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRecord {
    /// Record ID.
    pub id: String,
    /// When the route was computed.
    pub timestamp: DateTime<Utc>,
    /// Graph area.
    pub area: String,
    /// Requested origin.
    pub origin: GeoPoint,
    /// Requested destination.
    pub destination: GeoPoint,
    /// Fastest route node sequence.
    pub standard: Vec<NodeId>,
    /// Chosen safe route node sequence.
    pub safe: Vec<NodeId>,
    /// Safe route differs from standard.
    pub rerouted: bool,
    /// Every alternative was blocked.
    pub blocked: bool,
    /// Composite risk level at the origin.
    pub level: RiskLevel,
}

/// Destination for route records.
pub trait RecordSink: Send + Sync {
    /// Persists `record`. Failures are the sink's concern.
    fn record(&self, record: &RouteRecord);
}

/// Writes records to the log as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl RecordSink for LogSink {
    fn record(&self, record: &RouteRecord) {
        match serde_json::to_string(record) {
            Ok(json) => log::info!("Route record: {json}"),
            Err(e) => log::warn!("Failed to serialize route record {}: {e}", record.id),
        }
    }
}
