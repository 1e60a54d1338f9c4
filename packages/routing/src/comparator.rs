//! Standard versus risk-weighted route comparison.

use safe_route_geography_models::GeoPoint;
use serde::{Deserialize, Serialize};

use crate::RoutingError;
use crate::graph::{RoadGraph, Route};
use crate::injector::{ClassifiedReport, EdgeWeightInjector, InjectionSummary};
use crate::network::RoadNetwork;

/// Outcome of a route comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteComparison {
    /// Fastest route on the unmodified graph.
    pub standard: Route,
    /// Fastest route on the risk-adjusted graph, or `standard` when every
    /// alternative is blocked.
    pub safe: Route,
    /// `safe` differs from `standard`.
    pub rerouted: bool,
    /// No unblocked alternative exists.
    pub blocked: bool,
    /// Injection counts.
    pub summary: InjectionSummary,
}

/// Computes standard and safe routes between two points.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteComparator {
    injector: EdgeWeightInjector,
}

impl RouteComparator {
    /// Creates a comparator using `injector`.
    #[must_use]
    pub const fn new(injector: EdgeWeightInjector) -> Self {
        Self { injector }
    }

    /// Routes from `origin` to `destination` with and without `reports`.
    ///
    /// Both points snap to their nearest nodes. If the cheapest risk-graph
    /// route still crosses a blocked edge, or no risk-graph route exists,
    /// the standard route is returned as `safe` with `blocked = true`.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::EmptyGraph`] if the graph has no nodes and
    /// [`RoutingError::NoPath`] if no standard route exists.
    pub fn compare(
        &self,
        network: &dyn RoadNetwork,
        origin: &GeoPoint,
        destination: &GeoPoint,
        reports: &[ClassifiedReport],
    ) -> Result<RouteComparison, RoutingError> {
        let src = network.nearest_node(origin).ok_or(RoutingError::EmptyGraph)?;
        let dst = network
            .nearest_node(destination)
            .ok_or(RoutingError::EmptyGraph)?;
        log::info!("Routing node {src} -> node {dst} with {} reports", reports.len());

        let base: &RoadGraph = network.graph();
        let standard = network.shortest_path(base, src, dst)?;

        let risk = self.injector.inject(network, reports);
        let summary = risk.summary();

        let safe = match network.shortest_path(&risk, src, dst) {
            Ok(route) if !base.route_edges(&route).any(|e| risk.is_blocked(e)) => Some(route),
            Ok(_) | Err(RoutingError::NoPath { .. }) => None,
            Err(e) => return Err(e),
        };

        let comparison = match safe {
            Some(safe) => {
                let rerouted = safe.nodes != standard.nodes;
                if rerouted {
                    log::info!(
                        "Rerouted: {} -> {} waypoints",
                        standard.nodes.len(),
                        safe.nodes.len()
                    );
                }
                RouteComparison {
                    standard,
                    safe,
                    rerouted,
                    blocked: false,
                    summary,
                }
            }
            None => {
                log::warn!("Every route from {src} to {dst} is blocked, keeping standard route");
                RouteComparison {
                    safe: standard.clone(),
                    standard,
                    rerouted: false,
                    blocked: true,
                    summary,
                }
            }
        };

        Ok(comparison)
    }
}
