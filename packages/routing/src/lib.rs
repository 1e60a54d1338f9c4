#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Road graph routing with risk-weighted edges.
//!
//! A shared [`RoadGraph`] is loaded once per area through [`GraphCache`].
//! Each route request builds its own [`RiskAdjustedGraph`] from classified
//! hazard reports, and [`RouteComparator`] contrasts the fastest route with
//! the safest one.

pub mod cache;
pub mod comparator;
pub mod error;
pub mod graph;
pub mod injector;
pub mod network;

pub use cache::{GraphCache, GraphProvider, JsonFileGraphProvider};
pub use comparator::{RouteComparator, RouteComparison};
pub use error::RoutingError;
pub use graph::{Edge, EdgeId, EdgeWeights, Node, NodeId, RoadGraph, Route};
pub use injector::{
    ClassifiedReport, EdgeWeightInjector, InjectionSummary, PenaltyPolicy, RiskAdjustedGraph,
    severity_factor,
};
pub use network::{IndexedRoadNetwork, RoadNetwork};
