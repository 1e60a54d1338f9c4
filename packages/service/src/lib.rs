#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Hazard service orchestration.
//!
//! [`HazardService`] owns the crowd report log, the decision queue, drill
//! state, the classifier gate, the sensor snapshot cache, and the road
//! graph cache. It exposes [`HazardService::evaluate_risk`] and
//! [`HazardService::compute_route`] on top of them.

pub mod config;
pub mod service;
pub mod sink;

use safe_route_fusion::FusionError;
use safe_route_geography_models::ValidationError;
use safe_route_routing::RoutingError;
use thiserror::Error;

pub use config::{ConfigError, RoutingConfig, SafeRouteConfig};
pub use service::{
    HazardService, RiskContext, RouteDecision, RoutePlan, RouteStatus, route_distance_km,
};
pub use sink::{LogSink, RecordSink, RouteRecord};

/// Errors surfaced by [`HazardService`].
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Coordinates failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Fusion setup or decision queue error.
    #[error(transparent)]
    Fusion(#[from] FusionError),

    /// No route could be computed on a loaded graph.
    #[error(transparent)]
    Routing(#[from] RoutingError),
}
