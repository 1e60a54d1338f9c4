//! The service object owning all shared hazard state.

use std::sync::Arc;
use std::time::Duration;

use safe_route_classifier::ClassifierGate;
use safe_route_crowd::{CrowdConsensus, CrowdTier};
use safe_route_fusion::{
    ActiveScenario, DecisionEngine, DecisionProposal, FusionInputs, Measurements, RiskFusionEngine,
    SimulationState,
};
use safe_route_geography_models::GeoPoint;
use safe_route_risk_models::{
    Classification, CompositeRisk, HazardPayload, HazardReport, RiskLevel, TabularFeatures,
};
use safe_route_routing::{
    ClassifiedReport, EdgeWeightInjector, GraphCache, GraphProvider, InjectionSummary,
    JsonFileGraphProvider, RoadGraph, RoadNetwork, Route, RouteComparator,
};
use safe_route_sensor::{
    OpenMeteoFeed, SensorFeed, SensorMonitor, SensorSnapshot, SensorSnapshotCache,
};
use serde::{Deserialize, Serialize};

use crate::ServiceError;
use crate::config::SafeRouteConfig;
use crate::sink::{LogSink, RecordSink, RouteRecord};

/// Location context passed to [`HazardService::evaluate_risk`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RiskContext {
    /// Raw channel measurements.
    pub measurements: Measurements,
    /// Feature vector for the tabular classifier.
    pub features: Option<TabularFeatures>,
    /// Free-text description for the text classifier. Ignored when
    /// `features` is present.
    pub text: Option<String>,
}

/// Whether a route could be planned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RouteStatus {
    /// The area's graph was loaded and both routes were computed.
    Ready,
    /// The area's graph could not be loaded in time. Only the composite
    /// risk is available.
    GraphNotReady,
}

/// Standard and safe routes for one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePlan {
    /// Fastest route on the unmodified graph.
    pub standard: Route,
    /// Chosen safe route.
    pub safe: Route,
    /// `safe` differs from `standard`.
    pub rerouted: bool,
    /// Every alternative was blocked.
    pub blocked: bool,
    /// Great-circle length of `standard` in km.
    pub standard_distance_km: f64,
    /// Great-circle length of `safe` in km.
    pub safe_distance_km: f64,
    /// Injection counts.
    pub summary: InjectionSummary,
}

/// Result of [`HazardService::compute_route`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteDecision {
    /// Whether `plan` is present.
    pub status: RouteStatus,
    /// The routes, when the graph was available.
    #[serde(flatten)]
    pub plan: Option<RoutePlan>,
    /// Composite risk at the origin. `degraded` is set when the graph was
    /// not ready.
    pub composite_risk: CompositeRisk,
}

/// Owns the report log, decision queue, drill state, classifiers, sensor
/// cache, and road graphs, and exposes the fused operations.
pub struct HazardService {
    area: String,
    gate: ClassifierGate,
    crowd: CrowdConsensus,
    sensors: Option<SensorSnapshotCache>,
    engine: RiskFusionEngine,
    simulation: SimulationState,
    decisions: DecisionEngine,
    graphs: GraphCache,
    comparator: RouteComparator,
    sink: Arc<dyn RecordSink>,
}

impl HazardService {
    /// Builds every component from `config`.
    ///
    /// The sensor feed is only created when stations are configured.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] if the channel weights are invalid.
    pub fn from_config(config: &SafeRouteConfig) -> Result<Self, ServiceError> {
        let monitor = SensorMonitor::new(config.sensors.thresholds);
        let engine = RiskFusionEngine::new(config.weights, monitor)?;
        let timeout = Duration::from_millis(config.sensors.feed_timeout_ms);

        let sensors = if config.sensors.stations.is_empty() {
            log::info!("No sensor stations configured");
            None
        } else {
            log::info!(
                "Sensor feed with {} stations at {}",
                config.sensors.stations.len(),
                config.sensors.feed_url
            );
            let feed = OpenMeteoFeed::new(
                config.sensors.feed_url.clone(),
                config.sensors.stations.clone(),
                monitor,
            );
            Some(SensorSnapshotCache::new(Arc::new(feed), timeout))
        };

        let provider = JsonFileGraphProvider::new(config.routing.graph_dir.clone());
        let graph_timeout = Duration::from_millis(config.routing.graph_timeout_ms);

        Ok(Self {
            area: config.routing.default_area.clone(),
            gate: ClassifierGate::from_config(&config.classifier),
            crowd: CrowdConsensus::new(config.crowd.clone()),
            sensors,
            engine,
            simulation: SimulationState::default(),
            decisions: DecisionEngine::new(config.decisions),
            graphs: GraphCache::new(Arc::new(provider), graph_timeout),
            comparator: RouteComparator::new(EdgeWeightInjector::new(config.routing.penalty)),
            sink: Arc::new(LogSink),
        })
    }

    /// Replaces the classifier gate.
    #[must_use]
    pub fn with_classifier(mut self, gate: ClassifierGate) -> Self {
        self.gate = gate;
        self
    }

    /// Replaces the sensor feed, or removes it with `None`.
    #[must_use]
    pub fn with_sensor_feed(mut self, feed: Option<Arc<dyn SensorFeed>>, timeout: Duration) -> Self {
        self.sensors = feed.map(|feed| SensorSnapshotCache::new(feed, timeout));
        self
    }

    /// Replaces the road graph provider and its load timeout. Loaded
    /// graphs are discarded.
    #[must_use]
    pub fn with_graph_provider(
        mut self,
        provider: Arc<dyn GraphProvider>,
        timeout: Duration,
    ) -> Self {
        self.graphs = GraphCache::new(provider, timeout);
        self
    }

    /// Replaces the record sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn RecordSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Area used by [`Self::compute_route`].
    #[must_use]
    pub fn default_area(&self) -> &str {
        &self.area
    }

    /// The shared crowd report log.
    #[must_use]
    pub const fn crowd(&self) -> &CrowdConsensus {
        &self.crowd
    }

    /// The pending decision queue.
    #[must_use]
    pub const fn decisions(&self) -> &DecisionEngine {
        &self.decisions
    }

    /// Polls the sensor feed, or returns an empty healthy snapshot when no
    /// feed is configured.
    pub async fn sensor_snapshot(&self) -> SensorSnapshot {
        match &self.sensors {
            Some(cache) => cache.refresh().await,
            None => SensorSnapshot::default(),
        }
    }

    async fn classify_context(&self, context: &RiskContext) -> Option<Classification> {
        if let Some(features) = &context.features {
            Some(self.gate.classify_features(features).await)
        } else if let Some(text) = &context.text {
            Some(self.gate.classify_text(text).await)
        } else {
            None
        }
    }

    /// Fuses every signal available for `point`.
    pub async fn evaluate_risk(&self, point: &GeoPoint, context: &RiskContext) -> CompositeRisk {
        let classification = self.classify_context(context).await;
        let crowd = self.crowd.evaluate(point);
        let snapshot = self.sensor_snapshot().await;
        let drill = self.simulation.current();

        let inputs = FusionInputs {
            measurements: context.measurements,
            classification,
            crowd: crowd.as_ref(),
            sensors: &snapshot.readings,
            sensors_degraded: snapshot.degraded,
            drill: drill.as_ref(),
        };
        let risk = self.engine.evaluate_at(point, &inputs);
        log::debug!("Risk at {point}: {} ({:.1})", risk.level, risk.score);
        risk
    }

    /// Validates raw coordinates, then fuses every signal.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Validation`] for invalid coordinates.
    pub async fn evaluate(
        &self,
        lat: f64,
        lng: f64,
        context: &RiskContext,
    ) -> Result<CompositeRisk, ServiceError> {
        let point = GeoPoint::new(lat, lng)?;
        Ok(self.evaluate_risk(&point, context).await)
    }

    /// Classifies each report through the gate.
    pub async fn classify_reports(&self, reports: &[HazardReport]) -> Vec<ClassifiedReport> {
        let mut classified = Vec::with_capacity(reports.len());
        for report in reports {
            let classification = match &report.payload {
                HazardPayload::Features(features) => self.gate.classify_features(features).await,
                HazardPayload::Text(_) => {
                    self.gate.classify_text(report.classification_text()).await
                }
            };
            classified.push(ClassifiedReport {
                report: report.clone(),
                classification,
            });
        }
        classified
    }

    /// Routes in the default area.
    ///
    /// # Errors
    ///
    /// See [`Self::compute_route_in`].
    pub async fn compute_route(
        &self,
        origin: &GeoPoint,
        destination: &GeoPoint,
        reports: &[HazardReport],
    ) -> Result<RouteDecision, ServiceError> {
        self.compute_route_in(&self.area, origin, destination, reports, &RiskContext::default())
            .await
    }

    /// Compares the standard and risk-weighted routes in `area` and fuses
    /// the risk at `origin` with `context`.
    ///
    /// A graph that fails to load or times out is not an error: the
    /// decision carries [`RouteStatus::GraphNotReady`], no plan, and a
    /// degraded composite risk.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Routing`] if no standard route exists on a
    /// loaded graph.
    pub async fn compute_route_in(
        &self,
        area: &str,
        origin: &GeoPoint,
        destination: &GeoPoint,
        reports: &[HazardReport],
        context: &RiskContext,
    ) -> Result<RouteDecision, ServiceError> {
        let network = match self.graphs.get(area).await {
            Ok(network) => network,
            Err(e) => {
                log::warn!("Road graph for area '{area}' not ready, returning risk only: {e}");
                let mut composite_risk = self.evaluate_risk(origin, context).await;
                composite_risk.degraded = true;
                return Ok(RouteDecision {
                    status: RouteStatus::GraphNotReady,
                    plan: None,
                    composite_risk,
                });
            }
        };

        let classified = self.classify_reports(reports).await;
        let comparison = self
            .comparator
            .compare(&*network, origin, destination, &classified)?;
        let composite_risk = self.evaluate_risk(origin, context).await;

        let graph: &RoadGraph = network.graph();
        let plan = RoutePlan {
            standard_distance_km: route_distance_km(graph, &comparison.standard),
            safe_distance_km: route_distance_km(graph, &comparison.safe),
            standard: comparison.standard,
            safe: comparison.safe,
            rerouted: comparison.rerouted,
            blocked: comparison.blocked,
            summary: comparison.summary,
        };

        self.sink.record(&RouteRecord {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now(),
            area: area.to_string(),
            origin: *origin,
            destination: *destination,
            standard: plan.standard.nodes.clone(),
            safe: plan.safe.nodes.clone(),
            rerouted: plan.rerouted,
            blocked: plan.blocked,
            level: composite_risk.level,
        });

        Ok(RouteDecision {
            status: RouteStatus::Ready,
            plan: Some(plan),
            composite_risk,
        })
    }

    /// Records a citizen report and returns the zone's tier.
    pub fn submit_report(&self, point: GeoPoint, hazard_type: &str) -> Option<CrowdTier> {
        self.crowd.submit(point, hazard_type)
    }

    /// Forces a zone to `CRITICAL` through synthetic verified reports.
    pub fn force_override(&self, point: GeoPoint, status: RiskLevel) -> Option<CrowdTier> {
        self.crowd.force_override(point, status)
    }

    /// Starts a drill. Unknown keys start a flash flood.
    pub fn start_drill(&self, scenario: &str, target: GeoPoint) -> ActiveScenario {
        self.simulation.start(scenario, target)
    }

    /// Stops the active drill, returning it if one was running.
    pub fn stop_drill(&self) -> Option<ActiveScenario> {
        self.simulation.stop()
    }

    /// The active drill, if any.
    #[must_use]
    pub fn active_drill(&self) -> Option<ActiveScenario> {
        self.simulation.current()
    }

    /// Evaluates `target` and queues a proposal for operator review.
    ///
    /// While a drill runs the proposal is sized by the drill scenario.
    pub async fn propose(&self, target: GeoPoint, context: &RiskContext) -> DecisionProposal {
        let risk = self.evaluate_risk(&target, context).await;
        match self.simulation.current() {
            Some(drill) => self.decisions.propose_drill(&risk, target, &drill),
            None => self.decisions.propose(&risk, target),
        }
    }
}

/// Sum of great-circle lengths of the route's hops.
#[must_use]
pub fn route_distance_km(graph: &RoadGraph, route: &Route) -> f64 {
    route
        .nodes
        .windows(2)
        .filter_map(|hop| {
            let a = graph.node(hop[0])?;
            let b = graph.node(hop[1])?;
            Some(a.point.distance_km(&b.point))
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use safe_route_classifier::{ClassifierError, TextClassifier};
    use safe_route_fusion::Scenario;
    use safe_route_risk_models::{
        DominantSource, HazardLabel, HazardSource, SensorKind, SensorReading, SensorStatus,
    };
    use safe_route_routing::RoutingError;
    use safe_route_sensor::SensorError;

    use super::*;

    const DIAMOND: &str = r#"{
        "nodes": [
            {"id": 1, "point": {"lat": 26.10, "lng": 91.70}},
            {"id": 2, "point": {"lat": 26.12, "lng": 91.72}},
            {"id": 3, "point": {"lat": 26.08, "lng": 91.72}},
            {"id": 4, "point": {"lat": 26.10, "lng": 91.74}}
        ],
        "edges": [
            {"from": 1, "to": 2, "travelTime": 10.0},
            {"from": 2, "to": 1, "travelTime": 10.0},
            {"from": 2, "to": 4, "travelTime": 10.0},
            {"from": 4, "to": 2, "travelTime": 10.0},
            {"from": 1, "to": 3, "travelTime": 15.0},
            {"from": 3, "to": 1, "travelTime": 15.0},
            {"from": 3, "to": 4, "travelTime": 15.0},
            {"from": 4, "to": 3, "travelTime": 15.0}
        ]
    }"#;

    struct StaticGraph;

    #[async_trait]
    impl GraphProvider for StaticGraph {
        async fn load(&self, _area: &str) -> Result<RoadGraph, RoutingError> {
            RoadGraph::from_json(DIAMOND)
        }
    }

    struct MissingGraph;

    #[async_trait]
    impl GraphProvider for MissingGraph {
        async fn load(&self, area: &str) -> Result<RoadGraph, RoutingError> {
            Err(RoutingError::GraphLoad {
                area: area.to_string(),
                message: "not downloaded".to_string(),
            })
        }
    }

    struct HangingGraph;

    #[async_trait]
    impl GraphProvider for HangingGraph {
        async fn load(&self, _area: &str) -> Result<RoadGraph, RoutingError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            RoadGraph::from_json(DIAMOND)
        }
    }

    struct FixedFeed(Vec<SensorReading>);

    #[async_trait]
    impl SensorFeed for FixedFeed {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn poll(&self) -> Result<Vec<SensorReading>, SensorError> {
            Ok(self.0.clone())
        }
    }

    #[derive(Default)]
    struct MemorySink(Mutex<Vec<RouteRecord>>);

    impl RecordSink for MemorySink {
        fn record(&self, record: &RouteRecord) {
            self.0.lock().unwrap().push(record.clone());
        }
    }

    fn pt(lat: f64, lng: f64) -> GeoPoint {
        GeoPoint::new(lat, lng).unwrap()
    }

    fn service() -> HazardService {
        HazardService::from_config(&SafeRouteConfig::default())
            .unwrap()
            .with_classifier(ClassifierGate::fallback_only())
            .with_graph_provider(Arc::new(StaticGraph), Duration::from_secs(5))
    }

    fn river_reading(value: f64) -> SensorReading {
        SensorReading {
            id: "SENS-RL-01".to_string(),
            kind: SensorKind::RiverLevel,
            label: "Brahmaputra Alpha".to_string(),
            point: pt(26.19, 91.745),
            value,
            unit: "cm".to_string(),
            status: SensorStatus::Critical,
        }
    }

    fn wet_context() -> RiskContext {
        RiskContext {
            measurements: Measurements {
                rainfall_mm: Some(45.0),
                slope_deg: Some(32.0),
                soil_moisture_pct: Some(70.0),
                ..Measurements::default()
            },
            ..RiskContext::default()
        }
    }

    #[tokio::test]
    async fn evaluate_risk_is_idempotent() {
        let service = service();
        let point = pt(26.14, 91.73);
        let context = wet_context();
        let first = service.evaluate_risk(&point, &context).await;
        let second = service.evaluate_risk(&point, &context).await;
        assert_eq!(first, second);
        assert_eq!(first.score.to_bits(), second.score.to_bits());
        assert!(!first.degraded);
    }

    #[tokio::test]
    async fn invalid_coordinates_are_rejected() {
        let service = service();
        let err = service
            .evaluate(95.0, 91.7, &RiskContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn sensor_breach_overrides_calm_measurements() {
        let service = service().with_sensor_feed(
            Some(Arc::new(FixedFeed(vec![river_reading(180.0)]))),
            Duration::from_secs(1),
        );
        let risk = service
            .evaluate_risk(&pt(26.14, 91.73), &RiskContext::default())
            .await;
        assert_eq!(risk.level, RiskLevel::Critical);
        assert_eq!(risk.dominant_source, DominantSource::Sensor);
        assert!(risk.reason.contains("Brahmaputra Alpha"));
    }

    #[tokio::test]
    async fn crowd_consensus_reaches_nearby_points() {
        let service = service();
        for _ in 0..5 {
            service.submit_report(pt(26.1300, 91.7200), "FLOOD");
        }
        let risk = service
            .evaluate_risk(&pt(26.1301, 91.7199), &RiskContext::default())
            .await;
        assert_eq!(risk.level, RiskLevel::Critical);
        assert_eq!(risk.dominant_source, DominantSource::Crowd);
    }

    #[tokio::test]
    async fn drill_forces_critical_until_stopped() {
        let service = service();
        let point = pt(26.14, 91.73);
        let drill = service.start_drill("LANDSLIDE", point);
        assert_eq!(drill.scenario, Scenario::Landslide);

        let risk = service.evaluate_risk(&point, &RiskContext::default()).await;
        assert_eq!(risk.level, RiskLevel::Critical);
        assert_eq!(risk.dominant_source, DominantSource::Simulation);

        assert!(service.stop_drill().is_some());
        assert!(service.active_drill().is_none());
        let risk = service.evaluate_risk(&point, &RiskContext::default()).await;
        assert_eq!(risk.level, RiskLevel::Safe);
    }

    #[tokio::test]
    async fn text_context_uses_fallback_classifier() {
        let service = service();
        let context = RiskContext {
            text: Some("bridge collapsed, road blocked".to_string()),
            ..RiskContext::default()
        };
        let risk = service.evaluate_risk(&pt(26.14, 91.73), &context).await;
        assert!(risk.classifier_fallback_used);
    }

    struct ConfidentClear;

    #[async_trait]
    impl TextClassifier for ConfidentClear {
        fn name(&self) -> &str {
            "confident-clear"
        }

        async fn classify(&self, _text: &str) -> Result<Classification, ClassifierError> {
            Ok(Classification {
                score: 0.95,
                label: HazardLabel::Clear,
                fallback_used: false,
            })
        }
    }

    #[tokio::test]
    async fn confident_clear_does_not_raise_risk() {
        let context = RiskContext {
            measurements: Measurements {
                rainfall_mm: Some(100.0),
                slope_deg: Some(40.0),
                soil_moisture_pct: Some(70.0),
                ..Measurements::default()
            },
            text: Some("road is all clear".to_string()),
            ..RiskContext::default()
        };
        let point = pt(26.14, 91.73);

        let fallback = service().evaluate_risk(&point, &context).await;
        let primary = service()
            .with_classifier(ClassifierGate::new(
                None,
                Some(Arc::new(ConfidentClear)),
                Duration::from_secs(1),
            ))
            .evaluate_risk(&point, &context)
            .await;

        assert!(fallback.classifier_fallback_used);
        assert!(!primary.classifier_fallback_used);
        // 0.35 * 80 + 0.25 * 65 + 0.20 * 10 + 0.20 * 55
        assert!((fallback.score - 57.25).abs() < 1e-9);
        assert!(primary.score < fallback.score);
        assert!(primary.level <= fallback.level);
        assert_eq!(primary.level, RiskLevel::Moderate);
    }

    #[tokio::test]
    async fn route_without_reports_is_standard() {
        let sink = Arc::new(MemorySink::default());
        let service = service().with_sink(sink.clone());
        let decision = service
            .compute_route(&pt(26.10, 91.70), &pt(26.10, 91.74), &[])
            .await
            .unwrap();

        assert_eq!(decision.status, RouteStatus::Ready);
        assert!(!decision.composite_risk.degraded);
        let plan = decision.plan.unwrap();
        assert_eq!(plan.standard.nodes, vec![1, 2, 4]);
        assert_eq!(plan.safe, plan.standard);
        assert!(!plan.rerouted);
        assert!(!plan.blocked);
        assert!(plan.standard_distance_km > 0.0);

        let records = sink.0.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].area, "guwahati");
    }

    #[tokio::test]
    async fn blocked_report_reroutes() {
        let service = service();
        let report = HazardReport::text(
            pt(26.11, 91.71),
            "landslide blocked the road",
            HazardSource::Crowd,
        );
        let decision = service
            .compute_route(&pt(26.10, 91.70), &pt(26.10, 91.74), &[report])
            .await
            .unwrap();

        let plan = decision.plan.unwrap();
        assert_eq!(plan.safe.nodes, vec![1, 3, 4]);
        assert!(plan.rerouted);
        assert!(!plan.blocked);
        assert_eq!(plan.summary.blocked, 1);
        assert!(plan.safe_distance_km > plan.standard_distance_km - 1e-9);
    }

    #[test]
    fn route_distance_sums_hops() {
        let graph = RoadGraph::from_json(DIAMOND).unwrap();
        let route = Route {
            nodes: vec![1, 2, 4],
            total_weight: 20.0,
        };
        let a = pt(26.10, 91.70);
        let b = pt(26.12, 91.72);
        let c = pt(26.10, 91.74);
        let expected = a.distance_km(&b) + b.distance_km(&c);
        assert!((route_distance_km(&graph, &route) - expected).abs() < 1e-12);
        assert!(expected > 5.0 && expected < 7.0);
    }

    #[tokio::test]
    async fn missing_graph_degrades_instead_of_failing() {
        let sink = Arc::new(MemorySink::default());
        let service = service()
            .with_graph_provider(Arc::new(MissingGraph), Duration::from_secs(5))
            .with_sink(sink.clone());
        let decision = service
            .compute_route(&pt(26.10, 91.70), &pt(26.10, 91.74), &[])
            .await
            .unwrap();

        assert_eq!(decision.status, RouteStatus::GraphNotReady);
        assert!(decision.plan.is_none());
        assert!(decision.composite_risk.degraded);
        assert!(sink.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn hanging_graph_provider_is_bounded() {
        let service = service()
            .with_graph_provider(Arc::new(HangingGraph), Duration::from_millis(50));
        let point = pt(26.10, 91.70);
        service.force_override(point, RiskLevel::Critical);

        let destination = pt(26.10, 91.74);
        let context = wet_context();
        let decision = tokio::time::timeout(
            Duration::from_secs(5),
            service.compute_route_in("guwahati", &point, &destination, &[], &context),
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(decision.status, RouteStatus::GraphNotReady);
        assert!(decision.composite_risk.degraded);
        assert_eq!(decision.composite_risk.level, RiskLevel::Critical);
        assert_eq!(decision.composite_risk.dominant_source, DominantSource::Crowd);
    }

    #[tokio::test]
    async fn not_ready_decision_serializes_without_routes() {
        let service = service().with_graph_provider(Arc::new(MissingGraph), Duration::from_secs(5));
        let decision = service
            .compute_route(&pt(26.10, 91.70), &pt(26.10, 91.74), &[])
            .await
            .unwrap();
        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json["status"], "GRAPH_NOT_READY");
        assert!(json.get("standard").is_none());
        assert_eq!(json["compositeRisk"]["degraded"], true);

        let ready = self::service()
            .compute_route(&pt(26.10, 91.70), &pt(26.10, 91.74), &[])
            .await
            .unwrap();
        let json = serde_json::to_value(&ready).unwrap();
        assert_eq!(json["status"], "READY");
        assert_eq!(json["standard"]["nodes"], serde_json::json!([1, 2, 4]));
    }

    #[tokio::test]
    async fn proposals_follow_the_fused_level() {
        let service = service();
        let point = pt(26.14, 91.73);
        service.force_override(point, RiskLevel::Critical);

        let proposal = service.propose(point, &RiskContext::default()).await;
        assert_eq!(service.decisions().pending().len(), 1);
        let approved = service.decisions().approve(&proposal.id).unwrap();
        assert_eq!(approved.id, proposal.id);
        assert!(service.decisions().pending().is_empty());
        assert!((proposal.radius_km - 5.0).abs() < 1e-12);
    }

    #[tokio::test]
    async fn drill_proposals_cover_the_scenario_zone() {
        let service = service();
        let point = pt(26.14, 91.73);
        service.start_drill("FLASH_FLOOD", point);

        let proposal = service.propose(point, &RiskContext::default()).await;
        assert!((proposal.radius_km - Scenario::FlashFlood.impact_radius_km()).abs() < 1e-12);
        assert!((proposal.confidence - Scenario::FlashFlood.score()).abs() < 1e-12);
        assert_eq!(proposal.source, "Simulation");
    }
}
