//! Applies classified hazard reports to edge weights.

use std::sync::Arc;

use safe_route_risk_models::{Classification, HazardLabel, HazardReport};
use serde::{Deserialize, Serialize};

use crate::graph::{EdgeId, EdgeWeights, RoadGraph};
use crate::network::RoadNetwork;

/// Multiplier for a `BLOCKED` report. Large enough that any detour is
/// preferred, while keeping the graph connected.
pub const BLOCKED_FACTOR: f64 = 10_000.0;
/// Multiplier for a `CAUTION` report.
pub const CAUTION_FACTOR: f64 = 3.0;
/// Multiplier for a `CLEAR` report.
pub const CLEAR_FACTOR: f64 = 1.0;

/// Weight multiplier for a label.
#[must_use]
pub const fn severity_factor(label: HazardLabel) -> f64 {
    match label {
        HazardLabel::Blocked => BLOCKED_FACTOR,
        HazardLabel::Caution => CAUTION_FACTOR,
        HazardLabel::Clear => CLEAR_FACTOR,
    }
}

/// How multiple reports on one edge combine.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PenaltyPolicy {
    /// Factors multiply without limit.
    #[default]
    Stack,
    /// Factors multiply up to `max_multiplier` (never below 1).
    Cap {
        /// Upper bound on the cumulative multiplier of one edge.
        max_multiplier: f64,
    },
}

impl PenaltyPolicy {
    fn combine(self, current: f64, factor: f64) -> f64 {
        let stacked = current * factor;
        match self {
            Self::Stack => stacked,
            Self::Cap { max_multiplier } => stacked.min(max_multiplier.max(1.0)),
        }
    }
}

/// A report paired with its classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedReport {
    /// The report.
    pub report: HazardReport,
    /// Its classification.
    pub classification: Classification,
}

/// Per-label counts of an injection pass.
///
/// Every report lands in exactly one bucket, so the four counts sum to the
/// number of reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InjectionSummary {
    /// Mapped `BLOCKED` reports.
    pub blocked: usize,
    /// Mapped `CAUTION` reports.
    pub caution: usize,
    /// Mapped `CLEAR` reports.
    pub clear: usize,
    /// Reports with no nearby edge.
    pub unmapped: usize,
}

/// A request-scoped weighting of a shared base graph.
///
/// The base graph is never touched; only the per-edge multipliers are
/// owned here.
#[derive(Debug, Clone)]
pub struct RiskAdjustedGraph {
    base: Arc<RoadGraph>,
    multipliers: Vec<f64>,
    blocked: Vec<bool>,
    summary: InjectionSummary,
}

impl RiskAdjustedGraph {
    /// An unmodified view of `base`.
    #[must_use]
    pub fn identity(base: Arc<RoadGraph>) -> Self {
        let n = base.edges().len();
        Self {
            base,
            multipliers: vec![1.0; n],
            blocked: vec![false; n],
            summary: InjectionSummary::default(),
        }
    }

    /// The shared base graph.
    #[must_use]
    pub const fn base(&self) -> &Arc<RoadGraph> {
        &self.base
    }

    /// Cumulative multiplier of `edge`.
    #[must_use]
    pub fn multiplier(&self, edge: EdgeId) -> f64 {
        self.multipliers.get(edge).copied().unwrap_or(1.0)
    }

    /// Whether a `BLOCKED` report was mapped to `edge`.
    #[must_use]
    pub fn is_blocked(&self, edge: EdgeId) -> bool {
        self.blocked.get(edge).copied().unwrap_or(false)
    }

    /// Counts from the injection pass.
    #[must_use]
    pub const fn summary(&self) -> InjectionSummary {
        self.summary
    }

    fn apply(&mut self, edge: EdgeId, factor: f64, blocked: bool, policy: PenaltyPolicy) {
        if let Some(m) = self.multipliers.get_mut(edge) {
            *m = policy.combine(*m, factor);
        }
        if blocked {
            if let Some(b) = self.blocked.get_mut(edge) {
                *b = true;
            }
        }
    }
}

impl EdgeWeights for RiskAdjustedGraph {
    fn weight(&self, edge: EdgeId) -> f64 {
        self.base.weight(edge) * self.multiplier(edge)
    }
}

/// Builds risk-adjusted graphs from classified reports.
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeWeightInjector {
    policy: PenaltyPolicy,
}

impl EdgeWeightInjector {
    /// Creates an injector with `policy`.
    #[must_use]
    pub const fn new(policy: PenaltyPolicy) -> Self {
        Self { policy }
    }

    /// Active stacking policy.
    #[must_use]
    pub const fn policy(&self) -> PenaltyPolicy {
        self.policy
    }

    /// Snaps each report to its nearest edge and multiplies that edge and
    /// its reverse by the label's severity factor.
    #[must_use]
    pub fn inject(
        &self,
        network: &dyn RoadNetwork,
        reports: &[ClassifiedReport],
    ) -> RiskAdjustedGraph {
        let base = network.graph();
        let mut risk = RiskAdjustedGraph::identity(Arc::clone(base));

        for ClassifiedReport {
            report,
            classification,
        } in reports
        {
            let Some(edge) = network.nearest_edge(&report.point) else {
                log::warn!("Report {} at {} maps to no road", report.id, report.point);
                risk.summary.unmapped += 1;
                continue;
            };

            let label = classification.label;
            let factor = severity_factor(label);
            let blocked = label == HazardLabel::Blocked;
            match label {
                HazardLabel::Blocked => risk.summary.blocked += 1,
                HazardLabel::Caution => risk.summary.caution += 1,
                HazardLabel::Clear => risk.summary.clear += 1,
            }

            let e = base.edges()[edge];
            log::debug!(
                "Report {} ({label}, {:.2}) -> edge {} -> {} x{factor}",
                report.id,
                classification.score,
                e.from,
                e.to
            );

            risk.apply(edge, factor, blocked, self.policy);
            if let Some(reverse) = base.reverse_of(edge) {
                risk.apply(reverse, factor, blocked, self.policy);
            }
        }

        let s = risk.summary;
        log::info!(
            "Injected {} reports: {} blocked, {} caution, {} clear, {} unmapped",
            reports.len(),
            s.blocked,
            s.caution,
            s.clear,
            s.unmapped
        );
        risk
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use safe_route_geography_models::GeoPoint;
    use safe_route_risk_models::HazardSource;

    use super::*;
    use crate::graph::tests::diamond;
    use crate::network::IndexedRoadNetwork;

    pub(crate) fn classified(lat: f64, lng: f64, label: HazardLabel) -> ClassifiedReport {
        ClassifiedReport {
            report: HazardReport::text(
                GeoPoint::new(lat, lng).unwrap(),
                label.to_string(),
                HazardSource::Crowd,
            ),
            classification: Classification {
                score: 0.9,
                label,
                fallback_used: true,
            },
        }
    }

    fn network() -> IndexedRoadNetwork {
        IndexedRoadNetwork::new(Arc::new(diamond()))
    }

    #[test]
    fn blocked_applies_both_directions() {
        let network = network();
        let risk = EdgeWeightInjector::default()
            .inject(&network, &[classified(26.11, 91.71, HazardLabel::Blocked)]);

        let g = network.graph();
        let fwd = g.edge_between(1, 2).unwrap();
        let back = g.edge_between(2, 1).unwrap();
        for e in [fwd, back] {
            assert!(risk.weight(e) >= BLOCKED_FACTOR * g.weight(e));
            assert!(risk.is_blocked(e));
        }
        assert!((risk.weight(fwd) - risk.weight(back)).abs() < 1e-9);
        assert_eq!(risk.summary().blocked, 1);
    }

    #[test]
    fn base_graph_is_untouched() {
        let network = network();
        let g = Arc::clone(network.graph());
        let fwd = g.edge_between(1, 2).unwrap();
        let _risk = EdgeWeightInjector::default()
            .inject(&network, &[classified(26.11, 91.71, HazardLabel::Blocked)]);
        assert!((g.weight(fwd) - 10.0).abs() < 1e-12);
    }

    #[test]
    fn caution_stacks_multiplicatively() {
        let network = network();
        let reports = [
            classified(26.11, 91.71, HazardLabel::Caution),
            classified(26.111, 91.711, HazardLabel::Caution),
        ];
        let risk = EdgeWeightInjector::default().inject(&network, &reports);
        let fwd = network.graph().edge_between(1, 2).unwrap();
        assert!((risk.multiplier(fwd) - 9.0).abs() < 1e-9);
        assert!(!risk.is_blocked(fwd));
    }

    #[test]
    fn cap_limits_stacking() {
        let network = network();
        let reports = [
            classified(26.11, 91.71, HazardLabel::Blocked),
            classified(26.11, 91.71, HazardLabel::Blocked),
        ];
        let injector = EdgeWeightInjector::new(PenaltyPolicy::Cap {
            max_multiplier: 50_000.0,
        });
        let risk = injector.inject(&network, &reports);
        let fwd = network.graph().edge_between(1, 2).unwrap();
        assert!((risk.multiplier(fwd) - 50_000.0).abs() < 1e-9);
    }

    #[test]
    fn cap_never_drops_below_one() {
        let policy = PenaltyPolicy::Cap {
            max_multiplier: 0.5,
        };
        assert!((policy.combine(1.0, CAUTION_FACTOR) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn clear_reports_leave_weights() {
        let network = network();
        let risk = EdgeWeightInjector::default()
            .inject(&network, &[classified(26.11, 91.71, HazardLabel::Clear)]);
        for e in 0..network.graph().edges().len() {
            assert!((risk.multiplier(e) - 1.0).abs() < 1e-12);
        }
        assert_eq!(risk.summary().clear, 1);
    }

    #[test]
    fn unmapped_reports_are_counted() {
        let graph = RoadGraph::new(Vec::new(), Vec::new()).unwrap();
        let network = IndexedRoadNetwork::new(Arc::new(graph));
        let risk = EdgeWeightInjector::default()
            .inject(&network, &[classified(26.11, 91.71, HazardLabel::Blocked)]);
        assert_eq!(
            risk.summary(),
            InjectionSummary {
                unmapped: 1,
                ..InjectionSummary::default()
            }
        );
    }

    #[test]
    fn policy_deserializes() {
        let policy: PenaltyPolicy =
            serde_json::from_str(r#"{"mode":"cap","max_multiplier":1000.0}"#).unwrap();
        assert_eq!(
            policy,
            PenaltyPolicy::Cap {
                max_multiplier: 1000.0
            }
        );
        let policy: PenaltyPolicy = serde_json::from_str(r#"{"mode":"stack"}"#).unwrap();
        assert_eq!(policy, PenaltyPolicy::Stack);
    }
}
