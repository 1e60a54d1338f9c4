//! Converts composite risk verdicts into action proposals awaiting
//! operator approval.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use safe_route_geography_models::GeoPoint;
use safe_route_risk_models::{CompositeRisk, RiskLevel};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::FusionError;
use crate::simulation::ActiveScenario;

/// Recommended operator action.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendedAction {
    /// Keep watching.
    MonitorOnly,
    /// Publish an advisory to citizens in the zone.
    IssueCitizenAdvisory,
    /// Send a field team to confirm.
    DeployScout,
    /// Order evacuation of the zone.
    MassEvacuationAlert,
}

/// How quickly a proposal should be acted on.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Urgency {
    /// Routine.
    Low,
    /// Within hours.
    Medium,
    /// Within the hour.
    High,
    /// Now.
    Immediate,
}

/// Lifecycle state of a proposal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ProposalStatus {
    /// Waiting for an operator.
    PendingApproval,
    /// Approved by an operator.
    Approved,
    /// Rejected by an operator.
    Rejected,
}

/// A proposed response to a risk verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionProposal {
    /// Proposal ID (`CMD-XXXXXXXX`).
    pub id: String,
    /// When the proposal was created.
    pub timestamp: DateTime<Utc>,
    /// Recommended action.
    pub action: RecommendedAction,
    /// Urgency.
    pub urgency: Urgency,
    /// Centre of the affected zone.
    pub target: GeoPoint,
    /// Radius of the affected zone.
    pub radius_km: f64,
    /// Reason carried over from the verdict.
    pub reason: String,
    /// Composite score of the verdict.
    pub confidence: f64,
    /// Signal that decided the verdict.
    pub source: String,
    /// Current status.
    pub status: ProposalStatus,
}

const fn default_capacity() -> usize {
    100
}

const fn default_radius_km() -> f64 {
    5.0
}

/// Decision section of the service configuration.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    /// Maximum pending proposals; the oldest is dropped past this.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Zone radius attached to every proposal.
    #[serde(default = "default_radius_km")]
    pub radius_km: f64,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            radius_km: default_radius_km(),
        }
    }
}

/// Action and urgency for a level.
#[must_use]
pub const fn action_for(level: RiskLevel) -> (RecommendedAction, Urgency) {
    match level {
        RiskLevel::Critical => (RecommendedAction::MassEvacuationAlert, Urgency::Immediate),
        RiskLevel::High => (RecommendedAction::DeployScout, Urgency::High),
        RiskLevel::Moderate => (RecommendedAction::IssueCitizenAdvisory, Urgency::Medium),
        RiskLevel::Safe => (RecommendedAction::MonitorOnly, Urgency::Low),
    }
}

/// Creates proposals and holds them until approved or rejected.
#[derive(Debug, Default)]
pub struct DecisionEngine {
    config: DecisionConfig,
    pending: Mutex<VecDeque<DecisionProposal>>,
}

impl DecisionEngine {
    /// Creates an engine with an empty queue.
    #[must_use]
    pub fn new(config: DecisionConfig) -> Self {
        Self {
            config,
            pending: Mutex::new(VecDeque::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<DecisionProposal>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Builds a proposal for `risk` at `target` and queues it.
    pub fn propose(&self, risk: &CompositeRisk, target: GeoPoint) -> DecisionProposal {
        self.enqueue(risk, target, self.config.radius_km, risk.score)
    }

    /// Builds a proposal for a verdict forced by `drill` and queues it.
    ///
    /// The zone takes the scenario's impact radius and the confidence its
    /// nominal score.
    pub fn propose_drill(
        &self,
        risk: &CompositeRisk,
        target: GeoPoint,
        drill: &ActiveScenario,
    ) -> DecisionProposal {
        self.enqueue(
            risk,
            target,
            drill.scenario.impact_radius_km(),
            drill.scenario.score(),
        )
    }

    fn enqueue(
        &self,
        risk: &CompositeRisk,
        target: GeoPoint,
        radius_km: f64,
        confidence: f64,
    ) -> DecisionProposal {
        let (action, urgency) = action_for(risk.level);
        let short: String = uuid::Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(8)
            .collect();

        let proposal = DecisionProposal {
            id: format!("CMD-{}", short.to_uppercase()),
            timestamp: Utc::now(),
            action,
            urgency,
            target,
            radius_km,
            reason: risk.reason.clone(),
            confidence,
            source: risk.dominant_source.to_string(),
            status: ProposalStatus::PendingApproval,
        };
        log::info!("Proposal {} ({action}, {urgency}) at {target}", proposal.id);

        let mut pending = self.lock();
        pending.push_back(proposal.clone());
        while pending.len() > self.config.capacity {
            if let Some(dropped) = pending.pop_front() {
                log::warn!("Pending queue full, dropping proposal {}", dropped.id);
            }
        }
        drop(pending);

        proposal
    }

    /// Proposals awaiting a decision, oldest first.
    #[must_use]
    pub fn pending(&self) -> Vec<DecisionProposal> {
        self.lock().iter().cloned().collect()
    }

    /// Approves and dequeues a proposal.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::ProposalNotFound`] if `id` is not pending.
    pub fn approve(&self, id: &str) -> Result<DecisionProposal, FusionError> {
        self.resolve(id, ProposalStatus::Approved)
    }

    /// Rejects and dequeues a proposal.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::ProposalNotFound`] if `id` is not pending.
    pub fn reject(&self, id: &str) -> Result<DecisionProposal, FusionError> {
        self.resolve(id, ProposalStatus::Rejected)
    }

    fn resolve(&self, id: &str, status: ProposalStatus) -> Result<DecisionProposal, FusionError> {
        let mut pending = self.lock();
        let index = pending
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| FusionError::ProposalNotFound { id: id.to_string() })?;
        let mut proposal = pending
            .remove(index)
            .ok_or_else(|| FusionError::ProposalNotFound { id: id.to_string() })?;
        drop(pending);

        proposal.status = status;
        log::info!("Proposal {id} {status}");
        Ok(proposal)
    }
}
