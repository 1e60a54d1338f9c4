#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Multi-signal risk fusion.
//!
//! Raw channel measurements are normalized onto a common scale
//! ([`normalizer`]), blended with configurable weights, and subjected to a
//! strict override order ([`engine`]). Drill state lives in
//! [`simulation`] and verdicts become operator proposals in
//! [`governance`].

pub mod engine;
pub mod governance;
pub mod normalizer;
pub mod simulation;

use thiserror::Error;

pub use engine::{FusionInputs, Measurements, RiskFusionEngine};
pub use governance::{DecisionConfig, DecisionEngine, DecisionProposal};
pub use normalizer::{ChannelWeights, normalize};
pub use simulation::{ActiveScenario, Scenario, SimulationState};

/// Errors from fusion configuration and the decision queue.
#[derive(Debug, Error)]
pub enum FusionError {
    /// Channel weights are malformed or do not sum to 1.0.
    #[error("Invalid channel weights: {message}")]
    InvalidWeights {
        /// What was wrong.
        message: String,
    },

    /// No pending proposal has the given ID.
    #[error("Proposal {id} not found")]
    ProposalNotFound {
        /// Requested proposal ID.
        id: String,
    },
}
