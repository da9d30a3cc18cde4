//! Error types for offer coordination.

use offerloop_id::StepId;
use offerloop_plan::PlanError;
use thiserror::Error;

/// Errors raised by a step scheduler while matching offers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// A step could not be evaluated against the offers.
    #[error("failed to evaluate step {step}: {reason}")]
    Evaluation { step: StepId, reason: String },

    /// The cluster rejected the launch.
    #[error("launch rejected: {0}")]
    Rejected(String),
}

/// Errors surfaced by the coordinator.
///
/// Only `NoPlanManagers` ever reaches a caller; the others are recorded per
/// manager in the pass report.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoordinatorError {
    /// A coordinator needs at least one plan manager.
    #[error("at least one plan manager is required")]
    NoPlanManagers,

    /// The manager failed to produce candidates.
    #[error("plan '{plan}' failed: {source}")]
    Plan {
        plan: String,
        #[source]
        source: PlanError,
    },

    /// The step scheduler failed for this manager's candidates.
    #[error("scheduling for plan '{plan}' failed: {source}")]
    Scheduler {
        plan: String,
        #[source]
        source: SchedulerError,
    },
}
