//! Error types for plan operations.

use offerloop_id::StepId;
use thiserror::Error;

use crate::Status;

/// Errors raised by plans and plan managers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// The step does not belong to this plan.
    #[error("unknown step: {0}")]
    UnknownStep(StepId),

    /// The requested status change is not allowed from the current status.
    #[error("invalid transition for step {step}: {from} -> {to}")]
    InvalidTransition {
        step: StepId,
        from: Status,
        to: Status,
    },

    /// The manager could not compute candidates.
    #[error("candidate selection failed: {0}")]
    Candidates(String),
}
