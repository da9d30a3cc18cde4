//! # offerloop-coordinator
//!
//! Offer coordination across several plans.
//!
//! The [`PlanCoordinator`] walks its plan managers in priority order once per
//! batch of offers. Each manager is handed only the offers that higher
//! priority managers left unconsumed, and is told which workload
//! requirements other plans are already working on so that two plans never
//! advance the same pod instance at once.
//!
//! ## Invariants
//!
//! - The manager list is never empty
//! - An offer consumed in a pass is never shown to a later manager in that pass
//! - A failing manager never stops the pass; later managers still run

mod coordinator;
mod error;
mod offer;
mod scheduler;

pub use coordinator::{is_relevant, ManagerOutcome, ManagerReport, PassReport, PlanCoordinator};
pub use error::{CoordinatorError, SchedulerError};
pub use offer::{filter_accepted_offers, Offer};
pub use scheduler::{FirstFitStepScheduler, StepScheduler};
