//! # offerloop-plan
//!
//! The plan model driven by the offer coordinator.
//!
//! A [`Plan`] is an ordered list of [`Phase`]s, each an ordered list of
//! [`Step`]s. A step may carry a [`WorkloadRequirement`] naming the pod
//! instance it wants to place or update. Each plan is owned by exactly one
//! [`PlanManager`], which decides which steps are candidates for the current
//! scheduling pass and reports the requirements it is actively working on
//! (its "dirty assets").
//!
//! ## Ownership
//!
//! Plans are owned by their manager. Everything outside the manager reads
//! plan state through `&Plan`; the only shared piece is the interruption flag,
//! exposed as an [`InterruptHandle`] so an operator path can pause a plan
//! without holding the manager.

mod error;
mod listener;
mod manager;
mod phase;
mod plan;
mod requirement;
mod resources;
mod status;
mod step;

pub use error::PlanError;
pub use listener::{ListenerSet, PlanEvent, PlanEventKind, PlanListener};
pub use manager::{DefaultPlanManager, PlanManager};
pub use phase::Phase;
pub use plan::{InterruptHandle, Plan, Strategy};
pub use requirement::{RecoveryType, WorkloadRequirement};
pub use resources::ResourceSet;
pub use status::Status;
pub use step::Step;
