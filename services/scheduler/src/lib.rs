//! offerloop scheduler service
//!
//! Loads a service manifest, builds one plan manager per plan, and runs
//! coordinator passes against an offer source until shut down.
//!
//! ## Modules
//!
//! - `config`: environment configuration
//! - `manifest`: TOML service manifest to plans
//! - `cluster`: offer sources, including the in-process `LocalCluster`
//! - `worker`: the periodic pass loop

pub mod cluster;
pub mod config;
pub mod manifest;
pub mod worker;

use std::sync::Arc;

use anyhow::Result;
use offerloop_coordinator::{FirstFitStepScheduler, PlanCoordinator};
use offerloop_plan::{DefaultPlanManager, Plan, PlanManager};

use crate::worker::PlanEventLogger;

/// Builds a coordinator over `plans`, in priority order, with plan events
/// logged.
pub fn build_coordinator(plans: Vec<Plan>) -> Result<PlanCoordinator> {
    let managers: Vec<Box<dyn PlanManager>> = plans
        .into_iter()
        .map(|plan| Box::new(DefaultPlanManager::new(plan)) as Box<dyn PlanManager>)
        .collect();

    let coordinator = PlanCoordinator::new(managers, Arc::new(FirstFitStepScheduler))?;
    coordinator.subscribe(Arc::new(PlanEventLogger));
    Ok(coordinator)
}
