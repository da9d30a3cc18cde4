//! Plan managers: the owners of plans.

use std::collections::BTreeSet;
use std::sync::Arc;

use offerloop_id::StepId;
use tracing::debug;

use crate::{
    ListenerSet, Plan, PlanError, PlanEvent, PlanEventKind, PlanListener, Status, Step,
    WorkloadRequirement,
};

/// Owns one plan and decides which of its steps are schedulable.
pub trait PlanManager: Send {
    fn plan(&self) -> &Plan;

    /// Requirements this manager is actively working on.
    fn dirty_assets(&self) -> BTreeSet<WorkloadRequirement>;

    /// Steps to hand to the step scheduler this pass.
    ///
    /// `dirty_assets` holds requirements other plans are working on; a
    /// manager should not expose steps that conflict with them.
    fn candidates(
        &mut self,
        dirty_assets: &BTreeSet<WorkloadRequirement>,
    ) -> Result<Vec<&mut Step>, PlanError>;

    /// Applies a status reported for one of this plan's steps.
    fn update_step_status(&mut self, step: StepId, status: Status) -> Result<(), PlanError>;

    fn subscribe(&mut self, listener: Arc<dyn PlanListener>);

    fn interrupt(&mut self) {
        self.plan().interrupt();
    }

    fn proceed(&mut self) {
        self.plan().proceed();
    }
}

/// Plan manager that treats in-progress steps as dirty and defers to the
/// plan's strategies for candidate selection.
#[derive(Debug)]
pub struct DefaultPlanManager {
    plan: Plan,
    listeners: ListenerSet,
}

impl DefaultPlanManager {
    pub fn new(plan: Plan) -> Self {
        Self {
            plan,
            listeners: ListenerSet::new(),
        }
    }

    fn notify(&self, kind: PlanEventKind) {
        self.listeners.notify(&PlanEvent {
            plan: self.plan.name().to_string(),
            kind,
        });
    }
}

impl PlanManager for DefaultPlanManager {
    fn plan(&self) -> &Plan {
        &self.plan
    }

    fn dirty_assets(&self) -> BTreeSet<WorkloadRequirement> {
        if self.plan.is_interrupted() {
            return BTreeSet::new();
        }
        self.plan.in_progress_requirements().cloned().collect()
    }

    fn candidates(
        &mut self,
        dirty_assets: &BTreeSet<WorkloadRequirement>,
    ) -> Result<Vec<&mut Step>, PlanError> {
        let name = self.plan.name().to_string();
        let dirty: Vec<&WorkloadRequirement> = dirty_assets.iter().collect();
        let candidates = self.plan.candidates(&dirty);
        debug!(
            plan = %name,
            dirty_assets = dirty.len(),
            candidates = candidates.len(),
            "Selected candidate steps"
        );
        Ok(candidates)
    }

    fn update_step_status(&mut self, step_id: StepId, status: Status) -> Result<(), PlanError> {
        let step = self
            .plan
            .step_mut(step_id)
            .ok_or(PlanError::UnknownStep(step_id))?;

        let from = step.status();
        step.update_status(status)?;
        let to = step.status();
        let step_name = step.name().to_string();

        if from != to {
            self.notify(PlanEventKind::StepStatusChanged {
                step: step_id,
                step_name,
                from,
                to,
            });
        }
        Ok(())
    }

    fn subscribe(&mut self, listener: Arc<dyn PlanListener>) {
        self.listeners.subscribe(listener);
    }

    fn interrupt(&mut self) {
        self.plan.interrupt();
        self.notify(PlanEventKind::Interrupted);
    }

    fn proceed(&mut self) {
        self.plan.proceed();
        self.notify(PlanEventKind::Proceeded);
    }
}
