use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use offerloop_id::{PlanId, StepId};
use serde::{Deserialize, Serialize};

use crate::{Phase, Status, Step, WorkloadRequirement};

/// Ordering policy for a plan's phases or a phase's steps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// One child at a time, in order.
    #[default]
    Serial,
    /// All children at once.
    Parallel,
}

/// Shared interruption flag for a plan.
///
/// Cloning the handle shares the flag, so an operator path can pause or
/// resume a plan while its manager is owned elsewhere. The coordinator reads
/// the flag fresh at the start of each manager's turn.
#[derive(Debug, Clone, Default)]
pub struct InterruptHandle(Arc<AtomicBool>);

impl InterruptHandle {
    pub fn interrupt(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn proceed(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_interrupted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// An ordered list of phases representing one workload's rollout.
#[derive(Debug, Clone)]
pub struct Plan {
    id: PlanId,
    name: String,
    strategy: Strategy,
    phases: Vec<Phase>,
    interrupt: InterruptHandle,
}

impl Plan {
    pub fn new(name: impl Into<String>, strategy: Strategy, phases: Vec<Phase>) -> Self {
        Self {
            id: PlanId::new(),
            name: name.into(),
            strategy,
            phases,
            interrupt: InterruptHandle::default(),
        }
    }

    pub fn id(&self) -> PlanId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    /// All steps across all phases, in order.
    pub fn steps(&self) -> impl Iterator<Item = &Step> {
        self.phases.iter().flat_map(|phase| phase.steps().iter())
    }

    pub fn steps_mut(&mut self) -> impl Iterator<Item = &mut Step> {
        self.phases
            .iter_mut()
            .flat_map(|phase| phase.steps_mut().iter_mut())
    }

    pub fn step(&self, id: StepId) -> Option<&Step> {
        self.steps().find(|step| step.id() == id)
    }

    pub fn step_mut(&mut self, id: StepId) -> Option<&mut Step> {
        self.steps_mut().find(|step| step.id() == id)
    }

    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupt.is_interrupted()
    }

    pub fn interrupt(&self) {
        self.interrupt.interrupt();
    }

    pub fn proceed(&self) {
        self.interrupt.proceed();
    }

    pub fn is_complete(&self) -> bool {
        self.phases.iter().all(Phase::is_complete)
    }

    pub fn status(&self) -> Status {
        if self.is_interrupted() && !self.is_complete() {
            return Status::Waiting;
        }
        Status::aggregate(self.phases.iter().map(Phase::status))
    }

    /// Returns true while the plan has work left that a scheduling pass
    /// could advance.
    pub fn has_operations(&self) -> bool {
        !self.is_complete() && !self.is_interrupted()
    }

    /// Requirements of the steps currently in progress.
    pub fn in_progress_requirements(&self) -> impl Iterator<Item = &WorkloadRequirement> {
        self.steps()
            .filter(|step| step.is_in_progress())
            .filter_map(Step::requirement)
    }

    /// Steps that may be scheduled now, per the plan and phase strategies.
    ///
    /// An interrupted plan has no candidates.
    pub fn candidates(&mut self, dirty_assets: &[&WorkloadRequirement]) -> Vec<&mut Step> {
        if self.is_interrupted() {
            return Vec::new();
        }
        match self.strategy {
            Strategy::Serial => self
                .phases
                .iter_mut()
                .find(|phase| !phase.is_complete())
                .map(|phase| phase.candidates(dirty_assets))
                .unwrap_or_default(),
            Strategy::Parallel => self
                .phases
                .iter_mut()
                .flat_map(|phase| phase.candidates(dirty_assets))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phase(name: &str, pod: &str, count: u32) -> Phase {
        let steps = (0..count)
            .map(|i| {
                let req = WorkloadRequirement::new(pod, i).with_tasks(["server"]);
                Step::new(format!("{pod}-{i}:[server]"), Some(req))
            })
            .collect();
        Phase::new(name, Strategy::Serial, steps)
    }

    fn plan(strategy: Strategy) -> Plan {
        Plan::new(
            "deploy",
            strategy,
            vec![phase("hello", "hello", 2), phase("world", "world", 2)],
        )
    }

    fn complete_all(plan: &mut Plan) {
        for step in plan.steps_mut() {
            step.start();
            step.complete().unwrap();
        }
    }

    #[test]
    fn test_serial_plan_only_exposes_first_phase() {
        let mut plan = plan(Strategy::Serial);
        let names: Vec<_> = plan
            .candidates(&[])
            .iter()
            .map(|s| s.name().to_string())
            .collect();
        assert_eq!(names, vec!["hello-0:[server]"]);
    }

    #[test]
    fn test_parallel_plan_exposes_every_phase() {
        let mut plan = plan(Strategy::Parallel);
        let names: Vec<_> = plan
            .candidates(&[])
            .iter()
            .map(|s| s.name().to_string())
            .collect();
        assert_eq!(names, vec!["hello-0:[server]", "world-0:[server]"]);
    }

    #[test]
    fn test_interrupt_handle_is_shared() {
        let mut plan = plan(Strategy::Serial);
        let handle = plan.interrupt_handle();

        handle.interrupt();
        assert!(plan.is_interrupted());
        assert_eq!(plan.status(), Status::Waiting);
        assert!(plan.candidates(&[]).is_empty());
        assert!(!plan.has_operations());

        handle.proceed();
        assert!(!plan.is_interrupted());
        assert!(plan.has_operations());
    }

    #[test]
    fn test_in_progress_requirements() {
        let mut plan = plan(Strategy::Parallel);
        let first = plan.steps().next().unwrap().id();
        plan.step_mut(first).unwrap().start();

        let in_progress: Vec<_> = plan.in_progress_requirements().cloned().collect();
        assert_eq!(in_progress, vec![WorkloadRequirement::new("hello", 0).with_tasks(["server"])]);
    }

    #[test]
    fn test_complete_plan_has_no_operations() {
        let mut plan = plan(Strategy::Serial);
        complete_all(&mut plan);
        assert!(plan.is_complete());
        assert_eq!(plan.status(), Status::Complete);
        assert!(!plan.has_operations());

        plan.interrupt();
        assert_eq!(plan.status(), Status::Complete);
    }
}
