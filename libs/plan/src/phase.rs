use offerloop_id::PhaseId;

use crate::{Status, Step, Strategy, WorkloadRequirement};

/// An ordered group of steps executed under one strategy.
#[derive(Debug, Clone)]
pub struct Phase {
    id: PhaseId,
    name: String,
    strategy: Strategy,
    steps: Vec<Step>,
}

impl Phase {
    pub fn new(name: impl Into<String>, strategy: Strategy, steps: Vec<Step>) -> Self {
        Self {
            id: PhaseId::new(),
            name: name.into(),
            strategy,
            steps,
        }
    }

    pub fn id(&self) -> PhaseId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn steps_mut(&mut self) -> &mut [Step] {
        &mut self.steps
    }

    pub fn status(&self) -> Status {
        Status::aggregate(self.steps.iter().map(Step::status))
    }

    pub fn is_complete(&self) -> bool {
        self.steps.iter().all(Step::is_complete)
    }

    /// Steps that may be scheduled now.
    ///
    /// Serial phases only ever expose their first incomplete step, and only
    /// when it is eligible; parallel phases expose every eligible step.
    pub fn candidates(&mut self, dirty_assets: &[&WorkloadRequirement]) -> Vec<&mut Step> {
        match self.strategy {
            Strategy::Serial => self
                .steps
                .iter_mut()
                .find(|step| !step.is_complete())
                .filter(|step| step.is_eligible(dirty_assets.iter().copied()))
                .into_iter()
                .collect(),
            Strategy::Parallel => self
                .steps
                .iter_mut()
                .filter(|step| step.is_eligible(dirty_assets.iter().copied()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steps(count: u32) -> Vec<Step> {
        (0..count)
            .map(|i| {
                let req = WorkloadRequirement::new("hello", i).with_tasks(["server"]);
                Step::new(format!("hello-{i}:[server]"), Some(req))
            })
            .collect()
    }

    fn names(candidates: &[&mut Step]) -> Vec<String> {
        candidates.iter().map(|s| s.name().to_string()).collect()
    }

    #[test]
    fn test_serial_exposes_first_incomplete_step() {
        let mut phase = Phase::new("hello-deploy", Strategy::Serial, steps(3));
        assert_eq!(names(&phase.candidates(&[])), vec!["hello-0:[server]"]);

        phase.steps_mut()[0].start();
        phase.steps_mut()[0].complete().unwrap();
        assert_eq!(names(&phase.candidates(&[])), vec!["hello-1:[server]"]);
    }

    #[test]
    fn test_serial_waits_on_in_progress_step() {
        let mut phase = Phase::new("hello-deploy", Strategy::Serial, steps(2));
        phase.steps_mut()[0].start();
        assert!(phase.candidates(&[]).is_empty());
        assert_eq!(phase.status(), Status::InProgress);
    }

    #[test]
    fn test_serial_blocked_by_dirty_asset() {
        let mut phase = Phase::new("hello-deploy", Strategy::Serial, steps(2));
        let dirty = WorkloadRequirement::new("hello", 0);
        assert!(phase.candidates(&[&dirty]).is_empty());
    }

    #[test]
    fn test_parallel_skips_dirty_assets() {
        let mut phase = Phase::new("hello-deploy", Strategy::Parallel, steps(3));
        let dirty = WorkloadRequirement::new("hello", 1);
        assert_eq!(
            names(&phase.candidates(&[&dirty])),
            vec!["hello-0:[server]", "hello-2:[server]"]
        );
    }
}
