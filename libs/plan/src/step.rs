//! Leaf unit of work in a plan.

use offerloop_id::StepId;

use crate::{PlanError, Status, WorkloadRequirement};

/// A single unit of work in a phase.
///
/// A step without a requirement never conflicts with anything and needs no
/// offers to finish.
#[derive(Debug, Clone)]
pub struct Step {
    id: StepId,
    name: String,
    status: Status,
    requirement: Option<WorkloadRequirement>,
    interrupted: bool,
}

impl Step {
    /// Creates a pending step for `requirement`.
    pub fn new(name: impl Into<String>, requirement: Option<WorkloadRequirement>) -> Self {
        Self {
            id: StepId::new(),
            name: name.into(),
            status: Status::Pending,
            requirement,
            interrupted: false,
        }
    }

    /// Creates a step already in `status`, for restoring state.
    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    pub fn id(&self) -> StepId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn requirement(&self) -> Option<&WorkloadRequirement> {
        self.requirement.as_ref()
    }

    /// Reported status. A pending step that has been interrupted reports
    /// `Waiting`.
    pub fn status(&self) -> Status {
        if self.interrupted && self.status.is_pending() {
            Status::Waiting
        } else {
            self.status
        }
    }

    pub fn is_in_progress(&self) -> bool {
        self.status.is_running()
    }

    pub fn is_complete(&self) -> bool {
        self.status.is_complete()
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted
    }

    /// Returns true if this step may be handed to the step scheduler given
    /// the requirements other plans are working on.
    pub fn is_eligible<'a, I>(&self, dirty_assets: I) -> bool
    where
        I: IntoIterator<Item = &'a WorkloadRequirement>,
    {
        if self.interrupted || !self.status.is_pending() {
            return false;
        }
        match &self.requirement {
            Some(requirement) => !requirement.conflicts_with_any(dirty_assets),
            None => true,
        }
    }

    /// Marks the step as being evaluated against offers and returns the
    /// requirement to match.
    pub fn start(&mut self) -> Option<&WorkloadRequirement> {
        if self.status.is_pending() {
            self.status = Status::Prepared;
        }
        self.requirement.as_ref()
    }

    /// Records the result of offer evaluation: launched steps move to
    /// `Starting`, unmatched steps go back to `Pending`.
    pub fn update_offer_status(&mut self, launched: bool) {
        if self.status != Status::Prepared {
            return;
        }
        self.status = if launched {
            Status::Starting
        } else {
            Status::Pending
        };
    }

    /// Tasks reported running.
    pub fn mark_started(&mut self) -> Result<(), PlanError> {
        self.transition(Status::Started, |s| s == Status::Starting)
    }

    pub fn complete(&mut self) -> Result<(), PlanError> {
        self.transition(Status::Complete, |s| {
            matches!(s, Status::Prepared | Status::Starting | Status::Started)
        })
    }

    pub fn fail(&mut self) -> Result<(), PlanError> {
        self.transition(Status::Error, |s| s.is_running())
    }

    /// Puts the step back to `Pending` so it is attempted again.
    pub fn restart(&mut self) {
        self.status = Status::Pending;
    }

    pub fn interrupt(&mut self) {
        self.interrupted = true;
    }

    pub fn proceed(&mut self) {
        self.interrupted = false;
    }

    /// Applies an externally reported status.
    pub fn update_status(&mut self, to: Status) -> Result<(), PlanError> {
        match to {
            Status::Started => self.mark_started(),
            Status::Complete => self.complete(),
            Status::Error => self.fail(),
            Status::Pending => {
                self.restart();
                Ok(())
            }
            _ => Err(self.invalid(to)),
        }
    }

    fn transition(&mut self, to: Status, allowed: impl Fn(Status) -> bool) -> Result<(), PlanError> {
        if !allowed(self.status) {
            return Err(self.invalid(to));
        }
        self.status = to;
        Ok(())
    }

    fn invalid(&self, to: Status) -> PlanError {
        PlanError::InvalidTransition {
            step: self.id,
            from: self.status,
            to,
        }
    }
}
