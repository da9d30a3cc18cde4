//! Test doubles and fixtures shared by the offerloop test suites.
//!
//! - [`StubPlanManager`]: a plan manager whose dirty assets and failures can
//!   be forced, and which records the dirty sets it was asked about
//! - [`ScriptedStepScheduler`]: consumes offers according to a script and
//!   records the offer pool it was shown on each call
//! - [`RecordingListener`]: collects plan events
//! - Builders for offers, requirements, and plans

use std::collections::{BTreeSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use offerloop_coordinator::{Offer, SchedulerError, StepScheduler};
use offerloop_id::{AgentId, OfferId, StepId};
use offerloop_plan::{
    ListenerSet, Phase, Plan, PlanError, PlanEvent, PlanListener, PlanManager, ResourceSet,
    Status, Step, Strategy, WorkloadRequirement,
};

/// Shared, cloneable log of calls.
#[derive(Debug)]
pub struct CallLog<T>(Arc<Mutex<Vec<T>>>);

impl<T> Default for CallLog<T> {
    fn default() -> Self {
        Self(Arc::new(Mutex::new(Vec::new())))
    }
}

impl<T> Clone for CallLog<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T: Clone> CallLog<T> {
    pub fn push(&self, value: T) {
        self.lock().push(value);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn snapshot(&self) -> Vec<T> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<T>> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// Resources every fixture offer carries.
pub const OFFER_RESOURCES: ResourceSet = ResourceSet::new(4000, 8192, 10240);

/// A requirement for `{pod_type}-{index}` running a `server` task.
pub fn requirement(pod_type: &str, index: u32) -> WorkloadRequirement {
    WorkloadRequirement::new(pod_type, index)
        .with_tasks(["server"])
        .with_resources(ResourceSet::new(500, 256, 0))
}

/// `count` offers on distinct agents.
pub fn offers(count: usize) -> Vec<Offer> {
    (0..count)
        .map(|i| Offer::new(AgentId::new(), format!("agent-{i}"), OFFER_RESOURCES))
        .collect()
}

pub fn offer_ids(offers: &[Offer]) -> Vec<OfferId> {
    offers.iter().map(|offer| offer.id).collect()
}

/// A single-phase parallel plan with one step per requirement.
pub fn plan(name: &str, requirements: Vec<WorkloadRequirement>) -> Plan {
    let steps = requirements
        .into_iter()
        .map(|req| Step::new(req.to_string(), Some(req)))
        .collect();
    Plan::new(
        name,
        Strategy::Serial,
        vec![Phase::new(name, Strategy::Parallel, steps)],
    )
}

/// Like [`plan`], but every step is already launched.
pub fn in_progress_plan(name: &str, requirements: Vec<WorkloadRequirement>) -> Plan {
    let mut plan = plan(name, requirements);
    for step in plan.steps_mut() {
        step.start();
        step.update_offer_status(true);
    }
    plan
}

// =============================================================================
// Plan manager
// =============================================================================

/// Plan manager with controllable behavior.
///
/// Candidate selection follows the plan's strategies, filtered by the dirty
/// assets passed in. Every call to `candidates` is recorded.
pub struct StubPlanManager {
    plan: Plan,
    dirty_assets: Option<BTreeSet<WorkloadRequirement>>,
    failure: Option<PlanError>,
    candidate_calls: CallLog<BTreeSet<WorkloadRequirement>>,
    listeners: ListenerSet,
}

impl StubPlanManager {
    pub fn new(plan: Plan) -> Self {
        Self {
            plan,
            dirty_assets: None,
            failure: None,
            candidate_calls: CallLog::default(),
            listeners: ListenerSet::new(),
        }
    }

    /// Reports `assets` as dirty instead of the in-progress requirements.
    pub fn with_dirty_assets(mut self, assets: impl IntoIterator<Item = WorkloadRequirement>) -> Self {
        self.dirty_assets = Some(assets.into_iter().collect());
        self
    }

    /// Fails every `candidates` call with `error`.
    pub fn failing(mut self, error: PlanError) -> Self {
        self.failure = Some(error);
        self
    }

    /// The relevant dirty sets passed to `candidates`, one per call.
    pub fn candidate_calls(&self) -> CallLog<BTreeSet<WorkloadRequirement>> {
        self.candidate_calls.clone()
    }

    pub fn boxed(self) -> Box<dyn PlanManager> {
        Box::new(self)
    }
}

impl PlanManager for StubPlanManager {
    fn plan(&self) -> &Plan {
        &self.plan
    }

    fn dirty_assets(&self) -> BTreeSet<WorkloadRequirement> {
        match &self.dirty_assets {
            Some(assets) => assets.clone(),
            None => self.plan.in_progress_requirements().cloned().collect(),
        }
    }

    fn candidates(
        &mut self,
        dirty_assets: &BTreeSet<WorkloadRequirement>,
    ) -> Result<Vec<&mut Step>, PlanError> {
        self.candidate_calls.push(dirty_assets.clone());
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        let dirty: Vec<&WorkloadRequirement> = dirty_assets.iter().collect();
        Ok(self.plan.candidates(&dirty))
    }

    fn update_step_status(&mut self, step: StepId, status: Status) -> Result<(), PlanError> {
        self.plan
            .step_mut(step)
            .ok_or(PlanError::UnknownStep(step))?
            .update_status(status)
    }

    fn subscribe(&mut self, listener: Arc<dyn PlanListener>) {
        self.listeners.subscribe(listener);
    }
}

// =============================================================================
// Step scheduler
// =============================================================================

/// One scripted response of [`ScriptedStepScheduler`].
#[derive(Debug, Clone)]
pub enum Script {
    /// Consume the first `n` offers presented.
    ConsumeFirst(usize),
    /// Consume these offers, if they are presented.
    Consume(Vec<OfferId>),
    /// Return an error without consuming anything.
    Fail(SchedulerError),
}

/// Step scheduler that follows a script, one entry per call.
///
/// Calls beyond the end of the script consume nothing. Candidate steps are
/// launched in order, one per consumed offer; the rest go back to pending.
#[derive(Debug, Default)]
pub struct ScriptedStepScheduler {
    script: Mutex<VecDeque<Script>>,
    presented: CallLog<Vec<OfferId>>,
    candidates: CallLog<Vec<String>>,
}

impl ScriptedStepScheduler {
    pub fn new(script: impl IntoIterator<Item = Script>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            ..Self::default()
        }
    }

    /// The offer IDs presented on each call, in call order.
    pub fn presented(&self) -> CallLog<Vec<OfferId>> {
        self.presented.clone()
    }

    /// Candidate step names received on each call, in call order.
    pub fn candidates(&self) -> CallLog<Vec<String>> {
        self.candidates.clone()
    }

    fn next(&self) -> Option<Script> {
        self.script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front()
    }
}

impl StepScheduler for ScriptedStepScheduler {
    fn resource_offers(
        &self,
        offers: &[Offer],
        steps: &mut [&mut Step],
    ) -> Result<BTreeSet<OfferId>, SchedulerError> {
        self.presented.push(offers.iter().map(|offer| offer.id).collect());
        self.candidates
            .push(steps.iter().map(|step| step.name().to_string()).collect());

        let consumed: BTreeSet<OfferId> = match self.next() {
            None => BTreeSet::new(),
            Some(Script::ConsumeFirst(n)) => offers.iter().take(n).map(|offer| offer.id).collect(),
            Some(Script::Consume(ids)) => offers
                .iter()
                .map(|offer| offer.id)
                .filter(|id| ids.contains(id))
                .collect(),
            Some(Script::Fail(error)) => return Err(error),
        };

        for (i, step) in steps.iter_mut().enumerate() {
            step.start();
            step.update_offer_status(i < consumed.len());
        }

        Ok(consumed)
    }
}

// =============================================================================
// Listener
// =============================================================================

/// Collects every plan event it receives.
#[derive(Debug, Default)]
pub struct RecordingListener {
    events: CallLog<PlanEvent>,
}

impl RecordingListener {
    pub fn events(&self) -> Vec<PlanEvent> {
        self.events.snapshot()
    }
}

impl PlanListener for RecordingListener {
    fn plan_updated(&self, event: &PlanEvent) {
        self.events.push(event.clone());
    }
}
