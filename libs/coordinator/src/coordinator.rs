//! The plan coordinator.
//!
//! One pass over a batch of offers:
//! 1. Snapshot the dirty assets of every non-interrupted plan
//! 2. Walk the managers in priority order, skipping interrupted plans
//! 3. Give each manager the dirty assets that matter to it and the offers
//!    nobody has consumed yet
//! 4. Collect consumed offers and newly dirtied assets before moving on
//!
//! The coordinator keeps no state between passes.

use std::collections::BTreeSet;
use std::sync::Arc;

use offerloop_id::OfferId;
use offerloop_plan::{
    ListenerSet, Plan, PlanEvent, PlanListener, PlanManager, WorkloadRequirement,
};
use tracing::{debug, error, info, instrument};

use crate::{filter_accepted_offers, CoordinatorError, Offer, StepScheduler};

/// What happened to one manager during a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagerOutcome {
    /// The plan was interrupted; the manager was not consulted.
    Skipped,

    /// Candidates were offered to the step scheduler.
    Processed {
        candidates: Vec<String>,
        consumed: BTreeSet<OfferId>,
    },

    /// Candidate selection or scheduling failed. Nothing from this manager
    /// was merged into the pass.
    Failed { error: CoordinatorError },
}

/// Outcome for one manager, in priority order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerReport {
    pub plan: String,
    pub outcome: ManagerOutcome,
}

/// Result of one coordinator pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Every offer consumed during the pass.
    pub dirtied_offers: BTreeSet<OfferId>,

    /// The initial dirty snapshot plus each processed manager's dirty assets.
    pub dirtied_assets: BTreeSet<WorkloadRequirement>,

    pub managers: Vec<ManagerReport>,
}

impl PassReport {
    pub fn processed_count(&self) -> usize {
        self.count(|o| matches!(o, ManagerOutcome::Processed { .. }))
    }

    pub fn skipped_count(&self) -> usize {
        self.count(|o| matches!(o, ManagerOutcome::Skipped))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|o| matches!(o, ManagerOutcome::Failed { .. }))
    }

    /// Outcome for the named plan, if it is managed by the coordinator.
    pub fn outcome(&self, plan: &str) -> Option<&ManagerOutcome> {
        self.managers
            .iter()
            .find(|report| report.plan == plan)
            .map(|report| &report.outcome)
    }

    fn count(&self, pred: impl Fn(&ManagerOutcome) -> bool) -> usize {
        self.managers.iter().filter(|r| pred(&r.outcome)).count()
    }
}

/// Forwards every plan event to the coordinator's own subscribers.
#[derive(Debug, Default)]
struct PlanRelay {
    listeners: ListenerSet,
}

impl PlanListener for PlanRelay {
    fn plan_updated(&self, event: &PlanEvent) {
        self.listeners.notify(event);
    }
}

/// Coordinates offer consumption across plan managers.
///
/// Managers are consulted in the order given at construction; earlier
/// managers get first pick of each batch.
pub struct PlanCoordinator {
    plan_managers: Vec<Box<dyn PlanManager>>,
    scheduler: Arc<dyn StepScheduler>,
    relay: Arc<PlanRelay>,
}

impl PlanCoordinator {
    /// Creates a coordinator and subscribes it to every manager.
    pub fn new(
        mut plan_managers: Vec<Box<dyn PlanManager>>,
        scheduler: Arc<dyn StepScheduler>,
    ) -> Result<Self, CoordinatorError> {
        if plan_managers.is_empty() {
            return Err(CoordinatorError::NoPlanManagers);
        }

        let relay = Arc::new(PlanRelay::default());
        for manager in plan_managers.iter_mut() {
            manager.subscribe(relay.clone());
        }

        Ok(Self {
            plan_managers,
            scheduler,
            relay,
        })
    }

    /// Registers a listener for events from any managed plan.
    pub fn subscribe(&self, listener: Arc<dyn PlanListener>) {
        self.relay.listeners.subscribe(listener);
    }

    /// Runs one pass and returns the IDs of every consumed offer.
    ///
    /// Offers not in the result were not used and may be declined.
    pub fn process_offers(&mut self, offers: &[Offer]) -> BTreeSet<OfferId> {
        self.run_pass(offers).dirtied_offers
    }

    /// Runs one pass and reports what each manager did.
    #[instrument(skip_all, fields(offers = offers.len(), managers = self.plan_managers.len()))]
    pub fn run_pass(&mut self, offers: &[Offer]) -> PassReport {
        let mut dirtied_offers: BTreeSet<OfferId> = BTreeSet::new();

        // Snapshot what every live plan is already working on, so a manager
        // that runs early cannot start work a later manager is in the middle of.
        let mut dirtied_assets: BTreeSet<WorkloadRequirement> = self
            .plan_managers
            .iter()
            .filter(|manager| !manager.plan().is_interrupted())
            .flat_map(|manager| manager.dirty_assets())
            .collect();
        debug!(dirty_assets = ?names(&dirtied_assets), "Initial dirtied assets");

        let mut available = offers.to_vec();
        let mut managers = Vec::with_capacity(self.plan_managers.len());

        for manager in self.plan_managers.iter_mut() {
            let plan = manager.plan().name().to_string();

            if manager.plan().is_interrupted() {
                info!(plan = %plan, "Skipping interrupted plan");
                managers.push(ManagerReport {
                    plan,
                    outcome: ManagerOutcome::Skipped,
                });
                continue;
            }

            let outcome = match process_manager(
                manager.as_mut(),
                self.scheduler.as_ref(),
                &available,
                &dirtied_assets,
            ) {
                Ok((candidates, consumed)) => {
                    dirtied_offers.extend(consumed.iter().copied());
                    debug!(plan = %plan, dirtied_offers = ?dirtied_offers, "Updated dirtied offers");

                    dirtied_assets.extend(manager.dirty_assets());
                    debug!(plan = %plan, dirty_assets = ?names(&dirtied_assets), "Updated dirtied assets");

                    ManagerOutcome::Processed {
                        candidates,
                        consumed,
                    }
                }
                Err(e) => {
                    error!(plan = %plan, error = %e, "Failed to process offers for plan");
                    ManagerOutcome::Failed { error: e }
                }
            };
            managers.push(ManagerReport { plan, outcome });

            // Only unconsumed offers move on to the next manager.
            available = filter_accepted_offers(&available, &dirtied_offers);
        }

        let report = PassReport {
            dirtied_offers,
            dirtied_assets,
            managers,
        };

        info!(
            consumed = report.dirtied_offers.len(),
            remaining = offers.len().saturating_sub(report.dirtied_offers.len()),
            processed = report.processed_count(),
            skipped = report.skipped_count(),
            failed = report.failed_count(),
            "Offer pass complete"
        );

        report
    }

    /// Returns true if any managed plan still has work a pass could advance.
    pub fn has_operations(&self) -> bool {
        let mut has_operations = false;
        for manager in &self.plan_managers {
            let plan = manager.plan();
            debug!(plan = %plan.name(), status = %plan.status(), "Plan status");
            has_operations |= plan.has_operations();
        }
        has_operations
    }

    /// Managers in priority order.
    pub fn plan_managers(&self) -> &[Box<dyn PlanManager>] {
        &self.plan_managers
    }

    /// Mutable access for control paths such as status updates and
    /// interruption. Must not be used while a pass is running.
    pub fn plan_managers_mut(&mut self) -> &mut [Box<dyn PlanManager>] {
        &mut self.plan_managers
    }

    pub fn plan_manager_mut(&mut self, plan: &str) -> Option<&mut (dyn PlanManager + 'static)> {
        self.plan_managers
            .iter_mut()
            .find(|manager| manager.plan().name() == plan)
            .map(|manager| manager.as_mut())
    }
}

impl std::fmt::Debug for PlanCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let plans: Vec<&str> = self
            .plan_managers
            .iter()
            .map(|manager| manager.plan().name())
            .collect();
        f.debug_struct("PlanCoordinator")
            .field("plans", &plans)
            .field("listeners", &self.relay.listeners.len())
            .finish()
    }
}

/// Asks one manager for candidates and schedules them against `offers`.
fn process_manager(
    manager: &mut dyn PlanManager,
    scheduler: &dyn StepScheduler,
    offers: &[Offer],
    dirty_assets: &BTreeSet<WorkloadRequirement>,
) -> Result<(Vec<String>, BTreeSet<OfferId>), CoordinatorError> {
    let plan = manager.plan().name().to_string();
    let relevant = relevant_dirty_assets(manager.plan(), dirty_assets);
    debug!(
        plan = %plan,
        relevant_dirty_assets = ?names(&relevant),
        offers = offers.len(),
        "Processing offers for plan"
    );

    let mut candidates = manager
        .candidates(&relevant)
        .map_err(|source| CoordinatorError::Plan {
            plan: plan.clone(),
            source,
        })?;
    let candidate_names: Vec<String> = candidates
        .iter()
        .map(|step| step.name().to_string())
        .collect();
    debug!(plan = %plan, candidates = ?candidate_names, "Attempting to process candidates");

    let consumed = scheduler
        .resource_offers(offers, &mut candidates)
        .map_err(|source| CoordinatorError::Scheduler {
            plan: plan.clone(),
            source,
        })?;

    Ok((candidate_names, consumed))
}

/// Filters `dirty_assets` down to those that do not collide with the
/// plan's own in-progress work.
fn relevant_dirty_assets(
    plan: &Plan,
    dirty_assets: &BTreeSet<WorkloadRequirement>,
) -> BTreeSet<WorkloadRequirement> {
    dirty_assets
        .iter()
        .filter(|requirement| is_relevant(requirement, plan))
        .cloned()
        .collect()
}

/// True iff no in-progress step of `plan` has a requirement conflicting
/// with `requirement`.
///
/// A plan already tracks its own in-flight work; only conflicts coming from
/// other plans need to be reported to it.
pub fn is_relevant(requirement: &WorkloadRequirement, plan: &Plan) -> bool {
    !plan
        .in_progress_requirements()
        .any(|own| own.conflicts_with(requirement))
}

fn names(assets: &BTreeSet<WorkloadRequirement>) -> Vec<String> {
    assets.iter().map(ToString::to_string).collect()
}
