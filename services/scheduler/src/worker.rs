//! Scheduler background worker.
//!
//! Runs coordinator passes on a periodic interval against an offer source.

use std::collections::BTreeSet;
use std::time::Duration;

use anyhow::Result;
use offerloop_coordinator::{PassReport, PlanCoordinator};
use offerloop_id::{OfferId, StepId};
use offerloop_plan::{PlanEvent, PlanEventKind, PlanListener, Status};
use tokio::sync::watch;
use tracing::{error, info, instrument, warn};

use crate::cluster::OfferSource;

/// Counters from one worker tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickStats {
    pub offered: usize,
    pub accepted: usize,
    pub declined: usize,
    pub failed_plans: usize,
    pub steps_reverted: usize,
    pub steps_advanced: usize,
}

/// Logs every plan event the coordinator relays.
#[derive(Debug, Default)]
pub struct PlanEventLogger;

impl PlanListener for PlanEventLogger {
    fn plan_updated(&self, event: &PlanEvent) {
        match &event.kind {
            PlanEventKind::StepStatusChanged {
                step_name, from, to, ..
            } => {
                info!(
                    plan = %event.plan,
                    step = %step_name,
                    from = %from,
                    to = %to,
                    "Step status changed"
                );
            }
            PlanEventKind::Interrupted => info!(plan = %event.plan, "Plan interrupted"),
            PlanEventKind::Proceeded => info!(plan = %event.plan, "Plan proceeding"),
        }
    }
}

/// Scheduler worker that drives coordinator passes.
pub struct SchedulerWorker {
    coordinator: PlanCoordinator,
    source: Box<dyn OfferSource>,
    interval: Duration,
    exit_when_idle: bool,
}

impl SchedulerWorker {
    pub fn new(
        coordinator: PlanCoordinator,
        source: Box<dyn OfferSource>,
        interval: Duration,
    ) -> Self {
        Self {
            coordinator,
            source,
            interval,
            exit_when_idle: false,
        }
    }

    /// Return from [`run`](Self::run) once no plan has work left.
    pub fn exit_when_idle(mut self, exit: bool) -> Self {
        self.exit_when_idle = exit;
        self
    }

    pub fn coordinator(&self) -> &PlanCoordinator {
        &self.coordinator
    }

    /// Run the worker until shutdown is signaled.
    #[instrument(skip(self, shutdown))]
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_ms = self.interval.as_millis() as u64,
            plans = self.coordinator.plan_managers().len(),
            "Starting scheduler worker"
        );

        let mut interval = tokio::time::interval(self.interval);
        let mut idle = false;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if !self.coordinator.has_operations() {
                        if !idle {
                            info!("No plan has work left; waiting");
                            idle = true;
                        }
                        if self.exit_when_idle {
                            info!("Scheduler worker finished");
                            break;
                        }
                        continue;
                    }
                    idle = false;

                    if let Err(e) = self.tick() {
                        error!(error = %e, "Scheduler pass failed");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("Scheduler worker shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// Run one pass: offer a batch, answer the source, and advance launched
    /// steps.
    ///
    /// If the source refuses the accepted offers, the steps launched on them
    /// go back to `Pending` and are retried on a later pass.
    pub fn tick(&mut self) -> Result<TickStats> {
        let batch = self.source.next_batch();
        let report = self.coordinator.run_pass(&batch);

        let mut accepted = report.dirtied_offers.clone();
        let declined: BTreeSet<OfferId> = batch
            .iter()
            .map(|offer| offer.id)
            .filter(|id| !accepted.contains(id))
            .collect();

        let mut reverted = 0;
        if let Err(e) = self.source.accept(&accepted) {
            error!(error = %e, offers = accepted.len(), "Failed to accept offers");
            accepted.clear();
            reverted = self.update_steps(|status| match status {
                Status::Starting => Some(Status::Pending),
                _ => None,
            });
        }
        self.source.decline(&declined)?;

        // Starting to Started, then Started to Complete. Stands in for task
        // status updates.
        let steps_advanced = self.update_steps(|status| match status {
            Status::Starting => Some(Status::Started),
            Status::Started => Some(Status::Complete),
            _ => None,
        });

        let stats = TickStats {
            offered: batch.len(),
            accepted: accepted.len(),
            declined: declined.len(),
            failed_plans: report.failed_count(),
            steps_reverted: reverted,
            steps_advanced,
        };
        log_report(&report, &stats);

        Ok(stats)
    }

    /// Applies `next` to every step of every plan and reports the resulting
    /// status to the step's manager. Returns the number of steps updated.
    fn update_steps(&mut self, next: impl Fn(Status) -> Option<Status>) -> usize {
        let mut updated = 0;

        for manager in self.coordinator.plan_managers_mut() {
            let updates: Vec<(StepId, Status)> = manager
                .plan()
                .steps()
                .filter_map(|step| next(step.status()).map(|status| (step.id(), status)))
                .collect();

            for (step, status) in updates {
                match manager.update_step_status(step, status) {
                    Ok(()) => updated += 1,
                    Err(e) => {
                        // Keep going with the rest of the plan.
                        warn!(
                            plan = %manager.plan().name(),
                            step = %step,
                            to = %status,
                            error = %e,
                            "Failed to update step"
                        );
                    }
                }
            }
        }

        updated
    }
}

fn log_report(report: &PassReport, stats: &TickStats) {
    if stats.accepted > 0
        || stats.failed_plans > 0
        || stats.steps_reverted > 0
        || stats.steps_advanced > 0
    {
        info!(
            offered = stats.offered,
            accepted = stats.accepted,
            declined = stats.declined,
            failed_plans = stats.failed_plans,
            steps_reverted = stats.steps_reverted,
            steps_advanced = stats.steps_advanced,
            dirty_assets = report.dirtied_assets.len(),
            "Scheduler pass complete"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use offerloop_coordinator::{FirstFitStepScheduler, Offer};
    use offerloop_plan::{DefaultPlanManager, Plan, PlanManager};
    use offerloop_testing::{plan, requirement};

    use super::*;
    use crate::cluster::{ClusterError, LocalCluster};
    use crate::config::ClusterConfig;

    /// Local cluster whose accept calls always fail.
    struct RefusingCluster(LocalCluster);

    impl OfferSource for RefusingCluster {
        fn next_batch(&mut self) -> Vec<Offer> {
            self.0.next_batch()
        }

        fn accept(&mut self, offers: &BTreeSet<OfferId>) -> Result<(), ClusterError> {
            let first = offers.iter().next().copied().unwrap_or_default();
            Err(ClusterError::UnknownOffer(first))
        }

        fn decline(&mut self, offers: &BTreeSet<OfferId>) -> Result<(), ClusterError> {
            self.0.decline(offers)
        }
    }

    fn worker(plans: Vec<Plan>) -> SchedulerWorker {
        let managers: Vec<Box<dyn PlanManager>> = plans
            .into_iter()
            .map(|p| Box::new(DefaultPlanManager::new(p)) as Box<dyn PlanManager>)
            .collect();
        let coordinator = PlanCoordinator::new(managers, Arc::new(FirstFitStepScheduler)).unwrap();
        let cluster = LocalCluster::new(&ClusterConfig::default());
        SchedulerWorker::new(coordinator, Box::new(cluster), Duration::from_millis(10))
    }

    #[test]
    fn test_tick_accepts_and_declines() {
        let mut worker = worker(vec![plan("deploy", vec![requirement("hello", 0)])]);

        let stats = worker.tick().unwrap();
        assert_eq!(stats.offered, 3);
        assert_eq!(stats.accepted, 1);
        assert_eq!(stats.declined, 2);
        assert_eq!(stats.steps_advanced, 1);
    }

    #[test]
    fn test_refused_accept_returns_steps_to_pending() {
        let mut worker = worker(vec![plan("deploy", vec![requirement("hello", 0)])]);
        worker.source = Box::new(RefusingCluster(LocalCluster::new(&ClusterConfig::default())));

        let stats = worker.tick().unwrap();
        assert_eq!(stats.accepted, 0);
        assert_eq!(stats.declined, 2);
        assert_eq!(stats.steps_reverted, 1);
        assert_eq!(stats.steps_advanced, 0);

        let step = worker.coordinator().plan_managers()[0]
            .plan()
            .steps()
            .next()
            .unwrap()
            .status();
        assert_eq!(step, Status::Pending);
        assert!(worker.coordinator().has_operations());
    }

    #[test]
    fn test_steps_complete_after_two_ticks() {
        let mut worker = worker(vec![plan("deploy", vec![requirement("hello", 0)])]);

        worker.tick().unwrap();
        assert!(worker.coordinator().has_operations());
        worker.tick().unwrap();
        assert!(!worker.coordinator().has_operations());
    }

    #[tokio::test]
    async fn test_run_exits_when_idle() {
        let mut worker = worker(vec![
            plan("deploy", vec![requirement("hello", 0), requirement("hello", 1)]),
            plan("recovery", vec![requirement("world", 0)]),
        ])
        .exit_when_idle(true);
        let (_tx, rx) = watch::channel(false);

        tokio::time::timeout(Duration::from_secs(5), worker.run(rx))
            .await
            .unwrap();

        assert!(worker
            .coordinator()
            .plan_managers()
            .iter()
            .all(|m| m.plan().is_complete()));
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let mut worker = worker(vec![plan("deploy", vec![requirement("hello", 0)])]);
        worker.coordinator().plan_managers()[0].plan().interrupt();
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            worker.run(rx).await;
            worker
        });
        tx.send(true).unwrap();

        let worker = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(!worker.coordinator().plan_managers()[0].plan().is_complete());
    }
}
