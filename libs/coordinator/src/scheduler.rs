//! Step schedulers match candidate steps against offers.

use std::collections::BTreeSet;

use offerloop_id::OfferId;
use offerloop_plan::Step;
use tracing::{debug, warn};

use crate::{Offer, SchedulerError};

/// Consumes offers on behalf of candidate steps.
pub trait StepScheduler: Send + Sync {
    /// Matches `steps` against `offers` and returns the IDs of the offers
    /// consumed. Steps are updated to reflect whether they launched.
    fn resource_offers(
        &self,
        offers: &[Offer],
        steps: &mut [&mut Step],
    ) -> Result<BTreeSet<OfferId>, SchedulerError>;
}

/// Places each step on the first unused offer large enough for it.
///
/// One offer launches at most one step. Steps without a requirement finish
/// immediately and consume nothing; one that cannot finish is left as it is
/// and the rest of the batch is still scheduled.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstFitStepScheduler;

impl StepScheduler for FirstFitStepScheduler {
    fn resource_offers(
        &self,
        offers: &[Offer],
        steps: &mut [&mut Step],
    ) -> Result<BTreeSet<OfferId>, SchedulerError> {
        let mut used = BTreeSet::new();

        for step in steps.iter_mut() {
            let step_id = step.id();
            let Some(requirement) = step.start().cloned() else {
                if let Err(e) = step.complete() {
                    warn!(
                        step = %step_id,
                        error = %e,
                        "Failed to complete step without requirement"
                    );
                }
                continue;
            };

            let matched = offers.iter().find(|offer| {
                !used.contains(&offer.id) && requirement.resources.fits_within(&offer.resources)
            });

            match matched {
                Some(offer) => {
                    debug!(
                        step = %step.name(),
                        offer_id = %offer.id,
                        hostname = %offer.hostname,
                        "Launching step"
                    );
                    used.insert(offer.id);
                    step.update_offer_status(true);
                }
                None => {
                    debug!(
                        step = %step.name(),
                        resources = %requirement.resources,
                        "No offer fits step"
                    );
                    step.update_offer_status(false);
                }
            }
        }

        Ok(used)
    }
}

#[cfg(test)]
mod tests {
    use offerloop_id::AgentId;
    use offerloop_plan::{ResourceSet, Status, WorkloadRequirement};

    use super::*;

    fn step(index: u32, cpus_milli: u32) -> Step {
        let req = WorkloadRequirement::new("hello", index)
            .with_tasks(["server"])
            .with_resources(ResourceSet::new(cpus_milli, 128, 0));
        Step::new(format!("hello-{index}:[server]"), Some(req))
    }

    fn offer(cpus_milli: u32) -> Offer {
        Offer::new(AgentId::new(), "agent", ResourceSet::new(cpus_milli, 1024, 0))
    }

    #[test]
    fn test_first_fit_skips_small_offers() {
        let offers = vec![offer(100), offer(1000)];
        let mut a = step(0, 500);
        let used = FirstFitStepScheduler
            .resource_offers(&offers, &mut [&mut a])
            .unwrap();

        assert_eq!(used, BTreeSet::from([offers[1].id]));
        assert_eq!(a.status(), Status::Starting);
    }

    #[test]
    fn test_one_step_per_offer() {
        let offers = vec![offer(1000)];
        let mut a = step(0, 100);
        let mut b = step(1, 100);
        let used = FirstFitStepScheduler
            .resource_offers(&offers, &mut [&mut a, &mut b])
            .unwrap();

        assert_eq!(used.len(), 1);
        assert_eq!(a.status(), Status::Starting);
        assert_eq!(b.status(), Status::Pending);
    }

    #[test]
    fn test_step_without_requirement_completes() {
        let mut barrier = Step::new("barrier", None);
        let used = FirstFitStepScheduler
            .resource_offers(&[], &mut [&mut barrier])
            .unwrap();

        assert!(used.is_empty());
        assert!(barrier.is_complete());
    }

    #[test]
    fn test_stuck_step_does_not_drop_earlier_launches() {
        let offers = vec![offer(1000)];
        let mut a = step(0, 100);
        let mut broken = Step::new("barrier", None);
        broken.start();
        broken.fail().unwrap();

        let used = FirstFitStepScheduler
            .resource_offers(&offers, &mut [&mut a, &mut broken])
            .unwrap();

        assert_eq!(used, BTreeSet::from([offers[0].id]));
        assert_eq!(a.status(), Status::Starting);
        assert_eq!(broken.status(), Status::Error);
    }
}
