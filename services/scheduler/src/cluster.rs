//! Offer sources.
//!
//! An [`OfferSource`] hands out batches of offers and learns which ones were
//! used. [`LocalCluster`] simulates a fixed set of agents for development and
//! tests: each batch offers every agent's free capacity as a single offer, and
//! an accepted offer keeps that capacity leased for a number of batches.

use std::collections::{BTreeMap, BTreeSet};

use offerloop_coordinator::Offer;
use offerloop_id::{AgentId, OfferId};
use offerloop_plan::ResourceSet;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::ClusterConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClusterError {
    #[error("unknown or already answered offer: {0}")]
    UnknownOffer(OfferId),
}

/// Supplies offers to the scheduler.
pub trait OfferSource: Send {
    /// Returns the next batch. Offers still outstanding from an earlier
    /// batch are rescinded.
    fn next_batch(&mut self) -> Vec<Offer>;

    /// Marks offers as used.
    fn accept(&mut self, offers: &BTreeSet<OfferId>) -> Result<(), ClusterError>;

    /// Returns offers unused.
    fn decline(&mut self, offers: &BTreeSet<OfferId>) -> Result<(), ClusterError>;
}

#[derive(Debug, Clone)]
struct Agent {
    id: AgentId,
    hostname: String,
    capacity: ResourceSet,
}

#[derive(Debug, Clone)]
struct Lease {
    agent: usize,
    resources: ResourceSet,
    batches_left: u32,
}

/// In-process cluster of identical agents.
#[derive(Debug)]
pub struct LocalCluster {
    agents: Vec<Agent>,
    lease_passes: u32,
    outstanding: BTreeMap<OfferId, Offer>,
    leases: Vec<Lease>,
}

impl LocalCluster {
    pub fn new(config: &ClusterConfig) -> Self {
        let agents = (0..config.agents)
            .map(|i| Agent {
                id: AgentId::new(),
                hostname: format!("agent-{i}"),
                capacity: config.agent_resources,
            })
            .collect();

        Self {
            agents,
            lease_passes: config.lease_passes,
            outstanding: BTreeMap::new(),
            leases: Vec::new(),
        }
    }

    /// Capacity on `agent` not covered by a lease.
    fn free(&self, agent: usize) -> ResourceSet {
        self.leases
            .iter()
            .filter(|lease| lease.agent == agent)
            .fold(self.agents[agent].capacity, |free, lease| {
                free.saturating_sub(&lease.resources)
            })
    }

    /// Number of active leases.
    pub fn lease_count(&self) -> usize {
        self.leases.len()
    }

    fn agent_index(&self, agent_id: AgentId) -> Option<usize> {
        self.agents.iter().position(|agent| agent.id == agent_id)
    }

    fn take_outstanding(&mut self, ids: &BTreeSet<OfferId>) -> Result<Vec<Offer>, ClusterError> {
        if let Some(unknown) = ids.iter().find(|id| !self.outstanding.contains_key(id)) {
            return Err(ClusterError::UnknownOffer(*unknown));
        }
        Ok(ids
            .iter()
            .filter_map(|id| self.outstanding.remove(id))
            .collect())
    }
}

impl OfferSource for LocalCluster {
    fn next_batch(&mut self) -> Vec<Offer> {
        if !self.outstanding.is_empty() {
            debug!(count = self.outstanding.len(), "Rescinding unanswered offers");
            self.outstanding.clear();
        }

        for lease in &mut self.leases {
            lease.batches_left = lease.batches_left.saturating_sub(1);
        }
        let before = self.leases.len();
        self.leases.retain(|lease| lease.batches_left > 0);
        if self.leases.len() < before {
            debug!(expired = before - self.leases.len(), "Leases expired");
        }

        let mut batch = Vec::new();
        for (i, agent) in self.agents.iter().enumerate() {
            let free = self.free(i);
            if free.is_empty() {
                continue;
            }
            let offer = Offer::new(agent.id, agent.hostname.clone(), free);
            self.outstanding.insert(offer.id, offer.clone());
            batch.push(offer);
        }
        batch
    }

    fn accept(&mut self, offers: &BTreeSet<OfferId>) -> Result<(), ClusterError> {
        for offer in self.take_outstanding(offers)? {
            let Some(agent) = self.agent_index(offer.agent_id) else {
                continue;
            };
            info!(
                offer_id = %offer.id,
                hostname = %offer.hostname,
                resources = %offer.resources,
                "Offer accepted"
            );
            self.leases.push(Lease {
                agent,
                resources: offer.resources,
                batches_left: self.lease_passes,
            });
        }
        Ok(())
    }

    fn decline(&mut self, offers: &BTreeSet<OfferId>) -> Result<(), ClusterError> {
        let declined = self.take_outstanding(offers)?;
        if !declined.is_empty() {
            debug!(count = declined.len(), "Offers declined");
        }
        Ok(())
    }
}
