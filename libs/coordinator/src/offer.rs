use std::collections::BTreeSet;

use offerloop_id::{AgentId, OfferId};
use offerloop_plan::ResourceSet;
use serde::{Deserialize, Serialize};

/// A transient grant of resources on one agent, valid for a single pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    pub id: OfferId,
    pub agent_id: AgentId,
    pub hostname: String,
    pub resources: ResourceSet,
}

impl Offer {
    pub fn new(agent_id: AgentId, hostname: impl Into<String>, resources: ResourceSet) -> Self {
        Self {
            id: OfferId::new(),
            agent_id,
            hostname: hostname.into(),
            resources,
        }
    }
}

/// Returns the offers whose IDs are not in `accepted`, preserving order.
pub fn filter_accepted_offers(offers: &[Offer], accepted: &BTreeSet<OfferId>) -> Vec<Offer> {
    offers
        .iter()
        .filter(|offer| !accepted.contains(&offer.id))
        .cloned()
        .collect()
}
