//! Fluent construction of campaigns for seed files and tests.

use crate::campaign::Campaign;
use crate::ids::{ActionId, DemandId, EnhancementId, FactionId, JobId, NpcId, RegionId};
use crate::leverage::{DemandState, DemandWeight, LeverageDemand};
use crate::npc::Npc;
use crate::thread::DormantThread;
use crate::world::{
    ConnectivityTier, EnhancementOffer, FactionLink, FactionState, Job, PlayerState, RegionState,
    RouteRequirement,
};

/// Builder for [`Campaign`] values.
///
/// Regions added with [`region`](Self::region) are connected in both
/// directions by [`connect`](Self::connect).
#[derive(Debug, Clone)]
pub struct CampaignBuilder {
    campaign: Campaign,
}

impl CampaignBuilder {
    pub fn new(id: &str, start_region: &str) -> Self {
        let player = PlayerState::new("Player", start_region);
        Self {
            campaign: Campaign::new(id, id, 0, player),
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.campaign.name = name.to_string();
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.campaign.seed = seed;
        self
    }

    pub fn player(mut self, f: impl FnOnce(&mut PlayerState)) -> Self {
        f(&mut self.campaign.player);
        self
    }

    pub fn region(mut self, id: &str, name: &str, tier: ConnectivityTier) -> Self {
        let mut region = RegionState::new(name);
        region.connectivity = tier;
        self.campaign.regions.insert(RegionId::new(id), region);
        self
    }

    pub fn controlled_by(mut self, region: &str, faction: &str) -> Self {
        if let Some(r) = self.campaign.regions.get_mut(&RegionId::new(region)) {
            r.controlling_faction = Some(FactionId::new(faction));
        }
        self
    }

    pub fn connect(mut self, a: &str, b: &str) -> Self {
        for (from, to) in [(a, b), (b, a)] {
            if let Some(r) = self.campaign.regions.get_mut(&RegionId::new(from)) {
                let to = RegionId::new(to);
                if !r.adjacent.contains(&to) {
                    r.adjacent.push(to);
                }
            }
        }
        self
    }

    pub fn route_requirement(mut self, region: &str, requirement: RouteRequirement) -> Self {
        if let Some(r) = self.campaign.regions.get_mut(&RegionId::new(region)) {
            r.route_requirements.push(requirement);
        }
        self
    }

    pub fn faction(mut self, id: &str, name: &str, standing: i32) -> Self {
        self.campaign
            .factions
            .insert(FactionId::new(id), FactionState::new(name, standing));
        self
    }

    pub fn link(mut self, from: &str, to: &str, multiplier_permille: i32) -> Self {
        self.campaign
            .faction_links
            .push(FactionLink::new(from, to, multiplier_permille));
        self
    }

    pub fn npc(mut self, id: &str, npc: Npc) -> Self {
        self.campaign.npcs.insert(NpcId::new(id), npc);
        self
    }

    pub fn job(mut self, id: &str, job: Job) -> Self {
        self.campaign.jobs.insert(JobId::new(id), job);
        self
    }

    pub fn offer(mut self, id: &str, offer: EnhancementOffer) -> Self {
        self.campaign
            .enhancement_offers
            .insert(EnhancementId::new(id), offer);
        self
    }

    pub fn thread(mut self, thread: DormantThread) -> Self {
        self.campaign.queue_thread(thread);
        self
    }

    /// Add an open demand created on the current turn.
    pub fn demand(
        mut self,
        id: &str,
        faction: &str,
        enhancement: &str,
        deadline: u64,
        weight: DemandWeight,
    ) -> Self {
        let demand = LeverageDemand {
            id: DemandId::new(id),
            faction: FactionId::new(faction),
            source_enhancement: EnhancementId::new(enhancement),
            text: format!("{faction} calls in what you owe"),
            deadline,
            state: DemandState::Offered,
            weight,
            created_turn: self.campaign.turn_count,
            at_expense_of: None,
            negotiated: false,
            resolution: None,
        };
        self.campaign.demands.insert(demand.id.clone(), demand);
        self
    }

    pub fn hinge(mut self, situation: &str, choice: &str, reasoning: &str) -> Self {
        self.campaign
            .record_hinge(ActionId::new("seed"), situation, choice, reasoning);
        self
    }

    pub fn turn(mut self, turn_count: u64) -> Self {
        self.campaign.turn_count = turn_count;
        self
    }

    pub fn build(mut self) -> Campaign {
        let start = self.campaign.player.current_region.clone();
        if let Some(r) = self.campaign.regions.get_mut(&start) {
            r.visited = true;
        }
        self.campaign
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_is_bidirectional() {
        let c = CampaignBuilder::new("c", "a")
            .region("a", "A", ConnectivityTier::Embedded)
            .region("b", "B", ConnectivityTier::Disconnected)
            .connect("a", "b")
            .build();
        assert!(c.regions[&RegionId::new("a")].is_adjacent_to(&RegionId::new("b")));
        assert!(c.regions[&RegionId::new("b")].is_adjacent_to(&RegionId::new("a")));
        assert!(c.regions[&RegionId::new("a")].visited);
    }
}
