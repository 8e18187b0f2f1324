//! Built-in resolvers, one per action type.

mod choice;
mod combat;
mod demand;
mod enhancement;
mod favor;
mod jobs;
mod travel;

pub use choice::ChoiceResolver;
pub use combat::CombatResolver;
pub use demand::DemandResponseResolver;
pub use enhancement::EnhancementResolver;
pub use favor::CallFavorResolver;
pub use jobs::{AcceptJobResolver, CompleteJobResolver};
pub use travel::TravelResolver;

use hinge_core::{ActionType, Alternative, CostPreview, ProposalResult, Requirement};

/// Accumulates requirement lines for a proposal preview.
#[derive(Debug)]
pub(crate) struct Preview {
    action_type: ActionType,
    requirements: Vec<Requirement>,
    cost: CostPreview,
    alternatives: Vec<Alternative>,
}

impl Preview {
    pub fn new(action_type: ActionType) -> Self {
        Self {
            action_type,
            requirements: Vec::new(),
            cost: CostPreview::default(),
            alternatives: Vec::new(),
        }
    }

    /// Preview for a payload naming something the campaign does not have.
    pub fn unknown(action_type: ActionType, kind: &str, id: impl std::fmt::Display) -> ProposalResult {
        let mut preview = Self::new(action_type);
        preview.require(format!("{kind} {id} exists"), false);
        preview.build()
    }

    pub fn require(&mut self, description: impl Into<String>, met: bool) -> &mut Self {
        self.requirements.push(Requirement::new(description, met));
        self
    }

    pub fn cost_mut(&mut self) -> &mut CostPreview {
        &mut self.cost
    }

    pub fn with_cost(&mut self, cost: CostPreview) -> &mut Self {
        self.cost = cost;
        self
    }

    pub fn alternative(&mut self, alternative: Alternative) -> &mut Self {
        self.alternatives.push(alternative);
        self
    }

    pub fn all_met(&self) -> bool {
        self.requirements.iter().all(|r| r.met)
    }

    pub fn build(self) -> ProposalResult {
        let traversable = self.requirements.iter().all(|r| r.met);
        ProposalResult {
            action_type: self.action_type,
            requirements: self.requirements,
            cost_preview: self.cost,
            alternatives: self.alternatives,
            traversable,
        }
    }
}

/// Requirement line for having enough credits.
pub(crate) fn credits_requirement(have: i64, need: i64) -> Requirement {
    Requirement::new(format!("at least {need} credits (have {have})"), have >= need)
}

/// Requirement line for having enough social energy.
pub(crate) fn energy_requirement(have: i32, need: i32) -> Requirement {
    Requirement::new(
        format!("at least {need} social energy (have {have})"),
        have >= need,
    )
}

#[cfg(test)]
pub(crate) mod test_support {
    use hinge_core::{
        Action, ActionPayload, Campaign, CampaignBuilder, ConnectivityTier, Disposition,
        MemoryTrigger, Npc, RouteRequirement,
    };

    /// Docks (embedded, start) -- Market (syndicate-controlled, needs standing 10).
    pub fn two_region_campaign() -> Campaign {
        CampaignBuilder::new("test", "docks")
            .seed(11)
            .player(|p| {
                p.credits = 100;
                p.social_energy = 5;
            })
            .region("docks", "The Docks", ConnectivityTier::Embedded)
            .region("market", "Drowned Market", ConnectivityTier::Disconnected)
            .connect("docks", "market")
            .faction("guild", "Harbor Guild", 20)
            .faction("syndicate", "Syndicate", 0)
            .controlled_by("docks", "guild")
            .controlled_by("market", "syndicate")
            .route_requirement(
                "market",
                RouteRequirement::FactionStanding {
                    faction: "syndicate".into(),
                    minimum: 10,
                },
            )
            .npc("marrow", {
                let mut npc = Npc::new("Marrow", "docks");
                npc.faction = Some("guild".into());
                npc.disposition = Disposition::Warm;
                npc.memory_triggers.push(MemoryTrigger::once("combat", -1));
                npc
            })
            .npc("dace", {
                let mut npc = Npc::new("Dace", "market");
                npc.faction = Some("syndicate".into());
                npc
            })
            .build()
    }

    pub fn action(campaign: &Campaign, id: &str, payload: ActionPayload) -> Action {
        Action::new(id, campaign.id.clone(), payload, campaign.state_version)
    }
}
