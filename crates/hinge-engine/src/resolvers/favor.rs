//! Calling in favors from warm contacts.

use hinge_core::{
    tags, Action, ActionPayload, ActionType, Campaign, CostPreview, Disposition, EventPayload,
    FavorAsk, ProposalResult,
};

use super::{energy_requirement, Preview};
use crate::config::EngineConfig;
use crate::error::{ResolverError, ResolverResult};
use crate::resolver::{expect_payload, Resolver, ResolverContext};

/// Spends a contact's goodwill (one disposition tier) and social energy
/// for an introduction, intel or resources.
#[derive(Debug, Default, Clone)]
pub struct CallFavorResolver;

impl Resolver for CallFavorResolver {
    fn action_type(&self) -> ActionType {
        ActionType::CallFavor
    }

    fn description(&self) -> &str {
        "Ask a warm contact for help"
    }

    fn preview(&self, state: &Campaign, payload: &ActionPayload, config: &EngineConfig) -> ResolverResult<ProposalResult> {
        let ActionPayload::CallFavor { npc: npc_id, ask } = payload else {
            return Err(ResolverError::PayloadMismatch {
                expected: ActionType::CallFavor,
                found: payload.action_type(),
            });
        };
        let Some(npc) = state.npcs.get(npc_id) else {
            return Ok(Preview::unknown(ActionType::CallFavor, "contact", npc_id));
        };

        let mut preview = Preview::new(ActionType::CallFavor);
        preview.require(
            format!("{} is warm or loyal (currently {})", npc.name, npc.disposition),
            npc.disposition >= Disposition::Warm,
        );
        let energy = energy_requirement(state.player.social_energy, config.favor.energy_cost);
        preview.require(energy.description, energy.met);

        let mut cost = CostPreview {
            social_energy: config.favor.energy_cost,
            ..CostPreview::default()
        };
        cost.notes.push(format!(
            "{} will be {} afterwards",
            npc.name,
            npc.disposition.shifted(-1)
        ));
        match ask {
            FavorAsk::Introduction { faction } => {
                preview.require(format!("faction {faction} exists"), state.factions.contains_key(faction));
                cost.standing
                    .push((faction.clone(), config.favor.introduction_standing));
            }
            FavorAsk::Intel { region } => {
                preview.require(format!("region {region} exists"), state.regions.contains_key(region));
            }
            FavorAsk::Resources => {
                cost.credits = -config.favor.resource_credits;
            }
        }
        preview.with_cost(cost);
        Ok(preview.build())
    }

    fn resolve(&self, state: &mut Campaign, action: &Action, ctx: &mut ResolverContext<'_>) -> ResolverResult<()> {
        let (npc_id, ask) = expect_payload!(action, ActionType::CallFavor,
            ActionPayload::CallFavor { npc, ask } => (npc, ask));
        let config = ctx.config;

        ctx.charge(
            state,
            &CostPreview {
                social_energy: config.favor.energy_cost,
                ..CostPreview::default()
            },
        );

        let npc = state
            .npcs
            .get_mut(npc_id)
            .ok_or_else(|| ResolverError::unknown("contact", npc_id))?;
        let from = npc.disposition;
        npc.disposition = from.shifted(-1);
        let to = npc.disposition;

        ctx.emit(
            EventPayload::FavorCalled {
                npc: npc_id.clone(),
                ask: ask.to_string(),
            },
            vec![tags::npc(npc_id), "favor".to_string()],
        );
        if from != to {
            ctx.emit(
                EventPayload::DispositionShifted {
                    npc: npc_id.clone(),
                    from,
                    to,
                    reason: "favor called in".to_string(),
                },
                vec![tags::npc(npc_id)],
            );
        }

        match ask {
            FavorAsk::Introduction { faction } => {
                ctx.shift_standing(
                    state,
                    faction,
                    config.favor.introduction_standing,
                    "introduction",
                    Vec::new(),
                )?;
            }
            FavorAsk::Intel { region } => {
                let entry = state
                    .regions
                    .get_mut(region)
                    .ok_or_else(|| ResolverError::unknown("region", region))?;
                let previous = entry.connectivity;
                entry.connectivity = previous.raised();
                if entry.connectivity != previous {
                    ctx.emit(
                        EventPayload::ConnectivityUpdated {
                            region: region.clone(),
                            from: previous,
                            to: entry.connectivity,
                        },
                        vec![format!("connectivity:{region}")],
                    );
                }
            }
            FavorAsk::Resources => {
                state.player.credits += config.favor.resource_credits;
                ctx.emit(
                    EventPayload::ResourcesChanged {
                        credits: config.favor.resource_credits,
                        social_energy: 0,
                        exposure: 0,
                    },
                    Vec::new(),
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolvers::test_support::{action, two_region_campaign};
    use hinge_core::{ConnectivityTier, NpcId, RegionId};

    #[test]
    fn test_neutral_contact_cannot_be_asked() {
        let campaign = two_region_campaign();
        let preview = CallFavorResolver
            .preview(
                &campaign,
                &ActionPayload::CallFavor {
                    npc: NpcId::new("dace"),
                    ask: FavorAsk::Resources,
                },
                &EngineConfig::default(),
            )
            .unwrap();
        assert!(!preview.traversable);
    }

    #[test]
    fn test_intel_raises_connectivity_and_spends_goodwill() {
        let config = EngineConfig::default();
        let mut campaign = two_region_campaign();
        let act = action(
            &campaign,
            "f1",
            ActionPayload::CallFavor {
                npc: NpcId::new("marrow"),
                ask: FavorAsk::Intel {
                    region: RegionId::new("market"),
                },
            },
        );
        let mut ctx = ResolverContext::new(&config, &act.action_id, 1, 3, 0);
        CallFavorResolver.resolve(&mut campaign, &act, &mut ctx).unwrap();

        assert_eq!(
            campaign.regions[&RegionId::new("market")].connectivity,
            ConnectivityTier::Aware
        );
        assert_eq!(campaign.npcs[&NpcId::new("marrow")].disposition, Disposition::Neutral);
        assert_eq!(campaign.player.social_energy, 5 - config.favor.energy_cost);
    }
}
