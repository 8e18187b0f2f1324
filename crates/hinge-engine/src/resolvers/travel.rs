//! Travel between adjacent regions.

use hinge_core::{
    tags, Action, ActionPayload, ActionType, Alternative, Campaign, CostPreview, Disposition,
    EventPayload, ProposalResult, RegionId, Requirement, RouteRequirement, TravelApproach,
};

use super::{credits_requirement, energy_requirement, Preview};
use crate::config::EngineConfig;
use crate::error::{ResolverError, ResolverResult};
use crate::resolver::{expect_payload, Resolver, ResolverContext};

/// Moves the player, paying for whichever approach was chosen.
///
/// Route requirements apply in full to a direct approach. A bribe waives
/// faction-standing checks, a warm contact waives standing and contact
/// checks, and a risky traversal waives all of them at the cost of
/// exposure and the controlling faction's displeasure (applied by the cascade).
#[derive(Debug, Default, Clone)]
pub struct TravelResolver;

/// Requirements and cost of one travel approach.
fn evaluate(
    state: &Campaign,
    destination: &RegionId,
    approach: &TravelApproach,
    config: &EngineConfig,
) -> (Vec<Requirement>, CostPreview) {
    let mut reqs = Vec::new();
    let mut cost = CostPreview::default();
    let player = &state.player;

    let Some(target) = state.regions.get(destination) else {
        reqs.push(Requirement::new(format!("region {destination} exists"), false));
        return (reqs, cost);
    };
    let origin = state.current_region();
    let origin_name = origin.map(|r| r.name.as_str()).unwrap_or("nowhere");

    reqs.push(Requirement::new(
        format!("not already in {}", target.name),
        &player.current_region != destination,
    ));
    reqs.push(Requirement::new(
        format!("{} is adjacent to {}", target.name, origin_name),
        origin.map(|o| o.is_adjacent_to(destination)).unwrap_or(false),
    ));

    for requirement in &target.route_requirements {
        let waived = match (approach, requirement) {
            (TravelApproach::RiskyTraversal, _) => true,
            (TravelApproach::Bribe, RouteRequirement::FactionStanding { .. }) => true,
            (
                TravelApproach::Contact { .. },
                RouteRequirement::FactionStanding { .. } | RouteRequirement::Contact { .. },
            ) => true,
            _ => false,
        };
        if !waived {
            reqs.push(route_requirement(state, requirement));
        }
    }

    match approach {
        TravelApproach::Direct => {
            if config.travel.direct_energy_cost > 0 {
                reqs.push(energy_requirement(player.social_energy, config.travel.direct_energy_cost));
                cost.social_energy = config.travel.direct_energy_cost;
            }
        }
        TravelApproach::Bribe => {
            reqs.push(credits_requirement(player.credits, config.travel.bribe_credits));
            cost.credits = config.travel.bribe_credits;
            cost.notes.push("the checkpoint looks the other way".to_string());
        }
        TravelApproach::Contact { npc } => {
            let (description, met) = match state.npcs.get(npc) {
                Some(contact) => (
                    format!("{} is warm or loyal (currently {})", contact.name, contact.disposition),
                    contact.disposition >= Disposition::Warm,
                ),
                None => (format!("contact {npc} exists"), false),
            };
            reqs.push(Requirement::new(description, met));
            reqs.push(energy_requirement(player.social_energy, config.travel.contact_energy_cost));
            cost.social_energy = config.travel.contact_energy_cost;
        }
        TravelApproach::RiskyTraversal => {
            cost.exposure = config.travel.risky_exposure;
            if let Some(controller) = &target.controlling_faction {
                cost.standing
                    .push((controller.clone(), -config.cascade.trespass_penalty));
                cost.notes.push(format!("{controller} will notice the trespass"));
            }
        }
    }

    (reqs, cost)
}

fn route_requirement(state: &Campaign, requirement: &RouteRequirement) -> Requirement {
    match requirement {
        RouteRequirement::FactionStanding { faction, minimum } => {
            let name = state
                .factions
                .get(faction)
                .map(|f| f.name.as_str())
                .unwrap_or(faction.as_str());
            let have = state.standing(faction).unwrap_or(i32::MIN);
            Requirement::new(
                format!("standing with {name} at least {minimum:+} (currently {})", have.max(-100)),
                have >= *minimum,
            )
        }
        RouteRequirement::Connectivity { minimum } => {
            let have = state.current_region().map(|r| r.connectivity).unwrap_or_default();
            Requirement::new(
                format!("connectivity at least {minimum} here (currently {have})"),
                have >= *minimum,
            )
        }
        RouteRequirement::Credits { amount } => credits_requirement(state.player.credits, *amount),
        RouteRequirement::Contact { npc } => match state.npcs.get(npc) {
            Some(contact) => Requirement::new(
                format!("on speaking terms with {} (currently {})", contact.name, contact.disposition),
                contact.disposition >= Disposition::Neutral,
            ),
            None => Requirement::new(format!("contact {npc} exists"), false),
        },
    }
}

impl Resolver for TravelResolver {
    fn action_type(&self) -> ActionType {
        ActionType::Travel
    }

    fn description(&self) -> &str {
        "Move to an adjacent region"
    }

    fn preview(&self, state: &Campaign, payload: &ActionPayload, config: &EngineConfig) -> ResolverResult<ProposalResult> {
        let ActionPayload::Travel { destination, approach } = payload else {
            return Err(ResolverError::PayloadMismatch {
                expected: ActionType::Travel,
                found: payload.action_type(),
            });
        };

        let (reqs, cost) = evaluate(state, destination, approach, config);
        let mut preview = Preview::new(ActionType::Travel);
        for r in reqs {
            preview.require(r.description, r.met);
        }
        preview.with_cost(cost);

        // Offer ready-to-confirm alternatives when the direct route is closed.
        if *approach == TravelApproach::Direct && !preview.all_met() && state.regions.contains_key(destination) {
            let mut approaches = vec![TravelApproach::Bribe];
            approaches.extend(
                state
                    .npcs
                    .iter()
                    .filter(|(_, npc)| npc.disposition >= Disposition::Warm)
                    .map(|(id, _)| TravelApproach::Contact { npc: id.clone() }),
            );
            approaches.push(TravelApproach::RiskyTraversal);

            for alt in approaches {
                let (requirements, cost_preview) = evaluate(state, destination, &alt, config);
                let available = requirements.iter().all(|r| r.met);
                preview.alternative(Alternative {
                    label: alt.label(),
                    payload: ActionPayload::Travel {
                        destination: destination.clone(),
                        approach: alt,
                    },
                    requirements,
                    cost_preview,
                    available,
                });
            }
        }

        Ok(preview.build())
    }

    fn resolve(&self, state: &mut Campaign, action: &Action, ctx: &mut ResolverContext<'_>) -> ResolverResult<()> {
        let (destination, approach) = expect_payload!(action, ActionType::Travel,
            ActionPayload::Travel { destination, approach } => (destination, approach));

        if !state.regions.contains_key(destination) {
            return Err(ResolverError::unknown("region", destination));
        }

        let (_, cost) = evaluate(state, destination, approach, ctx.config);
        ctx.charge(state, &cost);

        if *approach == TravelApproach::RiskyTraversal {
            let mut risk_tags = vec![tags::RISK.to_string()];
            if let Some(controller) = state.regions[destination].controlling_faction.as_ref() {
                risk_tags.push(format!("trespass:{controller}"));
            }
            ctx.emit(
                EventPayload::RiskTaken {
                    region: destination.clone(),
                    exposure: cost.exposure,
                },
                risk_tags,
            );
        }

        let from = std::mem::replace(&mut state.player.current_region, destination.clone());
        ctx.emit(
            EventPayload::RegionChanged {
                from,
                to: destination.clone(),
            },
            vec![tags::region_entered(destination)],
        );

        let region = state
            .regions
            .get_mut(destination)
            .ok_or_else(|| ResolverError::unknown("region", destination))?;
        if !region.visited {
            region.visited = true;
            let previous = region.connectivity;
            region.connectivity = previous.raised();
            ctx.emit(
                EventPayload::ConnectivityUpdated {
                    region: destination.clone(),
                    from: previous,
                    to: region.connectivity,
                },
                vec![format!("connectivity:{destination}")],
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolvers::test_support::{action, two_region_campaign};
    use hinge_core::{ConnectivityTier, EventType};

    fn travel(approach: TravelApproach) -> ActionPayload {
        ActionPayload::Travel {
            destination: RegionId::new("market"),
            approach,
        }
    }

    #[test]
    fn test_unmet_standing_blocks_direct_route_and_lists_alternatives() {
        let campaign = two_region_campaign();
        let config = EngineConfig::default();
        let result = TravelResolver
            .preview(&campaign, &travel(TravelApproach::Direct), &config)
            .unwrap();

        assert!(!result.traversable);
        assert!(result.failed_requirements()[0].contains("Syndicate"));
        let labels: Vec<_> = result.alternatives.iter().map(|a| a.label.as_str()).collect();
        assert!(labels.contains(&"risky traversal"));
        assert!(labels.contains(&"bribe the checkpoint"));
        assert!(result.alternatives.iter().any(|a| a.available));
    }

    #[test]
    fn test_contact_alternative_requires_warm_npc() {
        let campaign = two_region_campaign();
        let config = EngineConfig::default();
        let result = TravelResolver
            .preview(&campaign, &travel(TravelApproach::Direct), &config)
            .unwrap();
        assert!(result
            .alternatives
            .iter()
            .any(|a| a.label == "travel on marrow's word" && a.available));
    }

    #[test]
    fn test_risky_traversal_moves_player_and_raises_connectivity() {
        let mut campaign = two_region_campaign();
        let config = EngineConfig::default();
        let act = action(&campaign, "t1", travel(TravelApproach::RiskyTraversal));
        let mut ctx = ResolverContext::new(&config, &act.action_id, 1, 5, 0);

        TravelResolver.resolve(&mut campaign, &act, &mut ctx).unwrap();

        assert_eq!(campaign.player.current_region, RegionId::new("market"));
        assert_eq!(campaign.player.exposure, config.travel.risky_exposure);
        let market = &campaign.regions[&RegionId::new("market")];
        assert_eq!(market.connectivity, ConnectivityTier::Aware);
        assert!(market.visited);

        let types: Vec<_> = ctx.events().iter().map(|e| e.event_type).collect();
        assert!(types.contains(&EventType::RiskTaken));
        assert!(types.contains(&EventType::RegionChanged));
        assert!(types.contains(&EventType::ConnectivityUpdated));
    }

    #[test]
    fn test_bribe_charges_credits() {
        let mut campaign = two_region_campaign();
        let config = EngineConfig::default();
        let act = action(&campaign, "t1", travel(TravelApproach::Bribe));
        let mut ctx = ResolverContext::new(&config, &act.action_id, 1, 5, 0);
        TravelResolver.resolve(&mut campaign, &act, &mut ctx).unwrap();
        assert_eq!(campaign.player.credits, 100 - config.travel.bribe_credits);
    }

    #[test]
    fn test_unknown_destination_is_an_unmet_requirement() {
        let campaign = two_region_campaign();
        let payload = ActionPayload::Travel {
            destination: RegionId::new("atlantis"),
            approach: TravelApproach::Direct,
        };
        let result = TravelResolver
            .preview(&campaign, &payload, &EngineConfig::default())
            .unwrap();
        assert!(!result.traversable);
        assert!(result.alternatives.is_empty());
    }
}
