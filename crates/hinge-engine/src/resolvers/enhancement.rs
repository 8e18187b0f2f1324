//! Accepting enhancements, and the leverage that comes with them.

use hinge_core::{
    tags, Action, ActionPayload, ActionType, Campaign, Enhancement, EventPayload, ProposalResult,
};
use tracing::info;

use super::Preview;
use crate::config::EngineConfig;
use crate::error::{ResolverError, ResolverResult};
use crate::leverage;
use crate::resolver::{expect_payload, Resolver, ResolverContext};

/// Grants an offered enhancement. Every grant is a hinge moment and opens
/// a demand the offering faction will escalate until it is answered.
#[derive(Debug, Default, Clone)]
pub struct EnhancementResolver;

impl Resolver for EnhancementResolver {
    fn action_type(&self) -> ActionType {
        ActionType::AcceptEnhancement
    }

    fn description(&self) -> &str {
        "Accept a faction's enhancement in exchange for future leverage"
    }

    fn preview(&self, state: &Campaign, payload: &ActionPayload, config: &EngineConfig) -> ResolverResult<ProposalResult> {
        let ActionPayload::AcceptEnhancement { offer: offer_id } = payload else {
            return Err(ResolverError::PayloadMismatch {
                expected: ActionType::AcceptEnhancement,
                found: payload.action_type(),
            });
        };
        let Some(offer) = state.enhancement_offers.get(offer_id) else {
            return Ok(Preview::unknown(ActionType::AcceptEnhancement, "offer", offer_id));
        };

        let standing = state.standing(&offer.faction).unwrap_or_default();
        let mut preview = Preview::new(ActionType::AcceptEnhancement);
        preview
            .require(format!("{} is still on offer", offer.name), !offer.taken)
            .require(
                format!("standing with {} at least {} (have {standing})", offer.faction, offer.min_standing),
                standing >= offer.min_standing,
            );

        let deadline = state.turn_count + 1 + config.leverage.deadline_turns;
        let cost = preview.cost_mut();
        cost.notes.push(format!(
            "{} will call in a {:?} demand by turn {deadline}",
            offer.faction, offer.weight
        ));
        if let Some(rival) = &offer.at_expense_of {
            cost.notes
                .push(format!("answering it will cost you with {rival}"));
        }
        Ok(preview.build())
    }

    fn resolve(&self, state: &mut Campaign, action: &Action, ctx: &mut ResolverContext<'_>) -> ResolverResult<()> {
        let offer_id = expect_payload!(action, ActionType::AcceptEnhancement,
            ActionPayload::AcceptEnhancement { offer } => offer);
        let offer = state
            .enhancement_offers
            .get_mut(offer_id)
            .ok_or_else(|| ResolverError::unknown("offer", offer_id))?;
        if offer.taken {
            return Err(ResolverError::inconsistent(format!("offer {offer_id} was already taken")));
        }
        offer.taken = true;
        let offer = offer.clone();

        state.player.enhancements.push(Enhancement {
            id: offer_id.clone(),
            name: offer.name.clone(),
            faction: offer.faction.clone(),
            granted_turn: ctx.turn,
            leverage_weight: offer.weight,
            demand_text: offer.demand_text.clone(),
            at_expense_of: offer.at_expense_of.clone(),
            next_demand_turn: None,
            demands_issued: 0,
        });
        info!(enhancement = %offer_id, faction = %offer.faction, "enhancement_granted");
        ctx.emit(
            EventPayload::EnhancementGranted {
                enhancement: offer_id.clone(),
                faction: offer.faction.clone(),
            },
            vec![tags::faction(&offer.faction), format!("enhancement:{offer_id}")],
        );

        leverage::issue_demand(state, offer_id, ctx)?;

        let situation = format!("{} offered {}", offer.faction, offer.name);
        let choice = format!("accepted {}", offer.name);
        let hinge = state.record_hinge(
            action.action_id.clone(),
            situation.clone(),
            choice.clone(),
            offer.demand_text.clone(),
        );
        let index = hinge.index();
        ctx.emit(
            EventPayload::HingeRecorded {
                index,
                situation,
                choice,
            },
            vec!["hinge".to_string(), tags::faction(&offer.faction)],
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolvers::test_support::{action, two_region_campaign};
    use hinge_core::{DemandState, DemandWeight, EnhancementId, EnhancementOffer, FactionId};

    fn with_offer(min_standing: i32) -> Campaign {
        let mut campaign = two_region_campaign();
        campaign.enhancement_offers.insert(
            EnhancementId::new("lungs"),
            EnhancementOffer {
                name: "Tidal lungs".to_string(),
                faction: FactionId::new("syndicate"),
                demand_text: "carry a sealed crate past the guild".to_string(),
                weight: DemandWeight::Medium,
                min_standing,
                at_expense_of: Some(FactionId::new("guild")),
                taken: false,
            },
        );
        campaign
    }

    #[test]
    fn test_offer_requires_standing() {
        let campaign = with_offer(10);
        let preview = EnhancementResolver
            .preview(
                &campaign,
                &ActionPayload::AcceptEnhancement {
                    offer: EnhancementId::new("lungs"),
                },
                &EngineConfig::default(),
            )
            .unwrap();
        assert!(!preview.traversable);
        assert_eq!(preview.failed_requirements().len(), 1);
    }

    #[test]
    fn test_accepting_opens_demand_and_records_hinge() {
        let config = EngineConfig::default();
        let mut campaign = with_offer(0);
        campaign.turn_count = 1;
        let act = action(
            &campaign,
            "e1",
            ActionPayload::AcceptEnhancement {
                offer: EnhancementId::new("lungs"),
            },
        );
        let mut ctx = ResolverContext::new(&config, &act.action_id, 1, 0, 0);
        EnhancementResolver.resolve(&mut campaign, &act, &mut ctx).unwrap();

        assert!(campaign.enhancement_offers[&EnhancementId::new("lungs")].taken);
        assert_eq!(campaign.player.enhancements.len(), 1);
        let demand = campaign.open_demands().next().unwrap();
        assert_eq!(demand.deadline, 1 + config.leverage.deadline_turns);
        assert_eq!(demand.state, DemandState::Offered);
        assert_eq!(campaign.hinges().len(), 1);
        assert_eq!(campaign.hinges()[0].choice(), "accepted Tidal lungs");

        let again = EnhancementResolver.resolve(&mut campaign, &act, &mut ctx);
        assert!(again.is_err());
    }
}
