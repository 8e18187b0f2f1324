//! Open violence against an NPC.

use hinge_core::{
    tags, Action, ActionPayload, ActionType, Campaign, CostPreview, Disposition, DormantThread,
    EventPayload, ProposalResult, Severity, ThreadConsequence, TriggerCondition,
};
use tracing::info;

use super::Preview;
use crate::config::EngineConfig;
use crate::error::{ResolverError, ResolverResult};
use crate::resolver::{expect_payload, Resolver, ResolverContext};

/// Opposed d20 rolls; each enhancement the player holds adds a flat bonus.
///
/// Win or lose, the target turns hostile and the fight is a hinge moment.
/// A victory over a faction member leaves a dormant retaliation thread.
#[derive(Debug, Default, Clone)]
pub struct CombatResolver;

impl Resolver for CombatResolver {
    fn action_type(&self) -> ActionType {
        ActionType::InitiateCombat
    }

    fn description(&self) -> &str {
        "Attack someone in the current region"
    }

    fn preview(&self, state: &Campaign, payload: &ActionPayload, config: &EngineConfig) -> ResolverResult<ProposalResult> {
        let ActionPayload::InitiateCombat { target } = payload else {
            return Err(ResolverError::PayloadMismatch {
                expected: ActionType::InitiateCombat,
                found: payload.action_type(),
            });
        };
        let Some(npc) = state.npcs.get(target) else {
            return Ok(Preview::unknown(ActionType::InitiateCombat, "target", target));
        };

        let mut preview = Preview::new(ActionType::InitiateCombat);
        preview.require(
            format!("{} is in {}", npc.name, state.player.current_region),
            npc.region == state.player.current_region,
        );
        let mut cost = CostPreview {
            exposure: config.combat.exposure,
            ..CostPreview::default()
        };
        if let Some(faction) = &npc.faction {
            cost.standing
                .push((faction.clone(), -config.combat.standing_penalty));
            cost.notes
                .push(format!("{faction} will remember a victory"));
        }
        cost.notes
            .push(format!("{} will be hostile afterwards", npc.name));
        preview.with_cost(cost);
        Ok(preview.build())
    }

    fn resolve(&self, state: &mut Campaign, action: &Action, ctx: &mut ResolverContext<'_>) -> ResolverResult<()> {
        let target = expect_payload!(action, ActionType::InitiateCombat,
            ActionPayload::InitiateCombat { target } => target);
        let config = ctx.config;
        let npc = state
            .npcs
            .get(target)
            .cloned()
            .ok_or_else(|| ResolverError::unknown("target", target))?;

        ctx.charge(
            state,
            &CostPreview {
                exposure: config.combat.exposure,
                ..CostPreview::default()
            },
        );

        let bonus = config.combat.enhancement_bonus * state.player.enhancements.len() as u32;
        let player_roll = ctx.roll(20) + bonus;
        let opponent_roll = ctx.roll(20);
        let victory = player_roll > opponent_roll;
        info!(target = %target, player_roll, opponent_roll, victory, "combat_resolved");

        let mut combat_tags = vec![tags::COMBAT.to_string(), tags::npc(target)];
        if let Some(faction) = &npc.faction {
            combat_tags.push(tags::faction(faction));
        }
        ctx.emit(
            EventPayload::CombatResolved {
                target: target.clone(),
                victory,
                player_roll,
                opponent_roll,
            },
            combat_tags,
        );

        if npc.disposition != Disposition::Hostile {
            if let Some(entry) = state.npcs.get_mut(target) {
                entry.disposition = Disposition::Hostile;
            }
            ctx.emit(
                EventPayload::DispositionShifted {
                    npc: target.clone(),
                    from: npc.disposition,
                    to: Disposition::Hostile,
                    reason: "attacked".to_string(),
                },
                vec![tags::npc(target)],
            );
        }

        if let Some(faction) = &npc.faction {
            ctx.shift_standing(
                state,
                faction,
                -config.combat.standing_penalty,
                &format!("attacked {}", npc.name),
                vec![tags::COMBAT.to_string()],
            )?;
        }

        let situation = format!("confronted {}", npc.name);
        let choice = if victory { "fought and won" } else { "fought and lost" };
        let index = state
            .record_hinge(action.action_id.clone(), situation.as_str(), choice, "")
            .index();
        ctx.emit(
            EventPayload::HingeRecorded {
                index,
                situation,
                choice: choice.to_string(),
            },
            vec!["hinge".to_string(), tags::npc(target)],
        );

        if !victory {
            ctx.charge(
                state,
                &CostPreview {
                    credits: config.combat.defeat_credit_loss,
                    ..CostPreview::default()
                },
            );
            return Ok(());
        }

        if let Some(faction) = npc.faction {
            let thread_id = format!("{}-retaliation", action.action_id);
            state.queue_thread(DormantThread::new(
                thread_id.clone(),
                action.action_id.clone(),
                TriggerCondition::any([tags::faction(&faction)]).not_before(ctx.turn + 1),
                ThreadConsequence {
                    summary: format!("{faction} avenges {}", npc.name),
                    standing_shifts: vec![(faction.clone(), -5)],
                    disposition_shifts: Vec::new(),
                    exposure: 5,
                },
                Severity::Moderate,
                ctx.turn,
            ));
            ctx.emit(
                EventPayload::ThreadQueued {
                    thread: thread_id.into(),
                    severity: Severity::Moderate,
                },
                vec![tags::faction(&faction)],
            );
        }
        Ok(())
    }
}
