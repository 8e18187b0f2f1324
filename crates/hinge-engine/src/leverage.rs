//! Leverage demand lifecycle.
//!
//! Demands move `Offered -> Active -> Escalating -> Called` as `turn_count`
//! approaches their deadline, and leave the open set only when the player
//! complies or resists. Nothing expires silently: a called demand stays at
//! the top of every state view until it is answered.

use hinge_core::{
    tags, ActionId, ActionType, Campaign, CostPreview, DemandId, DemandResolution, DemandResponse, DemandState,
    DemandWeight, DormantThread, EnhancementId, EventPayload, LeverageDemand, ProposalResult,
    Severity, ThreadConsequence, TriggerCondition,
};
use tracing::{debug, info};

use crate::config::LeverageConfig;
use crate::error::{ResolverError, ResolverResult};
use crate::resolver::ResolverContext;
use crate::resolvers::{credits_requirement, Preview};

fn demand_tags(demand: &LeverageDemand) -> Vec<String> {
    vec![tags::faction(&demand.faction), format!("demand:{}", demand.id)]
}

fn severity_for(weight: DemandWeight) -> Severity {
    match weight {
        DemandWeight::Light => Severity::Minor,
        DemandWeight::Medium => Severity::Moderate,
        DemandWeight::Heavy => Severity::Major,
    }
}

/// State a demand should be in on `turn`, never moving it backwards.
pub fn target_state(demand: &LeverageDemand, turn: u64, config: &LeverageConfig) -> DemandState {
    let target = if turn >= demand.deadline {
        DemandState::Called
    } else if turn + config.escalation_window >= demand.deadline {
        DemandState::Escalating
    } else if turn > demand.created_turn {
        DemandState::Active
    } else {
        DemandState::Offered
    };
    target.max(demand.state)
}

/// Open a new demand backed by an enhancement the player holds.
pub fn issue_demand(
    state: &mut Campaign,
    enhancement_id: &EnhancementId,
    ctx: &mut ResolverContext<'_>,
) -> ResolverResult<DemandId> {
    let turn = ctx.turn;
    let deadline_turns = ctx.config.leverage.deadline_turns;
    let enhancement = state
        .player
        .enhancement_mut(enhancement_id)
        .ok_or_else(|| ResolverError::unknown("enhancement", enhancement_id))?;

    enhancement.demands_issued += 1;
    enhancement.next_demand_turn = None;
    let demand = LeverageDemand {
        id: DemandId::new(format!("{}-{}", enhancement.id, enhancement.demands_issued)),
        faction: enhancement.faction.clone(),
        source_enhancement: enhancement.id.clone(),
        text: enhancement.demand_text.clone(),
        deadline: turn + deadline_turns,
        state: DemandState::Offered,
        weight: enhancement.leverage_weight,
        created_turn: turn,
        at_expense_of: enhancement.at_expense_of.clone(),
        negotiated: false,
        resolution: None,
    };

    info!(
        demand = %demand.id,
        faction = %demand.faction,
        deadline = demand.deadline,
        "demand_issued"
    );
    ctx.emit(
        EventPayload::DemandCreated {
            demand: demand.id.clone(),
            faction: demand.faction.clone(),
            deadline: demand.deadline,
            weight: demand.weight,
        },
        demand_tags(&demand),
    );
    let id = demand.id.clone();
    state.demands.insert(id.clone(), demand);
    Ok(id)
}

/// Per-turn upkeep: issue recurring demands and escalate open ones.
pub fn advance(state: &mut Campaign, ctx: &mut ResolverContext<'_>) -> ResolverResult<()> {
    let turn = ctx.turn;

    let due: Vec<EnhancementId> = state
        .player
        .enhancements
        .iter()
        .filter(|e| e.next_demand_turn.is_some_and(|t| t <= turn))
        .filter(|e| !state.open_demands().any(|d| d.source_enhancement == e.id))
        .map(|e| e.id.clone())
        .collect();
    for enhancement in due {
        issue_demand(state, &enhancement, ctx)?;
    }

    let engine = ctx.config;
    let mut changes = Vec::new();
    for demand in state.demands.values_mut().filter(|d| d.is_open()) {
        let next = target_state(demand, turn, &engine.leverage);
        if next != demand.state {
            changes.push((demand.id.clone(), demand.faction.clone(), demand.state, next));
            demand.state = next;
        }
    }

    for (demand, faction, from, to) in changes {
        debug!(demand = %demand, %from, %to, turn, "demand_advanced");
        let mut event_tags = vec![tags::faction(&faction), format!("demand:{demand}")];
        if to >= DemandState::Escalating {
            event_tags.push("demand_escalated".to_string());
        }
        ctx.emit(
            EventPayload::DemandStateChanged {
                demand,
                faction,
                from,
                to,
            },
            event_tags,
        );
    }
    Ok(())
}

/// Preview of answering a demand.
pub fn preview_response(
    state: &Campaign,
    demand_id: &DemandId,
    response: DemandResponse,
    config: &LeverageConfig,
) -> ProposalResult {
    let Some(demand) = state.demands.get(demand_id) else {
        return Preview::unknown(ActionType::RespondToDemand, "demand", demand_id);
    };

    let factor = demand.weight.factor();
    let mut preview = Preview::new(ActionType::RespondToDemand);
    preview.require(format!("{}'s demand is still open", demand.faction), demand.is_open());

    let mut cost = CostPreview::default();
    match response {
        DemandResponse::Comply => {
            let credits = config.comply_credit_cost * factor;
            let r = credits_requirement(state.player.credits, credits);
            preview.require(r.description, r.met);
            cost.credits = credits;
            cost.standing
                .push((demand.faction.clone(), config.comply_standing_gain));
            if let Some(other) = &demand.at_expense_of {
                cost.standing
                    .push((other.clone(), -config.comply_standing_cost * factor as i32));
            }
            cost.notes.push("future demands will weigh less".to_string());
        }
        DemandResponse::Resist => {
            cost.standing
                .push((demand.faction.clone(), -config.resist_standing_penalty * factor as i32));
            cost.notes
                .push(format!("{} will retaliate in time", demand.faction));
            cost.notes.push("future demands will weigh more".to_string());
        }
        DemandResponse::Negotiate => {
            preview.require("demand has not been negotiated before", !demand.negotiated);
            let credits = config.comply_credit_cost * factor / 2;
            let r = credits_requirement(state.player.credits, credits);
            preview.require(r.description, r.met);
            cost.credits = credits;
            cost.notes.push(format!(
                "deadline moves to turn {}",
                demand.deadline.max(state.turn_count + 1) + config.negotiation_extension
            ));
        }
    }
    preview.with_cost(cost);
    preview.build()
}

/// Answer a demand.
pub fn respond(
    state: &mut Campaign,
    demand_id: &DemandId,
    response: DemandResponse,
    action_id: &ActionId,
    ctx: &mut ResolverContext<'_>,
) -> ResolverResult<()> {
    let turn = ctx.turn;
    let engine = ctx.config;
    let config = &engine.leverage;
    let demand = state
        .demands
        .get(demand_id)
        .cloned()
        .ok_or_else(|| ResolverError::unknown("demand", demand_id))?;
    if !demand.is_open() {
        return Err(ResolverError::inconsistent(format!("demand {demand_id} is already resolved")));
    }
    let factor = demand.weight.factor();

    let new_weight = match response {
        DemandResponse::Comply => {
            ctx.charge(
                state,
                &CostPreview {
                    credits: config.comply_credit_cost * factor,
                    ..CostPreview::default()
                },
            );
            ctx.shift_standing(
                state,
                &demand.faction,
                config.comply_standing_gain,
                "complied with demand",
                Vec::new(),
            )?;
            if let Some(other) = &demand.at_expense_of {
                ctx.shift_standing(
                    state,
                    other,
                    -config.comply_standing_cost * factor as i32,
                    "served a rival's demand",
                    Vec::new(),
                )?;
            }
            demand.weight.lighter()
        }
        DemandResponse::Resist => {
            ctx.shift_standing(
                state,
                &demand.faction,
                -config.resist_standing_penalty * factor as i32,
                "resisted demand",
                vec![tags::BETRAYAL.to_string()],
            )?;

            let thread_id = format!("{demand_id}-retaliation");
            let mut trigger_tags = vec![tags::faction(&demand.faction)];
            trigger_tags.extend(
                state
                    .regions
                    .iter()
                    .filter(|(_, r)| r.controlling_faction.as_ref() == Some(&demand.faction))
                    .map(|(id, _)| tags::region_entered(id)),
            );
            let severity = severity_for(demand.weight);
            let consequence = ThreadConsequence {
                summary: format!("{} moves against you for your defiance", demand.faction),
                standing_shifts: Vec::new(),
                disposition_shifts: state
                    .npcs_of(&demand.faction)
                    .map(|(id, _)| (id.clone(), -1))
                    .collect(),
                exposure: 5 * factor as i32,
            };
            state.queue_thread(DormantThread::new(
                thread_id.clone(),
                action_id.clone(),
                TriggerCondition::any(trigger_tags).not_before(turn + config.retaliation_delay),
                consequence,
                severity,
                turn,
            ));
            ctx.emit(
                EventPayload::ThreadQueued {
                    thread: thread_id.into(),
                    severity,
                },
                vec![tags::faction(&demand.faction)],
            );
            demand.weight.heavier()
        }
        DemandResponse::Negotiate => {
            if demand.negotiated {
                return Err(ResolverError::inconsistent(format!(
                    "demand {demand_id} was already negotiated"
                )));
            }
            ctx.charge(
                state,
                &CostPreview {
                    credits: config.comply_credit_cost * factor / 2,
                    ..CostPreview::default()
                },
            );
            let new_deadline = demand.deadline.max(turn) + config.negotiation_extension;
            if let Some(entry) = state.demands.get_mut(demand_id) {
                entry.negotiated = true;
                entry.deadline = new_deadline;
                entry.state = DemandState::Active;
            }
            info!(demand = %demand_id, deadline = new_deadline, "demand_negotiated");
            ctx.emit(
                EventPayload::DemandStateChanged {
                    demand: demand_id.clone(),
                    faction: demand.faction.clone(),
                    from: demand.state,
                    to: DemandState::Active,
                },
                demand_tags(&demand),
            );
            return Ok(());
        }
    };

    if let Some(entry) = state.demands.get_mut(demand_id) {
        entry.resolution = Some(DemandResolution { response, turn });
        entry.weight = new_weight;
    }
    if let Some(enhancement) = state.player.enhancement_mut(&demand.source_enhancement) {
        enhancement.leverage_weight = new_weight;
        enhancement.next_demand_turn = Some(turn + config.recurrence_turns);
    }

    info!(demand = %demand_id, %response, weight = ?new_weight, "demand_resolved");
    ctx.emit(
        EventPayload::DemandResolved {
            demand: demand_id.clone(),
            response,
            weight: new_weight,
        },
        demand_tags(&demand),
    );
    Ok(())
}
