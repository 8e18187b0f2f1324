//! Pure turn pipeline.
//!
//! `validate -> resolve -> leverage upkeep -> cascade -> commit` over a
//! private copy of the campaign. Nothing here does I/O or locking; the
//! orchestrator wraps it with those. Because the seed is either supplied
//! or derived from `(campaign.seed, action_id, state_version)`, replaying
//! the same actions from the same initial state yields identical campaigns.

use hinge_core::{
    Action, ActionPayload, Campaign, DemandState, Disposition, Event, EventPayload, NarrativeHook,
    ProposalResult, TurnResult,
};
use tracing::{debug, info};

use crate::cascade::CascadeProcessor;
use crate::config::EngineConfig;
use crate::error::{ResolverError, ResolverResult, TurnError};
use crate::resolver::{derive_seed, ResolverContext, ResolverRegistry};
use crate::{feed, leverage, validator};

/// The committed campaign and the result describing how it got there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub campaign: Campaign,
    pub result: TurnResult,
}

/// Resolver registry plus the configuration every turn runs with.
#[derive(Debug)]
pub struct TurnPipeline {
    registry: ResolverRegistry,
    config: EngineConfig,
}

impl TurnPipeline {
    pub fn new(registry: ResolverRegistry, config: EngineConfig) -> Self {
        Self { registry, config }
    }

    /// Pipeline with every built-in resolver.
    pub fn standard(config: EngineConfig) -> Self {
        Self::new(ResolverRegistry::standard(), config)
    }

    pub fn registry(&self) -> &ResolverRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Answer a proposal. Never mutates anything.
    pub fn preview(&self, campaign: &Campaign, payload: &ActionPayload) -> ResolverResult<ProposalResult> {
        validator::preview(&self.registry, campaign, payload, &self.config)
    }

    /// The seed `action` resolves with against `campaign`.
    pub fn seed_for(&self, campaign: &Campaign, action: &Action) -> u64 {
        action
            .seed
            .unwrap_or_else(|| derive_seed(campaign.seed, &action.action_id, action.state_version))
    }

    /// Resolve one action against `campaign`, producing the next campaign.
    ///
    /// On any error the input is untouched and nothing should be persisted.
    pub fn execute(&self, campaign: &Campaign, action: &Action) -> Result<TurnOutcome, TurnError> {
        if campaign.has_seen(&action.action_id) {
            return Err(TurnError::Duplicate(action.action_id.clone()));
        }
        if action.state_version != campaign.state_version {
            return Err(TurnError::StaleState {
                submitted: action.state_version,
                current: campaign.state_version,
            });
        }
        validator::validate(&self.registry, campaign, &action.payload, &self.config)?;

        let resolver = self.registry.get(action.action_type())?;
        let seed = self.seed_for(campaign, action);
        let mut next = campaign.clone();
        next.turn_count += 1;
        let turn = next.turn_count;

        let mut ctx = ResolverContext::new(&self.config, &action.action_id, turn, seed, 0);
        ctx.emit(EventPayload::TurnStarted { turn }, Vec::new());
        resolver.resolve(&mut next, action, &mut ctx)?;
        leverage::advance(&mut next, &mut ctx)?;
        let end_seq = ctx.next_seq();
        let mut events = ctx.into_events();
        debug!(action = %action.action_id, root_events = events.len(), "resolver_finished");

        let mut truncated = false;
        if self.config.cascade.max_depth > 0 {
            let outcome = CascadeProcessor::new(&self.config.cascade).run(&mut next, &events);
            truncated = outcome.truncated;
            debug!(
                action = %action.action_id,
                derived = outcome.events.len(),
                max_depth = outcome.max_depth_reached,
                "cascade_finished"
            );
            events.extend(outcome.events);
        }

        if !next.extends_hinges_of(campaign) {
            return Err(ResolverError::inconsistent("hinge log was rewritten during resolution").into());
        }

        next.state_version += 1;
        events.push(Event::root(
            &action.action_id,
            end_seq,
            turn,
            EventPayload::TurnEnded {
                turn,
                state_version: next.state_version,
            },
            Vec::new(),
        ));
        next.remember_action(action.action_id.clone(), self.config.idempotency_window);
        next.append_events(events.iter().cloned());

        let result = TurnResult {
            action_id: action.action_id.clone(),
            success: true,
            new_state_version: next.state_version,
            turn,
            feed: feed::build(&next, &events),
            narrative_hooks: narrative_hooks(&next, &events),
            state_snapshot: next.view(),
            events,
            seed,
            truncated,
        };

        info!(
            campaign = %next.id,
            action = %action.action_id,
            action_type = %action.action_type(),
            turn,
            state_version = next.state_version,
            events = result.events.len(),
            truncated,
            "turn_resolved"
        );
        Ok(TurnOutcome {
            campaign: next,
            result,
        })
    }

    /// Apply `actions` in order, starting from `initial`.
    pub fn replay(&self, initial: &Campaign, actions: &[Action]) -> Result<Campaign, TurnError> {
        let mut campaign = initial.clone();
        for action in actions {
            campaign = self.execute(&campaign, action)?.campaign;
        }
        Ok(campaign)
    }
}

/// Cues for the narrator: hinge moments, resurfacing threads, called
/// demands, violence and relationships that hit an extreme.
fn narrative_hooks(state: &Campaign, events: &[Event]) -> Vec<NarrativeHook> {
    let npc_name = |id: &hinge_core::NpcId| {
        state
            .npcs
            .get(id)
            .map(|n| n.name.clone())
            .unwrap_or_else(|| id.to_string())
    };

    events
        .iter()
        .filter_map(|event| match &event.payload {
            EventPayload::HingeRecorded { situation, choice, .. } => Some(NarrativeHook {
                kind: "hinge".to_string(),
                subject: choice.clone(),
                detail: situation.clone(),
            }),
            EventPayload::ThreadSurfaced { thread, summary, .. } => Some(NarrativeHook {
                kind: "thread".to_string(),
                subject: thread.to_string(),
                detail: summary.clone(),
            }),
            EventPayload::DemandStateChanged {
                demand,
                to: DemandState::Called,
                ..
            } => state.demands.get(demand).map(|d| NarrativeHook {
                kind: "demand".to_string(),
                subject: d.faction.to_string(),
                detail: d.text.clone(),
            }),
            EventPayload::CombatResolved { target, victory, .. } => Some(NarrativeHook {
                kind: "combat".to_string(),
                subject: npc_name(target),
                detail: if *victory { "victory" } else { "defeat" }.to_string(),
            }),
            EventPayload::DispositionShifted { npc, to, .. }
                if matches!(to, Disposition::Hostile | Disposition::Loyal) =>
            {
                Some(NarrativeHook {
                    kind: "relationship".to_string(),
                    subject: npc_name(npc),
                    detail: to.to_string(),
                })
            }
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolvers::test_support::{action, two_region_campaign};
    use hinge_core::{EventType, RegionId, TravelApproach};

    fn risky_travel(campaign: &Campaign, id: &str) -> Action {
        action(
            campaign,
            id,
            ActionPayload::Travel {
                destination: RegionId::new("market"),
                approach: TravelApproach::RiskyTraversal,
            },
        )
    }

    #[test]
    fn test_execute_advances_turn_and_version() {
        let pipeline = TurnPipeline::standard(EngineConfig::default());
        let campaign = two_region_campaign();
        let outcome = pipeline.execute(&campaign, &risky_travel(&campaign, "t1")).unwrap();

        assert_eq!(outcome.campaign.state_version, campaign.state_version + 1);
        assert_eq!(outcome.campaign.turn_count, campaign.turn_count + 1);
        assert_eq!(outcome.result.new_state_version, outcome.campaign.state_version);
        let events = &outcome.result.events;
        assert_eq!(events.first().map(|e| e.event_type), Some(EventType::TurnStarted));
        assert_eq!(events.last().map(|e| e.event_type), Some(EventType::TurnEnded));
        assert!(outcome.campaign.has_seen(&"t1".into()));
    }

    #[test]
    fn test_trespass_cascades_to_controller() {
        let pipeline = TurnPipeline::standard(EngineConfig::default());
        let campaign = two_region_campaign();
        let outcome = pipeline.execute(&campaign, &risky_travel(&campaign, "t1")).unwrap();

        let derived: Vec<_> = outcome.result.events.iter().filter(|e| e.depth > 0).collect();
        assert!(derived
            .iter()
            .any(|e| e.event_type == EventType::FactionStandingChanged));
        assert_eq!(
            outcome.campaign.standing(&"syndicate".into()),
            Some(-pipeline.config().cascade.trespass_penalty)
        );
    }

    #[test]
    fn test_rejected_action_leaves_campaign_untouched() {
        let pipeline = TurnPipeline::standard(EngineConfig::default());
        let campaign = two_region_campaign();
        let before = campaign.clone();
        let act = action(
            &campaign,
            "t1",
            ActionPayload::Travel {
                destination: RegionId::new("market"),
                approach: TravelApproach::Direct,
            },
        );

        let err = pipeline.execute(&campaign, &act).unwrap_err();
        assert!(matches!(err, TurnError::RequirementNotMet { .. }));
        assert_eq!(campaign, before);
    }

    #[test]
    fn test_seen_action_is_duplicate() {
        let pipeline = TurnPipeline::standard(EngineConfig::default());
        let campaign = two_region_campaign();
        let act = risky_travel(&campaign, "t1");
        let outcome = pipeline.execute(&campaign, &act).unwrap();

        let err = pipeline.execute(&outcome.campaign, &act).unwrap_err();
        assert!(matches!(err, TurnError::Duplicate(_)));
    }

    #[test]
    fn test_stale_version_is_rejected() {
        let pipeline = TurnPipeline::standard(EngineConfig::default());
        let campaign = two_region_campaign();
        let mut act = risky_travel(&campaign, "t1");
        act.state_version += 1;
        assert!(matches!(
            pipeline.execute(&campaign, &act),
            Err(TurnError::StaleState { .. })
        ));
    }

    #[test]
    fn test_disabled_cascade_emits_no_derived_events() {
        let pipeline = TurnPipeline::standard(EngineConfig::without_cascade());
        let campaign = two_region_campaign();
        let outcome = pipeline.execute(&campaign, &risky_travel(&campaign, "t1")).unwrap();
        assert!(outcome.result.events.iter().all(|e| e.depth == 0));
        assert!(!outcome.result.truncated);
    }
}
