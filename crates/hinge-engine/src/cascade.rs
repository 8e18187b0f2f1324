//! Consequence cascade.
//!
//! Breadth-first propagation of resolver events through the campaign's
//! relationship graph. Each event is processed once; effects it implies
//! are applied immediately and become derived events at `depth + 1`, which
//! are queued in turn. Effects implied by events already at the depth
//! bound are dropped; the run records a single [`EventPayload::CascadeTruncated`]
//! marker counting everything dropped. The bound never exceeds
//! [`MAX_CASCADE_DEPTH`], whatever the config says.
//!
//! Each memory trigger fires at most once per run, so a trigger cannot
//! feed on the disposition change it caused.
//!
//! Rules, evaluated in order for every processed event:
//!
//! 1. standing change on faction `A` shifts every linked faction by
//!    `delta * multiplier / 1000`
//! 2. a risky traversal costs standing with the region's controller
//! 3. a large standing change moves the faction's NPCs one tier
//! 4. NPC memory triggers matching the event's tags fire
//! 5. dormant threads whose trigger matches the event surface
//! 6. a surfaced thread applies its consequence

use std::collections::{HashSet, VecDeque};

use hinge_core::{
    tags, Campaign, DormantThread, Event, EventId, EventPayload, FactionId, NpcId, ThreadId,
};
use tracing::{debug, warn};

use crate::config::{CascadeConfig, MAX_CASCADE_DEPTH};

/// Everything the cascade derived from one set of seed events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadeOutcome {
    /// Derived events in processing order; seeds are not repeated.
    pub events: Vec<Event>,
    pub truncated: bool,
    pub max_depth_reached: u8,
}

/// A planned state change, applied only if it actually changes something.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Effect {
    Standing {
        faction: FactionId,
        delta: i32,
        reason: String,
    },
    Disposition {
        npc: NpcId,
        steps: i32,
        /// Memory trigger to mark as fired.
        trigger: Option<usize>,
        reason: String,
    },
    SurfaceThread(ThreadId),
    Exposure(i32),
}

/// Runs the cascade rules over a campaign.
#[derive(Debug, Clone, Copy)]
pub struct CascadeProcessor<'a> {
    config: &'a CascadeConfig,
}

impl<'a> CascadeProcessor<'a> {
    pub fn new(config: &'a CascadeConfig) -> Self {
        Self { config }
    }

    /// Effective depth bound: the configured one, capped at [`MAX_CASCADE_DEPTH`].
    pub fn max_depth(&self) -> u8 {
        self.config.max_depth.min(MAX_CASCADE_DEPTH)
    }

    /// Propagate `seeds` through `state`, mutating it.
    pub fn run(&self, state: &mut Campaign, seeds: &[Event]) -> CascadeOutcome {
        let max_depth = self.max_depth();
        let mut outcome = CascadeOutcome::default();
        let mut processed: HashSet<EventId> = HashSet::new();
        let mut fired: HashSet<(NpcId, usize)> = HashSet::new();
        let mut marker: Option<usize> = None;
        let mut queue: VecDeque<Event> = seeds.iter().cloned().collect();

        while let Some(event) = queue.pop_front() {
            if !processed.insert(event.event_id.clone()) {
                continue;
            }
            let effects = self.plan(state, &event, &fired);
            if effects.is_empty() {
                continue;
            }

            if event.depth >= max_depth {
                warn!(
                    campaign = %state.id,
                    event = %event.event_id,
                    depth = event.depth,
                    pending = effects.len(),
                    "cascade_truncated"
                );
                outcome.truncated = true;
                match marker {
                    Some(i) => {
                        if let EventPayload::CascadeTruncated { pending, .. } = &mut outcome.events[i].payload {
                            *pending += effects.len();
                        }
                    }
                    None => {
                        let mut first = event.derive(
                            1,
                            EventPayload::CascadeTruncated {
                                depth: event.depth,
                                pending: effects.len(),
                            },
                            Vec::new(),
                        );
                        first.depth = event.depth;
                        marker = Some(outcome.events.len());
                        outcome.events.push(first);
                    }
                }
                continue;
            }

            let mut n = 1;
            for effect in effects {
                if let Effect::Disposition {
                    npc,
                    trigger: Some(i),
                    ..
                } = &effect
                {
                    fired.insert((npc.clone(), *i));
                }
                let Some((payload, event_tags)) = self.apply(state, effect, event.turn) else {
                    continue;
                };
                let child = event.derive(n, payload, event_tags);
                n += 1;
                debug!(
                    event = %child.event_id,
                    kind = child.event_type.as_str(),
                    depth = child.depth,
                    "cascade_effect"
                );
                outcome.max_depth_reached = outcome.max_depth_reached.max(child.depth);
                outcome.events.push(child.clone());
                queue.push_back(child);
            }
        }
        outcome
    }

    fn plan(
        &self,
        state: &Campaign,
        event: &Event,
        fired: &HashSet<(NpcId, usize)>,
    ) -> Vec<Effect> {
        let mut effects = Vec::new();

        match &event.payload {
            EventPayload::FactionStandingChanged { faction, delta, .. } => {
                for link in state.links_from(faction) {
                    let propagated = link.propagate(*delta);
                    if propagated.abs() >= self.config.min_propagated_delta {
                        effects.push(Effect::Standing {
                            faction: link.to.clone(),
                            delta: propagated,
                            reason: format!("ties to {faction}"),
                        });
                    }
                }
                if delta.abs() >= self.config.affiliate_shift_threshold {
                    for (npc, _) in state.npcs_of(faction) {
                        effects.push(Effect::Disposition {
                            npc: npc.clone(),
                            steps: delta.signum(),
                            trigger: None,
                            reason: format!("standing with {faction} changed"),
                        });
                    }
                }
            }
            EventPayload::RiskTaken { region, .. } => {
                if let Some(controller) = state
                    .regions
                    .get(region)
                    .and_then(|r| r.controlling_faction.clone())
                {
                    effects.push(Effect::Standing {
                        faction: controller,
                        delta: -self.config.trespass_penalty,
                        reason: format!("trespassed in {region}"),
                    });
                }
            }
            _ => {}
        }

        for (npc_id, npc) in &state.npcs {
            for (i, trigger) in npc.memory_triggers.iter().enumerate() {
                if trigger.matches(&event.tags) && !fired.contains(&(npc_id.clone(), i)) {
                    effects.push(Effect::Disposition {
                        npc: npc_id.clone(),
                        steps: trigger.shift,
                        trigger: Some(i),
                        reason: format!("remembers {}", trigger.condition),
                    });
                }
            }
        }

        effects.extend(
            state
                .threads()
                .iter()
                .filter(|t| t.is_triggered_by(&event.tags, event.turn))
                .map(|t| Effect::SurfaceThread(t.id().clone())),
        );

        if let EventPayload::ThreadSurfaced { thread, .. } = &event.payload {
            if let Some(thread) = state.thread(thread) {
                effects.extend(consequence_effects(thread));
            }
        }
        effects
    }

    fn apply(&self, state: &mut Campaign, effect: Effect, turn: u64) -> Option<(EventPayload, Vec<String>)> {
        match effect {
            Effect::Standing {
                faction,
                delta,
                reason,
            } => {
                let entry = state.factions.get_mut(&faction)?;
                let previous = entry.standing;
                let current = previous.shifted(delta);
                if current == previous {
                    return None;
                }
                entry.standing = current;
                let direction = if delta < 0 {
                    tags::standing_loss(&faction)
                } else {
                    tags::standing_gain(&faction)
                };
                Some((
                    EventPayload::FactionStandingChanged {
                        previous: previous.value(),
                        current: current.value(),
                        delta: current.value() - previous.value(),
                        reason,
                        faction: faction.clone(),
                    },
                    vec![tags::faction(&faction), direction],
                ))
            }
            Effect::Disposition {
                npc,
                steps,
                trigger,
                reason,
            } => {
                let entry = state.npcs.get_mut(&npc)?;
                if let Some(t) = trigger.and_then(|i| entry.memory_triggers.get_mut(i)) {
                    t.fired = true;
                }
                let from = entry.disposition;
                let to = from.shifted(steps);
                if to == from {
                    return None;
                }
                entry.disposition = to;
                let mut event_tags = vec![tags::npc(&npc)];
                if let Some(faction) = &entry.faction {
                    event_tags.push(tags::faction(faction));
                }
                Some((
                    EventPayload::DispositionShifted {
                        npc,
                        from,
                        to,
                        reason,
                    },
                    event_tags,
                ))
            }
            Effect::SurfaceThread(id) => {
                if !state.surface_thread(&id, turn) {
                    return None;
                }
                let thread = state.thread(&id)?;
                Some((
                    EventPayload::ThreadSurfaced {
                        thread: id.clone(),
                        summary: thread.consequence().summary.clone(),
                        severity: thread.severity(),
                    },
                    vec!["thread_surfaced".to_string(), format!("thread:{id}")],
                ))
            }
            Effect::Exposure(amount) => {
                let before = state.player.exposure;
                state.player.add_exposure(amount);
                let change = state.player.exposure - before;
                if change == 0 {
                    return None;
                }
                Some((
                    EventPayload::ResourcesChanged {
                        credits: 0,
                        social_energy: 0,
                        exposure: change,
                    },
                    Vec::new(),
                ))
            }
        }
    }
}

fn consequence_effects(thread: &DormantThread) -> Vec<Effect> {
    let consequence = thread.consequence();
    let reason = format!("{} resurfaced", thread.id());
    let mut effects: Vec<Effect> = consequence
        .standing_shifts
        .iter()
        .map(|(faction, delta)| Effect::Standing {
            faction: faction.clone(),
            delta: *delta,
            reason: reason.clone(),
        })
        .collect();
    effects.extend(consequence.disposition_shifts.iter().map(|(npc, steps)| Effect::Disposition {
        npc: npc.clone(),
        steps: *steps,
        trigger: None,
        reason: reason.clone(),
    }));
    if consequence.exposure != 0 {
        effects.push(Effect::Exposure(consequence.exposure));
    }
    effects
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MAX_CASCADE_DEPTH;
    use hinge_core::{
        ActionId, CampaignBuilder, ConnectivityTier, Disposition, MemoryTrigger, Npc, Severity,
        ThreadConsequence, TriggerCondition,
    };

    fn standing_seed(faction: &str, delta: i32) -> Event {
        let faction = FactionId::new(faction);
        Event::root(
            &ActionId::new("a"),
            0,
            1,
            EventPayload::FactionStandingChanged {
                faction: faction.clone(),
                previous: 0,
                current: delta,
                delta,
                reason: "test".to_string(),
            },
            vec![tags::faction(&faction), tags::standing_loss(&faction)],
        )
    }

    fn three_faction_cycle() -> Campaign {
        CampaignBuilder::new("cycle", "home")
            .region("home", "Home", ConnectivityTier::Embedded)
            .faction("a", "A", 0)
            .faction("b", "B", 0)
            .faction("c", "C", 0)
            .link("a", "b", 1000)
            .link("b", "c", 1000)
            .link("c", "a", 1000)
            .build()
    }

    #[test]
    fn test_link_propagates_scaled_delta() {
        let config = CascadeConfig::default();
        let mut campaign = CampaignBuilder::new("t", "home")
            .region("home", "Home", ConnectivityTier::Embedded)
            .faction("a", "A", 0)
            .faction("b", "B", 0)
            .link("a", "b", 500)
            .build();

        let outcome = CascadeProcessor::new(&config).run(&mut campaign, &[standing_seed("a", -8)]);

        assert_eq!(campaign.standing(&FactionId::new("b")), Some(-4));
        assert_eq!(outcome.events.len(), 1);
        assert_eq!(outcome.events[0].depth, 1);
        assert_eq!(outcome.events[0].cascaded_from, Some(EventId::new("a:0")));
        assert!(!outcome.truncated);
    }

    #[test]
    fn test_cycle_stops_at_max_depth_with_marker() {
        let config = CascadeConfig::default();
        let mut campaign = three_faction_cycle();

        let outcome = CascadeProcessor::new(&config).run(&mut campaign, &[standing_seed("a", -10)]);

        assert!(outcome.truncated);
        assert_eq!(outcome.max_depth_reached, MAX_CASCADE_DEPTH);
        assert!(outcome.events.iter().all(|e| e.depth <= MAX_CASCADE_DEPTH));
        let markers: Vec<_> = outcome
            .events
            .iter()
            .filter(|e| matches!(e.payload, EventPayload::CascadeTruncated { .. }))
            .collect();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].depth, MAX_CASCADE_DEPTH);
    }

    #[test]
    fn test_configured_depth_above_cap_is_clamped() {
        let config = CascadeConfig {
            max_depth: 9,
            ..CascadeConfig::default()
        };
        let mut campaign = three_faction_cycle();

        let outcome = CascadeProcessor::new(&config).run(&mut campaign, &[standing_seed("a", -10)]);

        assert!(outcome.truncated);
        assert_eq!(outcome.max_depth_reached, MAX_CASCADE_DEPTH);
        assert!(outcome.events.iter().all(|e| e.depth <= MAX_CASCADE_DEPTH));
    }

    #[test]
    fn test_branching_cycle_records_one_marker() {
        let config = CascadeConfig::default();
        let mut campaign = CampaignBuilder::new("fan", "home")
            .region("home", "Home", ConnectivityTier::Embedded)
            .faction("a", "A", 0)
            .faction("b", "B", 0)
            .faction("c", "C", 0)
            .link("a", "b", 1000)
            .link("a", "c", 1000)
            .link("b", "a", 1000)
            .link("c", "a", 1000)
            .build();

        let outcome = CascadeProcessor::new(&config).run(&mut campaign, &[standing_seed("a", -5)]);

        let capped_at_bound = outcome
            .events
            .iter()
            .filter(|e| e.depth == MAX_CASCADE_DEPTH)
            .filter(|e| !matches!(e.payload, EventPayload::CascadeTruncated { .. }))
            .count();
        assert!(capped_at_bound > 1);

        let markers: Vec<_> = outcome
            .events
            .iter()
            .filter_map(|e| match e.payload {
                EventPayload::CascadeTruncated { depth, pending } => Some((depth, pending)),
                _ => None,
            })
            .collect();
        assert_eq!(markers, vec![(MAX_CASCADE_DEPTH, capped_at_bound)]);
    }

    #[test]
    fn test_duplicate_seeds_are_processed_once() {
        let config = CascadeConfig::default();
        let mut campaign = CampaignBuilder::new("t", "home")
            .region("home", "Home", ConnectivityTier::Embedded)
            .faction("a", "A", 0)
            .faction("b", "B", 0)
            .link("a", "b", 1000)
            .build();
        let seed = standing_seed("a", -6);

        let outcome = CascadeProcessor::new(&config).run(&mut campaign, &[seed.clone(), seed]);

        assert_eq!(outcome.events.len(), 1);
        assert_eq!(campaign.standing(&FactionId::new("b")), Some(-6));
    }

    #[test]
    fn test_small_deltas_do_not_propagate() {
        let config = CascadeConfig::default();
        let mut campaign = CampaignBuilder::new("t", "home")
            .region("home", "Home", ConnectivityTier::Embedded)
            .faction("a", "A", 0)
            .faction("b", "B", 0)
            .link("a", "b", 100)
            .build();

        let outcome = CascadeProcessor::new(&config).run(&mut campaign, &[standing_seed("a", -5)]);
        assert!(outcome.events.is_empty());
    }

    #[test]
    fn test_memory_trigger_fires_once() {
        let config = CascadeConfig::default();
        let mut campaign = CampaignBuilder::new("t", "home")
            .region("home", "Home", ConnectivityTier::Embedded)
            .faction("a", "A", 0)
            .npc("vex", {
                let mut npc = Npc::new("Vex", "home");
                npc.disposition = Disposition::Warm;
                npc.memory_triggers.push(MemoryTrigger::once("faction:a", -1));
                npc
            })
            .build();

        CascadeProcessor::new(&config).run(&mut campaign, &[standing_seed("a", -2)]);
        let mut second = standing_seed("a", -2);
        second.event_id = EventId::new("b:0");
        CascadeProcessor::new(&config).run(&mut campaign, &[second]);

        let vex = &campaign.npcs[&NpcId::new("vex")];
        assert_eq!(vex.disposition, Disposition::Neutral);
        assert!(vex.memory_triggers[0].fired);
    }

    #[test]
    fn test_repeatable_trigger_cannot_feed_on_itself() {
        let config = CascadeConfig::default();
        let mut campaign = CampaignBuilder::new("t", "home")
            .region("home", "Home", ConnectivityTier::Embedded)
            .faction("a", "A", 0)
            .npc("vex", {
                let mut npc = Npc::new("Vex", "home");
                npc.faction = Some(FactionId::new("a"));
                npc.disposition = Disposition::Loyal;
                npc.memory_triggers.push(MemoryTrigger::repeatable("faction:a", -1));
                npc
            })
            .build();

        let outcome = CascadeProcessor::new(&config).run(&mut campaign, &[standing_seed("a", -2)]);

        let shifts = outcome
            .events
            .iter()
            .filter(|e| matches!(e.payload, EventPayload::DispositionShifted { .. }))
            .count();
        assert_eq!(shifts, 1);
        assert_eq!(campaign.npcs[&NpcId::new("vex")].disposition, Disposition::Warm);
        assert!(!outcome.truncated);

        // A later run may fire it again.
        let mut second = standing_seed("a", -2);
        second.event_id = EventId::new("b:0");
        CascadeProcessor::new(&config).run(&mut campaign, &[second]);
        assert_eq!(campaign.npcs[&NpcId::new("vex")].disposition, Disposition::Neutral);
    }

    #[test]
    fn test_thread_surfaces_and_applies_consequence() {
        let config = CascadeConfig::default();
        let thread = DormantThread::new(
            "debt",
            ActionId::new("earlier"),
            TriggerCondition::any(["faction:a"]),
            ThreadConsequence {
                summary: "the debt comes due".to_string(),
                standing_shifts: vec![(FactionId::new("a"), -3)],
                disposition_shifts: Vec::new(),
                exposure: 4,
            },
            Severity::Major,
            0,
        );
        let mut campaign = CampaignBuilder::new("t", "home")
            .region("home", "Home", ConnectivityTier::Embedded)
            .faction("a", "A", 0)
            .thread(thread)
            .build();

        let outcome = CascadeProcessor::new(&config).run(&mut campaign, &[standing_seed("a", -1)]);

        assert!(!campaign.thread(&ThreadId::new("debt")).unwrap().is_dormant());
        assert_eq!(campaign.player.exposure, 4);
        assert_eq!(campaign.standing(&FactionId::new("a")), Some(-3));
        assert_eq!(outcome.events[0].event_type, hinge_core::EventType::ThreadSurfaced);
    }
}
