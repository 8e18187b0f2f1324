//! Player-facing feed.
//!
//! Collapses a turn's event log into short lines. Standing changes are
//! summed per faction (direct and cascaded separately), resource changes
//! are summed into one line, and identical lines are merged. Dormant
//! threads are never mentioned until they surface.

use std::collections::BTreeMap;

use hinge_core::{
    Campaign, DemandResponse, DemandState, Event, EventId, EventPayload, FactionId, FeedEntry,
    FeedTone,
};

#[derive(Default)]
struct StandingTotals {
    direct: i32,
    cascaded: i32,
    direct_events: Vec<EventId>,
    cascaded_events: Vec<EventId>,
}

struct Feed {
    entries: Vec<FeedEntry>,
}

impl Feed {
    fn push(&mut self, text: String, tone: FeedTone, events: Vec<EventId>) {
        if let Some(existing) = self.entries.iter_mut().find(|e| e.text == text) {
            existing.events.extend(events);
            return;
        }
        self.entries.push(FeedEntry { text, tone, events });
    }
}

fn faction_name(state: &Campaign, id: &FactionId) -> String {
    state
        .factions
        .get(id)
        .map(|f| f.name.clone())
        .unwrap_or_else(|| id.to_string())
}

/// Build the feed for `events`, naming things as they are in `state`.
pub fn build(state: &Campaign, events: &[Event]) -> Vec<FeedEntry> {
    let mut feed = Feed {
        entries: Vec::new(),
    };
    let mut standing: BTreeMap<FactionId, StandingTotals> = BTreeMap::new();
    let (mut credits, mut energy, mut exposure) = (0i64, 0i32, 0i32);
    let mut resource_events = Vec::new();

    for event in events {
        let id = vec![event.event_id.clone()];
        match &event.payload {
            EventPayload::FactionStandingChanged { faction, delta, .. } => {
                let totals = standing.entry(faction.clone()).or_default();
                if event.depth == 0 {
                    totals.direct += delta;
                    totals.direct_events.push(event.event_id.clone());
                } else {
                    totals.cascaded += delta;
                    totals.cascaded_events.push(event.event_id.clone());
                }
            }
            EventPayload::ResourcesChanged {
                credits: c,
                social_energy: s,
                exposure: x,
            } => {
                credits += c;
                energy += s;
                exposure += x;
                resource_events.push(event.event_id.clone());
            }
            EventPayload::RegionChanged { to, .. } => {
                let name = state.regions.get(to).map(|r| r.name.as_str()).unwrap_or(to.as_str());
                feed.push(format!("You arrive in {name}"), FeedTone::Neutral, id);
            }
            EventPayload::RiskTaken { region, .. } => {
                feed.push(
                    format!("You slipped into {region} by a risky route"),
                    FeedTone::Warning,
                    id,
                );
            }
            EventPayload::ConnectivityUpdated { region, to, .. } => {
                let name = state.regions.get(region).map(|r| r.name.as_str()).unwrap_or(region.as_str());
                feed.push(format!("You are now {to} in {name}"), FeedTone::Positive, id);
            }
            EventPayload::DispositionShifted { npc, from, to, .. } => {
                let name = state.npcs.get(npc).map(|n| n.name.as_str()).unwrap_or(npc.as_str());
                let tone = if to > from {
                    FeedTone::Positive
                } else {
                    FeedTone::Negative
                };
                feed.push(format!("{name} is now {to} toward you"), tone, id);
            }
            EventPayload::JobAccepted { job, .. } => {
                let title = state.jobs.get(job).map(|j| j.title.as_str()).unwrap_or(job.as_str());
                feed.push(format!("Job accepted: {title}"), FeedTone::Neutral, id);
            }
            EventPayload::JobCompleted { job, .. } => {
                let title = state.jobs.get(job).map(|j| j.title.as_str()).unwrap_or(job.as_str());
                feed.push(format!("Job completed: {title}"), FeedTone::Positive, id);
            }
            EventPayload::FavorCalled { npc, ask } => {
                let name = state.npcs.get(npc).map(|n| n.name.as_str()).unwrap_or(npc.as_str());
                feed.push(format!("{name} came through with {ask}"), FeedTone::Positive, id);
            }
            EventPayload::CombatResolved { target, victory, .. } => {
                let name = state.npcs.get(target).map(|n| n.name.as_str()).unwrap_or(target.as_str());
                if *victory {
                    feed.push(format!("You overpowered {name}"), FeedTone::Positive, id);
                } else {
                    feed.push(format!("{name} got the better of you"), FeedTone::Negative, id);
                }
            }
            EventPayload::EnhancementGranted { enhancement, faction } => {
                let name = state
                    .player
                    .enhancement(enhancement)
                    .map(|e| e.name.clone())
                    .unwrap_or_else(|| enhancement.to_string());
                feed.push(
                    format!("{} granted you {name}", faction_name(state, faction)),
                    FeedTone::Positive,
                    id,
                );
            }
            EventPayload::DemandCreated { faction, deadline, .. } => {
                feed.push(
                    format!("{} expects a favor by turn {deadline}", faction_name(state, faction)),
                    FeedTone::Warning,
                    id,
                );
            }
            EventPayload::DemandStateChanged { faction, to, .. } => {
                let name = faction_name(state, faction);
                match to {
                    DemandState::Escalating => {
                        feed.push(format!("{name} is growing impatient"), FeedTone::Warning, id)
                    }
                    DemandState::Called => {
                        feed.push(format!("{name} is calling in what you owe"), FeedTone::Warning, id)
                    }
                    DemandState::Offered | DemandState::Active => {}
                }
            }
            EventPayload::DemandResolved { demand, response, .. } => {
                let name = state
                    .demands
                    .get(demand)
                    .map(|d| faction_name(state, &d.faction))
                    .unwrap_or_else(|| demand.to_string());
                let (verb, tone) = match response {
                    DemandResponse::Comply => ("complied with", FeedTone::Neutral),
                    DemandResponse::Resist => ("defied", FeedTone::Negative),
                    DemandResponse::Negotiate => ("bargained with", FeedTone::Neutral),
                };
                feed.push(format!("You {verb} {name}"), tone, id);
            }
            EventPayload::HingeRecorded { choice, .. } => {
                feed.push(format!("A turning point: {choice}"), FeedTone::Neutral, id);
            }
            EventPayload::ThreadSurfaced { summary, .. } => {
                feed.push(
                    format!("Something you did comes back: {summary}"),
                    FeedTone::Warning,
                    id,
                );
            }
            EventPayload::CascadeTruncated { .. } => {
                feed.push(
                    "The fallout is still spreading".to_string(),
                    FeedTone::Warning,
                    id,
                );
            }
            EventPayload::TurnStarted { .. }
            | EventPayload::TurnEnded { .. }
            | EventPayload::ThreadQueued { .. } => {}
        }
    }

    for (faction, totals) in standing {
        let name = faction_name(state, &faction);
        if totals.direct != 0 {
            let (verb, tone) = if totals.direct < 0 {
                ("angered", FeedTone::Negative)
            } else {
                ("pleased", FeedTone::Positive)
            };
            feed.push(
                format!("Your action {verb} {name} ({:+})", totals.direct),
                tone,
                totals.direct_events,
            );
        }
        if totals.cascaded != 0 {
            let (verb, tone) = if totals.cascaded < 0 {
                ("cooled toward you", FeedTone::Negative)
            } else {
                ("warmed to you", FeedTone::Positive)
            };
            feed.push(
                format!("{name} noticed and {verb} ({:+})", totals.cascaded),
                tone,
                totals.cascaded_events,
            );
        }
    }

    let mut parts = Vec::new();
    if credits != 0 {
        parts.push(format!("credits {credits:+}"));
    }
    if energy != 0 {
        parts.push(format!("social energy {energy:+}"));
    }
    if exposure != 0 {
        parts.push(format!("exposure {exposure:+}"));
    }
    if !parts.is_empty() {
        let tone = if credits < 0 || energy < 0 || exposure > 0 {
            FeedTone::Negative
        } else {
            FeedTone::Positive
        };
        feed.push(parts.join(", "), tone, resource_events);
    }

    feed.entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use hinge_core::{tags, ActionId, CampaignBuilder, ConnectivityTier};

    fn campaign() -> Campaign {
        CampaignBuilder::new("t", "home")
            .region("home", "Home", ConnectivityTier::Embedded)
            .faction("guild", "Harbor Guild", 0)
            .build()
    }

    fn standing(seq: usize, delta: i32) -> Event {
        let faction = FactionId::new("guild");
        Event::root(
            &ActionId::new("a"),
            seq,
            1,
            EventPayload::FactionStandingChanged {
                faction: faction.clone(),
                previous: 0,
                current: delta,
                delta,
                reason: String::new(),
            },
            vec![tags::faction(&faction)],
        )
    }

    #[test]
    fn test_standing_changes_are_summed_per_faction() {
        let state = campaign();
        let events = vec![standing(0, -3), standing(1, -2)];
        let feed = build(&state, &events);
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].text, "Your action angered Harbor Guild (-5)");
        assert_eq!(feed[0].events.len(), 2);
        assert_eq!(feed[0].tone, FeedTone::Negative);
    }

    #[test]
    fn test_cascaded_changes_are_reported_separately() {
        let state = campaign();
        let root = standing(0, 4);
        let child = root.derive(
            1,
            EventPayload::FactionStandingChanged {
                faction: FactionId::new("guild"),
                previous: 4,
                current: 2,
                delta: -2,
                reason: String::new(),
            },
            Vec::new(),
        );
        let feed = build(&state, &[root, child]);
        let texts: Vec<&str> = feed.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "Your action pleased Harbor Guild (+4)",
                "Harbor Guild noticed and cooled toward you (-2)"
            ]
        );
    }

    #[test]
    fn test_resources_collapse_into_one_line() {
        let state = campaign();
        let action = ActionId::new("a");
        let events = vec![
            Event::root(
                &action,
                0,
                1,
                EventPayload::ResourcesChanged {
                    credits: -30,
                    social_energy: 0,
                    exposure: 0,
                },
                Vec::new(),
            ),
            Event::root(
                &action,
                1,
                1,
                EventPayload::ResourcesChanged {
                    credits: 10,
                    social_energy: -2,
                    exposure: 5,
                },
                Vec::new(),
            ),
        ];
        let feed = build(&state, &events);
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].text, "credits -20, social energy -2, exposure +5");
    }

    #[test]
    fn test_queued_threads_stay_hidden() {
        let state = campaign();
        let event = Event::root(
            &ActionId::new("a"),
            0,
            1,
            EventPayload::ThreadQueued {
                thread: "debt".into(),
                severity: hinge_core::Severity::Minor,
            },
            Vec::new(),
        );
        assert!(build(&state, &[event]).is_empty());
    }
}
