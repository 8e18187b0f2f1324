//! The campaign aggregate root.
//!
//! A [`Campaign`] is a plain value. The engine clones it, mutates the clone
//! while resolving an action and hands the result to the store, which swaps
//! it in only if the version it replaces is still current.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::event::Event;
use crate::hinge::HingeMoment;
use crate::ids::{ActionId, CampaignId, DemandId, EnhancementId, FactionId, JobId, NpcId, RegionId, ThreadId};
use crate::leverage::LeverageDemand;
use crate::npc::Npc;
use crate::thread::DormantThread;
use crate::world::{EnhancementOffer, FactionLink, FactionState, Job, PlayerState, RegionState};

/// Full persistent state of one campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub name: String,
    /// Root seed; per-action seeds are derived from it.
    pub seed: u64,
    pub turn_count: u64,
    pub state_version: u64,
    pub player: PlayerState,
    pub regions: BTreeMap<RegionId, RegionState>,
    pub factions: BTreeMap<FactionId, FactionState>,
    /// Flat `(from, to) -> multiplier` relationship table.
    #[serde(default)]
    pub faction_links: Vec<FactionLink>,
    pub npcs: BTreeMap<NpcId, Npc>,
    #[serde(default)]
    pub jobs: BTreeMap<JobId, Job>,
    #[serde(default)]
    pub enhancement_offers: BTreeMap<EnhancementId, EnhancementOffer>,
    #[serde(default)]
    pub demands: BTreeMap<DemandId, LeverageDemand>,
    #[serde(default)]
    threads: Vec<DormantThread>,
    #[serde(default)]
    hinges: Vec<HingeMoment>,
    #[serde(default)]
    event_log: Vec<Event>,
    /// Action ids committed within the idempotency window, oldest first.
    #[serde(default)]
    recent_actions: VecDeque<ActionId>,
}

impl Campaign {
    /// Create an empty campaign at turn 0, version 0.
    pub fn new(id: impl Into<CampaignId>, name: impl Into<String>, seed: u64, player: PlayerState) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            seed,
            turn_count: 0,
            state_version: 0,
            player,
            regions: BTreeMap::new(),
            factions: BTreeMap::new(),
            faction_links: Vec::new(),
            npcs: BTreeMap::new(),
            jobs: BTreeMap::new(),
            enhancement_offers: BTreeMap::new(),
            demands: BTreeMap::new(),
            threads: Vec::new(),
            hinges: Vec::new(),
            event_log: Vec::new(),
            recent_actions: VecDeque::new(),
        }
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    pub fn current_region(&self) -> Option<&RegionState> {
        self.regions.get(&self.player.current_region)
    }

    pub fn standing(&self, faction: &FactionId) -> Option<i32> {
        self.factions.get(faction).map(|f| f.standing.value())
    }

    pub fn links_from<'a>(&'a self, faction: &'a FactionId) -> impl Iterator<Item = &'a FactionLink> + 'a {
        self.faction_links.iter().filter(move |l| &l.from == faction)
    }

    pub fn npcs_of<'a>(&'a self, faction: &'a FactionId) -> impl Iterator<Item = (&'a NpcId, &'a Npc)> + 'a {
        self.npcs
            .iter()
            .filter(move |(_, npc)| npc.faction.as_ref() == Some(faction))
    }

    pub fn open_demands(&self) -> impl Iterator<Item = &LeverageDemand> {
        self.demands.values().filter(|d| d.is_open())
    }

    // =========================================================================
    // Append-only logs
    // =========================================================================

    pub fn hinges(&self) -> &[HingeMoment] {
        &self.hinges
    }

    /// Append a hinge moment, assigning it the next index.
    pub fn record_hinge(
        &mut self,
        source_action: ActionId,
        situation: impl Into<String>,
        choice: impl Into<String>,
        reasoning: impl Into<String>,
    ) -> &HingeMoment {
        let index = self.hinges.len() as u64;
        self.hinges.push(HingeMoment::new(
            index,
            self.turn_count,
            source_action,
            situation,
            choice,
            reasoning,
        ));
        &self.hinges[self.hinges.len() - 1]
    }

    /// Whether `earlier`'s hinge log is an unmodified prefix of this one.
    pub fn extends_hinges_of(&self, earlier: &Campaign) -> bool {
        self.hinges.len() >= earlier.hinges.len()
            && self.hinges[..earlier.hinges.len()] == earlier.hinges[..]
    }

    pub fn event_log(&self) -> &[Event] {
        &self.event_log
    }

    pub fn append_events(&mut self, events: impl IntoIterator<Item = Event>) {
        self.event_log.extend(events);
    }

    pub fn threads(&self) -> &[DormantThread] {
        &self.threads
    }

    pub fn thread(&self, id: &ThreadId) -> Option<&DormantThread> {
        self.threads.iter().find(|t| t.id() == id)
    }

    pub fn queue_thread(&mut self, thread: DormantThread) {
        self.threads.push(thread);
    }

    /// Surface a dormant thread. Returns `false` if it is unknown or already surfaced.
    pub fn surface_thread(&mut self, id: &ThreadId, turn: u64) -> bool {
        self.threads
            .iter_mut()
            .find(|t| t.id() == id)
            .map(|t| t.surface(turn))
            .unwrap_or(false)
    }

    // =========================================================================
    // Idempotency window
    // =========================================================================

    pub fn has_seen(&self, action_id: &ActionId) -> bool {
        self.recent_actions.iter().any(|a| a == action_id)
    }

    pub fn recent_actions(&self) -> impl Iterator<Item = &ActionId> {
        self.recent_actions.iter()
    }

    /// Remember a committed action id, evicting the oldest beyond `window`.
    pub fn remember_action(&mut self, action_id: ActionId, window: usize) {
        self.recent_actions.push_back(action_id);
        while self.recent_actions.len() > window.max(1) {
            self.recent_actions.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn campaign() -> Campaign {
        Campaign::new("c1", "Test", 7, PlayerState::new("Vex", "docks"))
    }

    #[test]
    fn test_hinges_append_with_sequential_index() {
        let mut c = campaign();
        c.record_hinge(ActionId::new("a"), "s1", "c1", "r1");
        c.record_hinge(ActionId::new("b"), "s2", "c2", "r2");
        assert_eq!(c.hinges().len(), 2);
        assert_eq!(c.hinges()[1].index(), 1);

        let before = c.clone();
        c.record_hinge(ActionId::new("c"), "s3", "c3", "r3");
        assert!(c.extends_hinges_of(&before));
        assert!(!before.extends_hinges_of(&c));
    }

    #[test]
    fn test_recent_actions_window_evicts_oldest() {
        let mut c = campaign();
        for i in 0..5 {
            c.remember_action(ActionId::new(format!("a{i}")), 3);
        }
        assert!(!c.has_seen(&ActionId::new("a1")));
        assert!(c.has_seen(&ActionId::new("a4")));
        assert_eq!(c.recent_actions().count(), 3);
    }
}
