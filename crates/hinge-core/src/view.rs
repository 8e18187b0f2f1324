//! Read model handed to renderers: everything derived is computed here so
//! collaborators never recompute it.

use serde::{Deserialize, Serialize};

use crate::campaign::Campaign;
use crate::ids::{CampaignId, DemandId, FactionId, JobId, NpcId, RegionId, ThreadId};
use crate::leverage::{DemandState, DemandWeight};
use crate::npc::{Disposition, DispositionModifier};
use crate::thread::{Severity, ThreadStatus};
use crate::world::{ConnectivityTier, JobStatus, PlayerState};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionView {
    pub id: RegionId,
    pub name: String,
    pub connectivity: ConnectivityTier,
    pub controlling_faction: Option<FactionId>,
    pub adjacent: Vec<RegionId>,
    pub visited: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactionView {
    pub id: FactionId,
    pub name: String,
    pub standing: i32,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NpcView {
    pub id: NpcId,
    pub name: String,
    pub faction: Option<FactionId>,
    pub region: RegionId,
    pub disposition: Disposition,
    pub modifier: Option<DispositionModifier>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobView {
    pub id: JobId,
    pub title: String,
    pub patron: FactionId,
    pub region: RegionId,
    pub status: JobStatus,
}

/// An open demand, ordered for display. Overdue demands come first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityItem {
    pub demand: DemandId,
    pub faction: FactionId,
    pub text: String,
    pub state: DemandState,
    pub weight: DemandWeight,
    pub deadline: u64,
    pub turns_remaining: u64,
    pub overdue: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadView {
    pub id: ThreadId,
    pub summary: String,
    pub severity: Severity,
    pub surfaced_turn: u64,
}

/// Snapshot of a campaign as a renderer sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignView {
    pub campaign_id: CampaignId,
    pub name: String,
    pub turn_count: u64,
    pub state_version: u64,
    pub player: PlayerState,
    pub regions: Vec<RegionView>,
    pub factions: Vec<FactionView>,
    pub npcs: Vec<NpcView>,
    pub jobs: Vec<JobView>,
    pub priority_items: Vec<PriorityItem>,
    pub surfaced_threads: Vec<ThreadView>,
    pub hinge_count: usize,
}

impl Campaign {
    /// Build the read model. Pure: never touches `turn_count` or `state_version`.
    pub fn view(&self) -> CampaignView {
        let turn = self.turn_count;

        let mut priority_items: Vec<PriorityItem> = self
            .open_demands()
            .map(|d| PriorityItem {
                demand: d.id.clone(),
                faction: d.faction.clone(),
                text: d.text.clone(),
                state: d.state,
                weight: d.weight,
                deadline: d.deadline,
                turns_remaining: d.turns_remaining(turn),
                overdue: d.is_overdue(turn),
            })
            .collect();
        // Called first, then by escalation, then soonest deadline.
        priority_items.sort_by(|a, b| {
            b.overdue
                .cmp(&a.overdue)
                .then(b.state.cmp(&a.state))
                .then(a.deadline.cmp(&b.deadline))
                .then(a.demand.cmp(&b.demand))
        });

        let surfaced_threads = self
            .threads()
            .iter()
            .filter_map(|t| match t.status() {
                ThreadStatus::Surfaced { turn } => Some(ThreadView {
                    id: t.id().clone(),
                    summary: t.consequence().summary.clone(),
                    severity: t.severity(),
                    surfaced_turn: turn,
                }),
                ThreadStatus::Dormant => None,
            })
            .collect();

        CampaignView {
            campaign_id: self.id.clone(),
            name: self.name.clone(),
            turn_count: self.turn_count,
            state_version: self.state_version,
            player: self.player.clone(),
            regions: self
                .regions
                .iter()
                .map(|(id, r)| RegionView {
                    id: id.clone(),
                    name: r.name.clone(),
                    connectivity: r.connectivity,
                    controlling_faction: r.controlling_faction.clone(),
                    adjacent: r.adjacent.clone(),
                    visited: r.visited,
                })
                .collect(),
            factions: self
                .factions
                .iter()
                .map(|(id, f)| FactionView {
                    id: id.clone(),
                    name: f.name.clone(),
                    standing: f.standing.value(),
                    label: f.standing.label().to_string(),
                })
                .collect(),
            npcs: self
                .npcs
                .iter()
                .map(|(id, n)| NpcView {
                    id: id.clone(),
                    name: n.name.clone(),
                    faction: n.faction.clone(),
                    region: n.region.clone(),
                    disposition: n.disposition,
                    modifier: n.current_modifier().cloned(),
                })
                .collect(),
            jobs: self
                .jobs
                .iter()
                .map(|(id, j)| JobView {
                    id: id.clone(),
                    title: j.title.clone(),
                    patron: j.patron.clone(),
                    region: j.region.clone(),
                    status: j.status,
                })
                .collect(),
            priority_items,
            surfaced_threads,
            hinge_count: self.hinges().len(),
        }
    }
}
