//! Events: the flat record of everything a turn changed.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::{ActionId, DemandId, EnhancementId, EventId, FactionId, JobId, NpcId, RegionId, ThreadId};
use crate::leverage::{DemandResponse, DemandState, DemandWeight};
use crate::npc::Disposition;
use crate::thread::Severity;
use crate::world::ConnectivityTier;

/// Discriminant of an [`EventPayload`], used on the wire and in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    TurnStarted,
    TurnEnded,
    RegionChanged,
    ConnectivityUpdated,
    FactionStandingChanged,
    DispositionShifted,
    ResourcesChanged,
    RiskTaken,
    JobAccepted,
    JobCompleted,
    FavorCalled,
    CombatResolved,
    EnhancementGranted,
    DemandCreated,
    DemandStateChanged,
    DemandResolved,
    HingeRecorded,
    ThreadQueued,
    ThreadSurfaced,
    CascadeTruncated,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TurnStarted => "turn_started",
            Self::TurnEnded => "turn_ended",
            Self::RegionChanged => "region_changed",
            Self::ConnectivityUpdated => "connectivity_updated",
            Self::FactionStandingChanged => "faction_standing_changed",
            Self::DispositionShifted => "disposition_shifted",
            Self::ResourcesChanged => "resources_changed",
            Self::RiskTaken => "risk_taken",
            Self::JobAccepted => "job_accepted",
            Self::JobCompleted => "job_completed",
            Self::FavorCalled => "favor_called",
            Self::CombatResolved => "combat_resolved",
            Self::EnhancementGranted => "enhancement_granted",
            Self::DemandCreated => "demand_created",
            Self::DemandStateChanged => "demand_state_changed",
            Self::DemandResolved => "demand_resolved",
            Self::HingeRecorded => "hinge_recorded",
            Self::ThreadQueued => "thread_queued",
            Self::ThreadSurfaced => "thread_surfaced",
            Self::CascadeTruncated => "cascade_truncated",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What changed. Each variant carries enough data to replay its effect in a
/// feed or narration without consulting state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventPayload {
    TurnStarted {
        turn: u64,
    },
    TurnEnded {
        turn: u64,
        state_version: u64,
    },
    RegionChanged {
        from: RegionId,
        to: RegionId,
    },
    ConnectivityUpdated {
        region: RegionId,
        from: ConnectivityTier,
        to: ConnectivityTier,
    },
    FactionStandingChanged {
        faction: FactionId,
        previous: i32,
        current: i32,
        delta: i32,
        reason: String,
    },
    DispositionShifted {
        npc: NpcId,
        from: Disposition,
        to: Disposition,
        reason: String,
    },
    ResourcesChanged {
        credits: i64,
        social_energy: i32,
        exposure: i32,
    },
    RiskTaken {
        region: RegionId,
        exposure: i32,
    },
    JobAccepted {
        job: JobId,
        patron: FactionId,
    },
    JobCompleted {
        job: JobId,
        reward_credits: i64,
    },
    FavorCalled {
        npc: NpcId,
        ask: String,
    },
    CombatResolved {
        target: NpcId,
        victory: bool,
        player_roll: u32,
        opponent_roll: u32,
    },
    EnhancementGranted {
        enhancement: EnhancementId,
        faction: FactionId,
    },
    DemandCreated {
        demand: DemandId,
        faction: FactionId,
        deadline: u64,
        weight: DemandWeight,
    },
    DemandStateChanged {
        demand: DemandId,
        faction: FactionId,
        from: DemandState,
        to: DemandState,
    },
    DemandResolved {
        demand: DemandId,
        response: DemandResponse,
        weight: DemandWeight,
    },
    HingeRecorded {
        index: u64,
        situation: String,
        choice: String,
    },
    ThreadQueued {
        thread: ThreadId,
        severity: Severity,
    },
    ThreadSurfaced {
        thread: ThreadId,
        summary: String,
        severity: Severity,
    },
    /// Marker left where the cascade stopped expanding at the depth limit.
    CascadeTruncated {
        depth: u8,
        pending: usize,
    },
}

impl EventPayload {
    pub fn event_type(&self) -> EventType {
        match self {
            Self::TurnStarted { .. } => EventType::TurnStarted,
            Self::TurnEnded { .. } => EventType::TurnEnded,
            Self::RegionChanged { .. } => EventType::RegionChanged,
            Self::ConnectivityUpdated { .. } => EventType::ConnectivityUpdated,
            Self::FactionStandingChanged { .. } => EventType::FactionStandingChanged,
            Self::DispositionShifted { .. } => EventType::DispositionShifted,
            Self::ResourcesChanged { .. } => EventType::ResourcesChanged,
            Self::RiskTaken { .. } => EventType::RiskTaken,
            Self::JobAccepted { .. } => EventType::JobAccepted,
            Self::JobCompleted { .. } => EventType::JobCompleted,
            Self::FavorCalled { .. } => EventType::FavorCalled,
            Self::CombatResolved { .. } => EventType::CombatResolved,
            Self::EnhancementGranted { .. } => EventType::EnhancementGranted,
            Self::DemandCreated { .. } => EventType::DemandCreated,
            Self::DemandStateChanged { .. } => EventType::DemandStateChanged,
            Self::DemandResolved { .. } => EventType::DemandResolved,
            Self::HingeRecorded { .. } => EventType::HingeRecorded,
            Self::ThreadQueued { .. } => EventType::ThreadQueued,
            Self::ThreadSurfaced { .. } => EventType::ThreadSurfaced,
            Self::CascadeTruncated { .. } => EventType::CascadeTruncated,
        }
    }
}

/// A single entry of the audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub event_id: EventId,
    pub event_type: EventType,
    pub source_action: ActionId,
    pub payload: EventPayload,
    pub cascaded_from: Option<EventId>,
    /// Cascade depth; 0 for events emitted by a resolver.
    pub depth: u8,
    pub turn: u64,
    /// Matchable tags (`faction:<id>`, `region_entered:<id>`, `risk`, ...).
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Event {
    /// An event emitted directly by the action's resolution.
    pub fn root(source_action: &ActionId, seq: usize, turn: u64, payload: EventPayload, tags: Vec<String>) -> Self {
        Self {
            event_id: EventId::root(source_action, seq),
            event_type: payload.event_type(),
            source_action: source_action.clone(),
            payload,
            cascaded_from: None,
            depth: 0,
            turn,
            tags,
        }
    }

    /// The `n`-th event derived from this one by the cascade.
    pub fn derive(&self, n: usize, payload: EventPayload, tags: Vec<String>) -> Self {
        Self {
            event_id: EventId::derived(&self.event_id, n),
            event_type: payload.event_type(),
            source_action: self.source_action.clone(),
            payload,
            cascaded_from: Some(self.event_id.clone()),
            depth: self.depth.saturating_add(1),
            turn: self.turn,
            tags,
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Conventional tag constructors shared by resolvers and seed data.
pub mod tags {
    use crate::ids::{FactionId, JobId, NpcId, RegionId};

    pub const RISK: &str = "risk";
    pub const COMBAT: &str = "combat";
    pub const BETRAYAL: &str = "betrayal";

    pub fn faction(id: &FactionId) -> String {
        format!("faction:{id}")
    }

    pub fn standing_loss(id: &FactionId) -> String {
        format!("standing_loss:{id}")
    }

    pub fn standing_gain(id: &FactionId) -> String {
        format!("standing_gain:{id}")
    }

    pub fn npc(id: &NpcId) -> String {
        format!("npc:{id}")
    }

    pub fn region_entered(id: &RegionId) -> String {
        format!("region_entered:{id}")
    }

    pub fn job_completed(id: &JobId) -> String {
        format!("job_completed:{id}")
    }
}

/// Tone of a feed line, for renderers that colour them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedTone {
    Neutral,
    Positive,
    Negative,
    Warning,
}

/// One deduplicated, human-readable line of the player feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedEntry {
    pub text: String,
    pub tone: FeedTone,
    /// Events summarized by this line.
    pub events: Vec<EventId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_event_links_to_parent() {
        let action = ActionId::new("a1");
        let root = Event::root(
            &action,
            1,
            4,
            EventPayload::RiskTaken {
                region: RegionId::new("b"),
                exposure: 10,
            },
            vec![tags::RISK.to_string()],
        );
        let child = root.derive(
            0,
            EventPayload::CascadeTruncated { depth: 1, pending: 0 },
            Vec::new(),
        );
        assert_eq!(child.cascaded_from.as_ref(), Some(&root.event_id));
        assert_eq!(child.depth, 1);
        assert_eq!(child.turn, 4);
        assert_eq!(child.event_type, EventType::CascadeTruncated);
        assert!(root.has_tag("risk"));
    }

    #[test]
    fn test_payload_is_tagged_by_kind() {
        let json = serde_json::to_value(EventPayload::TurnStarted { turn: 2 }).unwrap();
        assert_eq!(json["kind"], "turn_started");
        assert_eq!(json["turn"], 2);
    }
}
