//! Turn results and the per-action phase machine.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::event::{Event, FeedEntry};
use crate::ids::ActionId;
use crate::view::CampaignView;

/// A cue for the narrator: something worth dwelling on this turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrativeHook {
    pub kind: String,
    pub subject: String,
    pub detail: String,
}

/// The committed outcome of one action.
///
/// Persisted as a receipt so a duplicate submission can be answered with
/// the exact same value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnResult {
    pub action_id: ActionId,
    pub success: bool,
    pub new_state_version: u64,
    pub turn: u64,
    /// Full audit log of the turn, cascade included.
    pub events: Vec<Event>,
    /// Deduplicated player-facing summary.
    pub feed: Vec<FeedEntry>,
    pub state_snapshot: CampaignView,
    pub narrative_hooks: Vec<NarrativeHook>,
    pub seed: u64,
    /// The cascade hit its depth limit.
    #[serde(default)]
    pub truncated: bool,
}

/// Phases an action passes through in the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    Idle,
    Proposed,
    Resolving,
    Resolved,
    Narrating,
    Complete,
    Error,
}

impl TurnPhase {
    /// Whether `self -> next` is a legal transition.
    pub fn can_transition_to(self, next: TurnPhase) -> bool {
        use TurnPhase::*;
        matches!(
            (self, next),
            (Idle, Proposed)
                | (Idle, Resolving)
                | (Proposed, Resolving)
                | (Proposed, Idle)
                | (Resolving, Resolved)
                | (Resolving, Error)
                | (Resolved, Narrating)
                | (Resolved, Complete)
                | (Narrating, Complete)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TurnPhase::Complete | TurnPhase::Error)
    }
}

impl fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Proposed => "proposed",
            Self::Resolving => "resolving",
            Self::Resolved => "resolved",
            Self::Narrating => "narrating",
            Self::Complete => "complete",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::TurnPhase::*;

    #[test]
    fn test_error_only_reachable_from_resolving() {
        for phase in [Idle, Proposed, Resolved, Narrating, Complete] {
            assert!(!phase.can_transition_to(Error), "{phase} -> error");
        }
        assert!(Resolving.can_transition_to(Error));
    }

    #[test]
    fn test_narration_follows_persistence() {
        assert!(!Resolving.can_transition_to(Narrating));
        assert!(Resolved.can_transition_to(Narrating));
        assert!(Narrating.can_transition_to(Complete));
        assert!(Complete.is_terminal());
    }
}
