//! String-backed identifiers for campaign entities.
//!
//! Every entity in a campaign is addressed by a stable, human-readable key so
//! that snapshots, receipts and seed files stay diffable.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow the raw identifier.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Identifier of a campaign aggregate.
    CampaignId
);
string_id!(
    /// Identifier of a region on the campaign map.
    RegionId
);
string_id!(
    /// Identifier of a faction.
    FactionId
);
string_id!(
    /// Identifier of a non-player character.
    NpcId
);
string_id!(
    /// Identifier of a job posting.
    JobId
);
string_id!(
    /// Identifier of an enhancement offer (and the enhancement it grants).
    EnhancementId
);
string_id!(
    /// Identifier of a leverage demand.
    DemandId
);
string_id!(
    /// Identifier of a dormant thread.
    ThreadId
);
string_id!(
    /// Client-supplied idempotency key of a submitted action.
    ActionId
);
string_id!(
    /// Identifier of an event in the audit log.
    ///
    /// Root events are `<action_id>:<seq>`; cascade-derived events append
    /// `.<n>` to their parent's id, so identity is stable across replays.
    EventId
);

impl EventId {
    /// Id of the `seq`-th event emitted directly by an action.
    pub fn root(action: &ActionId, seq: usize) -> Self {
        Self(format!("{action}:{seq}"))
    }

    /// Id of the `n`-th event derived from `parent`.
    pub fn derived(parent: &EventId, n: usize) -> Self {
        Self(format!("{parent}.{n}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_ids_are_hierarchical() {
        let action = ActionId::new("act-7");
        let root = EventId::root(&action, 2);
        assert_eq!(root.as_str(), "act-7:2");
        assert_eq!(EventId::derived(&root, 0).as_str(), "act-7:2.0");
    }

    #[test]
    fn test_ids_serialize_as_plain_strings() {
        let id = RegionId::new("undercity");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"undercity\"");
        let back: RegionId = serde_json::from_str("\"undercity\"").unwrap();
        assert_eq!(back, id);
    }
}
