//! Leverage demands: obligations a faction calls in against the player.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::{DemandId, EnhancementId, FactionId};

/// Escalation state of a demand. Only ever moves forward, except that a
/// successful negotiation returns the demand to `Active`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DemandState {
    #[default]
    Offered,
    Active,
    Escalating,
    Called,
}

impl DemandState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Offered => "offered",
            Self::Active => "active",
            Self::Escalating => "escalating",
            Self::Called => "called",
        }
    }
}

impl fmt::Display for DemandState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DemandWeight {
    #[default]
    Light,
    Medium,
    Heavy,
}

impl DemandWeight {
    /// Cost multiplier applied to compliance and resistance.
    pub fn factor(self) -> i64 {
        match self {
            Self::Light => 1,
            Self::Medium => 2,
            Self::Heavy => 3,
        }
    }

    pub fn heavier(self) -> Self {
        match self {
            Self::Light => Self::Medium,
            Self::Medium | Self::Heavy => Self::Heavy,
        }
    }

    pub fn lighter(self) -> Self {
        match self {
            Self::Heavy => Self::Medium,
            Self::Medium | Self::Light => Self::Light,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DemandResponse {
    Comply,
    Resist,
    Negotiate,
}

impl fmt::Display for DemandResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Comply => "comply",
            Self::Resist => "resist",
            Self::Negotiate => "negotiate",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemandResolution {
    pub response: DemandResponse,
    pub turn: u64,
}

/// A faction's claim on the player, created by an accepted enhancement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeverageDemand {
    pub id: DemandId,
    pub faction: FactionId,
    pub source_enhancement: EnhancementId,
    pub text: String,
    /// Turn (in `turn_count`) at which the demand is called.
    pub deadline: u64,
    pub state: DemandState,
    pub weight: DemandWeight,
    pub created_turn: u64,
    #[serde(default)]
    pub at_expense_of: Option<FactionId>,
    #[serde(default)]
    pub negotiated: bool,
    #[serde(default)]
    pub resolution: Option<DemandResolution>,
}

impl LeverageDemand {
    pub fn is_open(&self) -> bool {
        self.resolution.is_none()
    }

    pub fn is_overdue(&self, turn: u64) -> bool {
        self.is_open() && turn >= self.deadline
    }

    pub fn turns_remaining(&self, turn: u64) -> u64 {
        self.deadline.saturating_sub(turn)
    }
}
