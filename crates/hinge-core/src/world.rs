//! Regions, factions, jobs and the player's own ledger.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::{EnhancementId, FactionId, NpcId, RegionId};
use crate::leverage::DemandWeight;

// =============================================================================
// Regions
// =============================================================================

/// How much the player knows about (and is woven into) a region.
///
/// Distinct from physical distance: an adjacent region may be `Disconnected`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ConnectivityTier {
    #[default]
    Disconnected,
    Aware,
    Connected,
    Embedded,
}

impl ConnectivityTier {
    /// The next tier up, saturating at `Embedded`.
    pub fn raised(self) -> Self {
        match self {
            Self::Disconnected => Self::Aware,
            Self::Aware => Self::Connected,
            Self::Connected | Self::Embedded => Self::Embedded,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Aware => "aware",
            Self::Connected => "connected",
            Self::Embedded => "embedded",
        }
    }
}

impl fmt::Display for ConnectivityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A condition that must hold before the player may enter a region directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RouteRequirement {
    /// Standing with a faction must be at least `minimum`.
    FactionStanding { faction: FactionId, minimum: i32 },
    /// The player's connectivity with the *origin* region must be at least `minimum`.
    Connectivity { minimum: ConnectivityTier },
    /// The player must hold at least `amount` credits (they are not spent).
    Credits { amount: i64 },
    /// The player must have a non-hostile relationship with a named contact.
    Contact { npc: NpcId },
}

/// Persistent state of a single region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionState {
    pub name: String,
    #[serde(default)]
    pub controlling_faction: Option<FactionId>,
    #[serde(default)]
    pub connectivity: ConnectivityTier,
    #[serde(default)]
    pub adjacent: Vec<RegionId>,
    #[serde(default)]
    pub route_requirements: Vec<RouteRequirement>,
    #[serde(default)]
    pub visited: bool,
}

impl RegionState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            controlling_faction: None,
            connectivity: ConnectivityTier::Disconnected,
            adjacent: Vec::new(),
            route_requirements: Vec::new(),
            visited: false,
        }
    }

    pub fn is_adjacent_to(&self, other: &RegionId) -> bool {
        self.adjacent.iter().any(|r| r == other)
    }
}

// =============================================================================
// Factions
// =============================================================================

/// Standing with a faction, always clamped to `[MIN, MAX]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub struct StandingValue(i32);

impl StandingValue {
    pub const MIN: i32 = -100;
    pub const MAX: i32 = 100;

    pub fn new(value: i32) -> Self {
        Self(value.clamp(Self::MIN, Self::MAX))
    }

    pub fn value(self) -> i32 {
        self.0
    }

    /// Apply a delta, clamping to the valid range.
    pub fn shifted(self, delta: i32) -> Self {
        Self::new(self.0.saturating_add(delta))
    }

    /// Coarse label used in previews and the player feed.
    pub fn label(self) -> &'static str {
        match self.0 {
            i32::MIN..=-60 => "hostile",
            -59..=-20 => "unfriendly",
            -19..=19 => "neutral",
            20..=59 => "friendly",
            _ => "allied",
        }
    }
}

impl From<i32> for StandingValue {
    fn from(value: i32) -> Self {
        Self::new(value)
    }
}

impl From<StandingValue> for i32 {
    fn from(value: StandingValue) -> Self {
        value.0
    }
}

impl fmt::Display for StandingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+} ({})", self.0, self.label())
    }
}

/// A faction and the player's standing with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactionState {
    pub name: String,
    #[serde(default)]
    pub standing: StandingValue,
}

impl FactionState {
    pub fn new(name: impl Into<String>, standing: i32) -> Self {
        Self {
            name: name.into(),
            standing: StandingValue::new(standing),
        }
    }
}

/// One row of the flat faction-relationship table.
///
/// A standing change of `delta` with `from` propagates to `to` as
/// `delta * multiplier_permille / 1000` (integer division, toward zero).
/// Negative multipliers model rivals who enjoy the other side's misfortune.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactionLink {
    pub from: FactionId,
    pub to: FactionId,
    pub multiplier_permille: i32,
}

impl FactionLink {
    pub fn new(from: impl Into<FactionId>, to: impl Into<FactionId>, multiplier_permille: i32) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            multiplier_permille,
        }
    }

    pub fn propagate(&self, delta: i32) -> i32 {
        ((delta as i64 * self.multiplier_permille as i64) / 1000) as i32
    }
}

// =============================================================================
// Player
// =============================================================================

/// An enhancement the player accepted from a faction, and the leverage it carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enhancement {
    pub id: EnhancementId,
    pub name: String,
    pub faction: FactionId,
    pub granted_turn: u64,
    pub leverage_weight: DemandWeight,
    pub demand_text: String,
    #[serde(default)]
    pub at_expense_of: Option<FactionId>,
    /// Turn on which the faction will next call in its leverage.
    #[serde(default)]
    pub next_demand_turn: Option<u64>,
    #[serde(default)]
    pub demands_issued: u32,
}

/// The single player character's mechanical ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    pub name: String,
    pub current_region: RegionId,
    pub credits: i64,
    pub social_energy: i32,
    pub max_social_energy: i32,
    /// Accumulated risk, `0..=100`.
    #[serde(default)]
    pub exposure: i32,
    #[serde(default)]
    pub enhancements: Vec<Enhancement>,
    #[serde(default)]
    pub inventory: Vec<String>,
}

impl PlayerState {
    pub const MAX_EXPOSURE: i32 = 100;

    pub fn new(name: impl Into<String>, current_region: impl Into<RegionId>) -> Self {
        Self {
            name: name.into(),
            current_region: current_region.into(),
            credits: 0,
            social_energy: 5,
            max_social_energy: 5,
            exposure: 0,
            enhancements: Vec::new(),
            inventory: Vec::new(),
        }
    }

    pub fn add_exposure(&mut self, amount: i32) {
        self.exposure = (self.exposure + amount).clamp(0, Self::MAX_EXPOSURE);
    }

    /// Deduct credits, never going below zero. Returns what was actually taken.
    pub fn spend_credits(&mut self, amount: i64) -> i64 {
        let next = (self.credits - amount).max(0);
        let spent = self.credits - next;
        self.credits = next;
        spent
    }

    pub fn spend_social_energy(&mut self, amount: i32) {
        self.social_energy = (self.social_energy - amount).clamp(0, self.max_social_energy);
    }

    pub fn enhancement(&self, id: &EnhancementId) -> Option<&Enhancement> {
        self.enhancements.iter().find(|e| &e.id == id)
    }

    pub fn enhancement_mut(&mut self, id: &EnhancementId) -> Option<&mut Enhancement> {
        self.enhancements.iter_mut().find(|e| &e.id == id)
    }
}

// =============================================================================
// Jobs and offers
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Offered,
    Active,
    Completed,
}

/// A job posted by a patron faction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub title: String,
    pub patron: FactionId,
    /// Where the job is completed.
    pub region: RegionId,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub min_standing: i32,
    #[serde(default)]
    pub reward_credits: i64,
    #[serde(default)]
    pub standing_reward: i32,
    /// A faction harmed by the job's completion.
    #[serde(default)]
    pub opposed_by: Option<FactionId>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A faction's offer of an enhancement, paid for with future leverage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnhancementOffer {
    pub name: String,
    pub faction: FactionId,
    pub demand_text: String,
    #[serde(default)]
    pub weight: DemandWeight,
    #[serde(default)]
    pub min_standing: i32,
    #[serde(default)]
    pub at_expense_of: Option<FactionId>,
    #[serde(default)]
    pub taken: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standing_is_clamped() {
        assert_eq!(StandingValue::new(250).value(), 100);
        assert_eq!(StandingValue::new(-90).shifted(-50).value(), -100);
        let parsed: StandingValue = serde_json::from_str("-400").unwrap();
        assert_eq!(parsed.value(), -100);
    }

    #[test]
    fn test_connectivity_raise_saturates() {
        assert_eq!(ConnectivityTier::Disconnected.raised(), ConnectivityTier::Aware);
        assert_eq!(ConnectivityTier::Embedded.raised(), ConnectivityTier::Embedded);
        assert!(ConnectivityTier::Aware < ConnectivityTier::Connected);
    }

    #[test]
    fn test_link_propagation_uses_integer_permille() {
        let link = FactionLink::new("a", "b", 500);
        assert_eq!(link.propagate(-10), -5);
        assert_eq!(link.propagate(3), 1);
        assert_eq!(FactionLink::new("a", "b", 300).propagate(-3), 0);
    }

    #[test]
    fn test_player_exposure_bounds() {
        let mut player = PlayerState::new("Vex", "docks");
        player.add_exposure(150);
        assert_eq!(player.exposure, PlayerState::MAX_EXPOSURE);
        player.spend_social_energy(99);
        assert_eq!(player.social_energy, 0);
    }
}
