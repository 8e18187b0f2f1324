//! Non-player characters: disposition tiers, agendas and memory triggers.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::{FactionId, RegionId};

/// Ordered attitude of an NPC towards the player.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    Hostile,
    Wary,
    #[default]
    Neutral,
    Warm,
    Loyal,
}

impl Disposition {
    const TIERS: [Disposition; 5] = [
        Disposition::Hostile,
        Disposition::Wary,
        Disposition::Neutral,
        Disposition::Warm,
        Disposition::Loyal,
    ];

    fn rank(self) -> i32 {
        self as i32
    }

    /// Move `steps` tiers up (positive) or down (negative), clamped at the ends.
    pub fn shifted(self, steps: i32) -> Self {
        let idx = (self.rank() + steps).clamp(0, Self::TIERS.len() as i32 - 1);
        Self::TIERS[idx as usize]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hostile => "hostile",
            Self::Wary => "wary",
            Self::Neutral => "neutral",
            Self::Warm => "warm",
            Self::Loyal => "loyal",
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Narrative-only motivations. Never interpreted by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agenda {
    #[serde(default)]
    pub wants: String,
    #[serde(default)]
    pub fears: String,
    #[serde(default)]
    pub leverage_held: String,
    #[serde(default)]
    pub owed: String,
}

/// A remembered condition that shifts disposition when a matching event occurs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryTrigger {
    /// Event tag that fires this trigger, e.g. `faction:syndicate` or `combat`.
    pub condition: String,
    /// Disposition tiers to move (negative = worse).
    pub shift: i32,
    #[serde(default)]
    pub repeatable: bool,
    #[serde(default)]
    pub fired: bool,
}

impl MemoryTrigger {
    pub fn once(condition: impl Into<String>, shift: i32) -> Self {
        Self {
            condition: condition.into(),
            shift,
            repeatable: false,
            fired: false,
        }
    }

    pub fn repeatable(condition: impl Into<String>, shift: i32) -> Self {
        Self {
            repeatable: true,
            ..Self::once(condition, shift)
        }
    }

    /// Whether this trigger should fire for an event carrying `tags`.
    pub fn matches(&self, tags: &[String]) -> bool {
        (self.repeatable || !self.fired) && tags.iter().any(|t| t == &self.condition)
    }
}

/// How an NPC behaves at a given tier. Consumed by the narrative layer only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispositionModifier {
    #[serde(default)]
    pub tone: String,
    #[serde(default)]
    pub reveals: Vec<String>,
    #[serde(default)]
    pub withholds: Vec<String>,
}

/// A non-player character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Npc {
    pub name: String,
    #[serde(default)]
    pub faction: Option<FactionId>,
    pub region: RegionId,
    #[serde(default)]
    pub disposition: Disposition,
    #[serde(default)]
    pub agenda: Agenda,
    #[serde(default)]
    pub memory_triggers: Vec<MemoryTrigger>,
    #[serde(default)]
    pub modifiers: BTreeMap<Disposition, DispositionModifier>,
}

impl Npc {
    pub fn new(name: impl Into<String>, region: impl Into<RegionId>) -> Self {
        Self {
            name: name.into(),
            faction: None,
            region: region.into(),
            disposition: Disposition::Neutral,
            agenda: Agenda::default(),
            memory_triggers: Vec::new(),
            modifiers: BTreeMap::new(),
        }
    }

    /// The modifier for the NPC's current tier, if one was authored.
    pub fn current_modifier(&self) -> Option<&DispositionModifier> {
        self.modifiers.get(&self.disposition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disposition_shift_clamps() {
        assert_eq!(Disposition::Neutral.shifted(1), Disposition::Warm);
        assert_eq!(Disposition::Warm.shifted(5), Disposition::Loyal);
        assert_eq!(Disposition::Wary.shifted(-9), Disposition::Hostile);
        assert!(Disposition::Hostile < Disposition::Loyal);
    }

    #[test]
    fn test_one_shot_trigger_stops_matching_once_fired() {
        let tags = vec!["combat".to_string()];
        let mut trigger = MemoryTrigger::once("combat", -1);
        assert!(trigger.matches(&tags));
        trigger.fired = true;
        assert!(!trigger.matches(&tags));

        let mut repeat = MemoryTrigger::repeatable("combat", -1);
        repeat.fired = true;
        assert!(repeat.matches(&tags));
    }
}
