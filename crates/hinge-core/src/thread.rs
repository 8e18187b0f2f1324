//! Dormant threads: consequences queued now and surfaced later.

use serde::{Deserialize, Serialize};

use crate::ids::{ActionId, FactionId, NpcId, ThreadId};

/// How many of the trigger tags must be present on an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagMatch {
    #[default]
    Any,
    All,
}

/// Tag-matchable predicate evaluated against cascade events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerCondition {
    pub tags: Vec<String>,
    #[serde(default)]
    pub mode: TagMatch,
    /// Earliest turn on which the thread may surface.
    #[serde(default)]
    pub not_before_turn: u64,
}

impl TriggerCondition {
    pub fn any(tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
            mode: TagMatch::Any,
            not_before_turn: 0,
        }
    }

    pub fn all(tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            mode: TagMatch::All,
            ..Self::any(tags)
        }
    }

    pub fn not_before(mut self, turn: u64) -> Self {
        self.not_before_turn = turn;
        self
    }

    pub fn matches(&self, event_tags: &[String], turn: u64) -> bool {
        if turn < self.not_before_turn || self.tags.is_empty() {
            return false;
        }
        let present = |t: &String| event_tags.iter().any(|e| e == t);
        match self.mode {
            TagMatch::Any => self.tags.iter().any(present),
            TagMatch::All => self.tags.iter().all(present),
        }
    }
}

/// Mechanical effect applied when a thread surfaces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadConsequence {
    pub summary: String,
    #[serde(default)]
    pub standing_shifts: Vec<(FactionId, i32)>,
    #[serde(default)]
    pub disposition_shifts: Vec<(NpcId, i32)>,
    #[serde(default)]
    pub exposure: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Minor,
    Moderate,
    Major,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ThreadStatus {
    Dormant,
    Surfaced { turn: u64 },
}

/// A deferred consequence. Only `status` ever changes, and only once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DormantThread {
    id: ThreadId,
    origin_action: ActionId,
    trigger: TriggerCondition,
    consequence: ThreadConsequence,
    severity: Severity,
    created_turn: u64,
    status: ThreadStatus,
}

impl DormantThread {
    pub fn new(
        id: impl Into<ThreadId>,
        origin_action: ActionId,
        trigger: TriggerCondition,
        consequence: ThreadConsequence,
        severity: Severity,
        created_turn: u64,
    ) -> Self {
        Self {
            id: id.into(),
            origin_action,
            trigger,
            consequence,
            severity,
            created_turn,
            status: ThreadStatus::Dormant,
        }
    }

    pub fn id(&self) -> &ThreadId {
        &self.id
    }

    pub fn origin_action(&self) -> &ActionId {
        &self.origin_action
    }

    pub fn trigger(&self) -> &TriggerCondition {
        &self.trigger
    }

    pub fn consequence(&self) -> &ThreadConsequence {
        &self.consequence
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn created_turn(&self) -> u64 {
        self.created_turn
    }

    pub fn status(&self) -> ThreadStatus {
        self.status
    }

    pub fn is_dormant(&self) -> bool {
        self.status == ThreadStatus::Dormant
    }

    /// Whether an event with `tags` on `turn` wakes this thread.
    ///
    /// Threads never fire on the turn that created them.
    pub fn is_triggered_by(&self, tags: &[String], turn: u64) -> bool {
        self.is_dormant() && turn > self.created_turn && self.trigger.matches(tags, turn)
    }

    /// Mark the thread surfaced. Returns `false` if it already was.
    pub fn surface(&mut self, turn: u64) -> bool {
        if !self.is_dormant() {
            return false;
        }
        self.status = ThreadStatus::Surfaced { turn };
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_all_mode_requires_every_tag() {
        let cond = TriggerCondition::all(["region_entered:docks", "risk"]);
        assert!(!cond.matches(&tags(&["risk"]), 3));
        assert!(cond.matches(&tags(&["risk", "region_entered:docks"]), 3));
    }

    #[test]
    fn test_thread_surfaces_exactly_once() {
        let mut thread = DormantThread::new(
            "t1",
            ActionId::new("a1"),
            TriggerCondition::any(["combat"]).not_before(2),
            ThreadConsequence::default(),
            Severity::Moderate,
            1,
        );
        assert!(!thread.is_triggered_by(&tags(&["combat"]), 1));
        assert!(thread.is_triggered_by(&tags(&["combat"]), 2));
        assert!(thread.surface(2));
        assert!(!thread.surface(3));
        assert!(!thread.is_triggered_by(&tags(&["combat"]), 4));
        assert_eq!(thread.status(), ThreadStatus::Surfaced { turn: 2 });
    }
}
