//! Hinge moments: the immutable record of irreversible choices.

use serde::{Deserialize, Serialize};

use crate::ids::ActionId;

/// An irreversible choice. Fields are private and have no setters; the
/// campaign only ever appends new moments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HingeMoment {
    index: u64,
    turn: u64,
    source_action: ActionId,
    situation: String,
    choice: String,
    reasoning: String,
}

impl HingeMoment {
    pub fn new(
        index: u64,
        turn: u64,
        source_action: ActionId,
        situation: impl Into<String>,
        choice: impl Into<String>,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            index,
            turn,
            source_action,
            situation: situation.into(),
            choice: choice.into(),
            reasoning: reasoning.into(),
        }
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn turn(&self) -> u64 {
        self.turn
    }

    pub fn source_action(&self) -> &ActionId {
        &self.source_action
    }

    pub fn situation(&self) -> &str {
        &self.situation
    }

    pub fn choice(&self) -> &str {
        &self.choice
    }

    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }
}
