//! Engine tunables.
//!
//! Every weight, threshold and multiplier the resolvers and the cascade read
//! lives here so balance can change without touching code. Values are
//! integers (multipliers are per-mille) so resolution stays bit-for-bit
//! reproducible across platforms.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;

/// Hard ceiling on cascade depth per originating action.
pub const MAX_CASCADE_DEPTH: u8 = 5;

/// Root engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub cascade: CascadeConfig,
    #[serde(default)]
    pub leverage: LeverageConfig,
    #[serde(default)]
    pub travel: TravelConfig,
    #[serde(default)]
    pub favor: FavorConfig,
    #[serde(default)]
    pub combat: CombatConfig,
    #[serde(default)]
    pub narrative: NarrativeConfig,
    /// How many recent action ids (and receipts) are kept per campaign.
    #[serde(default = "default_idempotency_window")]
    pub idempotency_window: usize,
    /// Capacity of the broadcast event stream.
    #[serde(default = "default_stream_capacity")]
    pub stream_capacity: usize,
}

fn default_idempotency_window() -> usize {
    64
}

fn default_stream_capacity() -> usize {
    256
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cascade: CascadeConfig::default(),
            leverage: LeverageConfig::default(),
            travel: TravelConfig::default(),
            favor: FavorConfig::default(),
            combat: CombatConfig::default(),
            narrative: NarrativeConfig::default(),
            idempotency_window: default_idempotency_window(),
            stream_capacity: default_stream_capacity(),
        }
    }
}

impl EngineConfig {
    /// Load a config from a JSON file, filling gaps with defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&json)?;
        config.validate()?;
        debug!(path = %path.display(), "Loaded engine config");
        Ok(config)
    }

    /// Reject values that would break engine invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cascade.max_depth > MAX_CASCADE_DEPTH {
            return Err(ConfigError::Invalid {
                field: "cascade.max_depth",
                message: format!("must be <= {MAX_CASCADE_DEPTH}"),
            });
        }
        if self.idempotency_window == 0 {
            return Err(ConfigError::Invalid {
                field: "idempotency_window",
                message: "must be >= 1".to_string(),
            });
        }
        if self.stream_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "stream_capacity",
                message: "must be >= 1".to_string(),
            });
        }
        if self.leverage.escalation_window >= self.leverage.deadline_turns {
            return Err(ConfigError::Invalid {
                field: "leverage.escalation_window",
                message: "must be shorter than leverage.deadline_turns".to_string(),
            });
        }
        Ok(())
    }

    /// A config with no cascade at all, for isolating resolver behavior.
    pub fn without_cascade() -> Self {
        Self {
            cascade: CascadeConfig {
                max_depth: 0,
                ..CascadeConfig::default()
            },
            ..Self::default()
        }
    }
}

/// Second-order consequence propagation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeConfig {
    /// Depth at which propagation stops (inclusive). Never above 5.
    #[serde(default = "default_max_depth")]
    pub max_depth: u8,
    /// Propagated standing deltas smaller than this (in magnitude) are dropped.
    #[serde(default = "default_min_delta")]
    pub min_propagated_delta: i32,
    /// Standing lost with a region's controller when the player trespasses.
    #[serde(default = "default_trespass_penalty")]
    pub trespass_penalty: i32,
    /// Standing swing at which affiliated NPCs shift one disposition tier.
    #[serde(default = "default_affiliate_threshold")]
    pub affiliate_shift_threshold: i32,
}

fn default_max_depth() -> u8 {
    MAX_CASCADE_DEPTH
}

fn default_min_delta() -> i32 {
    1
}

fn default_trespass_penalty() -> i32 {
    5
}

fn default_affiliate_threshold() -> i32 {
    10
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            min_propagated_delta: default_min_delta(),
            trespass_penalty: default_trespass_penalty(),
            affiliate_shift_threshold: default_affiliate_threshold(),
        }
    }
}

/// Leverage demand lifecycle and response costs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeverageConfig {
    /// Turns between a demand's creation and its deadline.
    pub deadline_turns: u64,
    /// A demand escalates when this many turns or fewer remain.
    pub escalation_window: u64,
    /// Turns added to the deadline by a successful negotiation.
    pub negotiation_extension: u64,
    /// Credits paid on compliance, per weight step.
    pub comply_credit_cost: i64,
    /// Standing gained with the demanding faction on compliance.
    pub comply_standing_gain: i32,
    /// Standing lost with `at_expense_of` on compliance, per weight step.
    pub comply_standing_cost: i32,
    /// Standing lost with the demanding faction on resistance, per weight step.
    pub resist_standing_penalty: i32,
    /// Turns after a resistance before the retaliation thread can surface.
    pub retaliation_delay: u64,
    /// Turns after a resolution before the faction issues its next demand.
    pub recurrence_turns: u64,
}

impl Default for LeverageConfig {
    fn default() -> Self {
        Self {
            deadline_turns: 3,
            escalation_window: 1,
            negotiation_extension: 2,
            comply_credit_cost: 20,
            comply_standing_gain: 2,
            comply_standing_cost: 3,
            resist_standing_penalty: 5,
            retaliation_delay: 2,
            recurrence_turns: 6,
        }
    }
}

/// Travel costs per approach.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TravelConfig {
    pub direct_energy_cost: i32,
    pub bribe_credits: i64,
    pub contact_energy_cost: i32,
    pub risky_exposure: i32,
}

impl Default for TravelConfig {
    fn default() -> Self {
        Self {
            direct_energy_cost: 0,
            bribe_credits: 30,
            contact_energy_cost: 2,
            risky_exposure: 15,
        }
    }
}

/// Calling in favors from contacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FavorConfig {
    pub energy_cost: i32,
    pub introduction_standing: i32,
    pub resource_credits: i64,
}

impl Default for FavorConfig {
    fn default() -> Self {
        Self {
            energy_cost: 2,
            introduction_standing: 8,
            resource_credits: 25,
        }
    }
}

/// Combat contest tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Bonus added to the player's d20 per enhancement held.
    pub enhancement_bonus: u32,
    /// Standing lost with the target's faction when combat is initiated.
    pub standing_penalty: i32,
    pub exposure: i32,
    /// Credits lost on defeat.
    pub defeat_credit_loss: i64,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            enhancement_bonus: 2,
            standing_penalty: 10,
            exposure: 10,
            defeat_credit_loss: 15,
        }
    }
}

/// Narrative collaborator settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrativeConfig {
    #[serde(default = "default_narrative_enabled")]
    pub enabled: bool,
    #[serde(default = "default_narrative_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_narrative_enabled() -> bool {
    true
}

fn default_narrative_timeout_ms() -> u64 {
    3_000
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            enabled: default_narrative_enabled(),
            timeout_ms: default_narrative_timeout_ms(),
        }
    }
}

impl NarrativeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cascade.max_depth, 5);
        assert_eq!(config.leverage.deadline_turns, 3);
    }

    #[test]
    fn test_depth_above_five_is_rejected() {
        let mut config = EngineConfig::default();
        config.cascade.max_depth = 6;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "cascade.max_depth", .. })
        ));
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"cascade":{"trespass_penalty":9}}"#).unwrap();
        assert_eq!(config.cascade.trespass_penalty, 9);
        assert_eq!(config.cascade.max_depth, 5);
        assert_eq!(config.idempotency_window, 64);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("engine.json");
        std::fs::write(&path, r#"{"idempotency_window": 8}"#).unwrap();
        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.idempotency_window, 8);
    }
}
