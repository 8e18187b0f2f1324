//! Resolver abstractions.
//!
//! A resolver maps `(state, action, seed)` to `(new_state, events)` for one
//! action type. Resolvers receive a private clone of the campaign, mutate it,
//! and describe every change as a flat list of events. They never reach the
//! cascade or the narrator; the pipeline sequences those.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use hinge_core::{
    Action, ActionId, ActionPayload, ActionType, Campaign, CostPreview, Event, EventPayload,
    FactionId, ProposalResult, StandingValue,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::EngineConfig;
use crate::error::{ResolverError, ResolverResult};

/// Context handed to a resolver for one action.
///
/// Owns the only source of randomness a resolver may use, seeded from the
/// action seed, and collects the events the resolver emits.
pub struct ResolverContext<'a> {
    pub config: &'a EngineConfig,
    pub action_id: &'a ActionId,
    pub turn: u64,
    pub seed: u64,
    rng: ChaCha8Rng,
    events: Vec<Event>,
    next_seq: usize,
}

impl<'a> ResolverContext<'a> {
    /// `first_seq` continues event numbering after events already emitted this turn.
    pub fn new(config: &'a EngineConfig, action_id: &'a ActionId, turn: u64, seed: u64, first_seq: usize) -> Self {
        Self {
            config,
            action_id,
            turn,
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
            events: Vec::new(),
            next_seq: first_seq,
        }
    }

    /// Record a root event.
    pub fn emit(&mut self, payload: EventPayload, tags: Vec<String>) {
        let event = Event::root(self.action_id, self.next_seq, self.turn, payload, tags);
        self.next_seq += 1;
        self.events.push(event);
    }

    /// Roll a die with `sides` faces (1-based).
    pub fn roll(&mut self, sides: u32) -> u32 {
        self.rng.random_range(1..=sides.max(1))
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn next_seq(&self) -> usize {
        self.next_seq
    }

    pub fn into_events(self) -> Vec<Event> {
        self.events
    }

    /// Shift standing with a faction and emit the change, if any.
    pub fn shift_standing(
        &mut self,
        state: &mut Campaign,
        faction: &FactionId,
        delta: i32,
        reason: &str,
        mut tags: Vec<String>,
    ) -> ResolverResult<()> {
        let entry = state
            .factions
            .get_mut(faction)
            .ok_or_else(|| ResolverError::unknown("faction", faction))?;
        let previous = entry.standing;
        let current: StandingValue = previous.shifted(delta);
        if current == previous {
            return Ok(());
        }
        entry.standing = current;
        tags.push(hinge_core::tags::faction(faction));
        tags.push(if delta < 0 {
            hinge_core::tags::standing_loss(faction)
        } else {
            hinge_core::tags::standing_gain(faction)
        });
        self.emit(
            EventPayload::FactionStandingChanged {
                faction: faction.clone(),
                previous: previous.value(),
                current: current.value(),
                delta: current.value() - previous.value(),
                reason: reason.to_string(),
            },
            tags,
        );
        Ok(())
    }

    /// Charge the player and emit a resources event when anything changed.
    ///
    /// Credits floor at zero; a cost larger than the balance takes what is
    /// there and the event reports the amount actually taken.
    pub fn charge(&mut self, state: &mut Campaign, cost: &CostPreview) {
        if cost.credits == 0 && cost.social_energy == 0 && cost.exposure == 0 {
            return;
        }
        let credits = state.player.spend_credits(cost.credits);
        state.player.spend_social_energy(cost.social_energy);
        state.player.add_exposure(cost.exposure);
        self.emit(
            EventPayload::ResourcesChanged {
                credits: -credits,
                social_energy: -cost.social_energy,
                exposure: cost.exposure,
            },
            Vec::new(),
        );
    }
}

impl fmt::Debug for ResolverContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverContext")
            .field("action_id", &self.action_id)
            .field("turn", &self.turn)
            .field("seed", &self.seed)
            .field("events", &self.events.len())
            .finish()
    }
}

/// A handler for one action type.
///
/// `preview` must be pure: it is what proposals are answered with and what
/// validation checks before `resolve` runs.
pub trait Resolver: Send + Sync {
    /// The action type this resolver handles.
    fn action_type(&self) -> ActionType;

    /// Human-readable description.
    fn description(&self) -> &str {
        ""
    }

    /// Requirements, cost and alternatives of a payload against the current state.
    fn preview(&self, state: &Campaign, payload: &ActionPayload, config: &EngineConfig) -> ResolverResult<ProposalResult>;

    /// Apply the action to `state`, emitting events through `ctx`.
    fn resolve(&self, state: &mut Campaign, action: &Action, ctx: &mut ResolverContext<'_>) -> ResolverResult<()>;
}

/// Registry of resolvers keyed by action type.
pub struct ResolverRegistry {
    resolvers: BTreeMap<ActionType, Arc<dyn Resolver>>,
}

impl Default for ResolverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolverRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            resolvers: BTreeMap::new(),
        }
    }

    /// A registry with every built-in resolver.
    pub fn standard() -> Self {
        use crate::resolvers::*;
        Self::new()
            .with_resolver(Arc::new(TravelResolver))
            .with_resolver(Arc::new(AcceptJobResolver))
            .with_resolver(Arc::new(CompleteJobResolver))
            .with_resolver(Arc::new(CallFavorResolver))
            .with_resolver(Arc::new(DemandResponseResolver))
            .with_resolver(Arc::new(CombatResolver))
            .with_resolver(Arc::new(EnhancementResolver))
            .with_resolver(Arc::new(ChoiceResolver))
    }

    /// Register a resolver, replacing any existing one for the same type.
    pub fn register(&mut self, resolver: Arc<dyn Resolver>) {
        self.resolvers.insert(resolver.action_type(), resolver);
    }

    /// Register a resolver (builder pattern).
    pub fn with_resolver(mut self, resolver: Arc<dyn Resolver>) -> Self {
        self.register(resolver);
        self
    }

    pub fn get(&self, action_type: ActionType) -> ResolverResult<&Arc<dyn Resolver>> {
        self.resolvers
            .get(&action_type)
            .ok_or(ResolverError::NoResolver(action_type))
    }

    pub fn action_types(&self) -> impl Iterator<Item = ActionType> + '_ {
        self.resolvers.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    /// Resolve an action against a copy of `state`.
    ///
    /// Deterministic: identical `(state, action, seed)` yield identical output.
    pub fn resolve(
        &self,
        state: &Campaign,
        action: &Action,
        seed: u64,
        config: &EngineConfig,
    ) -> ResolverResult<(Campaign, Vec<Event>)> {
        let resolver = self.get(action.action_type())?;
        let mut next = state.clone();
        let mut ctx = ResolverContext::new(config, &action.action_id, state.turn_count, seed, 0);
        resolver.resolve(&mut next, action, &mut ctx)?;
        Ok((next, ctx.into_events()))
    }
}

impl fmt::Debug for ResolverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverRegistry")
            .field("action_types", &self.resolvers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Derive the resolution seed for an action that did not supply one.
///
/// FNV-1a over the action id, mixed with the campaign seed and the version
/// the action targets, then finalized with SplitMix64.
pub fn derive_seed(campaign_seed: u64, action_id: &ActionId, state_version: u64) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut hash = FNV_OFFSET;
    for byte in action_id.as_str().bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    let mut z = hash ^ campaign_seed.rotate_left(17) ^ state_version.wrapping_mul(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Extract the payload variant a resolver expects, or fail with a mismatch.
macro_rules! expect_payload {
    ($action:expr, $expected:expr, $pat:pat => $out:expr) => {
        match &$action.payload {
            $pat => $out,
            other => {
                return Err($crate::error::ResolverError::PayloadMismatch {
                    expected: $expected,
                    found: other.action_type(),
                })
            }
        }
    };
}
pub(crate) use expect_payload;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_seed_is_stable_and_sensitive() {
        let a = ActionId::new("act-1");
        let s1 = derive_seed(42, &a, 3);
        assert_eq!(s1, derive_seed(42, &a, 3));
        assert_ne!(s1, derive_seed(42, &a, 4));
        assert_ne!(s1, derive_seed(43, &a, 3));
        assert_ne!(s1, derive_seed(42, &ActionId::new("act-2"), 3));
    }

    #[test]
    fn test_charge_floors_credits_at_zero() {
        let config = EngineConfig::default();
        let id = ActionId::new("a");
        let mut ctx = ResolverContext::new(&config, &id, 1, 7, 0);
        let mut state = crate::resolvers::test_support::two_region_campaign();
        state.player.credits = 12;

        ctx.charge(
            &mut state,
            &CostPreview {
                credits: 50,
                ..CostPreview::default()
            },
        );

        assert_eq!(state.player.credits, 0);
        let events = ctx.into_events();
        assert!(matches!(
            events.last().map(|e| &e.payload),
            Some(EventPayload::ResourcesChanged { credits: -12, .. })
        ));
    }

    #[test]
    fn test_rolls_repeat_for_same_seed() {
        let config = EngineConfig::default();
        let id = ActionId::new("a");
        let mut c1 = ResolverContext::new(&config, &id, 1, 99, 0);
        let mut c2 = ResolverContext::new(&config, &id, 1, 99, 0);
        let r1: Vec<u32> = (0..8).map(|_| c1.roll(20)).collect();
        let r2: Vec<u32> = (0..8).map(|_| c2.roll(20)).collect();
        assert_eq!(r1, r2);
        assert!(r1.iter().all(|r| (1..=20).contains(r)));
    }

    #[test]
    fn test_standard_registry_covers_every_action_type() {
        let registry = ResolverRegistry::standard();
        for action_type in ActionType::ALL {
            assert!(registry.get(action_type).is_ok(), "missing {action_type}");
        }
        assert_eq!(registry.len(), ActionType::ALL.len());
    }
}
