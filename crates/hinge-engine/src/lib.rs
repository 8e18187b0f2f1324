//! Deterministic turn resolution for hinge campaigns.
//!
//! An action is validated against the campaign, resolved by the resolver
//! registered for its type, run through leverage upkeep and the
//! consequence cascade, and committed as a new campaign version. All of
//! that is a pure function of `(campaign, action, seed)`; persistence,
//! per-campaign locking, streaming and narration sit around it in the
//! [`TurnOrchestrator`].
//!
//! ## Turn flow
//!
//! ```text
//! submit(action)
//!   ├─ lock campaign            (Busy if held)
//!   ├─ load, dedupe, version    (receipt replay / Duplicate / StaleState)
//!   ├─ TurnPipeline::execute
//!   │    validate → resolve → leverage::advance → cascade → TurnEnded
//!   ├─ store.commit             (compare-and-swap on state_version)
//!   ├─ save receipt, unlock
//!   ├─ publish to EventStream
//!   └─ narrate in background    (timeout → narration_unavailable)
//! ```
//!
//! ## Guarantees
//!
//! - same initial campaign, actions and seeds give byte-identical campaigns
//! - re-submitting an action id returns the original result unchanged
//! - `state_version` rises by exactly one per committed action
//! - cascades never go deeper than [`MAX_CASCADE_DEPTH`]
//! - hinge moments are only ever appended

pub mod cascade;
pub mod config;
mod error;
pub mod feed;
pub mod leverage;
pub mod narrative;
pub mod orchestrator;
pub mod pipeline;
pub mod resolver;
pub mod resolvers;
pub mod seed;
pub mod store;
pub mod stream;
pub mod validator;

pub use cascade::{CascadeOutcome, CascadeProcessor};
pub use config::{
    CascadeConfig, CombatConfig, EngineConfig, FavorConfig, LeverageConfig, NarrativeConfig,
    TravelConfig, MAX_CASCADE_DEPTH,
};
pub use error::{
    ConfigError, NarrativeError, ResolverError, ResolverResult, StoreError, StoreResult,
    SubmitResult, TurnError,
};
pub use narrative::{NarrationDispatcher, NarrationRequest, NarrativeAdapter, NpcBrief, TemplateNarrator};
pub use orchestrator::{TurnLifecycle, TurnOrchestrator};
pub use pipeline::{TurnOutcome, TurnPipeline};
pub use resolver::{derive_seed, Resolver, ResolverContext, ResolverRegistry};
pub use seed::{sample_seed, CampaignSeed, SeedThread};
pub use store::{CampaignStore, FileCampaignStore, MemoryCampaignStore, StoreStats};
pub use stream::{EventStream, StreamMessage};
