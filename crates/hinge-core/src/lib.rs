//! Campaign data model for the hinge turn-resolution engine.
//!
//! Everything here is a plain serializable value with no I/O. The engine
//! crate owns all behavior that changes a [`Campaign`]; this crate only
//! guarantees the invariants that can be enforced locally:
//!
//! - [`StandingValue`] and [`Disposition`] are always within range
//! - [`HingeMoment`]s have no setters and the campaign only appends them
//! - a [`DormantThread`] surfaces at most once and its trigger never changes
//! - maps are ordered, so identical campaigns serialize to identical bytes

pub mod action;
pub mod builder;
pub mod campaign;
pub mod event;
pub mod hinge;
pub mod ids;
pub mod leverage;
pub mod npc;
pub mod thread;
pub mod turn;
pub mod view;
pub mod world;

pub use action::{
    Action, ActionPayload, ActionType, Alternative, CostPreview, FavorAsk, Proposal,
    ProposalResult, Requirement, TravelApproach,
};
pub use builder::CampaignBuilder;
pub use campaign::Campaign;
pub use event::{tags, Event, EventPayload, EventType, FeedEntry, FeedTone};
pub use hinge::HingeMoment;
pub use ids::{
    ActionId, CampaignId, DemandId, EnhancementId, EventId, FactionId, JobId, NpcId, RegionId,
    ThreadId,
};
pub use leverage::{DemandResolution, DemandResponse, DemandState, DemandWeight, LeverageDemand};
pub use npc::{Agenda, Disposition, DispositionModifier, MemoryTrigger, Npc};
pub use thread::{
    DormantThread, Severity, TagMatch, ThreadConsequence, ThreadStatus, TriggerCondition,
};
pub use turn::{NarrativeHook, TurnPhase, TurnResult};
pub use view::{CampaignView, FactionView, JobView, NpcView, PriorityItem, RegionView, ThreadView};
pub use world::{
    ConnectivityTier, Enhancement, EnhancementOffer, FactionLink, FactionState, Job, JobStatus,
    PlayerState, RegionState, RouteRequirement, StandingValue,
};
