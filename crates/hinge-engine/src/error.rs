//! Error types for the turn engine.

use hinge_core::{ActionId, ActionType, CampaignId};
use thiserror::Error;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type alias for resolver operations.
pub type ResolverResult<T> = Result<T, ResolverError>;

/// Result type alias for turn submission.
pub type SubmitResult<T> = Result<T, TurnError>;

/// Errors raised by a [`CampaignStore`](crate::store::CampaignStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// No campaign is stored under this id.
    #[error("campaign not found: {0}")]
    CampaignNotFound(CampaignId),

    /// A campaign already exists under this id.
    #[error("campaign already exists: {0}")]
    CampaignExists(CampaignId),

    /// Compare-and-swap failed: someone else committed first.
    #[error("stale version: expected {expected}, store holds {found}")]
    StaleVersion { expected: u64, found: u64 },

    /// A commit must advance the version by exactly one.
    #[error("version must advance by one: {from} -> {to}")]
    VersionSkip { from: u64, to: u64 },

    /// The id cannot be used as a storage key.
    #[error("invalid campaign id: {0:?}")]
    InvalidId(String),

    /// Snapshot serialization/deserialization error.
    #[error("snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error (file operations).
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while resolving an action. Any of these rolls the turn back.
#[derive(Debug, Error)]
pub enum ResolverError {
    /// The action was routed to a resolver for a different type.
    #[error("resolver for {expected} received a {found} payload")]
    PayloadMismatch { expected: ActionType, found: ActionType },

    /// No resolver is registered for the action type.
    #[error("no resolver registered for {0}")]
    NoResolver(ActionType),

    /// The payload names an entity the campaign does not contain.
    #[error("unknown {kind}: {id}")]
    UnknownEntity { kind: &'static str, id: String },

    /// The state does not allow the action even though validation passed.
    #[error("inconsistent state: {message}")]
    Inconsistent { message: String },
}

impl ResolverError {
    pub fn unknown(kind: &'static str, id: impl ToString) -> Self {
        Self::UnknownEntity {
            kind,
            id: id.to_string(),
        }
    }

    pub fn inconsistent(message: impl Into<String>) -> Self {
        Self::Inconsistent {
            message: message.into(),
        }
    }
}

/// Rejections and failures of a submitted action.
///
/// Messages use the same vocabulary as proposal previews.
#[derive(Debug, Error)]
pub enum TurnError {
    /// The caller's `state_version` is no longer current; re-fetch and retry.
    #[error("stale state: action was built against version {submitted}, campaign is at {current}")]
    StaleState { submitted: u64, current: u64 },

    /// The action id was already committed but its receipt has expired.
    #[error("duplicate action {0}: already committed")]
    Duplicate(ActionId),

    /// Another action is resolving on this campaign; retry.
    #[error("campaign {0} is busy resolving another action")]
    Busy(CampaignId),

    /// Validation failed before any resolver ran.
    #[error("requirements not met: {}", failed.join("; "))]
    RequirementNotMet { failed: Vec<String> },

    /// The resolver failed; nothing was persisted.
    #[error("resolution failed: {0}")]
    ResolverFailure(#[from] ResolverError),

    /// Persistence failed; nothing was committed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl TurnError {
    /// Stable machine-readable code for transports.
    pub fn code(&self) -> &'static str {
        match self {
            Self::StaleState { .. } => "STALE_STATE",
            Self::Duplicate(_) => "DUPLICATE",
            Self::Busy(_) => "BUSY",
            Self::RequirementNotMet { .. } => "REQUIREMENT_NOT_MET",
            Self::ResolverFailure(_) => "RESOLVER_FAILURE",
            Self::Store(StoreError::CampaignNotFound(_)) => "NOT_FOUND",
            Self::Store(_) => "STORE_ERROR",
        }
    }
}

/// Failures of the optional narrative collaborator. Never fail a turn.
#[derive(Debug, Error)]
pub enum NarrativeError {
    #[error("narrator unavailable: {0}")]
    Unavailable(String),

    #[error("narration timed out after {0} ms")]
    Timeout(u64),

    #[error("narration failed: {0}")]
    Failed(String),
}

/// Invalid engine configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config value `{field}`: {message}")]
    Invalid { field: &'static str, message: String },

    #[error("config serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
