//! Action validation.
//!
//! Validation and proposals share one code path: a payload is valid exactly
//! when its preview is traversable, so the failure reasons returned on
//! submission match the requirement lines a proposal showed.

use hinge_core::{ActionPayload, Campaign, ProposalResult};

use crate::config::EngineConfig;
use crate::error::{ResolverResult, TurnError};
use crate::resolver::ResolverRegistry;

/// Preview `payload` against `state`. Pure.
pub fn preview(
    registry: &ResolverRegistry,
    state: &Campaign,
    payload: &ActionPayload,
    config: &EngineConfig,
) -> ResolverResult<ProposalResult> {
    registry
        .get(payload.action_type())?
        .preview(state, payload, config)
}

/// Check `payload` against `state`, returning the preview when it passes.
pub fn validate(
    registry: &ResolverRegistry,
    state: &Campaign,
    payload: &ActionPayload,
    config: &EngineConfig,
) -> Result<ProposalResult, TurnError> {
    let result = preview(registry, state, payload, config)?;
    if !result.traversable {
        return Err(TurnError::RequirementNotMet {
            failed: result.failed_requirements(),
        });
    }
    Ok(result)
}
