//! Proposal and submission endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use hinge_core::{Action, CampaignId, ProposalResult, TurnResult};
use tracing::debug;

use super::blocking;
use crate::types::{ActionRequest, ApiError, ApiResponse, ApiState, ProposalRequest};

/// POST /api/campaigns/{id}/proposals - Preview; never mutates state.
pub async fn propose_handler(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<CampaignId>,
    Json(request): Json<ProposalRequest>,
) -> Result<Json<ApiResponse<ProposalResult>>, ApiError> {
    let result = blocking(&state, move |o| Ok(o.propose(&id, &request.payload)?)).await?;
    Ok(Json(ApiResponse::new(result)))
}

/// POST /api/campaigns/{id}/actions - Resolve and commit.
pub async fn submit_handler(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<CampaignId>,
    Json(request): Json<ActionRequest>,
) -> Result<Json<ApiResponse<TurnResult>>, ApiError> {
    let mut action = Action::new(request.action_id, id, request.payload, request.state_version);
    if let Some(seed) = request.seed {
        action = action.with_seed(seed);
    }
    debug!(action = %action.action_id, version = action.state_version, "Submitting action");

    let result = blocking(&state, move |o| Ok(o.submit(&action)?)).await?;
    Ok(Json(ApiResponse::new(result)))
}
