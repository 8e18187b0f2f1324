//! Campaign lifecycle and read endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use hinge_core::{Campaign, CampaignId, CampaignView, HingeMoment};
use hinge_engine::sample_seed;
use tracing::info;

use super::blocking;
use crate::types::{ApiError, ApiResponse, ApiState, CreateCampaignRequest};

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// GET /api/campaigns
pub async fn list_handler(State(state): State<Arc<ApiState>>) -> ApiResult<Vec<CampaignId>> {
    let ids = blocking(&state, |o| Ok(o.list()?)).await?;
    Ok(Json(ApiResponse::new(ids)))
}

/// POST /api/campaigns - Create from a seed, or from the bundled sample.
pub async fn create_handler(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<CreateCampaignRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CampaignView>>), ApiError> {
    let seed = match request.seed {
        Some(seed) => {
            seed.validate()
                .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, "INVALID_SEED", e.to_string()))?;
            seed
        }
        None => sample_seed().map_err(|e| ApiError::internal(e.to_string()))?,
    };
    let mut campaign = seed.into_campaign(request.id);
    if let Some(rng_seed) = request.rng_seed {
        campaign.seed = rng_seed;
    }

    let view = blocking(&state, move |o| Ok(o.create_campaign(&campaign)?)).await?;
    info!(campaign = %view.campaign_id, "Created campaign via API");
    Ok((StatusCode::CREATED, Json(ApiResponse::new(view))))
}

/// GET /api/campaigns/{id}
pub async fn view_handler(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<CampaignId>,
) -> ApiResult<CampaignView> {
    let view = blocking(&state, move |o| Ok(o.view(&id)?)).await?;
    Ok(Json(ApiResponse::new(view)))
}

/// GET /api/campaigns/{id}/snapshot
pub async fn snapshot_handler(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<CampaignId>,
) -> ApiResult<Campaign> {
    let campaign = blocking(&state, move |o| Ok(o.snapshot(&id)?)).await?;
    Ok(Json(ApiResponse::new(campaign)))
}

/// GET /api/campaigns/{id}/hinges
pub async fn hinges_handler(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<CampaignId>,
) -> ApiResult<Vec<HingeMoment>> {
    let hinges = blocking(&state, move |o| Ok(o.hinges(&id)?)).await?;
    Ok(Json(ApiResponse::new(hinges)))
}

/// DELETE /api/campaigns/{id}
pub async fn delete_handler(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<CampaignId>,
) -> ApiResult<CampaignId> {
    let deleted = id.clone();
    blocking(&state, move |o| Ok(o.delete(&id)?)).await?;
    Ok(Json(ApiResponse::new(deleted)))
}
