//! Health check endpoint.

use std::sync::Arc;

use axum::{extract::State, Json};

use super::blocking;
use crate::types::{ApiError, ApiResponse, ApiState, HealthResponse};

/// Handler for GET /api/health
pub async fn health_handler(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<ApiResponse<HealthResponse>>, ApiError> {
    let campaigns = blocking(&state, |o| Ok(o.list()?.len())).await?;
    let response = HealthResponse {
        status: "ok".to_string(),
        campaigns,
        subscribers: state.orchestrator.stream().subscriber_count(),
    };
    Ok(Json(ApiResponse::new(response)))
}
