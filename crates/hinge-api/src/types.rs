//! API types and DTOs.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use hinge_core::{ActionId, ActionPayload, CampaignId};
use hinge_engine::{CampaignSeed, StoreError, TurnError, TurnOrchestrator};
use serde::{Deserialize, Serialize};
use tracing::error;

/// Shared application state for the API.
pub struct ApiState {
    /// The orchestrator every request goes through.
    pub orchestrator: Arc<TurnOrchestrator>,
}

/// Response wrapper with timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Response data.
    pub data: T,
    /// Unix timestamp in milliseconds.
    pub timestamp: u64,
}

impl<T> ApiResponse<T> {
    /// Create a new API response with current timestamp.
    pub fn new(data: T) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self { data, timestamp }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub campaigns: usize,
    /// Open event stream subscriptions.
    pub subscribers: usize,
}

/// Body of `POST /campaigns`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCampaignRequest {
    pub id: CampaignId,
    /// Authored starting state; the bundled sample when absent.
    #[serde(default)]
    pub seed: Option<CampaignSeed>,
    /// Overrides the seed's root rng seed.
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

/// Body of `POST /campaigns/{id}/proposals`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalRequest {
    pub payload: ActionPayload,
}

/// Body of `POST /campaigns/{id}/actions`. The campaign comes from the path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRequest {
    pub action_id: ActionId,
    pub payload: ActionPayload,
    pub state_version: u64,
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Error payload shared by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    /// Unmet requirements, for `REQUIREMENT_NOT_MET`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<String>,
}

/// A handler failure, rendered as `ApiResponse<ErrorBody>`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                code: code.to_string(),
                message: message.into(),
                failed: Vec::new(),
            },
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", message)
    }
}

impl From<TurnError> for ApiError {
    fn from(err: TurnError) -> Self {
        let status = match &err {
            TurnError::StaleState { .. } | TurnError::Duplicate(_) => StatusCode::CONFLICT,
            TurnError::Busy(_) => StatusCode::SERVICE_UNAVAILABLE,
            TurnError::RequirementNotMet { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            TurnError::ResolverFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            TurnError::Store(StoreError::CampaignNotFound(_)) => StatusCode::NOT_FOUND,
            TurnError::Store(StoreError::CampaignExists(_)) => StatusCode::CONFLICT,
            TurnError::Store(StoreError::InvalidId(_)) => StatusCode::BAD_REQUEST,
            TurnError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let failed = match &err {
            TurnError::RequirementNotMet { failed } => failed.clone(),
            _ => Vec::new(),
        };
        Self {
            status,
            body: ErrorBody {
                code: err.code().to_string(),
                message: err.to_string(),
                failed,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() && self.status != StatusCode::SERVICE_UNAVAILABLE {
            error!(code = %self.body.code, "{}", self.body.message);
        }
        (self.status, Json(ApiResponse::new(self.body))).into_response()
    }
}

/// WebSocket control message sent from server to client.
///
/// Turn events themselves are sent as [`hinge_engine::StreamMessage`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsControlMessage {
    /// Subscription acknowledged.
    Subscribed { campaign_id: Option<CampaignId> },
    /// Error occurred.
    Error { code: String, message: String },
    /// Pong response to client ping.
    Pong,
}

/// WebSocket message sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsClientMessage {
    /// Only forward events for one campaign; `None` forwards all.
    Subscribe {
        #[serde(default)]
        campaign_id: Option<CampaignId>,
    },
    /// Ping to keep connection alive.
    Ping,
}
