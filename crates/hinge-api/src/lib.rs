//! REST + WebSocket transport for the hinge turn engine.
//!
//! The engine stays authoritative; this crate only maps HTTP onto
//! [`TurnOrchestrator`] calls and forwards the event stream.
//!
//! ## Endpoints
//!
//! - `GET /api/health` - Health check with campaign and subscriber counts
//! - `GET /api/campaigns` - Campaign ids
//! - `POST /api/campaigns` - Create a campaign from a seed (bundled sample by default)
//! - `GET /api/campaigns/{id}` - Read model of a campaign
//! - `DELETE /api/campaigns/{id}` - Delete a campaign
//! - `GET /api/campaigns/{id}/snapshot` - Full campaign state
//! - `GET /api/campaigns/{id}/hinges` - Recorded hinge moments
//! - `POST /api/campaigns/{id}/proposals` - Preview an action (no side effects)
//! - `POST /api/campaigns/{id}/actions` - Resolve and commit an action
//! - `GET /api/ws` - WebSocket carrying the turn event stream
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use hinge_api::{create_api_router, create_api_state};
//! use hinge_engine::{EngineConfig, MemoryCampaignStore, TurnOrchestrator};
//!
//! let orchestrator = TurnOrchestrator::new(Arc::new(MemoryCampaignStore::new()), EngineConfig::default());
//! let router = create_api_router(create_api_state(orchestrator));
//! ```

mod routes;
mod types;
mod ws;

pub use routes::create_api_router;
pub use types::{
    ActionRequest, ApiError, ApiResponse, ApiState, CreateCampaignRequest, ErrorBody,
    HealthResponse, ProposalRequest, WsClientMessage, WsControlMessage,
};

use std::sync::Arc;

use hinge_engine::TurnOrchestrator;

/// Wrap an orchestrator for sharing across handlers.
pub fn create_api_state(orchestrator: TurnOrchestrator) -> Arc<ApiState> {
    Arc::new(ApiState {
        orchestrator: Arc::new(orchestrator),
    })
}
