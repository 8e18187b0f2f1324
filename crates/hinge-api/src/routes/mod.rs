//! API route handlers.

mod campaigns;
mod health;
mod turns;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use hinge_engine::TurnOrchestrator;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::types::{ApiError, ApiState};
use crate::ws::ws_handler;

/// Create the API router with all endpoints.
pub fn create_api_router(state: Arc<ApiState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health
        .route("/health", get(health::health_handler))
        // Campaigns
        .route(
            "/campaigns",
            get(campaigns::list_handler).post(campaigns::create_handler),
        )
        .route(
            "/campaigns/{id}",
            get(campaigns::view_handler).delete(campaigns::delete_handler),
        )
        .route("/campaigns/{id}/snapshot", get(campaigns::snapshot_handler))
        .route("/campaigns/{id}/hinges", get(campaigns::hinges_handler))
        // Turns
        .route("/campaigns/{id}/proposals", post(turns::propose_handler))
        .route("/campaigns/{id}/actions", post(turns::submit_handler))
        // WebSocket
        .route("/ws", get(ws_handler))
        // Request tracing (enable with RUST_LOG=tower_http=info or higher)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(
                    DefaultMakeSpan::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}

/// Run an orchestrator call off the async workers; stores do blocking IO.
async fn blocking<T, F>(state: &ApiState, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&TurnOrchestrator) -> Result<T, ApiError> + Send + 'static,
{
    let orchestrator = Arc::clone(&state.orchestrator);
    tokio::task::spawn_blocking(move || f(&orchestrator))
        .await
        .map_err(|e| ApiError::internal(format!("worker failed: {e}")))?
}
