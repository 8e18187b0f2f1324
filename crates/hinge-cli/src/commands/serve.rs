//! Serve command implementation.
//!
//! Mounts the hinge REST + WebSocket API under `/api`, backed by the
//! campaign store in the data directory. Narration uses the template
//! narrator.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use hinge_api::{create_api_router, create_api_state};
use hinge_engine::TemplateNarrator;
use tokio::net::TcpListener;
use tracing::info;

use super::Session;
use crate::config::Config;

pub async fn execute(config: &Config, port: u16) -> Result<()> {
    let session = Session::open(config)?;
    let orchestrator = session.orchestrator.with_narrator(Arc::new(TemplateNarrator));
    let campaigns = orchestrator.list()?.len();

    let app = Router::new().nest("/api", create_api_router(create_api_state(orchestrator)));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!(%addr, campaigns, data_dir = %config.data_dir.display(), "Starting server");

    println!();
    println!("🚀 Hinge Server");
    println!("   API:  http://localhost:{}/api/health", port);
    println!("   WS:   ws://localhost:{}/api/ws", port);
    println!("   Data: {} ({} campaigns)", config.data_dir.display(), campaigns);
    println!();
    println!("   Press Ctrl+C to stop");
    println!();

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;
    Ok(())
}
