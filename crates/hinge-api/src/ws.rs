//! WebSocket handler forwarding the turn event stream.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use hinge_core::CampaignId;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, error, warn};

use crate::types::{ApiState, WsClientMessage, WsControlMessage};

/// Handler for WebSocket upgrade at GET /api/ws
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<ApiState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle an individual WebSocket connection.
async fn handle_socket(mut socket: WebSocket, state: Arc<ApiState>) {
    debug!("WebSocket client connected");

    let mut rx = state.orchestrator.stream().subscribe();
    let mut filter: Option<CampaignId> = None;

    loop {
        tokio::select! {
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Err(e) = handle_client_message(&text, &mut socket, &mut filter).await {
                            warn!("Error handling client message: {}", e);
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        debug!("WebSocket client disconnected");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        error!("WebSocket error: {}", e);
                        break;
                    }
                    None => {
                        debug!("WebSocket stream ended");
                        break;
                    }
                }
            }

            msg = rx.recv() => {
                match msg {
                    Ok(event) => {
                        if filter.as_ref().is_some_and(|id| id != event.campaign_id()) {
                            continue;
                        }
                        if let Err(e) = send_json(&mut socket, &event).await {
                            error!("Failed to send WebSocket message: {}", e);
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("WebSocket client lagged, missed {} messages", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Event stream closed");
                        break;
                    }
                }
            }
        }
    }
}

/// Handle a message from the client.
async fn handle_client_message(
    text: &str,
    socket: &mut WebSocket,
    filter: &mut Option<CampaignId>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let msg: WsClientMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => {
            let reply = WsControlMessage::Error {
                code: "BAD_MESSAGE".to_string(),
                message: e.to_string(),
            };
            return send_json(socket, &reply).await;
        }
    };

    match msg {
        WsClientMessage::Ping => send_json(socket, &WsControlMessage::Pong).await?,
        WsClientMessage::Subscribe { campaign_id } => {
            debug!(campaign = ?campaign_id, "Client subscribed");
            *filter = campaign_id.clone();
            send_json(socket, &WsControlMessage::Subscribed { campaign_id }).await?;
        }
    }

    Ok(())
}

async fn send_json<T: Serialize>(
    socket: &mut WebSocket,
    msg: &T,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let json = serde_json::to_string(msg)?;
    socket.send(Message::Text(json.into())).await?;
    Ok(())
}
