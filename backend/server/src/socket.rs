//! # Signaling Socket
//!
//! `GET /ws` upgrades to a WebSocket carrying JSON envelopes (see the
//! `protocol` crate). Each session gets:
//!
//! - a reader loop, this task, turning frames into matchmaker calls
//! - a writer task draining the session's outbound channel into the socket
//!
//! The matchmaker only ever holds the channel sender, never the socket.
//! Dropping the session from the registry drops that sender, which ends the
//! writer task.
use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use protocol::{
    decode_client_event,
    events::{ClientEvent, ServerEvent, SignalRequest},
    id::ConnId,
};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::state::AppState;

pub async fn socket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

    let id = state.matchmaker.connect(tx).await;

    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    warn!("Failed to encode {}: {e}", event.name());
                    continue;
                }
            };

            if ws_tx.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(result) = ws_rx.next().await {
        match result {
            Ok(Message::Text(text)) => handle_message(&text, id, &state).await,
            Ok(Message::Close(_)) => break,
            Ok(_) => {} // ping/pong handled by axum, binary is not part of the protocol
            Err(e) => {
                debug!("WebSocket error for {id}: {e}");
                break;
            }
        }
    }

    state.matchmaker.disconnect(id).await;
    let _ = send_task.await;
}

async fn handle_message(text: &str, id: ConnId, state: &AppState) {
    match decode_client_event(text) {
        Ok(ClientEvent::FindPartner(filters)) => {
            state.matchmaker.find_partner(id, &filters).await;
        }
        Ok(ClientEvent::Signal(SignalRequest { to, data })) => {
            state.matchmaker.relay(id, to, data).await;
        }
        Ok(ClientEvent::Leave) => state.matchmaker.leave(id).await,
        Err(e) => debug!("Ignoring frame from {id}: {e}"),
    }
}
