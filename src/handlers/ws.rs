use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

use crate::AppState;

/// GET /ws: push `habit_changed` events to the client
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let rx = state.ws_tx.subscribe();
    ws.on_upgrade(move |socket| handle_socket(socket, rx))
}

async fn handle_socket(socket: WebSocket, mut rx: broadcast::Receiver<String>) {
    let connection_id = Uuid::new_v4();
    let (mut sender, mut receiver) = socket.split();

    tracing::debug!(%connection_id, "WebSocket connection established");

    let mut send_task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(msg) => {
                    if sender.send(Message::Text(msg)).await.is_err() {
                        break;
                    }
                }
                // Slow client: events were dropped, it reloads state on the next one.
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(%connection_id, skipped, "WebSocket subscriber lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    // Inbound frames are only read to notice the close.
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    tracing::debug!(%connection_id, "WebSocket connection closed");
}
