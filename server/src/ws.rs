//! Websocket endpoint: one socket per player, one [`Session`] per socket.
//!
//! The socket is split in two halves. A forwarder task drains the session's
//! outbox channel into the write half so room broadcasts never block on the
//! socket while a room lock is held; the read half drives the session state
//! machine until the client disconnects or the session asks to close.

use crate::http::AppState;
use crate::outbox::ChannelOutbox;
use crate::session::{Session, SessionControl};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use log::{debug, warn};
use shared::ServerMessage;
use std::sync::Arc;
use tokio::sync::mpsc;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    let forward = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(text) => {
                    if sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(err) => warn!("outbound event serialization failed: {}", err),
            }
        }
    });

    let outbox = Arc::new(ChannelOutbox::new(tx));
    let mut session = Session::new(state.registry.clone(), state.auth.clone(), outbox);

    while let Some(Ok(message)) = receiver.next().await {
        match message {
            Message::Text(text) => {
                if session.handle_text(&text).await == SessionControl::Close {
                    break;
                }
            }
            Message::Close(_) => break,
            // Pings are answered by axum itself; binary frames are not part
            // of the protocol.
            _ => {}
        }
    }

    debug!("socket closed for player {:?}", session.player_id());
    session.on_close().await;
    forward.abort();
}
