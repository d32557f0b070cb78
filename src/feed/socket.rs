use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};

use crate::common::AppState;
use crate::feed::ingest::ingest_message;
use crate::feed::message::FeedMessage;

/// Feed WebSocket: the station sends one JSON message per frame.
pub async fn ingest_socket(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    tracing::info!("Feed connected");

    let mut accepted: u64 = 0;
    while let Some(frame) = socket.recv().await {
        let decoded = match frame {
            Ok(Message::Text(text)) => FeedMessage::decode(text.as_str().as_bytes()),
            Ok(Message::Binary(bytes)) => FeedMessage::decode(&bytes),
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!(error = %e, "Feed socket error");
                break;
            }
        };

        // A bad frame is skipped; the connection stays up
        match decoded {
            Ok(message) => {
                if ingest_message(&state, message) {
                    accepted += 1;
                }
            }
            Err(e) => tracing::debug!(error = %e, "Skipping malformed feed frame"),
        }
    }

    tracing::info!(accepted, "Feed disconnected");
}
