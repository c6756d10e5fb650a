//! WebSocket video stream endpoint.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::{debug, warn};

use super::StreamState;

/// WebSocket upgrade handler for the stream listener.
pub(super) async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<StreamState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Drive one stream client: framing header first, then every broadcast chunk
/// verbatim until the client goes away, the stream ends, or the client lags
/// past its queue depth (slow clients are disconnected, never waited for).
async fn handle_socket(socket: WebSocket, state: StreamState) {
    let subscription = state.hub.subscribe();
    let (mut sender, mut receiver) = socket.split();

    if sender.send(Message::Binary(subscription.header.encode().to_vec())).await.is_err() {
        return;
    }
    debug!(clients = state.hub.client_count(), "stream client connected");

    let mut chunks = BroadcastStream::new(subscription.chunks);
    let forward = async {
        while let Some(item) = chunks.next().await {
            match item {
                Ok(chunk) => {
                    if sender.send(Message::Binary(chunk.to_vec())).await.is_err() {
                        break;
                    }
                }
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!(skipped, "stream client too slow, disconnecting");
                    break;
                }
            }
        }
    };
    // Clients send nothing meaningful; drain so pings and close frames are
    // processed, and treat any error as a disconnect.
    let drain = async {
        while let Some(message) = receiver.next().await {
            match message {
                Ok(Message::Close(_)) | Err(_) => break,
                Ok(_) => {}
            }
        }
    };

    tokio::select! {
        _ = forward => {}
        _ = drain => {}
    }
    debug!("stream client disconnected");
}
