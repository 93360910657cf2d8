//! WebSocket connection handler
//!
//! Each accepted socket is split into two tasks. The reader decodes inbound
//! frames and forwards them to the coordinator in arrival order; the writer
//! drains the connection's outbox and encodes each notification as a text
//! frame. The coordinator closes a connection by dropping its outbox, which
//! ends the writer once everything already queued has been sent. A client
//! that stops reading fills its bounded outbox and is closed the same way.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::{SinkExt, StreamExt};

use onair_protocol::{
    decode_client_event, decode_client_event_bytes, encode_server_event, ConnectionId,
    MAX_FRAME_SIZE,
};

use crate::coordinator::CoordinatorHandle;

/// `GET /ws`
pub(crate) async fn ws_upgrade(
    ws: WebSocketUpgrade,
    State(coordinator): State<CoordinatorHandle>,
) -> Response {
    ws.max_message_size(MAX_FRAME_SIZE)
        .on_upgrade(move |socket| handle_socket(socket, coordinator))
}

/// Serve one upgraded socket until either side closes it
pub async fn handle_socket(socket: WebSocket, coordinator: CoordinatorHandle) {
    let connection = ConnectionId::new();
    let (outbox, mut inbox) = coordinator.outbox();

    if coordinator.connect(connection, outbox).await.is_err() {
        tracing::warn!("Coordinator stopped, refusing connection {}", connection);
        return;
    }

    let (mut sink, mut stream) = socket.split();

    let mut writer = tokio::spawn(async move {
        while let Some(event) = inbox.recv().await {
            let text = match encode_server_event(&event) {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!("Failed to encode {:?}: {}", event, e);
                    continue;
                }
            };
            if sink.send(Message::Text(text)).await.is_err() {
                return;
            }
        }
        // Outbox dropped: the coordinator is done with this connection.
        if sink.send(Message::Close(None)).await.is_err() {
            tracing::trace!("Socket already closed");
        }
    });

    let reader_handle = coordinator.clone();
    let mut reader = tokio::spawn(async move {
        while let Some(frame) = stream.next().await {
            let frame = match frame {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::debug!("Read error on {}: {}", connection, e);
                    break;
                }
            };

            let decoded = match frame {
                Message::Text(text) => decode_client_event(&text),
                Message::Binary(bytes) => decode_client_event_bytes(&bytes),
                Message::Close(_) => break,
                Message::Ping(_) | Message::Pong(_) => continue,
            };

            let forwarded = match decoded {
                Ok(event) => reader_handle.event(connection, event).await,
                Err(e) => reader_handle.malformed(connection, e.to_string()).await,
            };
            if forwarded.is_err() {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut writer => reader.abort(),
        _ = &mut reader => {}
    }

    if coordinator.disconnect(connection).await.is_err() {
        tracing::debug!("Coordinator stopped before {} closed", connection);
    }
}
