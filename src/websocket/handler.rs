use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;

use crate::connection_manager::ConnectionHandle;
use crate::metrics::{
    WsMessageMetrics, WS_CONNECTIONS_CLOSED, WS_CONNECTIONS_OPENED, WS_CONNECTION_DURATION,
};
use crate::server::AppState;

use super::message::{ClientEvent, ClientFrame, ServerMessage};

/// WebSocket upgrade handler
#[tracing::instrument(name = "ws.upgrade", skip(ws, state))]
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle an established WebSocket connection
#[tracing::instrument(name = "ws.connection", skip(socket, state))]
async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_start = std::time::Instant::now();

    // Create channel for sending messages to this connection
    let (tx, rx) = mpsc::channel::<ServerMessage>(state.settings.websocket.outbound_buffer);

    // Register connection with limit checking
    let handle = match state.connection_manager.register(tx) {
        Ok(h) => h,
        Err(e) => {
            tracing::warn!(error = %e, "Connection rejected");
            let (mut ws_sender, _) = socket.split();
            let error_msg = ServerMessage::error("CONNECTION_LIMIT", e.to_string());
            if let Ok(json) = error_msg.to_json() {
                let _ = ws_sender.send(Message::Text(json.into())).await;
            }
            let _ = ws_sender.close().await;
            return;
        }
    };
    let connection_id = handle.id;

    WS_CONNECTIONS_OPENED.inc();
    tracing::info!(connection_id = %connection_id, "New WebSocket connection");

    let (ws_sender, ws_receiver) = socket.split();
    run_connection(ws_sender, ws_receiver, rx, handle, state).await;

    WS_CONNECTIONS_CLOSED.inc();
    let duration = connection_start.elapsed().as_secs_f64();
    WS_CONNECTION_DURATION.observe(duration);

    tracing::info!(
        connection_id = %connection_id,
        duration_secs = duration,
        "WebSocket connection closed"
    );
}

/// Pump frames between a registered connection and its socket halves until
/// either side ends or the server closes the connection, then tear down.
async fn run_connection<S, R>(
    mut ws_sender: S,
    mut ws_receiver: R,
    mut rx: mpsc::Receiver<ServerMessage>,
    handle: Arc<ConnectionHandle>,
    state: AppState,
) where
    S: Sink<Message> + Unpin + Send + 'static,
    S::Error: Send,
    R: Stream<Item = Result<Message, axum::Error>> + Unpin + Send + 'static,
{
    let connection_id = handle.id;

    // Task for sending messages from channel to WebSocket
    let mut send_task = tokio::spawn(async move {
        'outer: while let Some(msg) = rx.recv().await {
            for frame in outbound_frames(&msg) {
                if ws_sender.send(frame).await.is_err() {
                    break 'outer;
                }
            }
        }
        let _ = ws_sender.close().await;
    });

    // Task for receiving messages from WebSocket
    let state_clone = state.clone();
    let handle_clone = handle.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = ws_receiver.next().await {
            match result {
                Ok(msg) => {
                    if !process_message(msg, &state_clone, &handle_clone).await {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "WebSocket receive error");
                    break;
                }
            }
        }
    });

    // Whichever side finishes first takes the other down with it
    tokio::select! {
        _ = &mut send_task => {
            tracing::debug!(connection_id = %connection_id, "Send task completed");
            recv_task.abort();
            let _ = recv_task.await;
        }
        _ = &mut recv_task => {
            tracing::debug!(connection_id = %connection_id, "Receive task completed");
            send_task.abort();
            let _ = send_task.await;
        }
        _ = handle.closed() => {
            tracing::debug!(connection_id = %connection_id, "Connection closed by server");
            recv_task.abort();
            send_task.abort();
            let _ = tokio::join!(recv_task, send_task);
        }
    }

    // Teardown runs exactly once per connection, after both tasks are done
    drop(handle);
    state.connection_manager.unregister(connection_id);
    state.dispatcher.disconnect(connection_id).await;
}

/// Socket frames for one outbound message.
///
/// Heartbeats are preceded by a ping control frame. Clients answer it with a
/// pong, which keeps read-only connections from going stale.
fn outbound_frames(msg: &ServerMessage) -> Vec<Message> {
    let mut frames = Vec::with_capacity(2);
    if matches!(msg, ServerMessage::Heartbeat) {
        frames.push(Message::Ping(Bytes::new()));
    }
    match msg.to_json() {
        Ok(text) => frames.push(Message::Text(text.into())),
        Err(e) => tracing::error!(error = %e, "Failed to serialize message"),
    }
    frames
}

/// Queue a reply for this connection only, waiting for space.
/// Fails only once the writer is gone, in which case the socket is closing.
async fn reply(handle: &ConnectionHandle, message: ServerMessage) {
    if handle.send(message).await.is_err() {
        tracing::debug!(connection_id = %handle.id, "Reply dropped, connection closing");
    }
}

/// Process a received WebSocket message
/// Returns false if the connection should be closed
async fn process_message(msg: Message, state: &AppState, handle: &Arc<ConnectionHandle>) -> bool {
    match msg {
        Message::Text(text) => {
            handle.update_activity();

            let frame = match ClientFrame::parse(&text) {
                Ok(f) => f,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to parse client message");
                    WsMessageMetrics::record_invalid();
                    reply(handle, ServerMessage::error(e.code(), e.to_string())).await;
                    return true;
                }
            };

            let ack_id = frame.id;
            match frame.into_event() {
                Ok(event) => {
                    WsMessageMetrics::record_event(event.name());
                    let result = handle_client_event(event, state, handle).await;
                    reply(handle, ServerMessage::ack(ack_id, result)).await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Rejected client frame");
                    WsMessageMetrics::record_invalid();
                    reply(handle, ServerMessage::error(e.code(), e.to_string())).await;
                }
            }
            true
        }
        Message::Binary(_) => {
            handle.update_activity();
            WsMessageMetrics::record_invalid();
            reply(
                handle,
                ServerMessage::error("UNSUPPORTED_FORMAT", "Binary messages are not supported"),
            )
            .await;
            true
        }
        Message::Ping(_) | Message::Pong(_) => {
            // Axum answers pings itself, we only track liveness
            handle.update_activity();
            true
        }
        Message::Close(_) => {
            tracing::debug!(connection_id = %handle.id, "Received close frame");
            false
        }
    }
}

/// Route a decoded client event to the dispatcher
#[tracing::instrument(
    name = "ws.event",
    skip(event, state, handle),
    fields(connection_id = %handle.id, event = event.name())
)]
async fn handle_client_event(
    event: ClientEvent,
    state: &AppState,
    handle: &Arc<ConnectionHandle>,
) -> Result<(), crate::chat::ChatError> {
    let dispatcher = &state.dispatcher;
    let result = match event {
        ClientEvent::Join(req) => dispatcher
            .join(handle.id, &req.username, &req.room)
            .await
            .map(|_| ()),
        ClientEvent::SendMessage(body) => dispatcher.send_text(handle.id, &body).await,
        ClientEvent::SendLocation(coords) => dispatcher.send_location(handle.id, coords).await,
    };

    if let Err(ref e) = result {
        tracing::debug!(connection_id = %handle.id, error = %e, "Client event rejected");
    }

    result
}
