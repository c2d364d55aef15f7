//! WebSocket upgrade handler and per-connection event loop.

use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::header::COOKIE;
use axum::http::HeaderMap;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use sandchat_common::ConnectionId;
use tokio::sync::mpsc;
use tokio::time::{self, Instant};

use crate::auth::Identity;
use crate::error::ApiError;
use crate::AppState;

use super::connection::{Connection, Outbound};
use super::registry::ConnectionRegistry;
use super::events::{ChatMessage, CLOSE_IDLE_TIMEOUT, CLOSE_INVALID_PAYLOAD};

pub fn router() -> Router<AppState> {
    Router::new().route("/gateway", get(ws_upgrade))
}

/// Join every `Cookie` header into one; HTTP/2 clients may split them.
fn cookie_header(headers: &HeaderMap) -> Option<String> {
    let parts: Vec<&str> = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("; "))
    }
}

/// Runs the gate before upgrading; rejected attempts never become sockets.
async fn ws_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let cookie = cookie_header(&headers);
    let identity = state.gate.admit(cookie.as_deref()).await?;
    Ok(ws.on_upgrade(move |socket| handle_connection(socket, state, identity)))
}

async fn handle_connection(socket: WebSocket, state: AppState, identity: Identity) {
    let (ws_tx, ws_rx) = socket.split();

    let (connection, mut outbound_rx) = Connection::channel(
        ConnectionId::new(),
        identity,
        state.config.outbound_queue_capacity,
    );
    let connection_id = connection.id.clone();
    let user_id = connection.identity.user_id.clone();

    if !state.registry.add(connection) {
        tracing::error!(connection_id = %connection_id, "connection id collision");
        return;
    }

    tracing::info!(
        connection_id = %connection_id,
        user_id = %user_id,
        connections = state.registry.len(),
        "connection registered"
    );

    let reason = run_connection(&state, &connection_id, ws_tx, ws_rx, &mut outbound_rx).await;

    deregister(&state.registry, &connection_id, outbound_rx);

    tracing::info!(
        connection_id = %connection_id,
        user_id = %user_id,
        %reason,
        "connection closed"
    );
}

/// Main event loop: relay client messages, drain the outbound queue, keep the socket alive.
///
/// Returns the reason the connection ended.
async fn run_connection(
    state: &AppState,
    connection_id: &ConnectionId,
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut ws_rx: SplitStream<WebSocket>,
    outbound_rx: &mut mpsc::Receiver<Outbound>,
) -> &'static str {
    let ping_interval = state.config.ping_interval;
    let idle_limit = ping_interval * 2;
    let mut ping_timer = time::interval_at(Instant::now() + ping_interval, ping_interval);
    let mut last_seen = Instant::now();

    loop {
        tokio::select! {
            // Client sends us a frame.
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        last_seen = Instant::now();
                        let message = match ChatMessage::parse(text) {
                            Ok(m) => m,
                            Err(_) => {
                                let _ = send_close(&mut ws_tx, CLOSE_INVALID_PAYLOAD, "Invalid JSON").await;
                                return "invalid json";
                            }
                        };
                        let report = state.relay.on_message(connection_id, &message);
                        tracing::debug!(
                            connection_id = %connection_id,
                            delivered = report.delivered,
                            dropped = report.dropped,
                            "message relayed"
                        );
                    }
                    Some(Ok(Message::Binary(_))) => {
                        last_seen = Instant::now();
                        tracing::debug!(connection_id = %connection_id, "ignoring binary frame");
                    }
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                        last_seen = Instant::now();
                    }
                    Some(Ok(Message::Close(_))) | None => return "client closed",
                    Some(Err(e)) => {
                        tracing::debug!(?e, connection_id = %connection_id, "ws read error");
                        return "read error";
                    }
                }
            }

            // Message relayed from another connection.
            frame = outbound_rx.recv() => {
                let Some(frame) = frame else {
                    return "outbound queue closed";
                };
                if ws_tx.send(Message::Text(frame)).await.is_err() {
                    return "write error";
                }
            }

            _ = ping_timer.tick() => {
                if last_seen.elapsed() >= idle_limit {
                    let _ = send_close(&mut ws_tx, CLOSE_IDLE_TIMEOUT, "Idle timeout").await;
                    return "idle timeout";
                }
                if ws_tx.send(Message::Ping(Default::default())).await.is_err() {
                    return "write error";
                }
            }
        }
    }
}

/// Remove a connection from the registry, then close its outbound queue.
///
/// A registered connection's queue is therefore always open: fan-out either
/// sees the entry with a live queue or does not see it at all.
fn deregister(
    registry: &ConnectionRegistry,
    connection_id: &ConnectionId,
    outbound_rx: mpsc::Receiver<Outbound>,
) {
    registry.remove(connection_id);
    drop(outbound_rx);
}

/// Send a WebSocket close frame with a code and reason.
async fn send_close(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    code: u16,
    reason: &str,
) -> Result<(), axum::Error> {
    let close_msg = Message::Close(Some(CloseFrame {
        code,
        reason: reason.into(),
    }));
    // Closing can race the client going away; bound the wait.
    match time::timeout(Duration::from_secs(1), ws_tx.send(close_msg)).await {
        Ok(result) => result,
        Err(_) => Ok(()),
    }
}
