#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use sandchat_gateway::config::Config;
use sandchat_gateway::db::kv::{KeyValueStore, MemoryStore};
use sandchat_gateway::AppState;
use tokio::net::TcpStream;
use tokio::time;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Start the gateway on an ephemeral port with an in-memory store seeded from `entries`.
pub async fn start_server(entries: &[(&str, &str)]) -> (SocketAddr, AppState) {
    let store = MemoryStore::with_entries(entries.iter().copied());
    start_server_with(Config::default(), Arc::new(store)).await
}

/// Start the gateway with an explicit config and store.
pub async fn start_server_with(
    config: Config,
    store: Arc<dyn KeyValueStore>,
) -> (SocketAddr, AppState) {
    let state = AppState::new(config, store);
    let app = sandchat_gateway::routes::router().with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, state)
}

/// Open a WebSocket to `/gateway`, sending `cookie` as the `Cookie` header.
pub async fn connect(addr: SocketAddr, cookie: Option<&str>) -> Result<WsStream, tungstenite::Error> {
    let mut request = format!("ws://{addr}/gateway")
        .into_client_request()
        .expect("valid request");
    if let Some(cookie) = cookie {
        request
            .headers_mut()
            .insert(http::header::COOKIE, http::HeaderValue::from_str(cookie).unwrap());
    }
    tokio_tungstenite::connect_async(request)
        .await
        .map(|(ws, _)| ws)
}

/// Connect and wait until the server has registered the connection.
pub async fn connect_admitted(addr: SocketAddr, state: &AppState, cookie: &str) -> WsStream {
    let expected = state.registry.len() + 1;
    let ws = connect(addr, Some(cookie)).await.expect("ws connect");
    wait_for_connections(state, expected).await;
    ws
}

/// Poll the registry until it holds exactly `n` connections.
pub async fn wait_for_connections(state: &AppState, n: usize) {
    time::timeout(Duration::from_secs(5), async {
        while state.registry.len() != n {
            time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| {
        panic!(
            "expected {n} registered connections, found {}",
            state.registry.len()
        )
    });
}

/// Next frame that is not a ping or pong.
pub async fn next_frame(ws: &mut WsStream) -> Option<Message> {
    loop {
        match ws.next().await? {
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
            Ok(msg) => return Some(msg),
            Err(_) => return None,
        }
    }
}

/// Wait for the next text frame.
pub async fn recv_text(ws: &mut WsStream) -> String {
    let msg = time::timeout(Duration::from_secs(5), next_frame(ws))
        .await
        .expect("timeout waiting for message")
        .expect("stream ended");
    match msg {
        Message::Text(text) => text.as_str().to_string(),
        other => panic!("unexpected frame: {other:?}"),
    }
}

/// Assert nothing but keepalive traffic arrives for a short while.
pub async fn assert_silent(ws: &mut WsStream) {
    let res = time::timeout(Duration::from_millis(200), next_frame(ws)).await;
    assert!(res.is_err(), "expected no message, got {res:?}");
}

/// Session store JSON for `user_id`, shaped like the HTTP session middleware writes it.
pub fn session_json(user_id: i64) -> String {
    serde_json::json!({
        "cookie": { "originalMaxAge": 604800000, "httpOnly": true, "path": "/" },
        "userId": user_id,
    })
    .to_string()
}
