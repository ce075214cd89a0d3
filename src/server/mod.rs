use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::connect_info::ConnectInfo;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::hub::RelayHub;
use crate::protocol::Frame;

/// Build the HTTP surface: two static pages plus the WebSocket upgrade path.
pub fn router(hub: Arc<RelayHub>) -> Router {
    Router::new()
        .route("/", get(broadcaster_page))
        .route("/view", get(viewer_page))
        .route("/ws", get(ws_upgrade))
        .with_state(hub)
}

/// Bind and serve until the process is killed
pub async fn run(addr: SocketAddr, hub: Arc<RelayHub>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    axum::serve(
        listener,
        router(hub).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("server error")
}

async fn broadcaster_page() -> Html<&'static str> {
    Html(include_str!("../../public/broadcaster.html"))
}

async fn viewer_page() -> Html<&'static str> {
    Html(include_str!("../../public/viewer.html"))
}

async fn ws_upgrade(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(hub): State<Arc<RelayHub>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, addr, hub))
}

/// Pump one WebSocket connection through the hub.
async fn handle_socket(socket: WebSocket, addr: SocketAddr, hub: Arc<RelayHub>) {
    println!("[{}] New connection", addr);

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Frame>();

    // Drain the outbound queue into the socket. Sends are fire-and-forget
    // from the hub's point of view: no delivery confirmation, no
    // backpressure, and a slow viewer's queue may grow without bound.
    let forward_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let msg = match frame {
                Frame::Text(text) => Message::Text(text.into()),
                Frame::Binary(data) => Message::Binary(data.into()),
            };
            if ws_sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    let id = hub.connect(tx, addr).await;

    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                hub.handle_message(id, Frame::Text(text.as_str().to_owned()))
                    .await;
            }
            Ok(Message::Binary(data)) => {
                hub.handle_message(id, Frame::Binary(data.to_vec())).await;
            }
            Ok(Message::Close(_)) => break,
            // Pings are answered by axum; protocol violations surface as
            // an error and end the read loop like any other close
            Ok(_) => {}
            Err(_) => break,
        }
    }

    hub.disconnect(id).await;
    forward_task.abort();
}
