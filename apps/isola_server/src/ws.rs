//! The WebSocket endpoint. A connection registers under the `name` query
//! parameter and from then on only ever receives invalidation pushes;
//! nothing a client sends on this channel means anything.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::info;

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub name: String,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(q): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| ws_task(socket, q.name, state))
}

async fn ws_task(socket: WebSocket, name: String, state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::channel::<Message>(32);

    state.registry.add(&name, tx.clone()).await;
    info!(name = %name, "ws client connected");

    // Writer task: the registry holds a sender, never the socket itself.
    let writer = tokio::spawn(async move {
        while let Some(m) = rx.recv().await {
            let closing = matches!(m, Message::Close(_));
            if sink.send(m).await.is_err() || closing {
                break;
            }
        }
    });

    while let Some(m) = stream.next().await {
        match m {
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(Message::Ping(v)) => {
                let _ = tx.try_send(Message::Pong(v));
            }
            Ok(_) => {}
        }
    }

    state.registry.remove(&name, &tx).await;
    drop(tx);
    let _ = writer.await;
    info!(name = %name, "ws client disconnected");
}
