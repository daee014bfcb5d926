use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::adapters::http::state::HttpState;
use crate::application::dto::DisplayQuery;
use crate::application::store::StoreState;
use crate::domain::geometry::Size;
use crate::domain::snapshot::{ResultSnapshot, WsResultsMessage};

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(st): State<HttpState>,
    Query(q): Query<DisplayQuery>,
) -> impl axum::response::IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, st, q.size()))
}

fn encode(snapshot: &ResultSnapshot, display: Option<Size>) -> String {
    serde_json::to_string(&WsResultsMessage { r#type: "results".into(), snapshot: snapshot.view(display) })
        .unwrap_or_default()
}

/// Sends the current snapshot, then one message per store change, until
/// either the store or the receiving side goes away.
async fn forward_results(mut rx: watch::Receiver<StoreState>, display: Option<Size>, tx: mpsc::Sender<String>) {
    loop {
        let json = {
            let state = rx.borrow_and_update();
            encode(&state.snapshot, display)
        };
        if tx.send(json).await.is_err() {
            break;
        }
        tokio::select! {
            _ = tx.closed() => break,
            changed = rx.changed() => if changed.is_err() { break },
        }
    }
}

async fn handle_socket(mut socket: WebSocket, st: HttpState, display: Option<Size>) {
    let (tx, mut out) = mpsc::channel(4);
    tokio::spawn(forward_results(st.detection.store().subscribe(), display, tx));

    while let Some(json) = out.recv().await {
        if socket.send(Message::Text(json)).await.is_err() {
            break;
        }
    }
    debug!("Results socket closed");
}
