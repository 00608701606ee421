use crate::state::AppState;
use async_trait::async_trait;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    response::IntoResponse,
};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use icra_core::{Visit, VisitSink};
use std::net::SocketAddr;

/// WebSocket handler streaming visits to the browser
pub async fn browsing_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, peer, state))
}

async fn handle_socket(socket: WebSocket, peer: SocketAddr, state: AppState) {
    let (sender, mut receiver) = socket.split();

    let session = state.hub.register().await;
    let session_id = session.id();
    tracing::info!(session_id, peer = %peer, "Client connected to visit stream");

    // Cached and live visits are written by the relay
    let mut relay = state.hub.spawn_relay(session, WebSocketSink::new(sender));

    // Receive task (detects the client going away)
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Close(_) => break,
                Message::Text(text) => {
                    tracing::trace!("Ignoring client message: {}", text);
                }
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut relay => {
            recv_task.abort();
        }
        _ = &mut recv_task => {
            tracing::debug!(session_id, "Client closed connection");
        }
    }

    state.hub.unregister(session_id).await;
    tracing::info!(session_id, peer = %peer, "Client disconnected from visit stream");
}

/// Writes visits to a WebSocket as JSON text frames
pub struct WebSocketSink {
    sender: SplitSink<WebSocket, Message>,
}

impl WebSocketSink {
    pub fn new(sender: SplitSink<WebSocket, Message>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl VisitSink for WebSocketSink {
    async fn send_visit(&mut self, visit: &Visit) -> icra_core::Result<()> {
        let text = visit.to_json()?;
        self.sender
            .send(Message::Text(text))
            .await
            .map_err(|e| icra_core::Error::transport(e.to_string()))
    }

    async fn close(&mut self) -> icra_core::Result<()> {
        self.sender
            .close()
            .await
            .map_err(|e| icra_core::Error::transport(e.to_string()))
    }
}
