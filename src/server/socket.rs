//! One task per websocket connection.
//!
//! ```text
//!   ws frames ──► Connection::handle_text ──┬─► LiveScheduler ──┐
//!                                           └─► one-shot chart ─┤
//!                                                               ▼
//!                                   mpsc<ServerEvent> ──► writer task ──► ws frames
//! ```
//!
//! Closing the socket, or process shutdown, cancels the connection token:
//! the live subscription and any chart request still in flight stop with it.

use std::future::Future;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::protocol::{ClientEvent, ServerEvent};
use super::AppState;
use crate::error::Result;
use crate::live::LiveScheduler;

/// Outgoing events buffered per connection before producers wait.
const OUTBOUND_CAPACITY: usize = 32;

/// GET /ws
pub async fn upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| serve(socket, state))
}

async fn serve(socket: WebSocket, state: AppState) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::channel::<ServerEvent>(OUTBOUND_CAPACITY);

    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    warn!(event = event.name(), error = %e, "Failed to encode event");
                    continue;
                }
            };
            if ws_tx.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    let mut connection = Connection::new(state, tx);
    let token = connection.token().clone();

    loop {
        let frame = tokio::select! {
            _ = token.cancelled() => break,
            frame = ws_rx.next() => frame,
        };
        match frame {
            Some(Ok(Message::Text(text))) => connection.handle_text(&text).await,
            Some(Ok(Message::Close(_))) | None => break,
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                debug!(error = %e, "Websocket read failed");
                break;
            }
        }
    }

    connection.close().await;
    let _ = writer.await;
}

/// Protocol state of one client connection.
#[derive(Debug)]
pub struct Connection {
    id: u64,
    state: AppState,
    tx: mpsc::Sender<ServerEvent>,
    token: CancellationToken,
    live: LiveScheduler<ServerEvent>,
}

impl Connection {
    pub fn new(state: AppState, tx: mpsc::Sender<ServerEvent>) -> Self {
        let id = state.next_connection_id();
        let token = state.shutdown.child_token();
        let live = LiveScheduler::new(
            state.service.clone(),
            state.live_interval,
            token.clone(),
            tx.clone(),
        );
        info!(connection = id, "Client connected");

        Self {
            id,
            state,
            tx,
            token,
            live,
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Dispatch one text frame.
    pub async fn handle_text(&mut self, text: &str) {
        let event = match serde_json::from_str::<ClientEvent>(text) {
            Ok(event) => event,
            Err(e) => {
                debug!(connection = self.id, error = %e, "Unrecognised message");
                self.reply(ServerEvent::error(format!("Unrecognised message: {}", e)))
                    .await;
                return;
            }
        };

        match event {
            ClientEvent::RequestLiveData(request) => {
                self.live.subscribe(&request.variable_group).await;
            }
            ClientEvent::StopLiveData => {
                self.live.unsubscribe().await;
            }
            ClientEvent::HistoricalChart(request) => {
                debug!(connection = self.id, group = %request.variable_group, "Historical chart requested");
                let service = self.state.service.clone();
                self.spawn_request("historical", async move {
                    service
                        .historical(&request)
                        .await
                        .map(ServerEvent::HistoricalData)
                });
            }
            ClientEvent::RelativeChart(request) => {
                debug!(
                    connection = self.id,
                    group = %request.variable_group,
                    range = %request.search_type,
                    "Relative chart requested"
                );
                let service = self.state.service.clone();
                self.spawn_request("relative", async move {
                    service
                        .relative(&request, Utc::now())
                        .await
                        .map(ServerEvent::RelativeData)
                });
            }
        }
    }

    /// Stop everything this connection started.
    pub async fn close(mut self) {
        self.live.unsubscribe().await;
        self.token.cancel();
        info!(connection = self.id, "Client disconnected");
    }

    /// Run a chart request independently of the live subscription.
    fn spawn_request<F>(&self, kind: &'static str, request: F)
    where
        F: Future<Output = Result<ServerEvent>> + Send + 'static,
    {
        let id = self.id;
        let tx = self.tx.clone();
        let token = self.token.clone();

        tokio::spawn(async move {
            let event = tokio::select! {
                biased;
                _ = token.cancelled() => return,
                result = request => match result {
                    Ok(event) => event,
                    Err(e) => {
                        warn!(connection = id, kind, error = %e, "Chart request failed");
                        ServerEvent::error(e.to_string())
                    }
                },
            };
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tx.send(event) => {}
            }
        });
    }

    async fn reply(&self, event: ServerEvent) {
        if self.tx.send(event).await.is_err() {
            debug!(connection = self.id, "Connection writer closed");
        }
    }
}
