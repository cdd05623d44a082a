//! WebSocket transport for the JSON-RPC service.
//!
//! Each upgraded socket gets the next connection id and an outbound channel
//! registered in [`WsSinks`]. Inbound text frames are handed to the service
//! strictly in arrival order. Upgrade requests on any path other than the
//! configured endpoints are refused with 404.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::app::ApplicationHost;
use crate::rpc::{ConnectionId, JsonRpcService, MessageSink};

#[derive(Error, Debug)]
pub enum ServeError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Outbound channels of the live sockets, keyed by connection id.
#[derive(Clone, Default)]
pub struct WsSinks {
    inner: Arc<Mutex<HashMap<ConnectionId, mpsc::UnboundedSender<String>>>>,
}

impl WsSinks {
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&self, connection_id: ConnectionId) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.lock().insert(connection_id, tx);
        rx
    }

    fn unregister(&self, connection_id: ConnectionId) {
        self.inner.lock().remove(&connection_id);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MessageSink for WsSinks {
    fn send(&self, connection_id: ConnectionId, text: String) {
        match self.inner.lock().get(&connection_id) {
            Some(tx) => {
                let _ = tx.send(text);
            }
            None => debug!(connection_id, "dropping message for closed connection"),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<JsonRpcService>,
    pub sinks: WsSinks,
    /// Lives as long as the server, keeping its countdown task running.
    pub applications: ApplicationHost,
    next_id: Arc<AtomicU64>,
}

impl AppState {
    /// `sinks` must be the sink the service was built with.
    pub fn new(service: Arc<JsonRpcService>, sinks: WsSinks, applications: ApplicationHost) -> Self {
        Self {
            service,
            sinks,
            applications,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .fallback(ws_entry)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Serve `router` until `cancel` fires.
pub async fn serve(listener: TcpListener, router: Router, cancel: CancellationToken) -> Result<(), ServeError> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "WebSocket server listening");
    }
    axum::serve(listener, router)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;
    Ok(())
}

/// Bind `addr` and serve until `cancel` fires.
pub async fn bind_and_serve(addr: &str, router: Router, cancel: CancellationToken) -> Result<(), ServeError> {
    let listener = TcpListener::bind(addr).await.map_err(|source| ServeError::Bind {
        addr: addr.to_string(),
        source,
    })?;
    serve(listener, router, cancel).await
}

async fn ws_entry(
    State(state): State<AppState>,
    uri: Uri,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let path = uri.path().to_string();
    if !state.service.accepts_path(&path) {
        debug!(path, "refusing unknown endpoint");
        return StatusCode::NOT_FOUND.into_response();
    }
    match ws {
        Ok(ws) => ws.on_upgrade(move |socket| handle_socket(socket, state, path)),
        Err(rejection) => rejection.into_response(),
    }
}

async fn handle_socket(socket: WebSocket, state: AppState, path: String) {
    let connection_id = state.next_id.fetch_add(1, Ordering::Relaxed);
    let mut outbound = state.sinks.register(connection_id);
    if !state.service.on_connection(connection_id, &path) {
        state.sinks.unregister(connection_id);
        return;
    }

    let (mut ws_tx, mut ws_rx) = socket.split();
    loop {
        tokio::select! {
            Some(text) = outbound.recv() => {
                if ws_tx.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }

            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        state.service.on_message(connection_id, text.as_str());
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue, // binary is ignored, ping/pong handled by axum
                    Some(Err(e)) => {
                        debug!(connection_id, ?e, "websocket read error");
                        break;
                    }
                }
            }
        }
    }

    state.service.on_disconnected(connection_id);
    state.sinks.unregister(connection_id);
}
