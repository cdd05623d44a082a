//! End-to-end over a real WebSocket.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tvrpc::app::host::DEFAULT_COUNTDOWN;
use tvrpc::app::{ApplicationHost, LoggingApplicationCallback};
use tvrpc::rpc::{JsonRpcService, LoggingSessionCallback, ServiceConfig};
use tvrpc::server::{self, AppState, WsSinks};

async fn start_server() -> (SocketAddr, Arc<JsonRpcService>, WsSinks, CancellationToken) {
    let sinks = WsSinks::new();
    let service = Arc::new(JsonRpcService::new(
        ServiceConfig {
            endpoint: "/hbbtv/jsonrpc".into(),
            opapp_endpoint: Some("/hbbtv/opapp".into()),
            require_voice_ready: false,
        },
        Arc::new(LoggingSessionCallback),
        Arc::new(sinks.clone()),
    ));
    let applications = ApplicationHost::new(Arc::new(LoggingApplicationCallback), DEFAULT_COUNTDOWN);
    let router = server::router(AppState::new(service.clone(), sinks.clone(), applications));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let cancel = CancellationToken::new();
    let serve_cancel = cancel.clone();
    tokio::spawn(async move {
        server::serve(listener, router, serve_cancel).await.unwrap();
    });
    (addr, service, sinks, cancel)
}

async fn next_json<S>(ws: &mut S) -> Value
where
    S: StreamExt<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("timed out waiting for a message")
        .expect("stream ended")
        .expect("websocket error");
    serde_json::from_str(msg.to_text().unwrap()).unwrap()
}

#[tokio::test]
async fn negotiate_over_websocket() {
    let (addr, service, sinks, cancel) = start_server().await;
    let (mut ws, _) = connect_async(format!("ws://{addr}/hbbtv/jsonrpc")).await.unwrap();

    let request = json!({
        "jsonrpc": "2.0",
        "method": "org.hbbtv.negotiateMethods",
        "id": "1",
        "params": {"terminalToApp": ["org.hbbtv.notify"], "appToTerminal": ["org.hbbtv.subscribe"]}
    });
    ws.send(Message::Text(request.to_string().into())).await.unwrap();
    let reply = next_json(&mut ws).await;
    assert_eq!(reply["id"], "1");
    assert_eq!(reply["result"]["terminalToApp"], json!(["org.hbbtv.notify"]));

    ws.send(Message::Text("not json".into())).await.unwrap();
    let reply = next_json(&mut ws).await;
    assert_eq!(reply["error"]["code"], -32700);

    assert_eq!(service.registry().connection_ids().len(), 1);
    assert_eq!(sinks.len(), 1);
    ws.close(None).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(service.registry().connection_ids().is_empty());
    assert!(sinks.is_empty());
    cancel.cancel();
}

#[tokio::test]
async fn opapp_endpoint_marks_connection() {
    let (addr, service, _sinks, cancel) = start_server().await;
    let (_ws, _) = connect_async(format!("ws://{addr}/hbbtv/opapp")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let ids = service.registry().connection_ids();
    assert_eq!(ids.len(), 1);
    assert!(service.registry().is_op_app(ids[0]));
    cancel.cancel();
}

#[tokio::test]
async fn unknown_path_is_refused() {
    let (addr, service, sinks, cancel) = start_server().await;
    let result = connect_async(format!("ws://{addr}/somewhere/else")).await;
    assert!(result.is_err());
    assert!(service.registry().connection_ids().is_empty());
    assert!(sinks.is_empty());
    cancel.cancel();
}
