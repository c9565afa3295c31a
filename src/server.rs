//! HTTP side of the bridge: static viewer files and the websocket push channel.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::services::ServeDir;
use tracing::{debug, error, info};

use crate::config::ServerCfg;
use crate::hub::HubCommand;
use crate::types::ViewerId;

#[derive(Clone)]
pub struct ViewerState {
    hub: mpsc::UnboundedSender<HubCommand>,
    next_id: Arc<AtomicU64>,
}

impl ViewerState {
    pub fn new(hub: mpsc::UnboundedSender<HubCommand>) -> Self {
        Self {
            hub,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    fn next_id(&self) -> ViewerId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

/// Every path on the push port upgrades to a viewer session.
pub fn viewer_router(state: ViewerState) -> Router {
    Router::new().fallback(ws_upgrade).with_state(state)
}

/// Plain static file server rooted at `dir`.
pub fn static_router(dir: &Path) -> Router {
    Router::new().fallback_service(ServeDir::new(dir))
}

/// Serve viewer sessions on an already-bound listener.
pub async fn serve_viewers(listener: TcpListener, state: ViewerState) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    info!("WebSocket debug server listening on ws://{}", addr);
    axum::serve(listener, viewer_router(state))
        .await
        .context("websocket server stopped")
}

/// Serve `static_dir` until the task is dropped. A bind failure is logged, not fatal.
pub async fn serve_static(cfg: ServerCfg) {
    let listener = match TcpListener::bind(cfg.static_addr()).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to start web server on {}: {}", cfg.static_addr(), e);
            return;
        }
    };
    info!("Web server started at {}", cfg.viewer_url());
    if let Err(e) = axum::serve(listener, static_router(&cfg.static_dir)).await {
        error!("Web server stopped: {}", e);
    }
}

async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<ViewerState>) -> Response {
    ws.on_upgrade(move |socket| viewer_session(socket, state))
}

async fn viewer_session(mut socket: WebSocket, state: ViewerState) {
    let id = state.next_id();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    if state.hub.send(HubCommand::Join { id, tx }).is_err() {
        return;
    }

    loop {
        tokio::select! {
            outgoing = rx.recv() => match outgoing {
                Some(frame) => {
                    if let Err(e) = socket.send(Message::Text(frame)).await {
                        debug!(viewer = id, "send failed: {}", e);
                        break;
                    }
                }
                None => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                // Viewers only listen; anything they send is ignored.
                Some(Ok(_)) => {}
            },
        }
    }

    let _ = state.hub.send(HubCommand::Leave(id));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn viewer_ids_are_unique_across_clones() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let a = ViewerState::new(tx);
        let b = a.clone();
        let ids = [a.next_id(), b.next_id(), a.next_id()];
        assert_eq!(ids, [1, 2, 3]);
    }

    #[tokio::test]
    async fn static_files_are_served() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("debugger.html"), "<html>viewer</html>").unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = static_router(tmp.path());
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        let mut conn = tokio::net::TcpStream::connect(addr).await.unwrap();
        conn.write_all(b"GET /debugger.html HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut body = String::new();
        tokio::time::timeout(Duration::from_secs(5), conn.read_to_string(&mut body))
            .await
            .unwrap()
            .unwrap();
        assert!(body.starts_with("HTTP/1.1 200"));
        assert!(body.contains("<html>viewer</html>"));
    }

    #[tokio::test]
    async fn plain_http_on_push_port_is_rejected() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve_viewers(listener, ViewerState::new(tx)));

        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        let mut conn = tokio::net::TcpStream::connect(addr).await.unwrap();
        conn.write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut body = String::new();
        tokio::time::timeout(Duration::from_secs(5), conn.read_to_string(&mut body))
            .await
            .unwrap()
            .unwrap();
        // Missing upgrade headers: the extractor rejects the request before any session starts.
        assert!(!body.starts_with("HTTP/1.1 2"), "{body}");
        assert!(!body.starts_with("HTTP/1.1 101"));
    }

    async fn connect(addr: std::net::SocketAddr) -> Viewer {
        let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/"))
            .await
            .expect("websocket handshake");
        ws
    }

    type Viewer = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    async fn next_frame(ws: &mut Viewer) -> serde_json::Value {
        use futures::StreamExt;
        use tokio_tungstenite::tungstenite::Message as WsMessage;

        loop {
            let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
                .await
                .expect("frame in time")
                .expect("socket open")
                .expect("valid frame");
            if let WsMessage::Text(text) = msg {
                return serde_json::from_str(&text).unwrap();
            }
        }
    }

    async fn next_command(rx: &mut mpsc::UnboundedReceiver<HubCommand>) -> HubCommand {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("hub command in time")
            .expect("server alive")
    }

    #[tokio::test]
    async fn viewer_gets_status_then_broadcasts_over_websocket() {
        use crate::hub::{Hub, GREETING};
        use crate::types::Envelope;
        use chrono::Local;
        use serde_json::json;

        let (hub_tx, hub_rx) = mpsc::unbounded_channel();
        let (log_tx, log_rx) = mpsc::channel(4);
        tokio::spawn(Hub::new(hub_rx, log_rx).run());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve_viewers(listener, ViewerState::new(hub_tx)));

        let mut ws = connect(addr).await;
        let status = next_frame(&mut ws).await;
        assert_eq!(status["type"], "status");
        assert_eq!(status["message"], GREETING);

        // The greeting proves the hub registered this viewer.
        log_tx
            .send(Envelope::structured_log(Local::now(), json!({"msg": "hi"}), "warn"))
            .await
            .unwrap();
        let log = next_frame(&mut ws).await;
        assert_eq!(log["type"], "structured_log");
        assert_eq!(log["payload"], json!({"msg": "hi"}));
        assert_eq!(log["logType"], "WARN");
    }

    #[tokio::test]
    async fn closing_the_socket_leaves_the_hub() {
        let (hub_tx, mut hub_rx) = mpsc::unbounded_channel();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve_viewers(listener, ViewerState::new(hub_tx)));

        let mut ws = connect(addr).await;
        let (id, tx) = match next_command(&mut hub_rx).await {
            HubCommand::Join { id, tx } => (id, tx),
            other => panic!("expected join, got {other:?}"),
        };
        tx.send(r#"{"type":"status","message":"hello"}"#.to_string()).unwrap();
        assert_eq!(next_frame(&mut ws).await["message"], "hello");

        ws.close(None).await.unwrap();
        match next_command(&mut hub_rx).await {
            HubCommand::Leave(left) => assert_eq!(left, id),
            other => panic!("expected leave, got {other:?}"),
        }
    }
}
