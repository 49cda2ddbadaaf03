//! WebSocket transport (§6). Grounded on the teacher's `ocpp_server.rs`: an
//! `accept_hdr_async` handshake, a send task draining an mpsc channel into the socket, and
//! a recv task feeding inbound text to the core — generalized to go through `Router`
//! directly instead of a per-version `OcppHandler`, and to actually reject the handshake
//! when the charger doesn't offer the `ocpp1.6` subprotocol rather than only warning.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::Message;
use tracing::{error, info, warn};

use crate::codec::OcppFrame;
use crate::router::Router;
use crate::support::errors::CsmsError;
use crate::transport::{InboundQueue, OutboundChannel, OCPP_SUBPROTOCOL};

struct WebSocketChannel {
    sender: mpsc::UnboundedSender<Message>,
}

#[async_trait]
impl OutboundChannel for WebSocketChannel {
    async fn send(&self, frame: &OcppFrame) -> Result<(), CsmsError> {
        self.sender
            .send(Message::Text(frame.serialize()))
            .map_err(|e| CsmsError::Transport(e.to_string()))
    }

    async fn close(&self) {
        let _ = self.sender.send(Message::Close(None));
    }
}

/// Accepts OCPP-J connections at `ws://<host>:<port>/ocpp/{charge_point_id}` (or bare
/// `/{charge_point_id}`), forever, until the listener errs.
pub async fn run(listener: TcpListener, router: Arc<Router>, inbound_buffer_depth: usize) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let router = router.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, addr, router, inbound_buffer_depth).await {
                        error!(%addr, error = %e, "websocket connection error");
                    }
                });
            }
            Err(e) => error!(error = %e, "failed to accept websocket connection"),
        }
    }
}

fn extract_charger_id(path: &str) -> Option<String> {
    let path = path.trim_start_matches('/');
    if let Some(id) = path.strip_prefix("ocpp/") {
        let id = id.trim_start_matches('/');
        return (!id.is_empty()).then(|| id.to_string());
    }
    (!path.is_empty() && !path.contains('/')).then(|| path.to_string())
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    router: Arc<Router>,
    inbound_buffer_depth: usize,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut charger_id: Option<String> = None;
    let mut subprotocol_ok = false;

    let handshake_result = tokio_tungstenite::accept_hdr_async(
        stream,
        |req: &Request, mut response: Response| {
            let path = req.uri().path();
            charger_id = extract_charger_id(path);

            let requested = req
                .headers()
                .get("Sec-WebSocket-Protocol")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("");
            subprotocol_ok = requested.split(',').map(str::trim).any(|p| p == OCPP_SUBPROTOCOL);

            if charger_id.is_none() {
                let mut rejection = ErrorResponse::new(Some("missing charger id in path".to_string()));
                *rejection.status_mut() = StatusCode::BAD_REQUEST;
                return Err(rejection);
            }
            if !subprotocol_ok {
                let mut rejection = ErrorResponse::new(Some(format!("must offer the {OCPP_SUBPROTOCOL} subprotocol")));
                *rejection.status_mut() = StatusCode::BAD_REQUEST;
                return Err(rejection);
            }

            response
                .headers_mut()
                .insert("Sec-WebSocket-Protocol", OCPP_SUBPROTOCOL.parse().unwrap());
            Ok(response)
        },
    )
    .await;

    let ws_stream = match handshake_result {
        Ok(s) => s,
        Err(e) => {
            warn!(%addr, error = %e, "websocket handshake rejected");
            return Ok(());
        }
    };
    let charger_id = charger_id.expect("handshake callback rejected connections with no charger id");

    info!(charge_point_id = charger_id.as_str(), %addr, "websocket connected");

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    let channel: Arc<dyn OutboundChannel> = Arc::new(WebSocketChannel { sender: tx });

    router.on_connected(&charger_id, channel).await;

    let cp_id_send = charger_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = ws_sender.send(msg).await {
                error!(charge_point_id = cp_id_send.as_str(), error = %e, "websocket send error");
                break;
            }
        }
    });

    let queue: Arc<InboundQueue<OcppFrame>> = Arc::new(InboundQueue::new(inbound_buffer_depth));

    let cp_id_dispatch = charger_id.clone();
    let router_dispatch = router.clone();
    let queue_dispatch = queue.clone();
    let dispatch_task = tokio::spawn(async move {
        loop {
            let frame = queue_dispatch.pop().await;
            if let Some(reply) = router_dispatch.on_inbound(&cp_id_dispatch, frame).await {
                if let Some(session) = router_dispatch.session(&cp_id_dispatch) {
                    // Direct reply to an inbound CALL bypasses the outbound queue — it's a
                    // response, not a new server-initiated call.
                    let _ = session.send_direct(&reply).await;
                }
            }
        }
    });

    let cp_id_recv = charger_id.clone();
    let router_recv = router.clone();
    let recv_task = tokio::spawn(async move {
        while let Some(msg) = ws_receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => match OcppFrame::parse(&text) {
                    Ok(frame) => {
                        router_recv.clear_decode_failures(&cp_id_recv);
                        if queue.push(frame).await.is_some() {
                            warn!(charge_point_id = cp_id_recv.as_str(), "inbound buffer full, dropped oldest frame");
                        }
                    }
                    Err(e) => {
                        warn!(charge_point_id = cp_id_recv.as_str(), error = %e, "malformed OCPP-J frame");
                        if router_recv.on_decode_failure(&cp_id_recv, e.to_string()).await {
                            warn!(charge_point_id = cp_id_recv.as_str(), "closing connection after repeated decode failures");
                            break;
                        }
                    }
                },
                Ok(Message::Close(frame)) => {
                    info!(charge_point_id = cp_id_recv.as_str(), ?frame, "websocket close frame received");
                    break;
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) | Ok(Message::Frame(_)) => {}
                Ok(Message::Binary(data)) => {
                    warn!(charge_point_id = cp_id_recv.as_str(), bytes = data.len(), "ignoring binary websocket frame");
                }
                Err(e) => {
                    error!(charge_point_id = cp_id_recv.as_str(), error = %e, "websocket error");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }
    dispatch_task.abort();

    router.on_disconnected(&charger_id).await;
    info!(charge_point_id = charger_id.as_str(), "websocket disconnected");
    Ok(())
}
