//! One WebSocket connection: a writer task, a reader task and the
//! sequential orchestrator loop.
//!
//! The reader forwards text frames to the orchestrator through a bounded
//! queue. A `barge_in` frame also raises the current session's cancel
//! signal as soon as it is read, so a stream the orchestrator is busy with
//! stops at its next chunk instead of after it finishes.
//!
//! The reader never waits on the orchestrator: frames it cannot hand over
//! yet wait in a local backlog, and once that is full further frames are
//! refused with an error frame. The cancel signal is raised before either
//! happens.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use dojo_core::cancel::CancelSignal;
use dojo_core::errors::BridgeError;
use dojo_core::ids::ConnectionId;
use dojo_core::protocol::{ClientMessage, ServerMessage};

use crate::context::BridgeContext;
use crate::dispatch::SessionDriver;
use crate::outbox::{Outbound, Outbox};

const INBOUND_QUEUE: usize = 64;
const READ_BACKLOG: usize = 256;
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Per-connection transport settings.
#[derive(Clone, Debug)]
pub struct ConnectionConfig {
    pub max_send_queue: usize,
    pub heartbeat_interval: Duration,
}

/// Drive a WebSocket until the client leaves or the server shuts down.
pub async fn handle_connection(
    socket: WebSocket,
    ctx: Arc<BridgeContext>,
    config: ConnectionConfig,
    shutdown: CancellationToken,
) {
    let conn_id = ConnectionId::new();
    info!(conn_id = %conn_id, "client connected");

    let (ws_tx, ws_rx) = socket.split();
    let (out, out_rx) = Outbox::channel(config.max_send_queue);
    let (inbound_tx, mut inbound_rx) = mpsc::channel::<String>(INBOUND_QUEUE);

    let mut driver = SessionDriver::new(ctx, out);
    let writer = tokio::spawn(write_frames(
        ws_tx,
        out_rx,
        config.heartbeat_interval,
        conn_id.clone(),
    ));
    let reader = tokio::spawn(read_frames(
        ws_rx,
        inbound_tx,
        Backlog::new(READ_BACKLOG, driver.cancel_watch()),
        driver.outbox(),
    ));

    loop {
        tokio::select! {
            frame = inbound_rx.recv() => {
                let Some(raw) = frame else { break };
                if let Err(e) = driver.handle_frame(&raw).await {
                    debug!(conn_id = %conn_id, error = %e, "transport lost");
                    break;
                }
            }
            () = shutdown.cancelled() => {
                debug!(conn_id = %conn_id, "server shutting down");
                break;
            }
        }
    }

    reader.abort();
    driver.finish().await;
    let _ = tokio::time::timeout(WRITER_DRAIN_TIMEOUT, writer).await;
    info!(conn_id = %conn_id, "client disconnected");
}

/// Forward queued frames to the socket and ping on a fixed interval. Ends
/// when every `Outbox` is dropped or the socket fails.
async fn write_frames(
    mut ws_tx: futures::stream::SplitSink<WebSocket, WsMessage>,
    mut rx: mpsc::Receiver<Outbound>,
    heartbeat: Duration,
    conn_id: ConnectionId,
) {
    let mut ping_interval = tokio::time::interval(heartbeat);
    ping_interval.tick().await;

    loop {
        tokio::select! {
            frame = rx.recv() => {
                let message = match frame {
                    Some(Outbound::Audio(chunk)) => WsMessage::Binary(chunk),
                    Some(Outbound::Text(text)) => WsMessage::Text(text.into()),
                    None => break,
                };
                if ws_tx.send(message).await.is_err() {
                    return;
                }
            }
            _ = ping_interval.tick() => {
                if ws_tx.send(WsMessage::Ping(Default::default())).await.is_err() {
                    return;
                }
                trace!(conn_id = %conn_id, "ping");
            }
        }
    }
    let _ = ws_tx.close().await;
}

async fn read_frames(
    mut ws_rx: futures::stream::SplitStream<WebSocket>,
    inbound: mpsc::Sender<String>,
    mut backlog: Backlog,
    out: Outbox,
) {
    loop {
        tokio::select! {
            permit = inbound.reserve(), if !backlog.is_empty() => {
                let Ok(permit) = permit else { return };
                if let Some(raw) = backlog.pop() {
                    permit.send(raw);
                }
            }
            msg = ws_rx.next() => match msg {
                Some(Ok(WsMessage::Text(text))) => {
                    if !backlog.push(text.to_string()) {
                        warn!(limit = backlog.limit, "read backlog full, refusing frame");
                        let refused = BridgeError::validation("too many pending messages");
                        let _ = out.try_send(ServerMessage::error(&refused));
                    }
                }
                Some(Ok(WsMessage::Binary(data))) => {
                    debug!(bytes = data.len(), "ignoring binary frame from client");
                }
                Some(Ok(WsMessage::Ping(_) | WsMessage::Pong(_))) => {}
                Some(Ok(WsMessage::Close(_)) | Err(_)) | None => break,
            },
        }
    }

    // The client is gone; hand over what it already sent.
    while let Some(raw) = backlog.pop() {
        if inbound.send(raw).await.is_err() {
            return;
        }
    }
}

/// Frames read from the socket but not yet taken by the orchestrator.
struct Backlog {
    frames: VecDeque<String>,
    limit: usize,
    cancel: watch::Receiver<CancelSignal>,
}

impl Backlog {
    fn new(limit: usize, cancel: watch::Receiver<CancelSignal>) -> Self {
        Self {
            frames: VecDeque::new(),
            limit,
            cancel,
        }
    }

    /// Raise the cancel signal for a barge-in, then queue the frame.
    /// Returns `false` when the backlog is full and the frame was refused.
    fn push(&mut self, raw: String) -> bool {
        if ClientMessage::is_barge_in(&raw) {
            self.cancel.borrow().set();
        }
        if self.frames.len() >= self.limit {
            return false;
        }
        self.frames.push_back(raw);
        true
    }

    fn pop(&mut self) -> Option<String> {
        self.frames.pop_front()
    }

    fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
