use bytes::Bytes;
use tokio::sync::mpsc;

use dojo_core::errors::BridgeError;
use dojo_core::protocol::ServerMessage;

/// A frame queued for the connection writer.
#[derive(Clone, Debug, PartialEq)]
pub enum Outbound {
    Audio(Bytes),
    Text(String),
}

/// Sending half of a connection's outbound queue.
///
/// A closed queue means the writer is gone, so every failure here is a
/// `BridgeError::Transport`.
#[derive(Clone)]
pub struct Outbox {
    tx: mpsc::Sender<Outbound>,
}

impl Outbox {
    pub fn new(tx: mpsc::Sender<Outbound>) -> Self {
        Self { tx }
    }

    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Outbound>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    pub async fn audio(&self, chunk: Bytes) -> Result<(), BridgeError> {
        self.push(Outbound::Audio(chunk)).await
    }

    pub async fn send(&self, message: impl Into<ServerMessage>) -> Result<(), BridgeError> {
        let json = message
            .into()
            .to_json()
            .map_err(|e| BridgeError::Transport(format!("encode failed: {e}")))?;
        self.push(Outbound::Text(json)).await
    }

    /// Queue a message without waiting. A full queue drops it.
    pub fn try_send(&self, message: impl Into<ServerMessage>) -> Result<(), BridgeError> {
        let json = message
            .into()
            .to_json()
            .map_err(|e| BridgeError::Transport(format!("encode failed: {e}")))?;
        self.tx.try_send(Outbound::Text(json)).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => BridgeError::Transport("send queue full".into()),
            mpsc::error::TrySendError::Closed(_) => {
                BridgeError::Transport("client disconnected".into())
            }
        })
    }

    async fn push(&self, frame: Outbound) -> Result<(), BridgeError> {
        self.tx
            .send(frame)
            .await
            .map_err(|_| BridgeError::Transport("client disconnected".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dojo_core::protocol::StatusEvent;

    #[tokio::test]
    async fn status_frames_are_json_text() {
        let (out, mut rx) = Outbox::channel(4);
        out.send(StatusEvent::Done).await.unwrap();
        assert_eq!(rx.recv().await, Some(Outbound::Text(r#"{"status":"done"}"#.into())));
    }

    #[tokio::test]
    async fn closed_queue_is_transport_error() {
        let (out, rx) = Outbox::channel(1);
        drop(rx);
        let err = out.audio(Bytes::from_static(b"x")).await.unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn try_send_reports_full_queue() {
        let (out, mut rx) = Outbox::channel(1);
        out.try_send(StatusEvent::Done).unwrap();
        let err = out.try_send(StatusEvent::Done).unwrap_err();
        assert_eq!(err, BridgeError::Transport("send queue full".into()));
        assert!(rx.recv().await.is_some());
    }
}
