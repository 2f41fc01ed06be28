//! Cancellable synthesis pipeline.
//!
//! Audio is forwarded chunk by chunk as the synthesizer yields it. The
//! session's cancel signal is cleared when the attempt starts and checked
//! before every chunk, so cancellation latency is at most one chunk.

use futures::StreamExt;
use tracing::{debug, info};

use dojo_core::cancel::CancelSignal;
use dojo_core::errors::BridgeError;
use dojo_core::upstream::{SpeechSynthesizer, SynthesisRequest};

use crate::outbox::Outbox;

/// One synthesis attempt bound to a session's cancel signal.
pub struct StreamRequest {
    pub synthesis: SynthesisRequest,
    pub cancel: CancelSignal,
}

/// How a stream that did not fail ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamOutcome {
    Completed { chunks: usize },
    Interrupted { chunks: usize },
}

/// Stream speech for `request` into `out`.
///
/// Errors before the first chunk abort with no audio sent; errors after it
/// leave the delivered chunks in place. There is no retry.
pub async fn stream_speech(
    synthesizer: &dyn SpeechSynthesizer,
    request: StreamRequest,
    out: &Outbox,
) -> Result<StreamOutcome, BridgeError> {
    let StreamRequest { synthesis, cancel } = request;
    cancel.clear();

    let mut audio = synthesizer.stream(&synthesis).await?;
    debug!(voice = %synthesis.voice_id, text_len = synthesis.text.len(), "speech stream opened");

    let mut chunks = 0usize;
    while let Some(item) = audio.next().await {
        let chunk = item?;
        if cancel.is_set() {
            info!(chunks, "speech stream interrupted");
            return Ok(StreamOutcome::Interrupted { chunks });
        }
        out.audio(chunk).await?;
        chunks += 1;
    }

    if cancel.is_set() {
        info!(chunks, "speech stream interrupted");
        return Ok(StreamOutcome::Interrupted { chunks });
    }
    info!(chunks, "speech stream complete");
    Ok(StreamOutcome::Completed { chunks })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bytes::Bytes;
    use tokio::sync::mpsc;

    use dojo_core::errors::UpstreamError;
    use dojo_upstream::mock::{MockSpeech, MockSynthesizer};

    use super::*;
    use crate::outbox::Outbound;

    fn request(cancel: &CancelSignal) -> StreamRequest {
        StreamRequest {
            synthesis: SynthesisRequest {
                text: "Hello dear".into(),
                voice_id: "v".into(),
                model_id: "m".into(),
            },
            cancel: cancel.clone(),
        }
    }

    fn audio_frames(rx: &mut mpsc::Receiver<Outbound>) -> usize {
        let mut n = 0;
        while let Ok(frame) = rx.try_recv() {
            assert!(matches!(frame, Outbound::Audio(_)));
            n += 1;
        }
        n
    }

    #[tokio::test]
    async fn forwards_every_chunk() {
        let synth = MockSynthesizer::new(vec![MockSpeech::chunks(&[b"a", b"b", b"c"])]);
        let (out, mut rx) = Outbox::channel(16);
        let cancel = CancelSignal::new();

        let outcome = stream_speech(&synth, request(&cancel), &out).await.unwrap();
        assert_eq!(outcome, StreamOutcome::Completed { chunks: 3 });
        assert_eq!(audio_frames(&mut rx), 3);
    }

    #[tokio::test]
    async fn cancel_mid_stream_stops_at_next_chunk() {
        let (chunk_tx, chunk_rx) = mpsc::channel(8);
        let synth = MockSynthesizer::new(vec![MockSpeech::Channel(chunk_rx)]);
        let (out, mut rx) = Outbox::channel(16);
        let cancel = CancelSignal::new();

        let driver_cancel = cancel.clone();
        let feeder = tokio::spawn(async move {
            chunk_tx.send(Ok(Bytes::from_static(b"one"))).await.unwrap();
            chunk_tx.send(Ok(Bytes::from_static(b"two"))).await.unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
            driver_cancel.set();
            chunk_tx.send(Ok(Bytes::from_static(b"three"))).await.unwrap();
            chunk_tx.send(Ok(Bytes::from_static(b"four"))).await.ok();
        });

        let outcome = stream_speech(&synth, request(&cancel), &out).await.unwrap();
        feeder.await.unwrap();

        assert_eq!(outcome, StreamOutcome::Interrupted { chunks: 2 });
        assert_eq!(audio_frames(&mut rx), 2);
    }

    #[tokio::test]
    async fn stale_cancel_does_not_pre_cancel_next_stream() {
        let synth = MockSynthesizer::new(vec![MockSpeech::chunks(&[b"a", b"b"])]);
        let (out, _rx) = Outbox::channel(16);
        let cancel = CancelSignal::new();
        cancel.set();

        let outcome = stream_speech(&synth, request(&cancel), &out).await.unwrap();
        assert_eq!(outcome, StreamOutcome::Completed { chunks: 2 });
        assert!(!cancel.is_set());
    }

    #[tokio::test]
    async fn upstream_failure_before_first_chunk_sends_nothing() {
        let synth = MockSynthesizer::new(vec![MockSpeech::Error(UpstreamError::Status {
            service: "synthesis",
            status: 401,
            body: "invalid_api_key".into(),
        })]);
        let (out, mut rx) = Outbox::channel(16);

        let err = stream_speech(&synth, request(&CancelSignal::new()), &out)
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Upstream(UpstreamError::Status { status: 401, .. })));
        assert_eq!(audio_frames(&mut rx), 0);
        assert_eq!(synth.call_count(), 1);
    }

    #[tokio::test]
    async fn mid_stream_failure_keeps_delivered_chunks() {
        let (chunk_tx, chunk_rx) = mpsc::channel(8);
        chunk_tx.send(Ok(Bytes::from_static(b"one"))).await.unwrap();
        chunk_tx
            .send(Err(UpstreamError::Timeout {
                service: "synthesis",
                after: Duration::from_secs(30),
            }))
            .await
            .unwrap();
        let synth = MockSynthesizer::new(vec![MockSpeech::Channel(chunk_rx)]);
        let (out, mut rx) = Outbox::channel(16);

        let err = stream_speech(&synth, request(&CancelSignal::new()), &out)
            .await
            .unwrap_err();
        assert_eq!(err.error_kind(), "upstream_timeout");
        assert_eq!(audio_frames(&mut rx), 1);
    }

    #[tokio::test]
    async fn closed_outbox_is_transport_error() {
        let synth = MockSynthesizer::new(vec![MockSpeech::chunks(&[b"a"])]);
        let (out, rx) = Outbox::channel(1);
        drop(rx);

        let err = stream_speech(&synth, request(&CancelSignal::new()), &out)
            .await
            .unwrap_err();
        assert!(err.is_transport());
    }
}
