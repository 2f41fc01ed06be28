//! Scripted collaborators for deterministic tests without network calls.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream, StreamExt};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use dojo_core::errors::UpstreamError;
use dojo_core::report::{ScoreReceipt, ScoreReport};
use dojo_core::upstream::{
    AudioStream, PersonaResponder, ScoreSink, SpeechSynthesizer, SynthesisRequest, Triage,
    TriageResult,
};

/// Triage that always answers with the same classification.
pub struct StaticTriage {
    result: TriageResult,
    call_count: AtomicUsize,
}

impl StaticTriage {
    pub fn new(result: TriageResult) -> Self {
        Self {
            result,
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }
}

impl Default for StaticTriage {
    fn default() -> Self {
        Self::new(TriageResult::default())
    }
}

#[async_trait]
impl Triage for StaticTriage {
    async fn classify(&self, _caller_number: &str) -> TriageResult {
        let _ = self.call_count.fetch_add(1, Ordering::Relaxed);
        self.result.clone()
    }
}

/// Persona that replays queued replies and records what it was asked.
#[derive(Default)]
pub struct MockPersona {
    replies: Mutex<VecDeque<Result<String, UpstreamError>>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockPersona {
    pub fn new(replies: Vec<Result<String, UpstreamError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())])
    }

    /// `(transcript, persona)` pairs in call order.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl PersonaResponder for MockPersona {
    async fn respond(&self, transcript: &str, persona: &str) -> Result<String, UpstreamError> {
        self.calls
            .lock()
            .push((transcript.to_string(), persona.to_string()));
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| {
                Err(UpstreamError::Network {
                    service: "persona",
                    message: "mock: no reply configured".into(),
                })
            })
    }
}

/// One scripted synthesis outcome.
pub enum MockSpeech {
    /// Yield the chunks back to back.
    Chunks(Vec<Bytes>),
    /// Sleep `interval` before each chunk.
    Paced { chunks: Vec<Bytes>, interval: Duration },
    /// Yield whatever the test pushes; the stream ends when the sender drops.
    Channel(mpsc::Receiver<Result<Bytes, UpstreamError>>),
    /// Fail before any chunk.
    Error(UpstreamError),
}

impl MockSpeech {
    pub fn chunks(chunks: &[&'static [u8]]) -> Self {
        Self::Chunks(chunks.iter().map(|c| Bytes::from_static(c)).collect())
    }
}

/// Synthesizer that replays queued outcomes and records every request.
pub struct MockSynthesizer {
    configured: bool,
    outcomes: Mutex<VecDeque<MockSpeech>>,
    requests: Mutex<Vec<SynthesisRequest>>,
}

impl MockSynthesizer {
    pub fn new(outcomes: Vec<MockSpeech>) -> Self {
        Self {
            configured: true,
            outcomes: Mutex::new(outcomes.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A synthesizer without credentials.
    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::new(Vec::new())
        }
    }

    pub fn requests(&self) -> Vec<SynthesisRequest> {
        self.requests.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn stream(&self, request: &SynthesisRequest) -> Result<AudioStream, UpstreamError> {
        self.requests.lock().push(request.clone());
        let outcome = self.outcomes.lock().pop_front();
        match outcome {
            Some(MockSpeech::Chunks(chunks)) => {
                Ok(Box::pin(stream::iter(chunks.into_iter().map(Ok::<_, UpstreamError>))))
            }
            Some(MockSpeech::Paced { chunks, interval }) => {
                Ok(Box::pin(stream::iter(chunks).then(move |chunk| async move {
                    tokio::time::sleep(interval).await;
                    Ok::<_, UpstreamError>(chunk)
                })))
            }
            Some(MockSpeech::Channel(rx)) => Ok(Box::pin(ReceiverStream::new(rx))),
            Some(MockSpeech::Error(e)) => Err(e),
            None => Err(UpstreamError::Network {
                service: "synthesis",
                message: "mock: no speech configured".into(),
            }),
        }
    }
}

/// Score sink that records every report and answers with a fixed receipt.
#[derive(Default)]
pub struct RecordingScoreSink {
    receipt: Option<ScoreReceipt>,
    reports: Mutex<Vec<ScoreReport>>,
}

impl RecordingScoreSink {
    pub fn new(receipt: Option<ScoreReceipt>) -> Self {
        Self {
            receipt,
            reports: Mutex::new(Vec::new()),
        }
    }

    pub fn reports(&self) -> Vec<ScoreReport> {
        self.reports.lock().clone()
    }
}

#[async_trait]
impl ScoreSink for RecordingScoreSink {
    async fn submit(&self, report: &ScoreReport) -> Option<ScoreReceipt> {
        self.reports.lock().push(report.clone());
        self.receipt.clone()
    }
}
