//! Contracts of the external collaborators the bridge drives.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::errors::UpstreamError;
use crate::report::{ScoreReceipt, ScoreReport};

/// Lazily delivered audio chunks from the speech synthesizer.
pub type AudioStream = Pin<Box<dyn Stream<Item = Result<Bytes, UpstreamError>> + Send>>;

pub const DEFAULT_RING: &str = "DEFAULT_RING";
pub const COMBAT_RING: &str = "COMBAT_RING";

/// Call classification returned by triage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageResult {
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiplier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona_suggestion: Option<String>,
}

impl Default for TriageResult {
    /// No special handling: an ordinary call.
    fn default() -> Self {
        Self {
            action: DEFAULT_RING.into(),
            multiplier: Some("1x".into()),
            persona_suggestion: None,
        }
    }
}

impl TriageResult {
    pub fn is_combat(&self) -> bool {
        self.action == COMBAT_RING
    }
}

/// Text, voice and model for one synthesis call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SynthesisRequest {
    pub text: String,
    pub voice_id: String,
    pub model_id: String,
}

/// Classifies callers. Never fails: transport problems degrade to
/// [`TriageResult::default`].
#[async_trait]
pub trait Triage: Send + Sync {
    async fn classify(&self, caller_number: &str) -> TriageResult;
}

/// Produces the automated persona's reply.
#[async_trait]
pub trait PersonaResponder: Send + Sync {
    async fn respond(&self, transcript: &str, persona: &str) -> Result<String, UpstreamError>;
}

/// Streams synthesized speech.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Whether credentials are present. Requests are refused without opening
    /// a stream when this is false.
    fn is_configured(&self) -> bool;

    async fn stream(&self, request: &SynthesisRequest) -> Result<AudioStream, UpstreamError>;
}

/// Best-effort submission to the reward engine. Failures are logged by the
/// implementation and come back as `None`.
#[async_trait]
pub trait ScoreSink: Send + Sync {
    async fn submit(&self, report: &ScoreReport) -> Option<ScoreReceipt>;
}
