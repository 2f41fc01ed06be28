//! One-shot HTTP endpoints. `/tts` buffers the whole audio body; `/combat`
//! runs triage and persona only. Streaming audio is WebSocket-only.

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use dojo_core::errors::BridgeError;
use dojo_core::upstream::TriageResult;

use crate::server::AppState;

const COMBAT_HINT: &str = "Connect via WebSocket at /ws/stream for real-time audio";

/// `BridgeError` rendered as an HTTP response.
pub struct ApiError(BridgeError);

impl From<BridgeError> for ApiError {
    fn from(err: BridgeError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            BridgeError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            BridgeError::Validation(_) => StatusCode::BAD_REQUEST,
            BridgeError::Upstream(e) => e
                .status()
                .and_then(|s| StatusCode::from_u16(s).ok())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            BridgeError::Transport(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        warn!(status = status.as_u16(), kind = self.0.error_kind(), error = %self.0, "request failed");
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct TtsBody {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub voice_id: Option<String>,
    #[serde(default)]
    pub model_id: Option<String>,
}

pub async fn tts_handler(
    State(state): State<AppState>,
    Json(body): Json<TtsBody>,
) -> Result<Response, ApiError> {
    let request = state
        .ctx
        .select_voice(body.voice_id, body.model_id)?
        .request(body.text)?;

    let mut audio = state
        .ctx
        .collaborators
        .synthesizer
        .stream(&request)
        .await
        .map_err(BridgeError::from)?;
    let mut buffer = Vec::new();
    while let Some(chunk) = audio.next().await {
        buffer.extend_from_slice(&chunk.map_err(BridgeError::from)?);
    }
    info!(bytes = buffer.len(), "one-shot speech buffered");

    Ok(([(header::CONTENT_TYPE, "audio/mpeg")], buffer).into_response())
}

#[derive(Debug, Deserialize)]
pub struct CombatBody {
    #[serde(default)]
    pub caller_number: Option<String>,
    #[serde(default)]
    pub transcript: String,
    #[serde(default)]
    pub persona: Option<String>,
}

#[derive(Debug, serde::Serialize)]
pub struct CombatReply {
    pub triage: TriageResult,
    pub actor_response: String,
    pub persona: String,
    pub hint: &'static str,
}

pub async fn combat_handler(
    State(state): State<AppState>,
    Json(body): Json<CombatBody>,
) -> Result<Json<CombatReply>, ApiError> {
    let caller_number = body
        .caller_number
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| BridgeError::validation("caller_number is required"))?;
    let persona = body
        .persona
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| state.ctx.session_defaults.persona.clone());

    let collaborators = &state.ctx.collaborators;
    let triage = collaborators.triage.classify(&caller_number).await;
    let actor_response = collaborators
        .persona
        .respond(&body.transcript, &persona)
        .await
        .map_err(BridgeError::from)?;

    Ok(Json(CombatReply {
        triage,
        actor_response,
        persona,
        hint: COMBAT_HINT,
    }))
}
