//! WebSocket control protocol.
//!
//! Client frames are JSON objects keyed by `action`; server frames are either
//! binary audio or JSON objects keyed by `status` (or a bare `error`).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::BridgeError;
use crate::ids::SessionId;
use crate::report::ScoreReceipt;
use crate::session::Mode;
use crate::upstream::TriageResult;

/// Reward multiplier advertised in the barge-in acknowledgement. Display
/// only; the reward engine computes the real multiplier.
pub const LIVE_XP_MULTIPLIER: u32 = 5;

pub const ACTIONS: [&str; 5] = ["barge_in", "barge_out", "end_session", "combat", "tts"];

/// A control message from the client.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientMessage {
    BargeIn {
        #[serde(default)]
        user_id: Option<String>,
    },
    BargeOut {
        #[serde(default)]
        persona: Option<String>,
    },
    EndSession,
    Combat {
        #[serde(default)]
        caller_number: Option<String>,
        #[serde(default)]
        transcript: Option<String>,
        #[serde(default)]
        persona: Option<String>,
    },
    Tts {
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        voice_id: Option<String>,
        #[serde(default)]
        model_id: Option<String>,
    },
}

#[derive(Deserialize)]
struct ActionProbe {
    #[serde(default)]
    action: Option<String>,
}

impl ClientMessage {
    /// Parse a text frame. A missing or unrecognised `action` is a
    /// validation error rather than a fallback to any known action.
    pub fn parse(raw: &str) -> Result<Self, BridgeError> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| BridgeError::validation(format!("invalid JSON: {e}")))?;

        let action = match value.get("action") {
            Some(Value::String(action)) => action.clone(),
            Some(_) => return Err(BridgeError::validation("action must be a string")),
            None => return Err(BridgeError::validation("missing action")),
        };
        if !ACTIONS.contains(&action.as_str()) {
            return Err(BridgeError::validation(format!("unknown action: {action}")));
        }

        serde_json::from_value(value)
            .map_err(|e| BridgeError::validation(format!("invalid {action} message: {e}")))
    }

    /// Cheap check used by the transport reader to react to a barge-in
    /// before the orchestrator gets to the frame.
    pub fn is_barge_in(raw: &str) -> bool {
        serde_json::from_str::<ActionProbe>(raw)
            .ok()
            .and_then(|p| p.action)
            .is_some_and(|a| a == "barge_in")
    }

    pub fn action(&self) -> &'static str {
        match self {
            Self::BargeIn { .. } => "barge_in",
            Self::BargeOut { .. } => "barge_out",
            Self::EndSession => "end_session",
            Self::Combat { .. } => "combat",
            Self::Tts { .. } => "tts",
        }
    }
}

/// Structured status frames sent to the client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StatusEvent {
    BargeInAck {
        session_id: SessionId,
        mode: Mode,
        xp_multiplier: u32,
        message: String,
    },
    BargeOutAck {
        mode: Mode,
        persona: String,
        live_seconds: f64,
        message: String,
    },
    SessionScored {
        session_id: SessionId,
        total_duration: f64,
        live_seconds: f64,
        auto_seconds: f64,
        steward: Option<ScoreReceipt>,
    },
    Streaming {
        session_id: SessionId,
        triage: TriageResult,
        actor_text: String,
        mode: Mode,
    },
    Done,
    StreamInterrupted {
        reason: String,
    },
}

/// Any JSON frame the server sends.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerMessage {
    Status(StatusEvent),
    Error { error: String },
}

impl ServerMessage {
    pub fn error(err: &BridgeError) -> Self {
        Self::Error {
            error: err.to_string(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl From<StatusEvent> for ServerMessage {
    fn from(event: StatusEvent) -> Self {
        Self::Status(event)
    }
}
