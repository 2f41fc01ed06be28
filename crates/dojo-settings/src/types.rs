//! Settings tree. Every struct is `#[serde(default)]` so a partial user
//! file only has to name the keys it changes.

use serde::{Deserialize, Serialize};

/// Root settings object.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DojoSettings {
    pub server: ServerSettings,
    pub synthesis: SynthesisSettings,
    pub upstream: UpstreamSettings,
    pub session: SessionSettings,
    pub logging: LoggingSettings,
}

/// Bind address and WebSocket runtime knobs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Outbound frame queue per connection.
    pub max_send_queue: usize,
    pub heartbeat_interval_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8090,
            max_send_queue: 256,
            heartbeat_interval_secs: 30,
        }
    }
}

/// Speech synthesis provider (ElevenLabs-compatible).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SynthesisSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<String>,
    pub model_id: String,
    pub base_url: String,
    pub connect_timeout_secs: u64,
    /// Longest silence tolerated between two audio chunks.
    pub idle_timeout_secs: u64,
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            voice_id: None,
            model_id: "eleven_monolingual_v1".to_string(),
            base_url: "https://api.elevenlabs.io/v1".to_string(),
            connect_timeout_secs: 10,
            idle_timeout_secs: 30,
        }
    }
}

/// Base URLs and timeouts of the triage, persona and scoring services.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpstreamSettings {
    pub triage_url: String,
    pub triage_timeout_secs: u64,
    pub persona_url: String,
    pub persona_timeout_secs: u64,
    pub scoring_url: String,
    pub scoring_timeout_secs: u64,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            triage_url: "http://triage-api:8080".to_string(),
            triage_timeout_secs: 10,
            persona_url: "http://actor:8000".to_string(),
            persona_timeout_secs: 15,
            scoring_url: "http://steward:8080".to_string(),
            scoring_timeout_secs: 10,
        }
    }
}

/// Values a fresh session starts with.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionSettings {
    pub default_persona: String,
    pub default_user_id: String,
    pub default_caller_number: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            default_persona: "hazel".to_string(),
            default_user_id: "anonymous".to_string(),
            default_caller_number: "unknown".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}
