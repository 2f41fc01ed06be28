//! Per-connection session state machine and live/auto time accounting.
//!
//! A session starts in [`Mode::Auto`]. `barge_in` opens a live interval,
//! `barge_out` closes it and folds its length into `live_seconds`, and `end`
//! closes any open interval before computing the auto share. Once ended the
//! session rejects every transition; the orchestrator replaces it with a
//! fresh one.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::cancel::CancelSignal;
use crate::errors::BridgeError;
use crate::ids::SessionId;

/// Who is driving the conversation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Auto,
    Live,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Live => "live",
        }
    }
}

/// Values a new session starts with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionDefaults {
    pub user_id: String,
    pub persona: String,
    pub caller_number: String,
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            user_id: "anonymous".into(),
            persona: "hazel".into(),
            caller_number: "unknown".into(),
        }
    }
}

/// Final accounting of an ended session.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub user_id: String,
    /// Wall-clock time the session opened.
    pub started_at: DateTime<Utc>,
    pub total_seconds: f64,
    pub live_seconds: f64,
    pub auto_seconds: f64,
}

impl SessionSummary {
    /// `Live` if any human-driven time was recorded.
    pub fn classification(&self) -> Mode {
        if self.live_seconds > 0.0 {
            Mode::Live
        } else {
            Mode::Auto
        }
    }
}

pub struct Session {
    id: SessionId,
    mode: Mode,
    user_id: String,
    caller_number: String,
    persona: String,
    started_at: DateTime<Utc>,
    start: Instant,
    live_seconds: f64,
    live_since: Option<Instant>,
    active: bool,
    cancel: CancelSignal,
}

impl Session {
    pub fn new(defaults: &SessionDefaults) -> Self {
        Self {
            id: SessionId::new(),
            mode: Mode::Auto,
            user_id: defaults.user_id.clone(),
            caller_number: defaults.caller_number.clone(),
            persona: defaults.persona.clone(),
            started_at: Utc::now(),
            start: Instant::now(),
            live_seconds: 0.0,
            live_since: None,
            active: true,
            cancel: CancelSignal::new(),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn caller_number(&self) -> &str {
        &self.caller_number
    }

    pub fn persona(&self) -> &str {
        &self.persona
    }

    /// Seconds accumulated in closed live intervals.
    pub fn live_seconds(&self) -> f64 {
        self.live_seconds
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn cancel_signal(&self) -> &CancelSignal {
        &self.cancel
    }

    pub fn total_duration(&self) -> Duration {
        self.start.elapsed()
    }

    /// Human operator takes over. Returns `true` when this call moved the
    /// session from Auto to Live; re-entry while Live only updates the user.
    pub fn barge_in(&mut self, user_id: Option<String>) -> Result<bool, BridgeError> {
        self.ensure_active()?;
        if let Some(user_id) = user_id.filter(|u| !u.is_empty()) {
            self.user_id = user_id;
        }
        if self.mode == Mode::Live {
            return Ok(false);
        }
        self.mode = Mode::Live;
        self.live_since = Some(Instant::now());
        Ok(true)
    }

    /// Automation resumes. Returns the length of the interval that was
    /// closed, zero if the session was already Auto.
    pub fn barge_out(&mut self, persona: Option<String>) -> Result<f64, BridgeError> {
        self.ensure_active()?;
        let closed = self.close_live_interval(Instant::now());
        self.mode = Mode::Auto;
        if let Some(persona) = persona.filter(|p| !p.is_empty()) {
            self.persona = persona;
        }
        Ok(closed)
    }

    /// Record who is on the line and which persona answers them.
    pub fn engage(&mut self, caller_number: String, persona: String) -> Result<(), BridgeError> {
        self.ensure_active()?;
        self.caller_number = caller_number;
        self.persona = persona;
        Ok(())
    }

    /// Close the session. Any open live interval is folded in first, and the
    /// same instant is used for the total so `total == live + auto`.
    pub fn end(&mut self) -> Result<SessionSummary, BridgeError> {
        self.ensure_active()?;
        let now = Instant::now();
        self.close_live_interval(now);
        self.mode = Mode::Auto;
        self.active = false;

        let total_seconds = now.duration_since(self.start).as_secs_f64();
        let auto_seconds = (total_seconds - self.live_seconds).max(0.0);
        Ok(SessionSummary {
            session_id: self.id.clone(),
            user_id: self.user_id.clone(),
            started_at: self.started_at,
            total_seconds,
            live_seconds: self.live_seconds,
            auto_seconds,
        })
    }

    fn close_live_interval(&mut self, now: Instant) -> f64 {
        match self.live_since.take() {
            Some(since) => {
                let elapsed = now.saturating_duration_since(since).as_secs_f64();
                self.live_seconds += elapsed;
                elapsed
            }
            None => 0.0,
        }
    }

    fn ensure_active(&self) -> Result<(), BridgeError> {
        if self.active {
            Ok(())
        } else {
            Err(BridgeError::validation(format!("session {} has ended", self.id)))
        }
    }
}
