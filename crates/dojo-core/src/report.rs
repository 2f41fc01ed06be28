use serde::{Deserialize, Serialize};

use crate::session::{Mode, SessionSummary};

/// Call-type tag reported for every bridge session.
pub const COMBAT_RING_CALL_TYPE: &str = "combat_ring";

/// Payload submitted to the reward engine once per ended session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub user_id: String,
    pub session_id: String,
    /// Whole seconds; the reward engine does not take fractions.
    pub duration_seconds: u64,
    pub mode: Mode,
    pub scam_type: String,
}

impl ScoreReport {
    pub fn from_summary(summary: &SessionSummary, call_type: &str) -> Self {
        Self {
            user_id: summary.user_id.clone(),
            session_id: summary.session_id.to_string(),
            duration_seconds: summary.total_seconds.max(0.0).floor() as u64,
            mode: summary.classification(),
            scam_type: call_type.to_string(),
        }
    }
}

/// What the reward engine answered, forwarded to the client untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreReceipt {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub credits_earned: i64,
    #[serde(default)]
    pub new_level: i64,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub duration_seconds: u64,
}
