//! Per-connection message dispatch.
//!
//! A [`SessionDriver`] owns the connection's current [`Session`] and handles
//! one control message at a time. Errors from a single message are sent back
//! as `{"error": ...}` and the driver keeps going; only a transport failure
//! stops it.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use dojo_core::cancel::CancelSignal;
use dojo_core::errors::BridgeError;
use dojo_core::protocol::{ClientMessage, ServerMessage, StatusEvent, LIVE_XP_MULTIPLIER};
use dojo_core::report::{ScoreReceipt, ScoreReport, COMBAT_RING_CALL_TYPE};
use dojo_core::session::{Mode, Session, SessionSummary};
use dojo_core::upstream::SynthesisRequest;

use crate::context::BridgeContext;
use crate::outbox::Outbox;
use crate::pipeline::{stream_speech, StreamOutcome, StreamRequest};

pub const INTERRUPT_REASON_BARGE_IN: &str = "barge_in";

pub struct SessionDriver {
    ctx: Arc<BridgeContext>,
    session: Session,
    out: Outbox,
    cancel_tx: watch::Sender<CancelSignal>,
}

impl SessionDriver {
    pub fn new(ctx: Arc<BridgeContext>, out: Outbox) -> Self {
        let session = Session::new(&ctx.session_defaults);
        let (cancel_tx, _) = watch::channel(session.cancel_signal().clone());
        info!(session_id = %session.id(), "session opened");
        Self {
            ctx,
            session,
            out,
            cancel_tx,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Follows the cancel signal of whichever session is current, so the
    /// transport reader can interrupt a stream without waiting for the
    /// driver.
    pub fn cancel_watch(&self) -> watch::Receiver<CancelSignal> {
        self.cancel_tx.subscribe()
    }

    pub fn outbox(&self) -> Outbox {
        self.out.clone()
    }

    /// Parse and handle one text frame. Returns `Err` only for transport
    /// failures.
    pub async fn handle_frame(&mut self, raw: &str) -> Result<(), BridgeError> {
        let result = match ClientMessage::parse(raw) {
            Ok(message) => self.handle(message).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => Ok(()),
            Err(e) if e.is_transport() => Err(e),
            Err(e) => {
                warn!(
                    session_id = %self.session.id(),
                    kind = e.error_kind(),
                    service = e.upstream_service().unwrap_or("-"),
                    error = %e,
                    "message failed"
                );
                self.out.send(ServerMessage::error(&e)).await
            }
        }
    }

    pub async fn handle(&mut self, message: ClientMessage) -> Result<(), BridgeError> {
        debug!(session_id = %self.session.id(), action = message.action(), "dispatch");
        match message {
            ClientMessage::BargeIn { user_id } => self.barge_in(user_id).await,
            ClientMessage::BargeOut { persona } => self.barge_out(persona).await,
            ClientMessage::EndSession => self.end_session().await,
            ClientMessage::Combat {
                caller_number,
                transcript,
                persona,
            } => self.combat(caller_number, transcript, persona).await,
            ClientMessage::Tts {
                text,
                voice_id,
                model_id,
            } => self.tts(text, voice_id, model_id).await,
        }
    }

    async fn barge_in(&mut self, user_id: Option<String>) -> Result<(), BridgeError> {
        let entered = self.session.barge_in(user_id)?;
        if entered {
            info!(session_id = %self.session.id(), user_id = %self.session.user_id(), "barge-in");
        }
        self.out
            .send(StatusEvent::BargeInAck {
                session_id: self.session.id().clone(),
                mode: Mode::Live,
                xp_multiplier: LIVE_XP_MULTIPLIER,
                message: format!("You have the conn. {LIVE_XP_MULTIPLIER}x XP active."),
            })
            .await
    }

    async fn barge_out(&mut self, persona: Option<String>) -> Result<(), BridgeError> {
        let closed = self.session.barge_out(persona)?;
        info!(
            session_id = %self.session.id(),
            interval_secs = closed,
            live_seconds = self.session.live_seconds(),
            "barge-out"
        );
        let persona = self.session.persona().to_string();
        self.out
            .send(StatusEvent::BargeOutAck {
                mode: self.session.mode(),
                persona: persona.clone(),
                live_seconds: self.session.live_seconds(),
                message: format!("AI resuming as {persona}."),
            })
            .await
    }

    async fn end_session(&mut self) -> Result<(), BridgeError> {
        let (summary, receipt) = self.close_session().await?;

        let fresh = Session::new(&self.ctx.session_defaults);
        let _ = self.cancel_tx.send_replace(fresh.cancel_signal().clone());
        self.session = fresh;
        info!(session_id = %self.session.id(), "session opened");

        self.out
            .send(StatusEvent::SessionScored {
                session_id: summary.session_id,
                total_duration: summary.total_seconds,
                live_seconds: summary.live_seconds,
                auto_seconds: summary.auto_seconds,
                steward: receipt,
            })
            .await
    }

    #[instrument(skip_all, fields(session_id = %self.session.id()))]
    async fn combat(
        &mut self,
        caller_number: Option<String>,
        transcript: Option<String>,
        persona: Option<String>,
    ) -> Result<(), BridgeError> {
        let caller_number = caller_number
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| BridgeError::validation("caller_number is required"))?;
        let voice = self.ctx.select_voice(None, None)?;
        let persona = persona
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| self.session.persona().to_string());
        self.session.engage(caller_number.clone(), persona.clone())?;

        let collaborators = &self.ctx.collaborators;
        let triage = collaborators.triage.classify(&caller_number).await;
        let actor_text = collaborators
            .persona
            .respond(transcript.as_deref().unwrap_or_default(), &persona)
            .await?;
        let request = voice.request(actor_text.clone())?;
        info!(action = %triage.action, persona = %persona, "combat cycle");

        self.out
            .send(StatusEvent::Streaming {
                session_id: self.session.id().clone(),
                triage,
                actor_text,
                mode: self.session.mode(),
            })
            .await?;
        self.speak(request).await
    }

    async fn tts(
        &mut self,
        text: Option<String>,
        voice_id: Option<String>,
        model_id: Option<String>,
    ) -> Result<(), BridgeError> {
        let request = self
            .ctx
            .select_voice(voice_id, model_id)?
            .request(text.unwrap_or_default())?;
        self.speak(request).await
    }

    async fn speak(&mut self, synthesis: SynthesisRequest) -> Result<(), BridgeError> {
        let outcome = stream_speech(
            self.ctx.collaborators.synthesizer.as_ref(),
            StreamRequest {
                synthesis,
                cancel: self.session.cancel_signal().clone(),
            },
            &self.out,
        )
        .await?;
        match outcome {
            StreamOutcome::Completed { .. } => self.out.send(StatusEvent::Done).await,
            StreamOutcome::Interrupted { .. } => {
                self.out
                    .send(StatusEvent::StreamInterrupted {
                        reason: INTERRUPT_REASON_BARGE_IN.into(),
                    })
                    .await
            }
        }
    }

    /// End the current session and submit its score. Scoring is
    /// best-effort; its failure is already logged by the sink.
    async fn close_session(
        &mut self,
    ) -> Result<(SessionSummary, Option<ScoreReceipt>), BridgeError> {
        let summary = self.session.end()?;
        info!(
            session_id = %summary.session_id,
            user_id = %summary.user_id,
            started_at = %summary.started_at.to_rfc3339(),
            total_secs = summary.total_seconds,
            live_secs = summary.live_seconds,
            auto_secs = summary.auto_seconds,
            "session ended"
        );
        let report = ScoreReport::from_summary(&summary, COMBAT_RING_CALL_TYPE);
        let receipt = self.ctx.collaborators.scoring.submit(&report).await;
        Ok((summary, receipt))
    }

    /// Implicit end on disconnect: close the active session, if any, and
    /// score it. Nothing is sent; the client is gone.
    pub async fn finish(mut self) {
        if !self.session.is_active() {
            return;
        }
        if let Err(e) = self.close_session().await {
            warn!(error = %e, "implicit session end failed");
        }
    }
}
