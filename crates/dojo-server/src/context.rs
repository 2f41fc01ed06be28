use std::sync::Arc;

use dojo_core::errors::BridgeError;
use dojo_core::session::SessionDefaults;
use dojo_core::upstream::{PersonaResponder, ScoreSink, SpeechSynthesizer, SynthesisRequest, Triage};

/// The four upstream services a connection drives.
#[derive(Clone)]
pub struct Collaborators {
    pub triage: Arc<dyn Triage>,
    pub persona: Arc<dyn PersonaResponder>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub scoring: Arc<dyn ScoreSink>,
}

/// Voice and model used when a request does not name its own.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VoiceDefaults {
    pub voice_id: Option<String>,
    pub model_id: String,
}

/// Everything a connection handler needs, shared across connections.
/// Read-only once the server is running.
pub struct BridgeContext {
    pub collaborators: Collaborators,
    pub voice: VoiceDefaults,
    pub session_defaults: SessionDefaults,
}

/// A voice and model that passed the configuration check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoiceSelection {
    pub voice_id: String,
    pub model_id: String,
}

impl VoiceSelection {
    /// Attach the text to speak. Blank text is rejected before any stream
    /// is opened.
    pub fn request(self, text: String) -> Result<SynthesisRequest, BridgeError> {
        if text.trim().is_empty() {
            return Err(BridgeError::validation("No text provided"));
        }
        Ok(SynthesisRequest {
            text,
            voice_id: self.voice_id,
            model_id: self.model_id,
        })
    }
}

impl BridgeContext {
    /// Pick the voice and model for a request, failing with a
    /// configuration error when the synthesizer has no credential or no
    /// voice can be resolved.
    pub fn select_voice(
        &self,
        voice_id: Option<String>,
        model_id: Option<String>,
    ) -> Result<VoiceSelection, BridgeError> {
        if !self.collaborators.synthesizer.is_configured() {
            return Err(BridgeError::configuration("speech synthesis credential"));
        }
        let voice_id = non_empty(voice_id)
            .or_else(|| non_empty(self.voice.voice_id.clone()))
            .ok_or_else(|| BridgeError::configuration("speech synthesis voice"))?;
        let model_id = non_empty(model_id).unwrap_or_else(|| self.voice.model_id.clone());
        Ok(VoiceSelection { voice_id, model_id })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use dojo_upstream::mock::{MockPersona, MockSynthesizer, RecordingScoreSink, StaticTriage};

    use super::*;

    fn context(synth: MockSynthesizer, voice: Option<&str>) -> BridgeContext {
        BridgeContext {
            collaborators: Collaborators {
                triage: Arc::new(StaticTriage::default()),
                persona: Arc::new(MockPersona::default()),
                synthesizer: Arc::new(synth),
                scoring: Arc::new(RecordingScoreSink::default()),
            },
            voice: VoiceDefaults {
                voice_id: voice.map(str::to_string),
                model_id: "eleven_monolingual_v1".into(),
            },
            session_defaults: SessionDefaults::default(),
        }
    }

    #[test]
    fn request_overrides_win() {
        let ctx = context(MockSynthesizer::new(vec![]), Some("default-voice"));
        let sel = ctx
            .select_voice(Some("brian".into()), Some("turbo".into()))
            .unwrap();
        assert_eq!(sel.voice_id, "brian");
        assert_eq!(sel.model_id, "turbo");
    }

    #[test]
    fn falls_back_to_defaults() {
        let ctx = context(MockSynthesizer::new(vec![]), Some("default-voice"));
        let sel = ctx.select_voice(None, Some(String::new())).unwrap();
        assert_eq!(sel.voice_id, "default-voice");
        assert_eq!(sel.model_id, "eleven_monolingual_v1");
    }

    #[test]
    fn missing_credential_is_configuration_error() {
        let ctx = context(MockSynthesizer::unconfigured(), Some("v"));
        let err = ctx.select_voice(None, None).unwrap_err();
        assert_eq!(err.error_kind(), "configuration");
    }

    #[test]
    fn missing_voice_is_configuration_error() {
        let ctx = context(MockSynthesizer::new(vec![]), None);
        assert!(matches!(
            ctx.select_voice(None, None),
            Err(BridgeError::Configuration(_))
        ));
    }

    #[test]
    fn blank_text_is_validation_error() {
        let sel = VoiceSelection {
            voice_id: "v".into(),
            model_id: "m".into(),
        };
        let err = sel.request("   ".into()).unwrap_err();
        assert_eq!(err, BridgeError::validation("No text provided"));
    }
}
