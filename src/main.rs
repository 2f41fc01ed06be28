use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use secrecy::SecretString;

use dojo_core::session::SessionDefaults;
use dojo_server::{BridgeContext, Collaborators, ServerConfig, VoiceDefaults};
use dojo_settings::DojoSettings;
use dojo_telemetry::TelemetryConfig;
use dojo_upstream::{ElevenLabsSynthesizer, HttpPersona, HttpScoring, HttpTriage, SynthesisConfig};

/// Real-time voice bridge for the combat ring.
#[derive(Parser, Debug)]
#[command(name = "dojo-bridge", about = "Dojo voice bridge")]
struct Cli {
    /// Settings file (defaults to `~/.dojo/settings.json`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Host to bind (overrides settings and `DOJO_HOST`).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides settings and `DOJO_PORT`).
    #[arg(long)]
    port: Option<u16>,
}

impl Cli {
    fn load_settings(&self) -> Result<DojoSettings> {
        let mut settings = match &self.config {
            Some(path) => dojo_settings::load_settings_from_file(path),
            None => dojo_settings::load_settings(),
        }
        .context("failed to load settings")?;
        if let Some(host) = &self.host {
            settings.server.host = host.clone();
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        Ok(settings)
    }
}

/// Wire the HTTP clients for every collaborator.
fn build_context(settings: &DojoSettings) -> Result<Arc<BridgeContext>> {
    let upstream = &settings.upstream;
    let synthesis = &settings.synthesis;

    let triage = HttpTriage::new(
        upstream.triage_url.clone(),
        Duration::from_secs(upstream.triage_timeout_secs),
    )
    .context("failed to build triage client")?;
    let persona = HttpPersona::new(
        upstream.persona_url.clone(),
        Duration::from_secs(upstream.persona_timeout_secs),
    )
    .context("failed to build persona client")?;
    let scoring = HttpScoring::new(
        upstream.scoring_url.clone(),
        Duration::from_secs(upstream.scoring_timeout_secs),
    )
    .context("failed to build scoring client")?;
    let synthesizer = ElevenLabsSynthesizer::new(SynthesisConfig {
        base_url: synthesis.base_url.clone(),
        api_key: synthesis.api_key.clone().map(SecretString::from),
        connect_timeout: Duration::from_secs(synthesis.connect_timeout_secs),
        idle_timeout: Duration::from_secs(synthesis.idle_timeout_secs),
    })
    .context("failed to build synthesis client")?;

    Ok(Arc::new(BridgeContext {
        collaborators: Collaborators {
            triage: Arc::new(triage),
            persona: Arc::new(persona),
            synthesizer: Arc::new(synthesizer),
            scoring: Arc::new(scoring),
        },
        voice: VoiceDefaults {
            voice_id: synthesis.voice_id.clone(),
            model_id: synthesis.model_id.clone(),
        },
        session_defaults: SessionDefaults {
            user_id: settings.session.default_user_id.clone(),
            persona: settings.session.default_persona.clone(),
            caller_number: settings.session.default_caller_number.clone(),
        },
    }))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = cli.load_settings()?;

    dojo_telemetry::init_telemetry(&TelemetryConfig::from_level_str(
        &settings.logging.level,
        settings.logging.json,
    ));

    let ctx = build_context(&settings)?;
    if ctx.voice.voice_id.is_none() || settings.synthesis.api_key.is_none() {
        tracing::warn!("speech synthesis not configured; tts and combat requests will be refused");
    }

    let handle = dojo_server::start(ServerConfig::from(&settings.server), ctx)
        .await
        .context("failed to start server")?;
    tracing::info!(port = handle.port, "dojo bridge ready");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl+c")?;
    tracing::info!("shutting down");
    handle.shutdown(None).await;
    Ok(())
}
