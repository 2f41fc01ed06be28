//! Settings loading with deep merge and environment variable overrides.
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::DojoSettings;

/// Resolve the default settings file (`~/.dojo/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".dojo").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<DojoSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a path the operator named explicitly. Unlike the
/// default location, a missing file here is an error.
pub fn load_settings_from_file(path: &Path) -> Result<DojoSettings> {
    if !path.exists() {
        return Err(SettingsError::Missing {
            path: path.to_path_buf(),
        });
    }
    load_settings_from_path(path)
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults; an unreadable or malformed file is an error.
pub fn load_settings_from_path(path: &Path) -> Result<DojoSettings> {
    let invalid = |source| SettingsError::Invalid {
        path: path.to_path_buf(),
        source,
    };
    let defaults = serde_json::to_value(DojoSettings::default()).map_err(invalid)?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let user: Value =
            serde_json::from_str(&content).map_err(|source| SettingsError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: DojoSettings = serde_json::from_value(merged).map_err(invalid)?;
    apply_overrides(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply overrides from a key lookup (the process environment in
/// production). Empty values are ignored; unparseable numbers are ignored
/// with a warning.
pub fn apply_overrides(settings: &mut DojoSettings, lookup: impl Fn(&str) -> Option<String>) {
    let read = |name: &str| lookup(name).filter(|v| !v.is_empty());

    // ── Synthesis ───────────────────────────────────────────────────
    if let Some(v) = read("ELEVENLABS_API_KEY") {
        settings.synthesis.api_key = Some(v);
    }
    if let Some(v) = read("ELEVENLABS_VOICE_ID") {
        settings.synthesis.voice_id = Some(v);
    }
    if let Some(v) = read("ELEVENLABS_MODEL_ID") {
        settings.synthesis.model_id = v;
    }
    if let Some(v) = read("ELEVENLABS_BASE_URL") {
        settings.synthesis.base_url = v;
    }

    // ── Collaborators ───────────────────────────────────────────────
    if let Some(v) = read("FOREMAN_HOST") {
        settings.upstream.triage_url = v;
    }
    if let Some(v) = read("ACTOR_HOST") {
        settings.upstream.persona_url = v;
    }
    if let Some(v) = read("STEWARD_HOST") {
        settings.upstream.scoring_url = v;
    }

    // ── Server ──────────────────────────────────────────────────────
    if let Some(v) = read("DOJO_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = read("DOJO_PORT") {
        match parse_port(&v) {
            Some(port) => settings.server.port = port,
            None => tracing::warn!(key = "DOJO_PORT", value = %v, "invalid port, ignoring"),
        }
    }
    if let Some(v) = read("DOJO_DEFAULT_PERSONA") {
        settings.session.default_persona = v;
    }
    if let Some(v) = read("DOJO_LOG_LEVEL") {
        settings.logging.level = v;
    }
}

/// Parse a TCP port, rejecting zero.
pub fn parse_port(val: &str) -> Option<u16> {
    let n: u16 = val.trim().parse().ok()?;
    (n >= 1).then_some(n)
}
