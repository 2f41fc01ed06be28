//! Server configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use dojo_settings::types::ServerSettings;

/// Bind address and per-connection runtime knobs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind (default `"0.0.0.0"`).
    pub host: String,
    /// Port to bind; `0` auto-assigns.
    pub port: u16,
    /// Outbound frame queue per connection (audio and status frames).
    pub max_send_queue: usize,
    /// Seconds between WebSocket pings.
    pub heartbeat_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8090,
            max_send_queue: 256,
            heartbeat_interval_secs: 30,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs.max(1))
    }
}

impl From<&ServerSettings> for ServerConfig {
    fn from(settings: &ServerSettings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
            max_send_queue: settings.max_send_queue.max(1),
            heartbeat_interval_secs: settings.heartbeat_interval_secs,
        }
    }
}
