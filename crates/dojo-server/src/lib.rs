//! HTTP and WebSocket front end of the dojo bridge.

pub mod config;
pub mod connection;
pub mod context;
pub mod dispatch;
pub mod health;
pub mod outbox;
pub mod pipeline;
pub mod rest;
pub mod server;
pub mod shutdown;

pub use config::ServerConfig;
pub use context::{BridgeContext, Collaborators, VoiceDefaults};
pub use server::{build_router, start, AppState, ServerHandle};
