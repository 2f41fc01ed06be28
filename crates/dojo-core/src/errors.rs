use std::time::Duration;

/// Failure talking to one of the upstream collaborators (persona, synthesis,
/// scoring, triage).
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum UpstreamError {
    /// Non-success response. The body is kept verbatim.
    #[error("{service} returned {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },
    #[error("{service} unreachable: {message}")]
    Network {
        service: &'static str,
        message: String,
    },
    #[error("{service} timed out after {after:?}")]
    Timeout {
        service: &'static str,
        after: Duration,
    },
    #[error("{service} sent an unreadable response: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },
}

impl UpstreamError {
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Status { .. } => "upstream_status",
            Self::Network { .. } => "upstream_network",
            Self::Timeout { .. } => "upstream_timeout",
            Self::Decode { .. } => "upstream_decode",
        }
    }

    pub fn service(&self) -> &'static str {
        match self {
            Self::Status { service, .. }
            | Self::Network { service, .. }
            | Self::Timeout { service, .. }
            | Self::Decode { service, .. } => service,
        }
    }

    /// HTTP status reported by the upstream, if it answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Error taxonomy for a single client message.
///
/// Only `Transport` ends a connection; everything else is reported back to
/// the client as `{"error": ...}` and the loop keeps reading.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum BridgeError {
    #[error("not configured: {0}")]
    Configuration(String),
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error("transport closed: {0}")]
    Transport(String),
}

impl BridgeError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Validation(_) => "validation",
            Self::Upstream(e) => e.error_kind(),
            Self::Transport(_) => "transport",
        }
    }

    /// Which collaborator failed, for upstream errors.
    pub fn upstream_service(&self) -> Option<&'static str> {
        match self {
            Self::Upstream(e) => Some(e.service()),
            _ => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
