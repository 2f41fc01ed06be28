//! Core types for the dojo bridge: session state, wire protocol, error
//! taxonomy and the contracts of the upstream collaborators.

pub mod cancel;
pub mod errors;
pub mod ids;
pub mod protocol;
pub mod report;
pub mod session;
pub mod upstream;

pub use cancel::CancelSignal;
pub use errors::{BridgeError, UpstreamError};
pub use ids::{ConnectionId, SessionId};
pub use session::{Mode, Session, SessionDefaults, SessionSummary};
