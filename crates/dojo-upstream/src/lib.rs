//! HTTP clients for the collaborators the bridge drives, plus scripted
//! in-process doubles for tests.

mod http;
pub mod mock;
pub mod persona;
pub mod scoring;
pub mod synthesis;
pub mod triage;

pub use persona::HttpPersona;
pub use scoring::HttpScoring;
pub use synthesis::{ElevenLabsSynthesizer, SynthesisConfig};
pub use triage::HttpTriage;
