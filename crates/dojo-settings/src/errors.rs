//! Settings error types.
//!
//! Every variant names the file involved so a bad `--config` argument is
//! reported against the path the operator actually passed.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when loading settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// An explicitly requested settings file does not exist.
    #[error("settings file {} does not exist", .path.display())]
    Missing { path: PathBuf },

    /// The file exists but could not be read (permissions, a directory, ...).
    #[error("cannot read settings file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid JSON.
    #[error("settings file {} is not valid JSON: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The JSON parsed but a field has the wrong shape, e.g. a string port.
    #[error("settings file {} has an invalid value: {source}", .path.display())]
    Invalid {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl SettingsError {
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Missing { path }
            | Self::Read { path, .. }
            | Self::Parse { path, .. }
            | Self::Invalid { path, .. } => path,
        }
    }
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;
