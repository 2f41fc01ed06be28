//! # dojo-settings
//!
//! Layered configuration for the dojo bridge:
//! 1. **Compiled defaults** - [`DojoSettings::default()`]
//! 2. **User file** - `~/.dojo/settings.json` or an explicit path,
//!    deep-merged over the defaults
//! 3. **Environment variables** - provider credentials and service hosts
//!    (highest priority)

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_overrides, deep_merge, load_settings, load_settings_from_file, load_settings_from_path,
    settings_path,
};
pub use types::*;
