//! # mcp-settings
//!
//! Configuration for the MCP SSE client transport.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`TransportSettings::default()`]
//! 2. **User file**: `$MCP_SETTINGS_FILE` or `~/.mcp/transport.json`,
//!    overlaid key by key
//! 3. **Environment variables**: `MCP_*` overrides (highest priority)

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{SETTINGS_FILE_ENV, apply_env_overrides, load_settings_from_path, settings_path};
pub use types::TransportSettings;
