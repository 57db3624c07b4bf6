//! Settings type definitions.
//!
//! Field names are camelCase on the wire. Every field has a default, so a
//! partial JSON file only needs to name what it overrides.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Default server base URL.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Default path of the server-push channel, relative to the base URL.
pub const DEFAULT_SSE_ENDPOINT: &str = "/sse";

/// Default connect timeout for both the stream GET and message POSTs.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

/// Configuration for one SSE client transport.
///
/// ```json
/// {
///   "baseUrl": "https://mcp.example.com/api/",
///   "sseEndpoint": "sse",
///   "requestTimeoutMs": 30000,
///   "headers": { "Authorization": "Bearer ..." }
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransportSettings {
    /// Server base URL. Announced endpoints must live under it.
    pub base_url: String,
    /// Path of the event stream, resolved against `base_url`.
    pub sse_endpoint: String,
    /// TCP/TLS connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Per-POST timeout in milliseconds. Unset means unbounded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_ms: Option<u64>,
    /// Extra headers sent on every request.
    pub headers: BTreeMap<String, String>,
    /// Default log filter for binaries (`RUST_LOG` wins when set).
    pub log_level: String,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            sse_endpoint: DEFAULT_SSE_ENDPOINT.to_owned(),
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            request_timeout_ms: None,
            headers: BTreeMap::new(),
            log_level: "warn".to_owned(),
        }
    }
}

impl TransportSettings {
    /// Parsed base URL.
    pub fn base_url(&self) -> Result<Url> {
        let url = Url::parse(&self.base_url)
            .map_err(|e| SettingsError::InvalidValue(format!("baseUrl {:?}: {e}", self.base_url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SettingsError::InvalidValue(format!(
                "baseUrl must be http or https, got {}",
                url.scheme()
            )));
        }
        Ok(url)
    }

    /// Connect timeout as a [`Duration`].
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Request timeout as a [`Duration`], if configured.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    /// Check values that serde cannot constrain.
    pub fn validate(&self) -> Result<()> {
        let _ = self.base_url()?;
        if self.connect_timeout_ms == 0 {
            return Err(SettingsError::InvalidValue(
                "connectTimeoutMs must be positive".into(),
            ));
        }
        if self.request_timeout_ms == Some(0) {
            return Err(SettingsError::InvalidValue(
                "requestTimeoutMs must be positive when set".into(),
            ));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
