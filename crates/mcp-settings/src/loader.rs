//! Settings loading: compiled defaults, then the JSON file, then `MCP_*`
//! environment overrides.
//!
//! The file layer is overlaid onto the serialized defaults key by key.
//! Nested objects such as `headers` merge per key; a `null` leaves the lower
//! layer's value in place; anything else replaces it.

use std::io::ErrorKind;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::types::TransportSettings;

/// Env var naming an explicit settings file.
pub const SETTINGS_FILE_ENV: &str = "MCP_SETTINGS_FILE";

const CONNECT_TIMEOUT_RANGE: RangeInclusive<u64> = 100..=600_000;
const REQUEST_TIMEOUT_RANGE: RangeInclusive<u64> = 100..=3_600_000;

/// Default settings file: `$MCP_SETTINGS_FILE`, else `~/.mcp/transport.json`.
pub fn settings_path() -> PathBuf {
    if let Some(explicit) = non_empty_env(SETTINGS_FILE_ENV) {
        return PathBuf::from(explicit);
    }
    let home = non_empty_env("HOME").map_or_else(|| PathBuf::from("."), PathBuf::from);
    home.join(".mcp").join("transport.json")
}

/// Load settings from `path`, then apply the process environment.
///
/// A missing file yields defaults. Unreadable or malformed files are errors.
/// The result is validated before it is returned.
pub fn load_settings_from_path(path: &Path) -> Result<TransportSettings> {
    let mut settings = read_layered(path)?;
    apply_env_overrides(&mut settings, non_empty_env);
    settings.validate()?;
    Ok(settings)
}

fn read_layered(path: &Path) -> Result<TransportSettings> {
    let Value::Object(mut merged) = serde_json::to_value(TransportSettings::default())? else {
        return Err(SettingsError::InvalidValue(
            "defaults did not serialize to an object".into(),
        ));
    };

    match read_file_layer(path)? {
        Some(layer) => {
            debug!(path = %path.display(), keys = layer.len(), "applying settings file");
            overlay(&mut merged, layer);
        }
        None => debug!(path = %path.display(), "no settings file, using defaults"),
    }

    Ok(serde_json::from_value(Value::Object(merged))?)
}

fn read_file_layer(path: &Path) -> Result<Option<Map<String, Value>>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    match serde_json::from_str(&content)? {
        Value::Object(layer) => Ok(Some(layer)),
        other => Err(SettingsError::InvalidValue(format!(
            "{} must hold a JSON object, found {}",
            path.display(),
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Overlay `layer` onto `base` in place.
fn overlay(base: &mut Map<String, Value>, layer: Map<String, Value>) {
    for (key, value) in layer {
        match value {
            Value::Null => {}
            Value::Object(layer) => match base.get_mut(&key) {
                Some(Value::Object(nested)) => overlay(nested, layer),
                _ => {
                    let _ = base.insert(key, Value::Object(layer));
                }
            },
            value => {
                let _ = base.insert(key, value);
            }
        }
    }
}

/// Apply `MCP_*` overrides read through `env`.
///
/// Out-of-range or unparseable timeouts are ignored with a warning.
pub fn apply_env_overrides<F>(settings: &mut TransportSettings, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = env("MCP_BASE_URL") {
        settings.base_url = v;
    }
    if let Some(v) = env("MCP_SSE_ENDPOINT") {
        settings.sse_endpoint = v;
    }
    if let Some(v) = env_millis(&env, "MCP_CONNECT_TIMEOUT_MS", CONNECT_TIMEOUT_RANGE) {
        settings.connect_timeout_ms = v;
    }
    if let Some(v) = env_millis(&env, "MCP_REQUEST_TIMEOUT_MS", REQUEST_TIMEOUT_RANGE) {
        settings.request_timeout_ms = Some(v);
    }
    if let Some(v) = env("MCP_LOG_LEVEL") {
        settings.log_level = v;
    }
}

fn env_millis<F>(env: &F, name: &str, range: RangeInclusive<u64>) -> Option<u64>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = env(name)?;
    let parsed = raw.trim().parse::<u64>().ok().filter(|ms| range.contains(ms));
    if parsed.is_none() {
        warn!(
            key = name,
            value = %raw,
            min = range.start(),
            max = range.end(),
            "ignoring out-of-range timeout override"
        );
    }
    parsed
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn fake_env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    fn write_settings(body: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transport.json");
        std::fs::write(&path, body).unwrap();
        (dir, path)
    }

    // ── overlay ─────────────────────────────────────────────────────

    #[test]
    fn overlay_headers_merge_per_key() {
        let mut base = object(json!({"headers": {"X-A": "1", "X-B": "2"}, "logLevel": "warn"}));
        overlay(&mut base, object(json!({"headers": {"X-B": "3"}})));
        assert_eq!(base["headers"], json!({"X-A": "1", "X-B": "3"}));
        assert_eq!(base["logLevel"], "warn");
    }

    #[test]
    fn overlay_null_keeps_lower_layer() {
        let mut base = object(json!({"connectTimeoutMs": 10_000}));
        overlay(&mut base, object(json!({"connectTimeoutMs": null, "extra": [1]})));
        assert_eq!(base["connectTimeoutMs"], 10_000);
        assert_eq!(base["extra"], json!([1]));
    }

    #[test]
    fn overlay_scalar_replaces_object() {
        let mut base = object(json!({"headers": {"X-A": "1"}}));
        overlay(&mut base, object(json!({"headers": "none"})));
        assert_eq!(base["headers"], "none");
    }

    // ── file layer ──────────────────────────────────────────────────

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = read_layered(&dir.path().join("absent.json")).unwrap();
        assert_eq!(settings, TransportSettings::default());
    }

    #[test]
    fn partial_file_overrides_defaults() {
        let (_dir, path) = write_settings(
            r#"{"sseEndpoint": "/events", "requestTimeoutMs": 15000, "headers": {"X-Api-Key": "k"}}"#,
        );

        let settings = read_layered(&path).unwrap();
        assert_eq!(settings.sse_endpoint, "/events");
        assert_eq!(settings.request_timeout_ms, Some(15_000));
        assert_eq!(settings.headers.get("X-Api-Key").map(String::as_str), Some("k"));
        assert_eq!(settings.connect_timeout_ms, 10_000);
    }

    #[test]
    fn malformed_file_is_json_error() {
        let (_dir, path) = write_settings("not valid json");
        assert!(matches!(read_layered(&path).unwrap_err(), SettingsError::Json(_)));
    }

    #[test]
    fn non_object_file_is_rejected() {
        let (_dir, path) = write_settings("[1, 2]");
        let err = read_layered(&path).unwrap_err();
        assert!(matches!(&err, SettingsError::InvalidValue(m) if m.contains("an array")));
    }

    #[test]
    fn directory_path_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(read_layered(dir.path()).unwrap_err(), SettingsError::Io(_)));
    }

    #[test]
    fn load_validates_merged_result() {
        let (_dir, path) = write_settings(r#"{"connectTimeoutMs": 0}"#);
        assert!(matches!(
            load_settings_from_path(&path).unwrap_err(),
            SettingsError::InvalidValue(_)
        ));
    }

    // ── env layer ───────────────────────────────────────────────────

    #[test]
    fn env_overrides_file_values() {
        let mut settings = TransportSettings::default();
        apply_env_overrides(
            &mut settings,
            fake_env(&[
                ("MCP_BASE_URL", "https://mcp.example"),
                ("MCP_SSE_ENDPOINT", "/events"),
                ("MCP_CONNECT_TIMEOUT_MS", " 2500 "),
                ("MCP_REQUEST_TIMEOUT_MS", "30000"),
                ("MCP_LOG_LEVEL", "debug"),
            ]),
        );
        assert_eq!(settings.base_url, "https://mcp.example");
        assert_eq!(settings.sse_endpoint, "/events");
        assert_eq!(settings.connect_timeout_ms, 2_500);
        assert_eq!(settings.request_timeout_ms, Some(30_000));
        assert_eq!(settings.log_level, "debug");
    }

    #[test]
    fn out_of_range_timeouts_ignored() {
        let mut settings = TransportSettings::default();
        apply_env_overrides(
            &mut settings,
            fake_env(&[
                ("MCP_CONNECT_TIMEOUT_MS", "50"),
                ("MCP_REQUEST_TIMEOUT_MS", "soon"),
            ]),
        );
        assert_eq!(settings.connect_timeout_ms, 10_000);
        assert_eq!(settings.request_timeout_ms, None);
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let env = fake_env(&[("A", "100"), ("B", "600000"), ("C", "600001")]);
        assert_eq!(env_millis(&env, "A", CONNECT_TIMEOUT_RANGE), Some(100));
        assert_eq!(env_millis(&env, "B", CONNECT_TIMEOUT_RANGE), Some(600_000));
        assert_eq!(env_millis(&env, "C", CONNECT_TIMEOUT_RANGE), None);
    }
}
