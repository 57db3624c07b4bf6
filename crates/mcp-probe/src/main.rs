//! # mcp-probe
//!
//! Connects to an MCP server over HTTP SSE, answers inbound pings, sends one
//! `ping` of its own, logs what arrives, then closes. Exits non-zero if the
//! transport reported any failure along the way.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use mcp_core::constants::methods;
use mcp_core::{JsonRpcMessage, JsonRpcRequest, JsonRpcResponse};
use mcp_settings::TransportSettings;
use mcp_sse::{
    HttpClientSseClientTransportBuilder, McpClientTransport, McpTransport, TransportError,
};
use serde_json::json;
use tracing::info;

/// Log output format.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    /// Compact human-readable lines.
    Text,
    /// Newline-delimited JSON.
    Json,
}

/// MCP SSE probe.
#[derive(Parser, Debug)]
#[command(name = "mcp-probe", about = "Ping an MCP server over HTTP SSE")]
struct Cli {
    /// Server base URL (overrides settings).
    #[arg(long)]
    url: Option<String>,

    /// Event stream path, relative to the base URL.
    #[arg(long)]
    sse_endpoint: Option<String>,

    /// Settings file (default `~/.mcp/transport.json`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log filter (overrides settings; `RUST_LOG` still wins).
    #[arg(long)]
    log_level: Option<String>,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Seconds to keep listening after the ping is sent.
    #[arg(long, default_value = "5")]
    wait_secs: u64,
}

impl Cli {
    fn settings(&self) -> Result<TransportSettings> {
        let path = self.config.clone().unwrap_or_else(mcp_settings::settings_path);
        let mut settings = mcp_settings::load_settings_from_path(&path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?;

        if let Some(url) = &self.url {
            settings.base_url.clone_from(url);
        }
        if let Some(endpoint) = &self.sse_endpoint {
            settings.sse_endpoint.clone_from(endpoint);
        }
        if let Some(level) = &self.log_level {
            settings.log_level.clone_from(level);
        }
        Ok(settings)
    }
}

async fn log_inbound(message: JsonRpcMessage) -> Option<JsonRpcMessage> {
    info!(
        kind = message.kind(),
        method = message.method().unwrap_or_default(),
        id = ?message.id(),
        "inbound message"
    );

    match message {
        JsonRpcMessage::Request(request) if request.method == methods::PING => {
            Some(JsonRpcResponse::success(request.id, json!({})).into())
        }
        _ => None,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let settings = args.settings()?;
    match args.log_format {
        LogFormat::Text => mcp_core::logging::init_subscriber(&settings.log_level),
        LogFormat::Json => mcp_core::logging::init_json_subscriber(&settings.log_level),
    }

    // the transport logs each failure itself; the sink only counts them
    let failures = Arc::new(AtomicUsize::new(0));
    let sink = Arc::clone(&failures);
    let transport = HttpClientSseClientTransportBuilder::from_settings(&settings)?
        .exception_handler(Arc::new(move |_e: &TransportError| {
            let _ = sink.fetch_add(1, Ordering::Relaxed);
        }))
        .build()
        .context("Failed to build transport")?;

    info!(url = %transport.sse_url(), "connecting");
    transport
        .connect(Arc::new(log_inbound))
        .await
        .context("Failed to open event stream")?;

    let endpoint = transport
        .endpoint_ready()
        .await
        .context("Server never announced a usable endpoint")?;
    info!(%endpoint, "endpoint ready");

    transport
        .send_message(JsonRpcRequest::new(methods::PING, 1, None).into())
        .await
        .context("Failed to send ping")?;
    info!("ping sent");

    tokio::select! {
        () = tokio::time::sleep(Duration::from_secs(args.wait_secs)) => {}
        _ = tokio::signal::ctrl_c() => info!("interrupted"),
    }

    transport.close_gracefully().await;
    info!(state = %transport.state(), "closed");

    let failures = failures.load(Ordering::Relaxed);
    if failures > 0 {
        bail!("transport reported {failures} failure(s)");
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_defaults_to_text() {
        let cli = Cli::try_parse_from(["mcp-probe"]).unwrap();
        assert!(matches!(cli.log_format, LogFormat::Text));
        assert_eq!(cli.wait_secs, 5);
    }

    #[test]
    fn log_format_json_parses() {
        let cli = Cli::try_parse_from(["mcp-probe", "--log-format", "json"]).unwrap();
        assert!(matches!(cli.log_format, LogFormat::Json));
    }

    #[test]
    fn flags_override_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("transport.json");
        std::fs::write(
            &config,
            r#"{"baseUrl": "http://file.example", "sseEndpoint": "/file-sse", "logLevel": "info"}"#,
        )
        .unwrap();

        let cli = Cli::try_parse_from([
            "mcp-probe",
            "--config",
            config.to_str().unwrap(),
            "--url",
            "http://flag.example",
            "--log-level",
            "trace",
        ])
        .unwrap();
        let settings = cli.settings().unwrap();
        assert_eq!(settings.base_url, "http://flag.example");
        assert_eq!(settings.sse_endpoint, "/file-sse");
        assert_eq!(settings.log_level, "trace");
    }
}
