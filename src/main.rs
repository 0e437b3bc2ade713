// MIT License - Copyright (c) 2026 Peter Wright
// it100d: panel gateway daemon

use std::collections::HashMap;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use it100_bridge::{CommandAction, Gateway, GatewayConfig, PanelEvent};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "it100d")]
#[command(about = "Gateway between a DSC IT-100 serial interface and TCP keypad clients")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "it100d.toml")]
    config: String,
}

// ---------------------------------------------------------------------------
// Config file
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FileConfig {
    panel: PanelToml,
    #[serde(default)]
    access_codes: HashMap<String, String>,
    #[serde(default)]
    zone_names: HashMap<String, String>,
    #[serde(default)]
    partition_names: HashMap<String, String>,
    #[serde(default)]
    user_names: HashMap<String, String>,
    #[serde(default)]
    key_names: HashMap<String, String>,
    #[serde(default)]
    keypad_names: HashMap<String, String>,
    /// Per-command dispatch, keyed by the 3-digit command code.
    #[serde(default)]
    actions: HashMap<String, CommandAction>,
}

#[derive(Debug, Deserialize)]
struct PanelToml {
    device: String,
    #[serde(default = "default_baud")]
    baud: u32,
    #[serde(default = "default_listen_port")]
    listen_port: u16,
    #[serde(default)]
    sync_time: bool,
    #[serde(default = "default_ack_timeout")]
    ack_timeout_ms: u64,
    /// Access code used for partitions without an [access_codes] entry.
    #[serde(default)]
    access_code: String,
}

fn default_baud() -> u32 {
    9600
}
fn default_listen_port() -> u16 {
    4025
}
fn default_ack_timeout() -> u64 {
    5000
}

/// TOML table keys are strings; the gateway wants numbers.
fn numeric_keys<T, V>(map: HashMap<String, V>, what: &str) -> Result<HashMap<T, V>>
where
    T: std::str::FromStr + std::hash::Hash + Eq,
    <T as std::str::FromStr>::Err: std::fmt::Display,
{
    map.into_iter()
        .map(|(k, v)| {
            k.parse::<T>()
                .map(|key| (key, v))
                .map_err(|e| anyhow::anyhow!("invalid {what} key {k:?}: {e}"))
        })
        .collect()
}

fn build_gateway_config(file: FileConfig) -> Result<GatewayConfig> {
    let mut builder = GatewayConfig::builder()
        .device(file.panel.device)
        .baud(file.panel.baud)
        .listen_port(file.panel.listen_port)
        .sync_time(file.panel.sync_time)
        .ack_timeout_ms(file.panel.ack_timeout_ms)
        .default_access_code(file.panel.access_code);

    for (partition, code) in numeric_keys::<u8, _>(file.access_codes, "access_codes")? {
        builder = builder.access_code(partition, code);
    }
    for (zone, name) in numeric_keys::<u8, _>(file.zone_names, "zone_names")? {
        builder = builder.zone_name(zone, name);
    }
    for (partition, name) in numeric_keys::<u8, _>(file.partition_names, "partition_names")? {
        builder = builder.partition_name(partition, name);
    }
    for (user, name) in numeric_keys::<u8, _>(file.user_names, "user_names")? {
        builder = builder.user_name(user, name);
    }
    for (key, name) in numeric_keys::<u8, _>(file.key_names, "key_names")? {
        builder = builder.key_name(key, name);
    }
    for (keypad, name) in numeric_keys::<u8, _>(file.keypad_names, "keypad_names")? {
        builder = builder.keypad_name(keypad, name);
    }
    for (code, action) in numeric_keys::<u16, _>(file.actions, "actions")? {
        builder = builder.action(code, action);
    }

    Ok(builder.build())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let text = std::fs::read_to_string(&cli.config)
        .with_context(|| format!("Failed to read config file {}", cli.config))?;
    let file: FileConfig = toml::from_str(&text)
        .with_context(|| format!("Failed to parse config file {}", cli.config))?;
    let config = build_gateway_config(file)?;

    let gateway = Gateway::connect(config)
        .await
        .context("Failed to open the panel link")?;
    let mut events = gateway.subscribe();

    let mut sigterm = signal(SignalKind::terminate())?;

    let serve = gateway.serve();
    tokio::pin!(serve);

    info!("it100d running. Send SIGINT/SIGTERM to stop.");
    loop {
        tokio::select! {
            result = &mut serve => {
                result.context("Client server failed")?;
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received SIGINT, shutting down...");
                break;
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down...");
                break;
            }
            event = events.recv() => match event {
                // Losing the panel makes the daemon pointless
                Ok(PanelEvent::Disconnected) => {
                    error!("Panel link lost, exiting");
                    anyhow::bail!("panel link lost");
                }
                Ok(_) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Event receiver lagged, missed {n} events");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    info!("Shutdown complete");
    Ok(())
}
