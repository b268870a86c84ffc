//! # babyshield
//!
//! Command-line front end for the BabyShield relay: inspect and flip the
//! enabled flag, run a one-off classification, or serve relay messages as
//! newline-delimited JSON over stdin/stdout.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use shield_core::messages::RelayRequest;
use shield_core::VideoMetadata;
use shield_relay::{HttpClassifier, Relay};
use shield_settings::{FileSettingsStore, MemorySettingsStore, SettingsStore, ShieldSettings};
use shield_telemetry::{init_telemetry, TelemetryConfig};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

/// BabyShield relay and settings tool.
#[derive(Parser, Debug)]
#[command(name = "babyshield", version, about = "BabyShield relay and settings tool")]
struct Cli {
    /// Configuration file (defaults to `~/.babyshield/config.json`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Settings store file (defaults to `~/.babyshield/settings.json`).
    #[arg(long, global = true)]
    settings_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print whether monitoring is enabled.
    Status,
    /// Turn monitoring on.
    Enable,
    /// Turn monitoring off.
    Disable,
    /// Classify one page and print the relay's reply.
    Classify {
        /// URL of the page hosting the video.
        #[arg(long)]
        page_url: String,
        /// Video source address.
        #[arg(long)]
        src: Option<String>,
        /// Document title.
        #[arg(long, default_value = "")]
        title: String,
    },
    /// Answer relay messages read line by line from stdin.
    Serve {
        /// Keep the enabled flag in memory only.
        #[arg(long)]
        ephemeral: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => shield_settings::load_settings_from_path(path),
        None => shield_settings::load_settings(),
    }
    .context("Failed to load configuration")?;

    init_telemetry(&TelemetryConfig::from_settings(&settings.logging))
        .context("Failed to initialize logging")?;

    let ephemeral = matches!(cli.command, Command::Serve { ephemeral: true });
    let relay = build_relay(&settings, cli.settings_file.clone(), ephemeral)?;

    match cli.command {
        Command::Status => {
            let reply = relay.handle(json!({ "action": "getStatus" })).await;
            let enabled = reply.get("isEnabled").and_then(Value::as_bool).unwrap_or(true);
            println!("{}", if enabled { "enabled" } else { "disabled" });
        }
        Command::Enable => set_enabled(&relay, true).await?,
        Command::Disable => set_enabled(&relay, false).await?,
        Command::Classify {
            page_url,
            src,
            title,
        } => {
            let request = RelayRequest::AnalyzeVideo {
                data: VideoMetadata {
                    src,
                    url: page_url,
                    title,
                    volume: 1.0,
                    playback_rate: 1.0,
                    ..VideoMetadata::default()
                },
            };
            let reply = relay.handle(serde_json::to_value(&request)?).await;
            println!("{}", serde_json::to_string_pretty(&reply)?);
        }
        Command::Serve { .. } => {
            tracing::info!("serving relay messages on stdio");
            let stdin = BufReader::new(tokio::io::stdin());
            let handled = serve_lines(&relay, stdin, tokio::io::stdout()).await?;
            tracing::info!(handled, "stdin closed, shutting down");
        }
    }
    Ok(())
}

fn build_relay(
    settings: &ShieldSettings,
    settings_file: Option<PathBuf>,
    ephemeral: bool,
) -> Result<Relay> {
    let store: Arc<dyn SettingsStore> = if ephemeral {
        Arc::new(MemorySettingsStore::new())
    } else {
        match settings_file {
            Some(path) => Arc::new(FileSettingsStore::new(path)),
            None => Arc::new(FileSettingsStore::default_location()),
        }
    };
    let classifier =
        HttpClassifier::new(&settings.classifier).context("Failed to build HTTP client")?;
    tracing::debug!(endpoint = classifier.endpoint(), "classifier configured");
    Ok(Relay::new(
        Arc::new(classifier),
        store,
        settings.relay.broadcast_capacity,
    ))
}

async fn set_enabled(relay: &Relay, enabled: bool) -> Result<()> {
    let reply = relay
        .handle(json!({ "action": "updateSettings", "settings": { "isEnabled": enabled } }))
        .await;
    if let Some(error) = reply.get("error").and_then(Value::as_str) {
        anyhow::bail!("Failed to update settings: {error}");
    }
    println!("{}", if enabled { "enabled" } else { "disabled" });
    Ok(())
}

/// Read one JSON message per line and write one reply per line.
/// Blank lines are skipped. Returns the number of replies written.
async fn serve_lines<R, W>(relay: &Relay, reader: R, mut writer: W) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut handled = 0;
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        let reply = match serde_json::from_str::<Value>(&line) {
            Ok(message) => relay.handle(message).await,
            Err(e) => {
                tracing::debug!(error = %e, "unparseable message line");
                json!({ "error": "Invalid message" })
            }
        };
        let mut out = serde_json::to_vec(&reply)?;
        out.push(b'\n');
        writer.write_all(&out).await?;
        writer.flush().await?;
        handled += 1;
    }
    Ok(handled)
}
