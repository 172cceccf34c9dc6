//! Stdio host for the panel engine: JSON-lines commands in on stdin,
//! JSON-lines notifications out on stdout, logs on stderr.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::Parser;
use tokio::io::AsyncBufReadExt;

use prism_core::commands::PanelCommand;
use prism_core::errors::TransportError;
use prism_core::notify::{Notification, Transport};
use prism_engine::{PanelConfig, PanelController, PanelDeps};
use prism_providers::{
    AutolinkEnrichment, ManualWatcher, RecordingActions, ScriptedSubjects,
};
use prism_store::{Database, PrefsRepo};
use prism_telemetry::{init_telemetry, TelemetryConfig};

#[derive(Parser)]
#[command(name = "prism", about = "Live detail-view panel engine")]
struct Args {
    /// Preference database path (defaults to ~/.prism/panel.db).
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Trailing-edge window for coalesced state pushes, in milliseconds.
    #[arg(long, default_value_t = 500)]
    debounce_ms: u64,

    /// Delay before enrichment starts, in milliseconds.
    #[arg(long, default_value_t = 100)]
    enrich_delay_ms: u64,

    /// Navigation history capacity.
    #[arg(long, default_value_t = 10)]
    history_capacity: usize,

    /// Emit JSON log records.
    #[arg(long)]
    json_logs: bool,

    /// Base URL used to link issue references found in subject messages.
    #[arg(long, default_value = "https://issues.example.com")]
    issue_base_url: String,
}

/// Writes each notification as one JSON line on stdout.
struct StdoutTransport;

#[async_trait]
impl Transport for StdoutTransport {
    async fn notify(&self, notification: Notification) -> Result<(), TransportError> {
        let line = serde_json::to_string(&notification)
            .map_err(|e| TransportError::Send(e.to_string()))?;
        println!("{line}");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_telemetry(&TelemetryConfig {
        json_output: args.json_logs,
        ..Default::default()
    });
    tracing::info!("starting prism panel engine");

    let db_path = args
        .db_path
        .unwrap_or_else(|| home_dir().join(".prism").join("panel.db"));
    let db = Database::open(&db_path)?;
    let prefs = Arc::new(PrefsRepo::new(db));

    let deps = PanelDeps {
        subjects: Arc::new(ScriptedSubjects::new()),
        enrichment: Arc::new(AutolinkEnrichment::new(args.issue_base_url)),
        transport: Arc::new(StdoutTransport),
        watcher: Arc::new(ManualWatcher::new()),
        actions: Arc::new(RecordingActions::new()),
        prefs,
    };
    let config = PanelConfig {
        debounce_window: Duration::from_millis(args.debounce_ms),
        enrich_delay: Duration::from_millis(args.enrich_delay_ms),
        history_capacity: args.history_capacity,
        ..Default::default()
    };
    let (handle, join) = PanelController::spawn(config, deps);
    tracing::info!("panel engine ready");

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<PanelCommand>(line) {
                        Ok(command) => {
                            if handle.send(command).await.is_err() {
                                tracing::error!("controller stopped, shutting down");
                                break;
                            }
                        }
                        Err(e) => tracing::warn!(error = %e, "ignoring malformed command"),
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "stdin read failed");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    drop(handle);
    let _ = join.await;
    tracing::info!("shut down");
    Ok(())
}

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}
