//! sleeprisk: score one survey record against the exported model.
//!
//! Usage: `sleeprisk [RECORD.json]` (reads stdin when no path is given).
//! Logs go to stderr so stdout carries only the JSON report.

use std::io::Read;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sleeprisk::adapters::json_store::JsonArtifactStore;
use sleeprisk::adapters::redact::RedactingMakeWriter;
use sleeprisk::{ModelBundle, PredictionService, RawRecord, ServiceConfig};

fn main() -> Result<()> {
    // Initialize logging.
    // - stderr (default): keeps stdout clean for the report
    // - file: appends to SLEEPRISK_LOG_FILE
    let log_mode = std::env::var("SLEEPRISK_LOG_MODE").unwrap_or_else(|_| "stderr".to_string());

    let (writer, _guard) = if log_mode == "file" {
        let log_file =
            std::env::var("SLEEPRISK_LOG_FILE").unwrap_or_else(|_| "sleeprisk.log".to_string());

        if let Some(parent) = std::path::Path::new(&log_file).parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .with_context(|| format!("opening log file {log_file}"))?;
        tracing_appender::non_blocking(file)
    } else {
        tracing_appender::non_blocking(std::io::stderr())
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(RedactingMakeWriter::new(writer)),
        )
        .init();

    tracing::info!("Starting sleeprisk...");
    let config = ServiceConfig::from_env()?;

    let store = JsonArtifactStore::new(&config.model_dir).require_manifest(config.require_manifest);
    let bundle = ModelBundle::load(&store)
        .with_context(|| format!("loading model from {}", config.model_dir.display()))?;

    let input = match std::env::args_os().nth(1) {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.to_string_lossy()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).context("reading stdin")?;
            buf
        }
    };
    let record: RawRecord = serde_json::from_str(&input).context("parsing survey record")?;

    let service = PredictionService::new(Arc::new(bundle), &config);
    let report = service.predict(&record)?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
