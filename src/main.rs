//! Term Deposit Prediction Service - Main Entry Point
//!
//! Loads the model artifact once and serves predictions over HTTP.
//! A missing or broken artifact does not stop the process; the service
//! starts in degraded mode and reports it on `GET /`.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use term_deposit_api::{
    config::{AppConfig, DEFAULT_CONFIG_PATH},
    metrics::{MetricsReporter, ServiceMetrics},
    models::{InferenceService, ModelLoader},
    server::{run_server, AppState},
};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "term-deposit-api", version, about = "Term deposit subscription prediction API")]
struct Cli {
    /// Configuration file (TOML); missing file falls back to defaults
    #[arg(long, env = "TDA_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Bind address
    #[arg(long)]
    host: Option<String>,

    /// Bind port
    #[arg(long)]
    port: Option<u16>,

    /// Model artifact path
    #[arg(long)]
    model: Option<PathBuf>,
}

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().or_else(|_| {
        tracing_subscriber::EnvFilter::try_new(format!(
            "term_deposit_api={},tower_http=info",
            config.logging.level
        ))
    })?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = AppConfig::load_from_path(&cli.config)?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(model) = cli.model {
        config.model.artifact_path = Some(model);
    }

    init_logging(&config)?;
    info!(config = %cli.config.display(), "Starting term deposit prediction service");
    info!(
        threshold = config.prediction.threshold,
        api_version = %config.server.api_version,
        "Configuration loaded"
    );

    // Load the model once; failure leaves the service degraded
    let artifact_path = config.artifact_path();
    let loader = ModelLoader::with_threads(config.model.onnx_threads);
    let service = Arc::new(InferenceService::load_with(&loader, &artifact_path));

    let metrics = Arc::new(ServiceMetrics::new(config.prediction.threshold));
    let reporter = MetricsReporter::new(metrics.clone(), config.metrics.report_interval_secs);
    tokio::spawn(reporter.start());

    let state = Arc::new(AppState::new(service, metrics.clone(), &config));
    run_server(state, &config.server.host, config.server.port).await?;

    metrics.log_summary();
    Ok(())
}
