//! Configuration management for the prediction service

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file, optional
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Prefix for environment overrides, e.g. `TDA__SERVER__PORT=9000`
pub const ENV_PREFIX: &str = "TDA";

/// Artifact location relative to the running executable's directory
const DEFAULT_ARTIFACT: &str = "../models/rf_pipeline.json";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub prediction: PredictionConfig,
    pub metrics: MetricsConfig,
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Version reported by `GET /`
    pub api_version: String,
}

/// Model artifact configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Artifact file; defaults to `models/rf_pipeline.json` next to the
    /// executable's parent directory
    #[serde(default)]
    pub artifact_path: Option<PathBuf>,
    /// Threads for the ONNX estimator backend
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
}

fn default_onnx_threads() -> usize {
    1
}

/// Values echoed back in every successful prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionConfig {
    /// Decision threshold chosen during model evaluation. Reported only.
    pub threshold: f64,
    pub description: String,
}

/// Metrics reporting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Seconds between summary log lines; 0 disables the reporter
    pub report_interval_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl AppConfig {
    /// Load configuration from the default file (if present) and environment
    pub fn load() -> Result<Self> {
        Self::load_from_path(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration layered as defaults, file at `path` (optional),
    /// then `TDA__*` environment variables
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let defaults =
            Config::try_from(&AppConfig::default()).context("Failed to encode default configuration")?;

        let config = Config::builder()
            .add_source(defaults)
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Resolve the artifact path: configured value, otherwise relative to
    /// the running executable.
    pub fn artifact_path(&self) -> PathBuf {
        if let Some(path) = &self.model.artifact_path {
            return path.clone();
        }
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(DEFAULT_ARTIFACT)))
            .unwrap_or_else(|| PathBuf::from("models/rf_pipeline.json"))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
                api_version: "1.0.0".to_string(),
            },
            model: ModelConfig {
                artifact_path: None,
                onnx_threads: 1,
            },
            prediction: PredictionConfig {
                threshold: 0.6239, // best F1 threshold from model evaluation
                description:
                    "Probability of subscribing ('yes') or not subscribing ('no') to the term deposit."
                        .to_string(),
            },
            metrics: MetricsConfig {
                report_interval_secs: 60,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}
