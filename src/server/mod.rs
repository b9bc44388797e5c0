//! HTTP server for term-deposit predictions.
//!
//! Two routes: `GET /` reports status and whether the model loaded,
//! `POST /predict` validates a customer record and returns class
//! probabilities.

mod api;
mod error;
mod handlers;
mod state;

pub use api::create_router;
pub use error::{ApiError, MODEL_UNAVAILABLE_DETAIL};
pub use state::AppState;

use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

/// Bind to `host:port` and serve until Ctrl+C.
pub async fn run_server(state: Arc<AppState>, host: &str, port: u16) -> anyhow::Result<()> {
    let start_time = chrono::Utc::now();

    let app = create_router(state.clone());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!(
        address = %addr,
        model_loaded = state.service.is_loaded(),
        api_version = %state.api_version,
        started_at = %start_time.to_rfc3339(),
        "Prediction server starting"
    );
    if !state.service.is_loaded() {
        warn!("No model loaded: /predict will answer 500 until restart");
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, pid = std::process::id(), "Server listening");

    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        let uptime = chrono::Utc::now().signed_duration_since(start_time);
        info!(uptime_secs = uptime.num_seconds(), "Shutdown signal received");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}
