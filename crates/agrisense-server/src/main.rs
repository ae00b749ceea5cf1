//! AgriSense: crop, soil and farm-advisory server.

use std::path::PathBuf;
use std::sync::Arc;

use agrisense_server::{build_router, AppState};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn resolve_data_dir() -> PathBuf {
    std::env::var("AGRISENSE_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let data_dir = resolve_data_dir();
    info!("Data directory: {}", data_dir.display());

    let config = agrisense_core::AgriSenseConfig::from_env(&data_dir)?;
    let port = config.port;

    let state = Arc::new(AppState::new(config)?);
    if !state.advisor.model_available() {
        info!("Generative model disabled; every request uses the rule engine");
    }

    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("AgriSense server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
