use std::sync::Arc;

use common_auth::ProcessEnv;
use content_service::config::load_service_config;
use content_service::{build_router, AppState};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_service_config()?;
    let state = AppState::from_config(Arc::new(ProcessEnv), &config)?;
    let app = build_router(state);

    info!(addr = %config.addr, "starting content-service");
    let listener = TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
