// rest_api/src/main.rs

use anyhow::Result;
use tokio::sync::oneshot;
use tracing::error;
use tracing_subscriber::EnvFilter;

use rest_api::{start_server, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config_path =
        std::env::var("CLINIC_CONFIG").unwrap_or_else(|_| "config/server.yaml".to_string());
    let config = ServerConfig::load(&config_path)?;

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            return;
        }
        let _ = shutdown_tx.send(());
    });

    start_server(config, shutdown_rx).await
}
