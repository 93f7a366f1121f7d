use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use pactum::api::{api_router, AppState};
use pactum::config::{default_log_filter, AppConfig, APP_NAME, APP_VERSION};
use pactum::db::sqlite::open_database;
use pactum::pipeline::{FsBlobStore, HttpProvider, InferenceProvider};
use pactum::registry::ExportClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_log_filter())),
        )
        .init();

    let config = AppConfig::from_env();
    info!(
        version = APP_VERSION,
        db_path = %config.db_path.display(),
        "Starting {}",
        APP_NAME
    );

    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    // Open once at startup so migrations run before the first request.
    let conn = open_database(&config.db_path)?;
    drop(conn);

    let blob = FsBlobStore::new(&config.blob_root);
    let provider: Arc<dyn InferenceProvider> = Arc::new(HttpProvider::new(&config));
    let export = ExportClient::new(&config);

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(config, blob, provider, export);
    let app = api_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "API listening");
    axum::serve(listener, app).await?;

    Ok(())
}
