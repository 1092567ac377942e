use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

use crate::server::app_router;
use crate::services::{load_config, Services};

pub async fn run_serve(
    config_path: Option<&Path>,
    bind: Option<String>,
    in_memory_index: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let services = Services::from_config(&config, in_memory_index)?;

    let status = services
        .ingest
        .ensure_index()
        .await
        .context("Failed to prepare the vector index")?;
    log::info!("Index '{}' ready ({:?})", config.index_name, status);

    let bind = bind.unwrap_or_else(|| config.bind.clone());
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    log::info!("Listening on {}", bind);

    axum::serve(listener, app_router(Arc::new(services)))
        .await
        .context("HTTP server stopped")?;
    Ok(())
}
