// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use crate::application::order_service::OrderService;
use crate::infrastructure::cache::CachedBoardSource;
use crate::infrastructure::config::load_app_config;
use crate::infrastructure::monday_client::{token_fingerprint, MondayClient};
use crate::infrastructure::popup_renderer::PopupRenderer;
use crate::presentation::app_state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("orders_map=info,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Load configuration; a bad config stops here
    let config = load_app_config().context("invalid configuration")?;
    tracing::info!(
        "Board {} (token {}), location column `{}`",
        config.monday.board_id,
        token_fingerprint(&config.monday.token),
        config.columns.location
    );

    // Create board source (infrastructure layer)
    let client = MondayClient::new(
        config.monday.api_url.clone(),
        config.monday.token.clone(),
        config.monday.api_version.clone(),
        config.monday.page_size,
        Duration::from_secs(config.monday.timeout_secs),
    )?;
    let source = CachedBoardSource::new(Arc::new(client), Duration::from_secs(config.cache.ttl_secs));

    let popups = PopupRenderer::new(
        config.monday.board_id.clone(),
        config.monday.subdomain.clone(),
        config.map.currency_symbol.clone(),
    )?;

    // Create services (application layer)
    let order_service = OrderService::new(
        source,
        config.monday.board_id.clone(),
        config.columns.clone(),
        popups,
        config.map.clone(),
    );

    // Create application state
    let state = Arc::new(AppState { order_service });

    // Build router (presentation layer)
    let router = presentation::router(state);

    // Start server
    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("invalid bind address {}", config.server.bind))?;
    tracing::info!("Starting orders-map dashboard on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
