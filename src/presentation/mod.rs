// Presentation layer - HTTP routes
pub mod app_state;
pub mod handlers;

use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{dashboard_data, dashboard_page, export_orders, health_check};
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(dashboard_page))
        .route("/healthz", get(health_check))
        .route("/api/dashboard", get(dashboard_data))
        .route("/api/orders.csv", get(export_orders))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
