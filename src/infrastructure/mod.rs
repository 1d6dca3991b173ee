// Infrastructure layer - External dependencies and adapters
pub mod cache;
pub mod config;
pub mod csv_export;
pub mod http_response;
pub mod monday_client;
pub mod popup_renderer;
