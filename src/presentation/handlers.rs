// HTTP request handlers
use crate::application::board_source::FetchError;
use crate::application::order_service::{ExportError, EXPORT_FILE_NAME};
use crate::domain::filter::FilterSpec;
use crate::infrastructure::http_response::{accepts_brotli, csv_response, json_response};
use crate::presentation::app_state::AppState;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use axum_extra::extract::Query;
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;

const DASHBOARD_PAGE: &str = include_str!("../../static/dashboard.html");

/// Filter and refresh options accepted by the API routes
#[derive(Debug, Default, Deserialize)]
pub struct FilterQuery {
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    /// One status label per repeated `status` parameter
    #[serde(default)]
    pub status: Vec<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub q: Option<String>,
    #[serde(default)]
    pub refresh: bool,
}

impl FilterQuery {
    pub fn to_spec(&self) -> FilterSpec {
        let statuses = self
            .status
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        FilterSpec {
            min_value: self.min_value,
            max_value: self.max_value,
            statuses,
            date_from: self.date_from,
            date_to: self.date_to,
            search_text: self.q.clone().unwrap_or_default(),
        }
    }
}

/// Errors surfaced to the browser as JSON
#[derive(Debug)]
pub enum ApiError {
    Fetch(FetchError),
    Export(String),
}

impl From<ExportError> for ApiError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::Fetch(e) => Self::Fetch(e),
            ExportError::Csv(e) => Self::Export(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Fetch(e) => (StatusCode::BAD_GATEWAY, e.to_string()),
            ApiError::Export(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Dashboard page
pub async fn dashboard_page() -> Html<&'static str> {
    Html(DASHBOARD_PAGE)
}

/// Summary, facets, markers and filtered orders as JSON
pub async fn dashboard_data(
    Query(query): Query<FilterQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let spec = query.to_spec();
    match state.order_service.dashboard(&spec, query.refresh).await {
        Ok(view) => match json_response(&view, accepts_brotli(&headers)).await {
            Ok(response) => response,
            Err(status) => status.into_response(),
        },
        Err(e) => ApiError::Fetch(e).into_response(),
    }
}

/// Filtered orders as a CSV download
pub async fn export_orders(
    Query(query): Query<FilterQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let spec = query.to_spec();
    match state.order_service.export_csv(&spec, query.refresh).await {
        Ok(bytes) => match csv_response(bytes, EXPORT_FILE_NAME, accepts_brotli(&headers)).await {
            Ok(response) => response,
            Err(status) => status.into_response(),
        },
        Err(e) => ApiError::from(e).into_response(),
    }
}
