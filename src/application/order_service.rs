// Order service - Use case for building the dashboard view and exports
use crate::application::board_source::FetchError;
use crate::domain::filter::{apply_filters, FilterSpec};
use crate::domain::location::Coordinates;
use crate::domain::marker::Marker;
use crate::domain::normalizer::{normalize_all, BoardColumn, ColumnMap, ExtraColumn};
use crate::domain::order::Order;
use crate::domain::summary::{map_center, Facets, Summary};
use crate::infrastructure::cache::CachedBoardSource;
use crate::infrastructure::config::MapSettings;
use crate::infrastructure::csv_export::orders_to_csv;
use crate::infrastructure::popup_renderer::PopupRenderer;
use serde::Serialize;
use std::sync::Arc;

pub const EXPORT_FILE_NAME: &str = "orders_filtered.csv";

/// Everything the dashboard page needs for one interaction.
///
/// `summary` and `facets` describe the whole board; `matching_orders`, `markers`,
/// `orders` and the map centre follow the filters.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub summary: Summary,
    pub facets: Facets,
    pub matching_orders: usize,
    pub markers: Vec<Marker>,
    pub orders: Vec<Order>,
    pub map: MapView,
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MapView {
    pub center: Option<Coordinates>,
    #[serde(flatten)]
    pub settings: MapSettings,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("failed to write CSV: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Clone)]
pub struct OrderService {
    source: CachedBoardSource,
    board_id: String,
    columns: ColumnMap,
    popups: Arc<PopupRenderer>,
    map_settings: MapSettings,
}

impl OrderService {
    pub fn new(
        source: CachedBoardSource,
        board_id: String,
        columns: ColumnMap,
        popups: PopupRenderer,
        map_settings: MapSettings,
    ) -> Self {
        Self {
            source,
            board_id,
            columns,
            popups: Arc::new(popups),
            map_settings,
        }
    }

    async fn load_orders(&self, force_refresh: bool) -> Result<LoadedOrders, FetchError> {
        let loaded = self.source.load(&self.board_id, force_refresh).await?;
        let board_columns = &loaded.snapshot.columns;
        let (columns, mapping_warning) = self.resolve_columns(board_columns);
        let orders = normalize_all(&loaded.snapshot.records, &columns);

        let warnings: Vec<String> = loaded.warning.into_iter().chain(mapping_warning).collect();
        Ok(LoadedOrders {
            orders,
            extras: columns.extra_fields(board_columns),
            fetched_at: loaded.snapshot.fetched_at,
            warning: (!warnings.is_empty()).then(|| warnings.join(" ")),
        })
    }

    /// Configured columns with titles turned into ids. A resolution that would feed two
    /// fields from one column is dropped in favour of the configured ids.
    fn resolve_columns(&self, board_columns: &[BoardColumn]) -> (ColumnMap, Option<String>) {
        let resolved = self.columns.resolve_titles(board_columns);
        match resolved.check_duplicates() {
            Ok(()) => (resolved, None),
            Err(err) => {
                tracing::warn!("Ignoring column titles for board {}: {}", self.board_id, err);
                (
                    self.columns.clone(),
                    Some(format!("Column titles could not be used: {}.", err)),
                )
            }
        }
    }

    pub async fn dashboard(&self, spec: &FilterSpec, force_refresh: bool) -> Result<DashboardView, FetchError> {
        let loaded = self.load_orders(force_refresh).await?;

        let summary = Summary::from_orders(&loaded.orders, loaded.fetched_at);
        let facets = Facets::from_orders(&loaded.orders);
        let filtered = apply_filters(&loaded.orders, spec);

        let markers: Vec<Marker> = filtered
            .iter()
            .filter_map(|order| self.popups.marker_for(order, &loaded.extras))
            .collect();
        let center = map_center(markers.iter().filter_map(|m| Coordinates::new(m.lat, m.lng)));

        tracing::debug!(
            "Dashboard view: {} of {} orders match, {} markers",
            filtered.len(),
            loaded.orders.len(),
            markers.len()
        );

        Ok(DashboardView {
            summary,
            facets,
            matching_orders: filtered.len(),
            markers,
            orders: filtered.into_iter().cloned().collect(),
            map: MapView {
                center,
                settings: self.map_settings.clone(),
            },
            warning: loaded.warning,
        })
    }

    /// CSV bytes for the filtered set, mapped or not
    pub async fn export_csv(&self, spec: &FilterSpec, force_refresh: bool) -> Result<Vec<u8>, ExportError> {
        let loaded = self.load_orders(force_refresh).await?;
        let filtered = apply_filters(&loaded.orders, spec);
        Ok(orders_to_csv(&filtered, &loaded.extras)?)
    }
}

struct LoadedOrders {
    orders: Vec<Order>,
    extras: Vec<ExtraColumn>,
    fetched_at: chrono::DateTime<chrono::Utc>,
    warning: Option<String>,
}
