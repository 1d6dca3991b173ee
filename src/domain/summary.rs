// KPI figures and filter facets for the dashboard
use super::location::Coordinates;
use super::order::Order;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_orders: usize,
    pub mapped_orders: usize,
    pub total_value: Option<f64>,
    pub average_value: Option<f64>,
    pub last_refreshed: DateTime<Utc>,
}

impl Summary {
    pub fn from_orders<'a, I>(orders: I, last_refreshed: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = &'a Order>,
    {
        let mut total_orders = 0;
        let mut mapped_orders = 0;
        let mut values = Vec::new();

        for order in orders {
            total_orders += 1;
            if order.is_mappable() {
                mapped_orders += 1;
            }
            if let Some(value) = order.value {
                values.push(value);
            }
        }

        let total_value = (!values.is_empty()).then(|| values.iter().sum::<f64>());
        let average_value = total_value.map(|total| total / values.len() as f64);

        Self {
            total_orders,
            mapped_orders,
            total_value,
            average_value,
            last_refreshed,
        }
    }
}

/// Options a UI needs to build its filter controls, taken from the unfiltered set
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Facets {
    pub statuses: Vec<String>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub min_date: Option<NaiveDate>,
    pub max_date: Option<NaiveDate>,
}

impl Facets {
    pub fn from_orders(orders: &[Order]) -> Self {
        // Status filtering ignores case, so labels differing only in case are one option
        let mut seen = HashSet::new();
        let mut statuses: Vec<String> = orders
            .iter()
            .filter_map(|o| o.status.clone())
            .filter(|status| seen.insert(status.to_lowercase()))
            .collect();
        statuses.sort_by_cached_key(|status| status.to_lowercase());

        let values = orders.iter().filter_map(|o| o.value);
        let min_value = values.clone().reduce(f64::min);
        let max_value = values.reduce(f64::max);

        let dates = orders.iter().filter_map(|o| o.date);

        Self {
            statuses,
            min_value,
            max_value,
            min_date: dates.clone().min(),
            max_date: dates.max(),
        }
    }
}

/// Mean position of the given coordinates, used to centre the map
pub fn map_center<I>(points: I) -> Option<Coordinates>
where
    I: IntoIterator<Item = Coordinates>,
{
    let (count, lat_sum, lng_sum) = points
        .into_iter()
        .fold((0usize, 0.0, 0.0), |(n, lat, lng), p| (n + 1, lat + p.lat, lng + p.lng));
    if count == 0 {
        return None;
    }
    Coordinates::new(lat_sum / count as f64, lng_sum / count as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(id: &str, value: Option<f64>, status: Option<&str>, lat_lng: Option<(f64, f64)>) -> Order {
        let mut order = Order::new(id, id);
        order.value = value;
        order.status = status.map(str::to_string);
        order.coordinates = lat_lng.and_then(|(lat, lng)| Coordinates::new(lat, lng));
        order
    }

    #[test]
    fn test_summary_figures() {
        let orders = vec![
            order("1", Some(100.0), None, Some((10.0, 20.0))),
            order("2", Some(300.0), None, None),
            order("3", None, None, Some((30.0, 40.0))),
        ];
        let now = Utc::now();
        let summary = Summary::from_orders(&orders, now);

        assert_eq!(summary.total_orders, 3);
        assert_eq!(summary.mapped_orders, 2);
        assert_eq!(summary.total_value, Some(400.0));
        assert_eq!(summary.average_value, Some(200.0));
        assert_eq!(summary.last_refreshed, now);
    }

    #[test]
    fn test_summary_without_values() {
        let orders = vec![order("1", None, None, None)];
        let summary = Summary::from_orders(&orders, Utc::now());
        assert_eq!(summary.total_value, None);
        assert_eq!(summary.average_value, None);
    }

    #[test]
    fn test_facets() {
        let mut orders = vec![
            order("1", Some(120.0), Some("Shipped"), None),
            order("2", Some(80.0), Some("Pending"), None),
            order("3", None, Some("Shipped"), None),
        ];
        orders[0].date = NaiveDate::from_ymd_opt(2024, 5, 1);
        orders[2].date = NaiveDate::from_ymd_opt(2023, 12, 24);

        let facets = Facets::from_orders(&orders);
        assert_eq!(facets.statuses, vec!["Pending", "Shipped"]);
        assert_eq!(facets.min_value, Some(80.0));
        assert_eq!(facets.max_value, Some(120.0));
        assert_eq!(facets.min_date, NaiveDate::from_ymd_opt(2023, 12, 24));
        assert_eq!(facets.max_date, NaiveDate::from_ymd_opt(2024, 5, 1));
    }

    #[test]
    fn test_facet_statuses_ignore_case() {
        let orders = vec![
            order("1", None, Some("shipped"), None),
            order("2", None, Some("Pending"), None),
            order("3", None, Some("Shipped"), None),
            order("4", None, Some("SHIPPED"), None),
        ];
        let facets = Facets::from_orders(&orders);
        assert_eq!(facets.statuses, vec!["Pending", "shipped"]);
    }

    #[test]
    fn test_map_center() {
        let points = [
            Coordinates::new(10.0, 20.0).unwrap(),
            Coordinates::new(30.0, 40.0).unwrap(),
        ];
        assert_eq!(map_center(points), Coordinates::new(20.0, 30.0));
        assert_eq!(map_center(Vec::new()), None);
    }
}
