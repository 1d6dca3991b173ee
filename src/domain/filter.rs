// Filter engine - narrows the fetched orders to what the user asked for
use super::order::Order;
use chrono::NaiveDate;

/// User-selected filters. Every unset option matches all orders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub statuses: Vec<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub search_text: String,
}

impl FilterSpec {
    fn value_constrained(&self) -> bool {
        self.min_value.is_some() || self.max_value.is_some()
    }

    fn date_constrained(&self) -> bool {
        self.date_from.is_some() || self.date_to.is_some()
    }

    /// Missing value, status or date fails any active constraint on that field
    pub fn matches(&self, order: &Order) -> bool {
        self.matches_value(order)
            && self.matches_status(order)
            && self.matches_date(order)
            && self.matches_search(order)
    }

    fn matches_value(&self, order: &Order) -> bool {
        if !self.value_constrained() {
            return true;
        }
        let Some(value) = order.value else {
            return false;
        };
        self.min_value.is_none_or(|min| value >= min) && self.max_value.is_none_or(|max| value <= max)
    }

    fn matches_status(&self, order: &Order) -> bool {
        if self.statuses.is_empty() {
            return true;
        }
        let Some(status) = order.status.as_deref() else {
            return false;
        };
        let status = status.trim().to_lowercase();
        self.statuses
            .iter()
            .any(|wanted| wanted.trim().to_lowercase() == status)
    }

    fn matches_date(&self, order: &Order) -> bool {
        if !self.date_constrained() {
            return true;
        }
        let Some(date) = order.date else {
            return false;
        };
        self.date_from.is_none_or(|from| date >= from) && self.date_to.is_none_or(|to| date <= to)
    }

    fn matches_search(&self, order: &Order) -> bool {
        let needle = self.search_text.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        let haystack = [
            Some(order.name.as_str()),
            order.address.as_deref(),
            order.customer.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join("\n")
        .to_lowercase();

        haystack.contains(&needle)
    }
}

/// Orders passing every active filter, in their original order
pub fn apply_filters<'a, I>(orders: I, spec: &FilterSpec) -> Vec<&'a Order>
where
    I: IntoIterator<Item = &'a Order>,
{
    orders.into_iter().filter(|order| spec.matches(order)).collect()
}
