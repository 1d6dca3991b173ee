// Record normalizer - maps raw board records onto typed orders
use super::location::{self, Location};
use super::order::{Order, RawRecord, RawValue};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y", "%b %d, %Y", "%B %d, %Y", "%d %b %Y",
    "%d %B %Y",
];

const DATE_TIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// A column as declared on the board
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BoardColumn {
    pub id: String,
    pub title: String,
}

/// An extra column to show: the id to read plus the label to show it under
#[derive(Debug, Clone, PartialEq)]
pub struct ExtraColumn {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("column id `{column}` is assigned to both `{first}` and `{second}`")]
pub struct DuplicateColumn {
    pub column: String,
    pub first: &'static str,
    pub second: &'static str,
}

/// Which board column feeds each recognized order field.
///
/// Each entry is a column id or a column title. An empty entry leaves the field unmapped.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ColumnMap {
    pub location: String,
    pub order_value: String,
    pub status: String,
    pub date: String,
    pub customer: String,
    /// Additional columns shown in popups and exports
    pub extras: Vec<String>,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            location: "location".to_string(),
            order_value: "order_value".to_string(),
            status: "status".to_string(),
            date: "date".to_string(),
            customer: "customer".to_string(),
            extras: Vec::new(),
        }
    }
}

impl ColumnMap {
    /// Recognized fields paired with their configured column id
    pub fn fields(&self) -> [(&'static str, &str); 5] {
        [
            ("location", self.location.as_str()),
            ("order_value", self.order_value.as_str()),
            ("status", self.status.as_str()),
            ("date", self.date.as_str()),
            ("customer", self.customer.as_str()),
        ]
    }

    /// Extra column ids with blanks and duplicates removed
    pub fn extra_columns(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.extras
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty() && seen.insert(*c))
            .collect()
    }

    /// Fail when one column id feeds two recognized fields. Blank entries never collide.
    pub fn check_duplicates(&self) -> Result<(), DuplicateColumn> {
        let mut assigned: HashMap<&str, &'static str> = HashMap::new();
        for (field, column) in self.fields() {
            let column = column.trim();
            if column.is_empty() {
                continue;
            }
            if let Some(first) = assigned.insert(column, field) {
                return Err(DuplicateColumn {
                    column: column.to_string(),
                    first,
                    second: field,
                });
            }
        }
        Ok(())
    }

    /// Replace entries that name a board column by title with that column's id.
    ///
    /// An entry equal to an existing id is kept as is. Titles match ignoring case and
    /// surrounding spaces; entries matching neither are kept and simply find nothing.
    pub fn resolve_titles(&self, board_columns: &[BoardColumn]) -> ColumnMap {
        if board_columns.is_empty() {
            return self.clone();
        }

        let resolve = |entry: &String| -> String {
            let wanted = entry.trim();
            if wanted.is_empty() || board_columns.iter().any(|c| c.id == wanted) {
                return entry.clone();
            }
            let wanted_title = wanted.to_lowercase();
            match board_columns
                .iter()
                .find(|c| c.title.trim().to_lowercase() == wanted_title)
            {
                Some(column) => {
                    tracing::debug!("Column title `{}` resolved to id `{}`", wanted, column.id);
                    column.id.clone()
                }
                None => entry.clone(),
            }
        };

        ColumnMap {
            location: resolve(&self.location),
            order_value: resolve(&self.order_value),
            status: resolve(&self.status),
            date: resolve(&self.date),
            customer: resolve(&self.customer),
            extras: self.extras.iter().map(&resolve).collect(),
        }
    }

    /// Extra columns labelled with their board title when the board declares one
    pub fn extra_fields(&self, board_columns: &[BoardColumn]) -> Vec<ExtraColumn> {
        self.extra_columns()
            .into_iter()
            .map(|id| ExtraColumn {
                id: id.to_string(),
                label: board_columns
                    .iter()
                    .find(|c| c.id == id && !c.title.trim().is_empty())
                    .map_or_else(|| id.to_string(), |c| c.title.trim().to_string()),
            })
            .collect()
    }

    fn lookup<'a>(&self, record: &'a RawRecord, column_id: &str) -> Option<&'a RawValue> {
        let column_id = column_id.trim();
        if column_id.is_empty() {
            return None;
        }
        record.columns.get(column_id)
    }
}

/// Project a raw record onto an order. Never fails: each field degrades to absent.
pub fn normalize(record: &RawRecord, columns: &ColumnMap) -> Order {
    let location = columns
        .lookup(record, &columns.location)
        .and_then(location_of);

    let (coordinates, address) = match location {
        Some(Location {
            coordinates,
            address,
        }) => (Some(coordinates), address),
        None => (None, None),
    };

    let value = columns
        .lookup(record, &columns.order_value)
        .and_then(amount_of);
    let date = columns.lookup(record, &columns.date).and_then(date_of);
    let status = columns.lookup(record, &columns.status).and_then(label_of);
    let customer = columns.lookup(record, &columns.customer).and_then(label_of);

    if coordinates.is_none() && columns.lookup(record, &columns.location).is_some() {
        tracing::debug!("Order {} has an unparseable location", record.id);
    }

    Order {
        id: record.id.clone(),
        name: record.name.clone(),
        coordinates,
        address,
        value,
        status,
        date,
        customer,
        updated_at: record.updated_at.clone(),
        raw: record.columns.clone(),
    }
}

/// Normalize a whole fetch, keeping the first record for any repeated id
pub fn normalize_all(records: &[RawRecord], columns: &ColumnMap) -> Vec<Order> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter(|record| {
            let first = seen.insert(record.id.as_str());
            if !first {
                tracing::warn!("Dropping duplicate record id {}", record.id);
            }
            first
        })
        .map(|record| normalize(record, columns))
        .collect()
}

fn location_of(value: &RawValue) -> Option<Location> {
    match value {
        RawValue::Structured { json, text } => location::parse_structured(json)
            .or_else(|| text.as_deref().and_then(location::parse_location)),
        RawValue::Text { text } => location::parse_location(text),
        RawValue::Number { .. } => None,
    }
}

fn amount_of(value: &RawValue) -> Option<f64> {
    match value {
        RawValue::Number { number } => Some(*number).filter(|n| n.is_finite()),
        other => other.display_text().as_deref().and_then(parse_amount),
    }
}

fn date_of(value: &RawValue) -> Option<NaiveDate> {
    if let RawValue::Structured {
        json: Value::Object(map),
        ..
    } = value
    {
        if let Some(date) = map.get("date").and_then(Value::as_str).and_then(parse_date) {
            return Some(date);
        }
    }
    value.display_text().as_deref().and_then(parse_date)
}

fn label_of(value: &RawValue) -> Option<String> {
    value
        .display_text()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Parse a currency amount such as `$1,250.50`, `1 250 EUR` or `1.250,50 €`
pub fn parse_amount(text: &str) -> Option<f64> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let cleaned = match decimal_comma(&compact) {
        Some(comma) => format!(
            "{}.{}",
            compact[..comma].replace(['.', ','], ""),
            &compact[comma + 1..]
        ),
        None => compact.replace(',', ""),
    };
    let numeric = cleaned.trim_matches(|c: char| !(c.is_ascii_digit() || c == '-' || c == '.'));
    if numeric.is_empty() {
        return None;
    }
    numeric.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Byte offset of a comma used as the decimal separator, if there is one.
///
/// The last comma counts as decimal when exactly two digits follow it, or when
/// dots group the thousands before it (`1.250,5`).
fn decimal_comma(text: &str) -> Option<usize> {
    let comma = text.rfind(',')?;
    let dot = text.rfind('.');
    if dot.is_some_and(|dot| dot > comma) {
        return None;
    }
    let digits = text[comma + 1..].chars().take_while(char::is_ascii_digit).count();
    (digits == 2 || (dot.is_some() && digits > 0)).then_some(comma)
}

/// Parse a calendar date in any of the formats boards commonly produce
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .or_else(|| DateTime::parse_from_rfc3339(text).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            DATE_TIME_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
                .map(|dt| dt.date())
        })
}
