// Order domain models
use super::location::Coordinates;
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// One column value as delivered by the board, resolved into an explicit shape
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawValue {
    Text { text: String },
    Number { number: f64 },
    Structured { json: Value, text: Option<String> },
}

impl RawValue {
    /// Resolve a monday `column_values` entry (display `text` plus JSON-encoded `value`)
    pub fn resolve(text: Option<&str>, value: Option<&str>) -> Option<Self> {
        let text = text.map(str::trim).filter(|t| !t.is_empty());
        let value = value.map(str::trim).filter(|v| !v.is_empty() && *v != "null");

        if let Some(raw) = value {
            match serde_json::from_str::<Value>(raw) {
                Ok(json @ (Value::Object(_) | Value::Array(_))) => {
                    return Some(Self::Structured {
                        json,
                        text: text.map(str::to_string),
                    });
                }
                Ok(Value::Number(n)) if text.is_none() => {
                    if let Some(number) = n.as_f64().filter(|f| f.is_finite()) {
                        return Some(Self::Number { number });
                    }
                }
                Ok(Value::String(s)) if text.is_none() && !s.trim().is_empty() => {
                    return Some(Self::Text {
                        text: s.trim().to_string(),
                    });
                }
                _ => {}
            }
        }

        text.or(value).map(|t| Self::Text {
            text: t.to_string(),
        })
    }

    /// Human readable text for display and free-text fields
    pub fn display_text(&self) -> Option<String> {
        match self {
            Self::Text { text } => Some(text.clone()),
            Self::Number { number } => Some(number.to_string()),
            Self::Structured { json, text } => text.clone().or_else(|| match json {
                Value::Object(map) => ["text", "label", "name"]
                    .iter()
                    .find_map(|key| map.get(*key).and_then(Value::as_str))
                    .map(str::to_string),
                _ => None,
            }),
        }
    }
}

/// A record fetched from the board before normalization
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub id: String,
    pub name: String,
    pub updated_at: Option<String>,
    pub columns: BTreeMap<String, RawValue>,
}

impl RawRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            updated_at: None,
            columns: BTreeMap::new(),
        }
    }

    #[cfg(test)]
    pub fn with_column(mut self, column_id: impl Into<String>, value: RawValue) -> Self {
        self.columns.insert(column_id.into(), value);
        self
    }

    #[cfg(test)]
    pub fn with_text(self, column_id: impl Into<String>, text: impl Into<String>) -> Self {
        self.with_column(column_id, RawValue::Text { text: text.into() })
    }
}

/// A board record projected onto the fields the dashboard uses
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    pub id: String,
    pub name: String,
    pub coordinates: Option<Coordinates>,
    pub address: Option<String>,
    pub value: Option<f64>,
    pub status: Option<String>,
    pub date: Option<NaiveDate>,
    pub customer: Option<String>,
    pub updated_at: Option<String>,
    pub raw: BTreeMap<String, RawValue>,
}

impl Order {
    #[cfg(test)]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            coordinates: None,
            address: None,
            value: None,
            status: None,
            date: None,
            customer: None,
            updated_at: None,
            raw: BTreeMap::new(),
        }
    }

    pub fn is_mappable(&self) -> bool {
        self.coordinates.is_some()
    }

    /// Display text of an arbitrary column kept in `raw`
    pub fn column_text(&self, column_id: &str) -> Option<String> {
        self.raw.get(column_id).and_then(RawValue::display_text)
    }
}
