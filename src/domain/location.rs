// Location domain model and parser for monday location columns
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::sync::LazyLock;

static NUMBER_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d+(?:\.\d+)?").expect("valid number pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    /// Build a coordinate pair, rejecting non-finite or out of range components
    pub fn new(lat: f64, lng: f64) -> Option<Self> {
        let valid = lat.is_finite()
            && lng.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lng);
        valid.then_some(Self { lat, lng })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub coordinates: Coordinates,
    pub address: Option<String>,
}

/// Parse a location field that may be monday JSON or free text.
///
/// Returns `None` when no valid pair is found; that is never an error.
pub fn parse_location(raw: &str) -> Option<Location> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    serde_json::from_str::<Value>(raw)
        .ok()
        .and_then(|json| parse_structured(&json))
        .or_else(|| parse_text(raw))
}

/// Extract a location from an already decoded JSON object
pub fn parse_structured(json: &Value) -> Option<Location> {
    let object = json.as_object()?;
    let lat = ["lat", "latitude"]
        .iter()
        .find_map(|key| object.get(*key))
        .and_then(as_float)?;
    let lng = ["lng", "longitude", "lon"]
        .iter()
        .find_map(|key| object.get(*key))
        .and_then(as_float)?;

    let coordinates = Coordinates::new(lat, lng)?;
    let address = object
        .get("address")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string);

    Some(Location {
        coordinates,
        address,
    })
}

/// Scan free text for a "lat, lng" pair
pub fn parse_text(text: &str) -> Option<Location> {
    let tokens: Vec<_> = NUMBER_TOKEN.find_iter(text).collect();

    // Adjacent decimal pairs anywhere in the text
    let decimal_pair = tokens.windows(2).find_map(|pair| {
        let (first, second) = (pair[0], pair[1]);
        if !first.as_str().contains('.') || !second.as_str().contains('.') {
            return None;
        }
        if !is_separator(&text[first.end()..second.start()]) {
            return None;
        }
        coordinates_from(first.as_str(), second.as_str())
    });

    // A bare "43, -79" style value made of two integers
    let bare_pair = || {
        if tokens.len() != 2 || !text[..tokens[0].start()].trim().is_empty() {
            return None;
        }
        if !text[tokens[1].end()..].trim().is_empty() {
            return None;
        }
        if !is_separator(&text[tokens[0].end()..tokens[1].start()]) {
            return None;
        }
        coordinates_from(tokens[0].as_str(), tokens[1].as_str())
    };

    decimal_pair.or_else(bare_pair).map(|coordinates| Location {
        coordinates,
        address: None,
    })
}

fn coordinates_from(lat: &str, lng: &str) -> Option<Coordinates> {
    let lat = lat.parse::<f64>().ok()?;
    let lng = lng.parse::<f64>().ok()?;
    Coordinates::new(lat, lng)
}

/// Gap between two numbers must be a comma and/or whitespace
fn is_separator(gap: &str) -> bool {
    if gap.is_empty() {
        return false;
    }
    let trimmed = gap.trim();
    trimmed.is_empty() || trimmed == ","
}

fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}
