// Map marker handed to the browser
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub id: String,
    pub lat: f64,
    pub lng: f64,
    pub popup_html: String,
    pub tooltip: String,
}
