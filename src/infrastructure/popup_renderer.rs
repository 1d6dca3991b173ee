// Marker popup rendering through an autoescaping template
use crate::domain::marker::Marker;
use crate::domain::normalizer::ExtraColumn;
use crate::domain::order::Order;
use serde::Serialize;
use tera::{Context, Tera};

const POPUP_TEMPLATE_NAME: &str = "popup.html";

const POPUP_TEMPLATE: &str = r#"<b>{{ name }}</b>
{%- if customer %}<br>Customer: {{ customer }}{% endif %}
{%- if value %}<br>Order Value: {{ value }}{% endif %}
{%- if status %}<br>Status: {{ status }}{% endif %}
{%- if date %}<br>Date: {{ date }}{% endif %}
{%- if address %}<br>Address: {{ address }}{% endif %}
{%- for extra in extras %}<br>{{ extra.label }}: {{ extra.value }}{% endfor %}
{%- if link %}<br><a target="_blank" rel="noopener" href="{{ link }}">Open in monday</a>{% endif %}"#;

#[derive(Debug, Serialize)]
struct ExtraField {
    label: String,
    value: String,
}

/// Builds escaped popup text and links for map markers
#[derive(Debug, Clone)]
pub struct PopupRenderer {
    tera: Tera,
    board_id: String,
    subdomain: Option<String>,
    currency_symbol: String,
}

impl PopupRenderer {
    pub fn new(
        board_id: String,
        subdomain: Option<String>,
        currency_symbol: String,
    ) -> Result<Self, tera::Error> {
        let mut tera = Tera::default();
        // `.html` names are autoescaped
        tera.add_raw_template(POPUP_TEMPLATE_NAME, POPUP_TEMPLATE)?;
        Ok(Self {
            tera,
            board_id,
            subdomain: subdomain.filter(|s| !s.trim().is_empty()),
            currency_symbol,
        })
    }

    /// Link back to the item on the board
    pub fn item_link(&self, item_id: &str) -> String {
        match &self.subdomain {
            Some(sub) => format!(
                "https://{}.monday.com/boards/{}/pulses/{}",
                sub.trim(),
                self.board_id,
                item_id
            ),
            None => format!(
                "https://view.monday.com/boards/{}/pulses/{}",
                self.board_id, item_id
            ),
        }
    }

    pub fn format_value(&self, value: Option<f64>) -> String {
        match value {
            Some(v) => format_amount(v, &self.currency_symbol),
            None => "—".to_string(),
        }
    }

    pub fn render_popup(&self, order: &Order, extra_columns: &[ExtraColumn]) -> Result<String, tera::Error> {
        let extras: Vec<ExtraField> = extra_columns
            .iter()
            .filter_map(|column| {
                order.column_text(&column.id).map(|value| ExtraField {
                    label: column.label.clone(),
                    value,
                })
            })
            .collect();

        let mut context = Context::new();
        context.insert("name", &order.name);
        context.insert("customer", &order.customer);
        context.insert("value", &order.value.map(|v| format_amount(v, &self.currency_symbol)));
        context.insert("status", &order.status);
        context.insert("date", &order.date.map(|d| d.format("%Y-%m-%d").to_string()));
        context.insert("address", &order.address);
        context.insert("extras", &extras);
        context.insert("link", &self.item_link(&order.id));

        self.tera.render(POPUP_TEMPLATE_NAME, &context)
    }

    /// Marker for an order, or `None` when it has no coordinates
    pub fn marker_for(&self, order: &Order, extra_columns: &[ExtraColumn]) -> Option<Marker> {
        let coordinates = order.coordinates?;
        let popup_html = match self.render_popup(order, extra_columns) {
            Ok(html) => html,
            Err(e) => {
                tracing::error!("Popup rendering failed for order {}: {}", order.id, e);
                return None;
            }
        };

        Some(Marker {
            id: order.id.clone(),
            lat: coordinates.lat,
            lng: coordinates.lng,
            popup_html,
            tooltip: format!("{} • {}", order.name, self.format_value(order.value)),
        })
    }
}

/// Format an amount with thousands separators and no decimals, e.g. `$12,345`
pub fn format_amount(value: f64, symbol: &str) -> String {
    let rounded = value.round();
    let sign = if rounded < 0.0 { "-" } else { "" };
    let digits = format!("{:.0}", rounded.abs());

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{}{}{}", sign, symbol, grouped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::location::Coordinates;
    use crate::domain::order::RawValue;
    use chrono::NaiveDate;

    fn renderer(subdomain: Option<&str>) -> PopupRenderer {
        PopupRenderer::new("42".to_string(), subdomain.map(str::to_string), "$".to_string()).unwrap()
    }

    fn extras() -> Vec<ExtraColumn> {
        vec![
            ExtraColumn {
                id: "text_4".to_string(),
                label: "City".to_string(),
            },
            ExtraColumn {
                id: "missing".to_string(),
                label: "missing".to_string(),
            },
        ]
    }

    fn sample_order() -> Order {
        let mut order = Order::new("7", "Main St Clinic");
        order.coordinates = Coordinates::new(43.65, -79.38);
        order.value = Some(12345.4);
        order.status = Some("Shipped".to_string());
        order.date = NaiveDate::from_ymd_opt(2024, 3, 5);
        order.customer = Some("ACME Corp".to_string());
        order.address = Some("Toronto, ON".to_string());
        order.raw.insert(
            "text_4".to_string(),
            RawValue::Text {
                text: "Toronto".to_string(),
            },
        );
        order
    }

    #[test]
    fn test_popup_lists_fields_and_link() {
        let html = renderer(Some("acme")).render_popup(&sample_order(), &extras()).unwrap();

        assert!(html.starts_with("<b>Main St Clinic</b>"));
        assert!(html.contains("<br>Customer: ACME Corp"));
        assert!(html.contains("<br>Order Value: $12,345"));
        assert!(html.contains("<br>Status: Shipped"));
        assert!(html.contains("<br>Date: 2024-03-05"));
        assert!(html.contains("<br>Address: Toronto, ON"));
        assert!(html.contains("<br>City: Toronto"));
        assert!(!html.contains("missing"));
        assert!(html.contains("https:&#x2F;&#x2F;acme.monday.com&#x2F;boards&#x2F;42&#x2F;pulses&#x2F;7"));
    }

    #[test]
    fn test_popup_escapes_html() {
        let mut order = sample_order();
        order.name = "<script>alert('x')</script>".to_string();
        order.customer = Some("Smith & Sons".to_string());

        let html = renderer(None).render_popup(&order, &extras()).unwrap();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("Smith &amp; Sons"));
    }

    #[test]
    fn test_popup_skips_absent_fields() {
        let order = Order::new("8", "Bare");
        let html = renderer(None).render_popup(&order, &[]).unwrap();
        assert!(!html.contains("Customer"));
        assert!(!html.contains("Order Value"));
        assert!(html.contains("Open in monday"));
    }

    #[test]
    fn test_item_link() {
        assert_eq!(
            renderer(Some("acme")).item_link("7"),
            "https://acme.monday.com/boards/42/pulses/7"
        );
        assert_eq!(
            renderer(Some("  ")).item_link("7"),
            "https://view.monday.com/boards/42/pulses/7"
        );
    }

    #[test]
    fn test_marker_requires_coordinates() {
        let renderer = renderer(None);
        let marker = renderer.marker_for(&sample_order(), &extras()).unwrap();
        assert_eq!((marker.lat, marker.lng), (43.65, -79.38));
        assert_eq!(marker.tooltip, "Main St Clinic • $12,345");

        let mut order = sample_order();
        order.coordinates = None;
        assert!(renderer.marker_for(&order, &[]).is_none());
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0.0, "$"), "$0");
        assert_eq!(format_amount(999.6, "$"), "$1,000");
        assert_eq!(format_amount(1234567.0, ""), "1,234,567");
        assert_eq!(format_amount(-2500.0, "€"), "-€2,500");
    }
}
