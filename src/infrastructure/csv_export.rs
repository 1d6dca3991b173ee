// CSV projection of the filtered orders
use crate::domain::normalizer::ExtraColumn;
use crate::domain::order::Order;

const BASE_HEADERS: [&str; 10] = [
    "id",
    "name",
    "lat",
    "lng",
    "address",
    "value",
    "status",
    "date",
    "customer",
    "updated_at",
];

pub fn orders_to_csv(orders: &[&Order], extra_columns: &[ExtraColumn]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let headers = BASE_HEADERS
        .iter()
        .map(|h| h.to_string())
        .chain(extra_columns.iter().map(|c| c.label.clone()));
    writer.write_record(headers)?;

    for order in orders {
        let optional = |v: Option<String>| v.unwrap_or_default();
        let mut row = vec![
            order.id.clone(),
            order.name.clone(),
            optional(order.coordinates.map(|c| c.lat.to_string())),
            optional(order.coordinates.map(|c| c.lng.to_string())),
            optional(order.address.clone()),
            optional(order.value.map(|v| v.to_string())),
            optional(order.status.clone()),
            optional(order.date.map(|d| d.format("%Y-%m-%d").to_string())),
            optional(order.customer.clone()),
            optional(order.updated_at.clone()),
        ];
        row.extend(extra_columns.iter().map(|c| optional(order.column_text(&c.id))));
        writer.write_record(&row)?;
    }

    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}
