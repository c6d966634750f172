use crate::{config::Columns, record::Row};

/// Text the operator copies into an assistant of their choice.
pub fn description_prompt(row: &Row, columns: &Columns) -> String {
    let fabric = row.optional(&columns.fabric);
    let description = row.text(&columns.description).trim();
    let product_type = row.optional(&columns.product_type);
    format!(
        "Give me a compelling SEO description for a {fabric} saree based on: \"{description}, {product_type}\""
    )
}
