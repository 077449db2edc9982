use serde_json::{Map, Value};

use crate::models::Row;

/// Key pairs recognised as (label, value) columns inside JSON objects
const KNOWN_COLUMN_PAIRS: &[(&str, &str)] = &[
    ("label", "value"),
    ("Field Name", "Field Value"),
    ("Category", "Details"),
    ("Category", "Value"),
    ("field", "value"),
    ("key", "value"),
    ("name", "value"),
];

/// Rows from a JSON array or object. Scalars and invalid JSON yield `None`.
pub(super) fn parse_json_rows(text: &str) -> Option<Vec<Row>> {
    let value: Value = serde_json::from_str(strip_code_fence(text)).ok()?;

    match value {
        Value::Array(items) => Some(items.into_iter().map(row_from_item).collect()),
        Value::Object(map) => Some(
            map.into_iter()
                .map(|(key, value)| Row::new(key, stringify(value)))
                .collect(),
        ),
        _ => None,
    }
}

/// Remove a surrounding ``` fence (with optional language tag).
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    match rest.find('\n') {
        Some(newline) => rest[newline + 1..].trim(),
        None => rest.trim(),
    }
}

fn row_from_item(item: Value) -> Row {
    match item {
        Value::Object(map) => row_from_object(map),
        other => Row::detail(stringify(other)),
    }
}

fn row_from_object(mut map: Map<String, Value>) -> Row {
    let known = KNOWN_COLUMN_PAIRS
        .iter()
        .find(|(label_key, value_key)| map.contains_key(*label_key) && map.contains_key(*value_key));

    if let Some((label_key, value_key)) = known {
        let label = map.remove(*label_key).map(stringify).unwrap_or_default();
        let value = map.remove(*value_key).map(stringify).unwrap_or_default();
        return Row::new(label, value);
    }

    // `{"Customer Name": "Acme"}`: the key is the label
    if map.len() == 1 {
        if let Some((key, value)) = map.into_iter().next() {
            return Row::new(key, stringify(value));
        }
        return Row::default();
    }

    // Unknown shape: first two values in document order
    let mut values = map.into_iter().map(|(_, value)| stringify(value));
    let label = values.next().unwrap_or_default();
    let value = values.next().unwrap_or_default();
    Row::new(label, value)
}

fn stringify(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
