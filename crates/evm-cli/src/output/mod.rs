pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Row collections in the order they are preferred when only one can be
/// shown (CSV).
pub(crate) const ROW_SECTIONS: [&str; 6] = [
    "axis_lines",
    "monthly_kpis",
    "project_kpis",
    "metrics",
    "budget_lines",
    "events",
];

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// Render a scalar cell. Nested values are printed as compact JSON.
pub(crate) fn cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

/// Union of the keys of an array of objects, in first-seen order.
pub(crate) fn headers(rows: &[Value]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for row in rows {
        if let Value::Object(map) = row {
            for key in map.keys() {
                if !out.iter().any(|k| k == key) {
                    out.push(key.clone());
                }
            }
        }
    }
    out
}
