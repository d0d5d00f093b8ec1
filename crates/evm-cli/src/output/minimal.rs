use serde_json::Value;

use super::cell;

/// Headline indicators, most telling first.
const PRIORITY_KEYS: [&str; 8] = [
    "cost_performance_index",
    "schedule_performance_index",
    "earned_value",
    "actual_cost",
    "cost_variance",
    "valid",
    "planned_value",
    "completion_rate",
];

/// Print a single headline value: the first priority key found in the
/// result, in its first metrics row, or in its last project KPI row.
pub fn print_minimal(value: &Value) {
    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    let candidates = [
        Some(result),
        result.get("metrics").and_then(|m| m.get(0)),
        result
            .get("project_kpis")
            .and_then(Value::as_array)
            .and_then(|rows| rows.last()),
    ];
    for obj in candidates.into_iter().flatten() {
        if let Some(found) = PRIORITY_KEYS
            .iter()
            .filter_map(|k| obj.get(*k))
            .find(|v| !v.is_null())
        {
            println!("{}", cell(found));
            return;
        }
    }

    match result {
        Value::Object(map) => match map.iter().next() {
            Some((key, val)) => println!("{key}: {}", cell(val)),
            None => println!(),
        },
        Value::Array(rows) => println!("{}", rows.len()),
        other => println!("{}", cell(other)),
    }
}
