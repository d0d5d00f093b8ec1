use colored::Colorize;
use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{cell, headers};

/// Print the envelope as tables: one per row collection of the result, one
/// for its scalar fields, followed by warnings and methodology.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => match map.get("result") {
            Some(result) => {
                print_result(result);
                print_footer(map);
            }
            None => print_fields(map),
        },
        Value::Array(rows) => print_rows(rows),
        other => println!("{}", cell(other)),
    }
}

fn print_result(result: &Value) {
    match result {
        Value::Object(map) => {
            let mut scalars = Map::new();
            for (key, val) in map {
                match val {
                    Value::Array(rows) => {
                        println!("{}", key.bold());
                        print_rows(rows);
                        println!();
                    }
                    Value::Object(inner) => {
                        println!("{}", key.bold());
                        print_fields(inner);
                        println!();
                    }
                    _ => {
                        scalars.insert(key.clone(), val.clone());
                    }
                }
            }
            if !scalars.is_empty() {
                print_fields(&scalars);
            }
        }
        Value::Array(rows) => print_rows(rows),
        other => println!("{}", cell(other)),
    }
}

fn print_fields(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        builder.push_record([key.clone(), cell(val)]);
    }
    println!("{}", Table::from(builder));
}

fn print_rows(rows: &[Value]) {
    if rows.is_empty() {
        println!("(no rows)");
        return;
    }
    let keys = headers(rows);
    if keys.is_empty() {
        for row in rows {
            println!("{}", cell(row));
        }
        return;
    }
    let mut builder = Builder::default();
    builder.push_record(keys.iter().cloned());
    for row in rows {
        builder.push_record(
            keys.iter()
                .map(|k| row.get(k.as_str()).map(cell).unwrap_or_default()),
        );
    }
    println!("{}", Table::from(builder));
}

fn print_footer(envelope: &Map<String, Value>) {
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\n{}", "Warnings:".yellow());
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {w}");
            }
        }
    }
    if let Some(Value::String(methodology)) = envelope.get("methodology") {
        println!("\nMethodology: {methodology}");
    }
}
