use serde_json::{Map, Value};
use std::io;

use super::{cell, headers, ROW_SECTIONS};

/// Write the main row collection of the output as CSV. Results without rows
/// are written as `field,value` pairs.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);
    let written = match result {
        Value::Array(rows) => write_rows(&mut wtr, rows),
        Value::Object(map) => match first_rows(map) {
            Some(rows) => write_rows(&mut wtr, rows),
            None => write_fields(&mut wtr, map),
        },
        other => wtr.write_record([cell(other)]),
    };
    if let Err(e) = written.and_then(|_| wtr.flush().map_err(csv::Error::from)) {
        eprintln!("Failed to write CSV output: {e}");
    }
}

fn first_rows(map: &Map<String, Value>) -> Option<&Vec<Value>> {
    ROW_SECTIONS
        .iter()
        .filter_map(|key| map.get(*key).and_then(Value::as_array))
        .find(|rows| !rows.is_empty())
}

fn write_rows<W: io::Write>(wtr: &mut csv::Writer<W>, rows: &[Value]) -> csv::Result<()> {
    let keys = headers(rows);
    if keys.is_empty() {
        for row in rows {
            wtr.write_record([cell(row)])?;
        }
        return Ok(());
    }
    wtr.write_record(&keys)?;
    for row in rows {
        wtr.write_record(
            keys.iter()
                .map(|k| row.get(k.as_str()).map(cell).unwrap_or_default()),
        )?;
    }
    Ok(())
}

fn write_fields<W: io::Write>(wtr: &mut csv::Writer<W>, map: &Map<String, Value>) -> csv::Result<()> {
    wtr.write_record(["field", "value"])?;
    for (key, val) in map {
        wtr.write_record([key.as_str(), cell(val).as_str()])?;
    }
    Ok(())
}
