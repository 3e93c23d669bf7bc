use serde_json::Value;
use std::io;

use super::flatten;

/// Write output as CSV to stdout.
///
/// Sensitivity output becomes one row per trial; any other result becomes
/// `field,value` pairs with dotted field names.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    match value {
        Value::Object(map) => match map.get("result") {
            Some(Value::Object(result)) => match result.get("rows") {
                Some(Value::Array(rows)) if !rows.is_empty() => write_array_csv(&mut wtr, rows),
                Some(Value::Array(_)) => match result.get("summaries") {
                    Some(Value::Array(summaries)) => write_array_csv(&mut wtr, summaries),
                    _ => write_pairs(&mut wtr, result),
                },
                _ => write_pairs(&mut wtr, result),
            },
            _ => write_pairs(&mut wtr, map),
        },
        Value::Array(arr) => write_array_csv(&mut wtr, arr),
        _ => {
            let _ = wtr.write_record([format_csv_value(value)]);
        }
    }

    let _ = wtr.flush();
}

fn write_pairs<W: io::Write>(wtr: &mut csv::Writer<W>, map: &serde_json::Map<String, Value>) {
    let _ = wtr.write_record(["field", "value"]);
    for (key, val) in flatten(map) {
        let _ = wtr.write_record([key, format_csv_value(&val)]);
    }
}

fn write_array_csv<W: io::Write>(wtr: &mut csv::Writer<W>, arr: &[Value]) {
    if arr.is_empty() {
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = flatten(first).into_iter().map(|(k, _)| k).collect();
        let _ = wtr.write_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let flat = flatten(map);
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| {
                        flat.iter()
                            .find(|(k, _)| k == h)
                            .map(|(_, v)| format_csv_value(v))
                            .unwrap_or_default()
                    })
                    .collect();
                let _ = wtr.write_record(&row);
            }
        }
    } else {
        for item in arr {
            let _ = wtr.write_record([format_csv_value(item)]);
        }
    }
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(arr) => arr
            .iter()
            .map(format_csv_value)
            .collect::<Vec<_>>()
            .join(";"),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
