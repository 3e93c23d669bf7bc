use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::flatten;

/// Format output as tables using the tabled crate.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_result_table(result, map);
            } else {
                print_flat_object(map);
            }
        }
        Value::Array(arr) => print_array_table(arr),
        _ => println!("{value}"),
    }
}

fn print_result_table(result: &Value, envelope: &Map<String, Value>) {
    match result {
        Value::Object(res_map) => {
            // Sensitivity output: summaries read better than raw trials
            if let Some(Value::Array(summaries)) = res_map.get("summaries") {
                if let Some(Value::Object(base)) = res_map.get("base_case") {
                    println!("Base case");
                    print_flat_object(base);
                }
                println!("\nSummaries");
                print_array_table(summaries);
            } else {
                print_flat_object(res_map);
            }
        }
        _ => print_flat_object(envelope),
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {s}");
                }
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {meth}");
    }
}

fn print_flat_object(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in flatten(map) {
        builder.push_record([key, format_value(&val)]);
    }
    println!("{}", Table::from(builder));
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = flatten(first).into_iter().map(|(k, _)| k).collect();
        let mut builder = Builder::default();
        builder.push_record(headers.clone());

        for item in arr {
            if let Value::Object(map) = item {
                let flat = flatten(map);
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| {
                        flat.iter()
                            .find(|(k, _)| k == h)
                            .map(|(_, v)| format_value(v))
                            .unwrap_or_default()
                    })
                    .collect();
                builder.push_record(row);
            }
        }

        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", format_value(item));
        }
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
