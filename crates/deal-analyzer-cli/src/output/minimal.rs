use serde_json::Value;

/// Headline fields, most important first.
const PRIORITY_KEYS: [&str; 4] = ["deal_irr", "sale_price", "net_operating_income", "irr"];

/// Print just the headline value of the output.
///
/// Looks for a priority field anywhere under `result` (breadth first, so a
/// shallow match wins), then falls back to the first field.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if let Some(v) = headline(result_obj) {
        println!("{}", format_minimal(v));
        return;
    }

    match result_obj {
        Value::Object(map) => {
            if let Some((key, val)) = map.iter().next() {
                println!("{}: {}", key, format_minimal(val));
            }
        }
        Value::Array(items) => {
            for item in items {
                println!("{}", format_minimal(item));
            }
        }
        other => println!("{}", format_minimal(other)),
    }
}

fn headline(root: &Value) -> Option<&Value> {
    for key in PRIORITY_KEYS {
        let mut level = vec![root];
        while !level.is_empty() {
            let mut next = Vec::new();
            for node in level {
                if let Value::Object(map) = node {
                    if let Some(v) = map.get(key) {
                        if !v.is_null() {
                            return Some(v);
                        }
                    }
                    next.extend(map.values().filter(|v| v.is_object()));
                }
            }
            level = next;
        }
    }
    None
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_headline() {
        let v = json!({"financing": {"total_cost": "1"}, "waterfall": {"deal_irr": "0.247"}});
        assert_eq!(headline(&v), Some(&json!("0.247")));
    }

    #[test]
    fn test_priority_order() {
        let v = json!({"sale_price": "1415842", "base_case": {"deal_irr": "0.25"}});
        assert_eq!(headline(&v), Some(&json!("0.25")));
    }

    #[test]
    fn test_no_headline() {
        assert_eq!(headline(&json!({"other": 1})), None);
    }
}
