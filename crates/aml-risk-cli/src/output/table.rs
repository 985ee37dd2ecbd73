use serde_json::Value;
use tabled::{builder::Builder, Table};

use super::assessment_rows;

/// Format output as a table using the tabled crate.
pub fn print_table(value: &Value) {
    if let Some(rows) = assessment_rows(value) {
        print_array_table(&rows);
        if let Some(meta) = value.pointer("/result/metadata") {
            print_batch_summary(meta);
        }
        print_footer(value);
        return;
    }

    match value {
        Value::Object(map) => match map.get("result") {
            Some(Value::Array(items)) => {
                print_array_table(items);
                print_footer(value);
            }
            Some(result @ Value::Object(_)) => {
                print_flat_object(result);
                print_footer(value);
            }
            _ => print_flat_object(value),
        },
        Value::Array(arr) => print_array_table(arr),
        _ => println!("{}", value),
    }
}

fn print_batch_summary(meta: &Value) {
    let mut builder = Builder::default();
    builder.push_record(["Batch", "Value"]);
    for (label, pointer) in [
        ("strategy", "/strategy/mode"),
        ("blend_weight", "/strategy/blend_weight"),
        ("classifier", "/classifier/status"),
        ("degraded", "/degraded"),
        ("config_version", "/config_version"),
        ("total_rows", "/total_rows"),
        ("assessed_rows", "/assessed_rows"),
        ("rejected_rows", "/rejected_rows"),
        ("labels", "/label_counts"),
        ("levels", "/level_counts"),
    ] {
        if let Some(v) = meta.pointer(pointer) {
            builder.push_record([label, &format_value(v)]);
        }
    }
    println!("\n{}", Table::from(builder));
}

fn print_footer(envelope: &Value) {
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {}", w);
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_flat_object(value: &Value) {
    if let Value::Object(map) = value {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (key, val) in map {
            builder.push_record([key.as_str(), &format_value(val)]);
        }
        println!("{}", Table::from(builder));
    }
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
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
        Value::Null => "-".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        Value::Object(map) => {
            // Counts and thresholds read better as `key=value` pairs.
            let items: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}={}", k, format_value(v)))
                .collect();
            items.join(" ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_values_render_as_pairs() {
        let v = json!({ "kind": "limit", "amount": "300000" });
        let rendered = format_value(&v);
        assert!(rendered.contains("kind=limit"));
        assert!(rendered.contains("amount=300000"));
    }

    #[test]
    fn test_null_renders_as_dash() {
        assert_eq!(format_value(&Value::Null), "-");
    }
}
