use serde_json::Value;

/// Print the headline answer for each command on one line.
pub fn print_minimal(value: &Value) {
    println!("{}", minimal_line(value));
}

fn minimal_line(value: &Value) -> String {
    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    // Batch: label counts plus rejections.
    if let Some(meta) = result.get("metadata") {
        let mut parts: Vec<String> = ["reportable", "unusual", "routine"]
            .iter()
            .map(|label| {
                let n = meta
                    .pointer(&format!("/label_counts/{}", label))
                    .and_then(Value::as_u64)
                    .unwrap_or(0);
                format!("{}={}", label, n)
            })
            .collect();
        let rejected = meta.get("rejected_rows").and_then(Value::as_u64).unwrap_or(0);
        parts.push(format!("rejected={}", rejected));
        if meta.get("degraded").and_then(Value::as_bool) == Some(true) {
            parts.push("degraded".to_string());
        }
        return parts.join(" ");
    }

    // Strategy selection.
    if let Some(mode) = result.get("mode").and_then(Value::as_str) {
        return mode.to_string();
    }

    // Threshold listing.
    if let Value::Array(items) = result {
        return items
            .iter()
            .map(|t| {
                format!(
                    "{}:{}",
                    t["fraction"].as_str().unwrap_or_default(),
                    threshold_amount(&t["notice"])
                )
            })
            .collect::<Vec<_>>()
            .join(" ");
    }

    format_minimal(result)
}

fn threshold_amount(threshold: &Value) -> String {
    match threshold.get("amount") {
        Some(amount) => format_minimal(amount),
        None => "no_limit".to_string(),
    }
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
