use serde_json::Value;
use std::io;

use super::assessment_rows;

/// Write output as CSV to stdout: one line per transaction for batch results.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    if let Some(rows) = assessment_rows(value) {
        write_array_csv(&mut wtr, &rows);
    } else {
        match value {
            Value::Object(map) => match map.get("result") {
                Some(Value::Array(items)) => write_array_csv(&mut wtr, items),
                Some(Value::Object(result)) => {
                    let _ = wtr.write_record(["field", "value"]);
                    for (key, val) in result {
                        let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
                    }
                }
                _ => {
                    let _ = wtr.write_record(["field", "value"]);
                    for (key, val) in map {
                        let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
                    }
                }
            },
            Value::Array(arr) => write_array_csv(&mut wtr, arr),
            _ => {
                let _ = wtr.write_record([&format_csv_value(value)]);
            }
        }
    }

    let _ = wtr.flush();
}

fn write_array_csv<W: io::Write>(wtr: &mut csv::Writer<W>, arr: &[Value]) {
    let Some(Value::Object(first)) = arr.first() else {
        for item in arr {
            let _ = wtr.write_record([&format_csv_value(item)]);
        }
        return;
    };

    let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
    let _ = wtr.write_record(&headers);

    for item in arr {
        if let Value::Object(map) = item {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(*h).map(format_csv_value).unwrap_or_default())
                .collect();
            let _ = wtr.write_record(&row);
        }
    }
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rows_share_first_row_headers() {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        let rows = vec![
            json!({ "transaction_id": "a", "label": "routine" }),
            json!({ "transaction_id": "b", "label": null }),
        ];
        write_array_csv(&mut wtr, &rows);
        let text = String::from_utf8(wtr.into_inner().unwrap()).unwrap();
        assert_eq!(text, "transaction_id,label\na,routine\nb,\n");
    }
}
