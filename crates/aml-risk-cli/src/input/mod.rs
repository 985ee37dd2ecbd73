pub mod file;
pub mod stdin;

use serde_json::Value;

/// Accept a bare array of rows, or an object carrying them under `transactions`.
pub fn transaction_rows(document: Value) -> Result<Vec<Value>, Box<dyn std::error::Error>> {
    match document {
        Value::Array(rows) => Ok(rows),
        Value::Object(mut map) => match map.remove("transactions") {
            Some(Value::Array(rows)) => Ok(rows),
            Some(_) => Err("'transactions' must be an array of transaction rows".into()),
            None => Ok(vec![Value::Object(map)]),
        },
        _ => Err("expected a JSON array of transaction rows".into()),
    }
}
