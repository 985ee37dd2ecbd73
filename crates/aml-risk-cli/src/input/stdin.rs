use serde_json::Value;
use std::io::{self, Read};

/// Read piped stdin as one JSON document or as JSON lines.
/// Returns None if stdin is a TTY or nothing was piped.
pub fn read_stdin() -> Result<Option<Value>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    parse_document(&buffer)
}

fn parse_document(buffer: &str) -> Result<Option<Value>, Box<dyn std::error::Error>> {
    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Ok(Some(value));
    }

    // JSON lines: one transaction object per line.
    let rows = trimmed
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .enumerate()
        .map(|(i, line)| {
            serde_json::from_str::<Value>(line)
                .map_err(|e| format!("stdin line {}: {}", i + 1, e))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Some(Value::Array(rows)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_single_document() {
        let v = parse_document(r#"[{"transaction_id": "a"}]"#).unwrap().unwrap();
        assert_eq!(v.as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn test_parses_json_lines() {
        let v = parse_document("{\"transaction_id\": \"a\"}\n\n{\"transaction_id\": \"b\"}\n")
            .unwrap()
            .unwrap();
        assert_eq!(v[1]["transaction_id"], "b");
    }

    #[test]
    fn test_blank_input_is_none() {
        assert!(parse_document("  \n").unwrap().is_none());
    }

    #[test]
    fn test_bad_line_reports_position() {
        let err = parse_document("{\"a\": 1}\n{oops").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
