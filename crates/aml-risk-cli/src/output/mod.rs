pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::{json, Map, Value};

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// Flatten a batch assessment envelope into one row per input transaction.
///
/// Returns None when the envelope does not hold a batch assessment.
pub fn assessment_rows(value: &Value) -> Option<Vec<Value>> {
    let result = value.get("result")?;
    let results = result.get("results")?.as_array()?;
    let errors = result
        .get("errors")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    let rows = results
        .iter()
        .enumerate()
        .map(|(index, assessment)| {
            if assessment.is_null() {
                let error = errors
                    .iter()
                    .find(|e| e.get("index").and_then(Value::as_u64) == Some(index as u64));
                rejected_row(index, error)
            } else {
                assessed_row(index, assessment)
            }
        })
        .collect();
    Some(rows)
}

fn assessed_row(index: usize, a: &Value) -> Value {
    let classification = &a["classification"];
    let level = &a["risk_level"];
    let triggers: Vec<String> = classification["triggers"]
        .as_array()
        .map(|ts| ts.iter().map(trigger_code).collect())
        .unwrap_or_default();

    let mut row = Map::new();
    row.insert("index".into(), json!(index));
    row.insert("transaction_id".into(), a["transaction_id"].clone());
    row.insert("status".into(), json!("assessed"));
    row.insert("label".into(), classification["label"].clone());
    row.insert("level".into(), level["level"].clone());
    row.insert("risk_score".into(), level["risk_score"].clone());
    row.insert("score".into(), classification["score"].clone());
    row.insert("confidence".into(), classification["confidence"].clone());
    row.insert("fusion_path".into(), classification["fusion_path"].clone());
    row.insert("triggers".into(), json!(triggers.join(" ")));
    row.insert("sla_deadline".into(), level["sla_deadline"].clone());
    row.insert("reason".into(), a["explanation"]["reasons"][0].clone());
    Value::Object(row)
}

fn rejected_row(index: usize, error: Option<&Value>) -> Value {
    let mut row = Map::new();
    row.insert("index".into(), json!(index));
    row.insert(
        "transaction_id".into(),
        error
            .and_then(|e| e.get("transaction_id"))
            .cloned()
            .unwrap_or(Value::Null),
    );
    row.insert("status".into(), json!("rejected"));
    for key in [
        "label",
        "level",
        "risk_score",
        "score",
        "confidence",
        "fusion_path",
        "triggers",
        "sla_deadline",
    ] {
        row.insert(key.into(), Value::Null);
    }
    row.insert(
        "reason".into(),
        error
            .and_then(|e| e.get("reason"))
            .cloned()
            .unwrap_or(Value::Null),
    );
    Value::Object(row)
}

/// Triggers serialize as `{ "category": .., "detail": { "rule" | "signal": .., .. } }`.
fn trigger_code(trigger: &Value) -> String {
    let detail = &trigger["detail"];
    detail
        .get("rule")
        .or_else(|| detail.get("signal"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope() -> Value {
        json!({
            "result": {
                "results": [
                    {
                        "transaction_id": "t-1",
                        "classification": {
                            "label": "reportable",
                            "score": "0.95",
                            "confidence": "1",
                            "fusion_path": "guardrail",
                            "triggers": [
                                {
                                    "category": "guardrail",
                                    "detail": {
                                        "rule": "notice_threshold",
                                        "amount": "500000",
                                        "threshold": "300000"
                                    }
                                },
                                {
                                    "category": "contextual",
                                    "detail": { "signal": "burst_pattern" }
                                }
                            ]
                        },
                        "risk_level": {
                            "level": "critical",
                            "risk_score": 100,
                            "sla_deadline": "2026-03-10T23:59:59Z"
                        },
                        "explanation": { "reasons": ["first", "second", "third"] }
                    },
                    null
                ],
                "errors": [
                    { "index": 1, "transaction_id": "t-2", "reason": "Malformed row 1: bad amount" }
                ],
                "metadata": {}
            },
            "warnings": []
        })
    }

    #[test]
    fn test_rows_align_with_input() {
        let rows = assessment_rows(&envelope()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["label"], "reportable");
        assert_eq!(rows[0]["triggers"], "notice_threshold burst_pattern");
        assert_eq!(rows[0]["reason"], "first");
        assert_eq!(rows[1]["status"], "rejected");
        assert_eq!(rows[1]["transaction_id"], "t-2");
    }

    #[test]
    fn test_non_batch_envelope_is_ignored() {
        assert!(assessment_rows(&json!({ "result": { "mode": "hybrid" } })).is_none());
    }
}
