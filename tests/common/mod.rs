//! Shared helpers for integration tests.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Value, json};
use triage::enrich::{EnrichedRecord, Enricher};
use triage::record::FailureRecord;

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, 15, 9, 26).unwrap()
}

pub fn enricher() -> Enricher {
    Enricher::builtin().expect("built-in enricher")
}

pub fn record(value: Value) -> FailureRecord {
    FailureRecord::from_value(value).expect("valid failure record")
}

pub fn enrich_one(value: Value) -> EnrichedRecord {
    let mut out = enricher().enrich_at(&[record(value)], fixed_now());
    out.remove(0)
}

/// The four reference failures used across suites.
pub fn reference_batch() -> Vec<Value> {
    vec![
        json!({"test_id": "t1", "error_message": "waited for element, timeout exceeded"}),
        json!({"test_id": "t2", "error_message": "401 unauthorized token expired"}),
        json!({"test_id": "t3", "error_message": "random gibberish xyz"}),
        json!({
            "test_id": "t4",
            "error_message": "api error 500 from service",
            "impacted_layers": ["ui", "api", "db"]
        }),
    ]
}

pub fn to_jsonl(values: &[Value]) -> String {
    values
        .iter()
        .map(|v| format!("{v}\n"))
        .collect::<String>()
}
