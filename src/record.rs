//! Input failure records.
//!
//! Records arrive as loosely shaped JSON objects produced by the test runner.
//! This module pins down the fields the engine reads, coerces the handful of
//! shapes seen in practice (`logs` as a string or list, `status` in any case),
//! and keeps every other field as an opaque pass-through value.

use crate::error::{Error, Result};
use serde::de::Deserializer;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Execution status of a test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestStatus {
    Pass,
    Fail,
    Skipped,
    Error,
}

impl TestStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::Skipped => "SKIPPED",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pass" | "passed" => Ok(Self::Pass),
            "fail" | "failed" => Ok(Self::Fail),
            "skip" | "skipped" => Ok(Self::Skipped),
            "error" | "broken" => Ok(Self::Error),
            other => Err(format!("unknown test status: {other}")),
        }
    }
}

impl Serialize for TestStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TestStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Link between a failure and a known defect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefectCorrelation {
    #[serde(default)]
    pub known_issue: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defect_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<String>,
}

/// One test execution as reported by the test runner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub test_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TestStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_behavior: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_behavior: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, alias = "stack_trace", skip_serializing_if = "Option::is_none")]
    pub stacktrace: Option<String>,
    #[serde(
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub logs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub impacted_layers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_categorization_reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<String>,
    #[serde(
        default,
        rename = "defectCorrelation",
        skip_serializing_if = "Option::is_none"
    )]
    pub defect_correlation: Option<DefectCorrelation>,
    /// Fields the engine does not interpret, carried through to the output.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FailureRecord {
    /// Minimal record carrying only an identifier.
    #[must_use]
    pub fn new(test_id: impl Into<String>) -> Self {
        Self {
            test_id: test_id.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    #[must_use]
    pub fn with_failure_type(mut self, failure_type: impl Into<String>) -> Self {
        self.failure_type = Some(failure_type.into());
        self
    }

    #[must_use]
    pub fn with_impacted_layers<I, S>(mut self, layers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.impacted_layers = layers.into_iter().map(Into::into).collect();
        self
    }

    /// Parse one JSON object into a record, rejecting a blank `test_id`.
    pub fn from_json(raw: &str) -> Result<Self> {
        let record: Self = serde_json::from_str(raw)?;
        record.check()?;
        Ok(record)
    }

    /// Convert an already-decoded JSON value into a record.
    pub fn from_value(value: Value) -> Result<Self> {
        let record: Self = serde_json::from_value(value)?;
        record.check()?;
        Ok(record)
    }

    fn check(&self) -> Result<()> {
        if self.test_id.trim().is_empty() {
            return Err(Error::validation("test_id must not be empty"));
        }
        Ok(())
    }

    /// Number of distinct impacted layers (trimmed, case-insensitive, blanks ignored).
    #[must_use]
    pub fn impacted_layer_count(&self) -> usize {
        self.impacted_layers
            .iter()
            .map(|layer| layer.trim().to_lowercase())
            .filter(|layer| !layer.is_empty())
            .collect::<BTreeSet<_>>()
            .len()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(value)) => vec![value],
        Some(OneOrMany::Many(values)) => values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn minimal_record_parses() {
        let record = FailureRecord::from_json(r#"{"test_id":"T1"}"#).unwrap();
        assert_eq!(record.test_id, "T1");
        assert!(record.error_message.is_none());
        assert!(record.logs.is_empty());
    }

    #[test]
    fn missing_test_id_is_rejected() {
        let err = FailureRecord::from_json(r#"{"error_message":"boom"}"#).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn blank_test_id_is_rejected() {
        let err = FailureRecord::from_json(r#"{"test_id":"  "}"#).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn logs_accept_string_or_list() {
        let single = FailureRecord::from_json(r#"{"test_id":"a","logs":"one line"}"#).unwrap();
        assert_eq!(single.logs, vec!["one line".to_string()]);

        let many =
            FailureRecord::from_json(r#"{"test_id":"a","logs":["x","y"],"impacted_layers":"ui"}"#)
                .unwrap();
        assert_eq!(many.logs.len(), 2);
        assert_eq!(many.impacted_layers, vec!["ui".to_string()]);

        let null = FailureRecord::from_json(r#"{"test_id":"a","logs":null}"#).unwrap();
        assert!(null.logs.is_empty());
    }

    #[test]
    fn non_string_logs_are_rejected() {
        assert!(FailureRecord::from_json(r#"{"test_id":"a","logs":[1,2]}"#).is_err());
    }

    #[test]
    fn status_is_case_insensitive() {
        let record = FailureRecord::from_json(r#"{"test_id":"a","status":"fail"}"#).unwrap();
        assert_eq!(record.status, Some(TestStatus::Fail));
        let record = FailureRecord::from_json(r#"{"test_id":"a","status":"SKIP"}"#).unwrap();
        assert_eq!(record.status, Some(TestStatus::Skipped));
        assert!(FailureRecord::from_json(r#"{"test_id":"a","status":"maybe"}"#).is_err());
    }

    #[test]
    fn stack_trace_alias() {
        let record =
            FailureRecord::from_json(r#"{"test_id":"a","stack_trace":"at foo()"}"#).unwrap();
        assert_eq!(record.stacktrace.as_deref(), Some("at foo()"));
    }

    #[test]
    fn unknown_fields_pass_through() {
        let value = json!({"test_id": "a", "browser": "chromium", "retries": 2});
        let record = FailureRecord::from_value(value).unwrap();
        assert_eq!(record.extra.get("browser"), Some(&json!("chromium")));

        let out = serde_json::to_value(&record).unwrap();
        assert_eq!(out["retries"], json!(2));
        assert_eq!(out["test_id"], json!("a"));
    }

    #[test]
    fn defect_correlation_uses_camel_case() {
        let record = FailureRecord::from_json(
            r#"{"test_id":"a","defectCorrelation":{"knownIssue":true,"defectId":"BUG-1"}}"#,
        )
        .unwrap();
        let defect = record.defect_correlation.unwrap();
        assert!(defect.known_issue);
        assert_eq!(defect.defect_id.as_deref(), Some("BUG-1"));
    }

    #[test]
    fn layer_count_is_distinct_and_ignores_blanks() {
        let record = FailureRecord::new("a").with_impacted_layers(["UI", "ui ", "api", "", "db"]);
        assert_eq!(record.impacted_layer_count(), 3);
    }
}
