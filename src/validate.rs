//! Structural checks over enriched output files.
//!
//! These checks run against raw JSON objects rather than [`EnrichedRecord`]
//! so that output written by other tools, or by older versions, can be
//! audited without failing deserialization first.
//!
//! [`EnrichedRecord`]: crate::enrich::EnrichedRecord

use crate::taxonomy::Priority;
use chrono::DateTime;
use serde::Serialize;
use serde_json::{Map, Value};

/// Fields every enriched record must carry with a non-empty string value.
const REQUIRED_TEXT_FIELDS: &[&str] = &[
    "test_id",
    "predicted_category",
    "triage_priority",
    "reasoning_short",
    "reasoning_long",
    "enriched_at",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Position of the record in the file (0-based), `None` for file-level issues.
    pub index: Option<usize>,
    pub test_id: Option<String>,
    pub check: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub records: usize,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Validate a batch of enriched records.
#[must_use]
pub fn validate_records(records: &[Value]) -> ValidationReport {
    let mut report = ValidationReport {
        records: records.len(),
        issues: Vec::new(),
    };
    if records.is_empty() {
        report.issues.push(ValidationIssue {
            index: None,
            test_id: None,
            check: "non_empty",
            message: "enriched file has no records".to_string(),
        });
        return report;
    }

    for (index, value) in records.iter().enumerate() {
        let Some(object) = value.as_object() else {
            report.issues.push(ValidationIssue {
                index: Some(index),
                test_id: None,
                check: "object",
                message: "record is not a JSON object".to_string(),
            });
            continue;
        };
        let mut checker = RecordChecker {
            index,
            test_id: text(object, "test_id").map(ToString::to_string),
            issues: &mut report.issues,
        };
        checker.run(object);
    }
    report
}

struct RecordChecker<'a> {
    index: usize,
    test_id: Option<String>,
    issues: &'a mut Vec<ValidationIssue>,
}

impl RecordChecker<'_> {
    fn fail(&mut self, check: &'static str, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            index: Some(self.index),
            test_id: self.test_id.clone(),
            check,
            message: message.into(),
        });
    }

    fn run(&mut self, object: &Map<String, Value>) {
        for field in REQUIRED_TEXT_FIELDS {
            if text(object, field).is_none() {
                self.fail("required", format!("{field} is required"));
            }
        }

        self.check_explainability(object);

        if let Some(stamp) = text(object, "enriched_at") {
            if DateTime::parse_from_rfc3339(stamp).is_err() {
                self.fail("enriched_at", format!("invalid enriched_at timestamp: {stamp}"));
            }
        }

        if let Some(confidence) = object.get("confidence") {
            match confidence.as_f64() {
                Some(c) if (0.0..=1.0).contains(&c) => {}
                _ => self.fail("confidence", format!("confidence out of range: {confidence}")),
            }
        }

        if let Some(priority) = text(object, "triage_priority") {
            if priority.parse::<Priority>().is_err() {
                self.fail("triage_priority", format!("invalid triage_priority: {priority}"));
            }
        }

        self.check_defect_correlation(object);

        let failed = text(object, "status").is_some_and(|s| s.eq_ignore_ascii_case("fail"));
        if failed && text(object, "error_message").is_none() && text(object, "actual_behavior").is_none() {
            self.fail(
                "failure_data",
                "FAIL record needs error_message or actual_behavior",
            );
        }

        if let (Some(correlation_id), Some(logs)) = (
            text(object, "correlation_id"),
            object.get("logs").and_then(Value::as_array),
        ) {
            let referenced = logs
                .iter()
                .filter_map(Value::as_str)
                .any(|line| line.contains(correlation_id));
            if !referenced {
                self.fail(
                    "correlation_id",
                    format!("correlation id {correlation_id} not referenced in logs"),
                );
            }
        }

        if text(object, "failure_type").is_some() {
            let has_layers = object
                .get("impacted_layers")
                .and_then(Value::as_array)
                .is_some_and(|layers| !layers.is_empty());
            if !has_layers {
                self.fail(
                    "impacted_layers",
                    "impacted_layers missing for record with failure_type",
                );
            }
        }
    }

    fn check_explainability(&mut self, object: &Map<String, Value>) {
        let Some(explainability) = object.get("explainability").and_then(Value::as_object) else {
            self.fail("explainability", "explainability object must exist");
            return;
        };
        if !explainability.get("matched").is_some_and(Value::is_array) {
            self.fail("explainability", "explainability.matched must be an array");
        }
        if !explainability.get("weights").is_some_and(Value::is_object) {
            self.fail("explainability", "explainability.weights must be an object");
        }
    }

    fn check_defect_correlation(&mut self, object: &Map<String, Value>) {
        let Some(defect) = object.get("defectCorrelation") else {
            return;
        };
        let has_defect_id = defect
            .get("defectId")
            .and_then(Value::as_str)
            .is_some_and(|id| !id.trim().is_empty());
        match defect.get("knownIssue").and_then(Value::as_bool) {
            None => self.fail(
                "defect_correlation",
                "defectCorrelation.knownIssue must be a boolean",
            ),
            Some(true) if !has_defect_id => self.fail(
                "defect_correlation",
                "defectId is required when knownIssue is true",
            ),
            Some(_) => {}
        }
    }
}

fn text<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    object
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}
