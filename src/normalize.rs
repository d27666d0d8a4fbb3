//! Searchable text for a failure record.

use crate::record::FailureRecord;

/// Separator placed between record fields in the normalized text.
pub const FIELD_SEPARATOR: &str = " --- ";

/// Build the lower-cased text that rules and keywords are matched against.
///
/// Fields are joined in a fixed order: error message, stack trace, log lines,
/// failure type, error type, module, test id. Absent or blank fields are
/// skipped entirely so they never contribute a dangling separator.
#[must_use]
pub fn normalize(record: &FailureRecord) -> String {
    let logs = record.logs.join("\n");
    let fields = [
        record.error_message.as_deref(),
        record.stacktrace.as_deref(),
        Some(logs.as_str()),
        record.failure_type.as_deref(),
        record.error_type.as_deref(),
        record.module.as_deref(),
        Some(record.test_id.as_str()),
    ];

    fields
        .into_iter()
        .flatten()
        .filter(|field| !field.trim().is_empty())
        .collect::<Vec<_>>()
        .join(FIELD_SEPARATOR)
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_present_fields_in_order() {
        let mut record = FailureRecord::new("T1").with_error_message("Boom");
        record.stacktrace = Some("at Foo".into());
        record.logs = vec!["line A".into(), "line B".into()];
        record.failure_type = Some("UI".into());
        record.module = Some("Checkout".into());

        assert_eq!(
            normalize(&record),
            "boom --- at foo --- line a\nline b --- ui --- checkout --- t1"
        );
    }

    #[test]
    fn skips_absent_and_blank_fields() {
        let mut record = FailureRecord::new("T9");
        record.error_message = Some("   ".into());
        record.error_type = Some("TypeError".into());
        assert_eq!(normalize(&record), "typeerror --- t9");
    }

    #[test]
    fn is_stable() {
        let record = FailureRecord::new("X").with_error_message("Timeout Exceeded");
        assert_eq!(normalize(&record), normalize(&record.clone()));
    }

    #[test]
    fn empty_record_normalizes_to_id_only() {
        let record = FailureRecord {
            test_id: String::new(),
            ..FailureRecord::default()
        };
        assert_eq!(normalize(&record), "");
    }
}
