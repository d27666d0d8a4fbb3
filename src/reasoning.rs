//! Human-readable reasoning attached to enriched records.

use crate::classifier::ClassificationResult;
use crate::priority::PriorityDecision;
use crate::record::FailureRecord;
use crate::taxonomy::Category;
use serde::{Deserialize, Serialize};

/// Short and long reasoning strings. Neither is ever empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reasoning {
    pub short: String,
    pub long: String,
}

/// One-line next step for a category.
#[must_use]
pub const fn short_advice(category: Category) -> &'static str {
    match category {
        Category::Timeout => "Increase wait / investigate infra",
        Category::AssertionFailure => "Verify assertion / UI change",
        Category::LocatorIssue => "Check selectors / update locators",
        Category::StaleElement => "Re-query element after DOM updates",
        Category::DriverFramework => "Check drivers & agents",
        Category::EnvironmentBuild => "Check build & deps",
        Category::BackendFailure => "Escalate to owning backend service",
        Category::AuthenticationFailure => "Check credentials & token refresh",
        Category::ConfigError => "Review configuration & feature flags",
        Category::ExternalDependency => "Check third-party provider status",
        Category::Infra => "Escalate to platform / infra on-call",
        Category::Other | Category::Unknown => "Manual triage required",
    }
}

/// Detailed recommendation for a category.
#[must_use]
pub const fn long_advice(category: Category) -> &'static str {
    match category {
        Category::Timeout => {
            "Investigate async waits, add retries or increase timeout. Check infra/slowness."
        }
        Category::AssertionFailure => {
            "Check test assertion vs current UI. Attach screenshot and DOM snapshot."
        }
        Category::LocatorIssue => {
            "Review selector stability; use data-* attrs or more robust locators."
        }
        Category::StaleElement => {
            "Avoid holding element handles across navigation or re-render; locate the element again before acting."
        }
        Category::DriverFramework => "Ensure browser/driver versions match; restart agents.",
        Category::EnvironmentBuild => {
            "Inspect CI logs, dependency versions and environment setup."
        }
        Category::BackendFailure => {
            "Correlate the request id with service logs and open a defect against the owning service."
        }
        Category::AuthenticationFailure => {
            "Verify test account credentials, token lifetimes and identity provider health."
        }
        Category::ConfigError => {
            "Diff environment settings and feature flags against the last passing run."
        }
        Category::ExternalDependency => {
            "Check provider status pages and consider stubbing the dependency in UI tests."
        }
        Category::Infra => {
            "Check deployment, network and DNS health for the test environment before re-running."
        }
        Category::Other | Category::Unknown => "Collect full logs and run locally for debug.",
    }
}

/// Build the reasoning for one classified record.
#[must_use]
pub fn generate(
    record: &FailureRecord,
    classification: &ClassificationResult,
    decision: &PriorityDecision,
) -> Reasoning {
    let category = classification.category;
    let short = format!(
        "{category} -> {}: {}",
        decision.priority,
        short_advice(category)
    );

    let mut parts = Vec::new();
    if classification.explanation.is_empty() {
        parts.push("No known failure signature matched".to_string());
    } else {
        parts.push(format!(
            "Matched: {}",
            classification.explanation.matched_terms.join(", ")
        ));
    }
    if let Some(error_type) = record.error_type.as_deref().filter(|s| !s.trim().is_empty()) {
        parts.push(format!("ErrorType: {error_type}"));
    }
    if !record.test_id.trim().is_empty() {
        parts.push(format!("Test: {}", record.test_id));
    }

    let long = format!(
        "{}. Priority {}: {}. Recommendation: {}",
        parts.join(" | "),
        decision.priority,
        decision.reason,
        long_advice(category)
    );

    Reasoning { short, long }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{Explanation, MatchSource};
    use crate::priority::PriorityReason;
    use crate::taxonomy::Priority;
    use std::collections::BTreeMap;

    fn classification(category: Category, matched: &[&str]) -> ClassificationResult {
        ClassificationResult {
            category,
            confidence: 0.9,
            explanation: Explanation {
                matched_terms: matched.iter().map(ToString::to_string).collect(),
                weights: matched.iter().map(|m| ((*m).to_string(), 0.9)).collect::<BTreeMap<_, _>>(),
            },
            source: MatchSource::Rule,
        }
    }

    #[test]
    fn short_reasoning_names_category_and_priority() {
        let record = FailureRecord::new("T1");
        let decision = PriorityDecision {
            priority: Priority::P3,
            reason: PriorityReason::TransientOrTooling,
        };
        let reasoning = generate(&record, &classification(Category::Timeout, &["timeout"]), &decision);
        assert_eq!(reasoning.short, "Timeout -> P3: Increase wait / investigate infra");
        assert_eq!(
            reasoning.long,
            "Matched: timeout | Test: T1. Priority P3: transient, tooling or unclassified failure. \
             Recommendation: Investigate async waits, add retries or increase timeout. Check infra/slowness."
        );
    }

    #[test]
    fn fallback_reasoning_is_readable() {
        let mut record = FailureRecord::new("T3");
        record.error_type = Some("WeirdError".into());
        let decision = PriorityDecision {
            priority: Priority::P3,
            reason: PriorityReason::TransientOrTooling,
        };
        let reasoning = generate(&record, &classification(Category::Other, &[]), &decision);
        assert_eq!(reasoning.short, "Other -> P3: Manual triage required");
        assert!(reasoning.long.starts_with("No known failure signature matched | ErrorType: WeirdError | Test: T3."));
    }

    #[test]
    fn advice_exists_for_every_category() {
        for category in Category::all() {
            assert!(!short_advice(*category).is_empty());
            assert!(!long_advice(*category).is_empty());
        }
    }
}
