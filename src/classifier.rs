//! Failure classifier.
//!
//! Maps a record to a category, a confidence and an explanation. A rule hit
//! wins outright; otherwise keyword scoring decides; otherwise the record lands
//! in the catch-all bucket at a fixed low confidence. Classification never
//! fails.

use crate::error::{Error, Result};
use crate::keywords::{KeywordTable, ScoringParams};
use crate::normalize::normalize;
use crate::record::FailureRecord;
use crate::rules::RuleSet;
use crate::taxonomy::Category;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Terminal outcome for text that no rule or keyword recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fallback {
    pub category: Category,
    pub confidence: f64,
}

impl Default for Fallback {
    fn default() -> Self {
        Self {
            category: Category::Other,
            confidence: 0.55,
        }
    }
}

impl Fallback {
    pub fn validate(&self) -> Result<()> {
        if !self.category.is_catch_all() {
            return Err(Error::config(format!(
                "fallback category must be Other or Unknown, got {}",
                self.category
            )));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(Error::config(format!(
                "fallback confidence {} is outside [0, 1]",
                self.confidence
            )));
        }
        Ok(())
    }
}

/// Which stage produced a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    Rule,
    Keyword,
    Fallback,
}

/// Evidence behind a classification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    #[serde(rename = "matched", alias = "matchedTerms")]
    pub matched_terms: Vec<String>,
    pub weights: BTreeMap<String, f64>,
}

impl Explanation {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matched_terms.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub category: Category,
    pub confidence: f64,
    pub explanation: Explanation,
    pub source: MatchSource,
}

/// Rule table, keyword table and fallback, fixed at construction.
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: RuleSet,
    keywords: KeywordTable,
    fallback: Fallback,
}

impl Classifier {
    pub fn new(rules: RuleSet, keywords: KeywordTable, fallback: Fallback) -> Result<Self> {
        fallback.validate()?;
        Ok(Self {
            rules,
            keywords,
            fallback,
        })
    }

    /// Built-in tables with default constants.
    pub fn builtin() -> Result<Self> {
        Self::new(
            RuleSet::builtin()?,
            KeywordTable::builtin(ScoringParams::default())?,
            Fallback::default(),
        )
    }

    #[must_use]
    pub const fn fallback(&self) -> Fallback {
        self.fallback
    }

    #[must_use]
    pub const fn rules(&self) -> &RuleSet {
        &self.rules
    }

    #[must_use]
    pub const fn keywords(&self) -> &KeywordTable {
        &self.keywords
    }

    #[must_use]
    pub fn classify(&self, record: &FailureRecord) -> ClassificationResult {
        let result = self.classify_text(&normalize(record));
        tracing::debug!(
            test_id = %record.test_id,
            category = %result.category,
            confidence = result.confidence,
            source = ?result.source,
            "classified record"
        );
        result
    }

    /// Classify already-normalized text.
    #[must_use]
    pub fn classify_text(&self, text: &str) -> ClassificationResult {
        if let Some(rule) = self.rules.match_rule(text) {
            let name = rule.name().to_string();
            return ClassificationResult {
                category: rule.category(),
                confidence: rule.confidence(),
                explanation: Explanation {
                    matched_terms: vec![name.clone()],
                    weights: BTreeMap::from([(name, rule.confidence())]),
                },
                source: MatchSource::Rule,
            };
        }

        if let Some(score) = self.keywords.score(text) {
            return ClassificationResult {
                category: score.category,
                confidence: score.confidence,
                explanation: Explanation {
                    matched_terms: score.matched,
                    weights: score.weights,
                },
                source: MatchSource::Keyword,
            };
        }

        ClassificationResult {
            category: self.fallback.category,
            confidence: self.fallback.confidence,
            explanation: Explanation::default(),
            source: MatchSource::Fallback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keywords::KeywordEntry;
    use crate::rules::Rule;

    fn classifier() -> Classifier {
        Classifier::builtin().expect("built-in classifier")
    }

    #[test]
    fn rule_hit_explains_with_rule_name() {
        let record = FailureRecord::new("T1").with_error_message("waited for element, timeout exceeded");
        let result = classifier().classify(&record);
        assert_eq!(result.category, Category::Timeout);
        assert!((result.confidence - 0.99).abs() < 1e-9);
        assert_eq!(result.source, MatchSource::Rule);
        assert_eq!(result.explanation.matched_terms, vec!["timeout".to_string()]);
        assert!((result.explanation.weights["timeout"] - 0.99).abs() < 1e-9);
    }

    #[test]
    fn keyword_path_when_no_rule_matches() {
        let record = FailureRecord::new("K1").with_error_message("Checkout page took too long");
        let result = classifier().classify(&record);
        assert_eq!(result.category, Category::Timeout);
        assert_eq!(result.source, MatchSource::Keyword);
        assert!(result.confidence < 0.99);
    }

    #[test]
    fn fallback_for_unrecognized_text() {
        let record = FailureRecord::new("T3").with_error_message("random gibberish xyz");
        let result = classifier().classify(&record);
        assert_eq!(result.category, Category::Other);
        assert!((result.confidence - 0.55).abs() < 1e-9);
        assert!(result.explanation.is_empty());
        assert_eq!(result.source, MatchSource::Fallback);
    }

    #[test]
    fn fallback_can_be_unknown() {
        let classifier = Classifier::new(
            RuleSet::builtin().unwrap(),
            KeywordTable::builtin(ScoringParams::default()).unwrap(),
            Fallback {
                category: Category::Unknown,
                confidence: 0.6,
            },
        )
        .unwrap();
        let result = classifier.classify_text("nothing to see");
        assert_eq!(result.category, Category::Unknown);
    }

    #[test]
    fn fallback_must_be_catch_all() {
        let err = Classifier::new(
            RuleSet::builtin().unwrap(),
            KeywordTable::builtin(ScoringParams::default()).unwrap(),
            Fallback {
                category: Category::Timeout,
                confidence: 0.5,
            },
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn alternate_taxonomy_is_injected() {
        let rules = RuleSet::new(vec![
            Rule::new("payments", "payment declined", Category::ExternalDependency, 0.91).unwrap(),
        ])
        .unwrap();
        let keywords = KeywordTable::new(
            vec![KeywordEntry::new("flaky", Category::Timeout, 1.0)],
            ScoringParams::default(),
        )
        .unwrap();
        let classifier = Classifier::new(rules, keywords, Fallback::default()).unwrap();

        assert_eq!(
            classifier.classify_text("payment declined by gateway").category,
            Category::ExternalDependency
        );
        assert_eq!(
            classifier.classify_text("flaky run").category,
            Category::Timeout
        );
        // The built-in timeout rule is not part of this table.
        assert_eq!(
            classifier.classify_text("timeout").category,
            Category::Other
        );
    }

    #[test]
    fn explanation_serializes_as_matched() {
        let explanation = Explanation {
            matched_terms: vec!["slow".into()],
            weights: BTreeMap::from([("slow".to_string(), 0.6)]),
        };
        let json = serde_json::to_value(&explanation).unwrap();
        assert_eq!(json["matched"][0], "slow");
        assert_eq!(json["weights"]["slow"], 0.6);
    }
}
