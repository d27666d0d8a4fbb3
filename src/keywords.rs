//! Weighted keyword scoring, the fallback when no rule fires.
//!
//! Every keyword found in the text adds its weight to its category. The best
//! category wins; on a tie the category whose first contributing keyword sits
//! earliest in the table wins. The reported `matched` list deliberately holds
//! every contributing keyword across all categories, not only the winner's,
//! so an auditor can see the competing evidence.
//!
//! Keywords are plain substrings of the normalized text, which also carries the
//! test id and module. Built-in entries are therefore phrases rather than short
//! stems: a stem such as "hang" would fire on "changed", and "login" on every
//! record of a login module.

use crate::error::{Error, Result};
use crate::taxonomy::Category;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One entry of the keyword table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordEntry {
    pub keyword: String,
    pub category: Category,
    pub weight: f64,
}

impl KeywordEntry {
    pub fn new(keyword: impl Into<String>, category: Category, weight: f64) -> Self {
        Self {
            keyword: keyword.into(),
            category,
            weight,
        }
    }
}

/// Constants of the keyword confidence formula.
///
/// `confidence = min(cap, base + best_score / normalizer)`, rounded to three
/// decimals, where `normalizer = saturation / (cap - base)` and `saturation` is
/// the largest total weight any one category can accumulate in the table. The
/// cap is reached only when every keyword of the heaviest category matches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringParams {
    pub base_confidence: f64,
    pub confidence_cap: f64,
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self {
            base_confidence: 0.6,
            confidence_cap: 0.95,
        }
    }
}

impl ScoringParams {
    pub fn validate(&self) -> Result<()> {
        let Self {
            base_confidence,
            confidence_cap,
        } = *self;
        if !(0.0..=1.0).contains(&base_confidence) {
            return Err(Error::config(format!(
                "baseConfidence {base_confidence} is outside [0, 1]"
            )));
        }
        if !(0.0..=1.0).contains(&confidence_cap) {
            return Err(Error::config(format!(
                "confidenceCap {confidence_cap} is outside [0, 1]"
            )));
        }
        if base_confidence > confidence_cap {
            return Err(Error::config(
                "baseConfidence must not exceed confidenceCap",
            ));
        }
        Ok(())
    }
}

// Format: (keyword, category, weight). Order breaks ties.
const BUILTIN_KEYWORDS: &[(&str, Category, f64)] = &[
    ("took too long", Category::Timeout, 0.9),
    ("hangs indefinitely", Category::Timeout, 0.8),
    ("page hang", Category::Timeout, 0.7),
    ("slow", Category::Timeout, 0.6),
    ("still loading", Category::Timeout, 0.6),
    ("exceeded", Category::Timeout, 0.5),
    ("did not match", Category::AssertionFailure, 0.9),
    ("unexpected value", Category::AssertionFailure, 0.9),
    ("mismatch", Category::AssertionFailure, 0.8),
    ("incorrect", Category::AssertionFailure, 0.6),
    ("locator", Category::LocatorIssue, 0.9),
    ("not visible", Category::LocatorIssue, 0.8),
    ("not clickable", Category::LocatorIssue, 0.8),
    ("stale", Category::StaleElement, 0.8),
    ("detached", Category::StaleElement, 0.8),
    ("driver error", Category::DriverFramework, 0.8),
    ("driver version", Category::DriverFramework, 0.8),
    ("browser launch", Category::DriverFramework, 0.7),
    ("version conflict", Category::EnvironmentBuild, 0.9),
    ("compile", Category::EnvironmentBuild, 0.7),
    ("npm", Category::EnvironmentBuild, 0.6),
    ("dependency", Category::EnvironmentBuild, 0.6),
    ("server error", Category::BackendFailure, 0.9),
    ("query failed", Category::BackendFailure, 0.8),
    ("unavailable", Category::BackendFailure, 0.7),
    ("exception", Category::BackendFailure, 0.3),
    ("login failed", Category::AuthenticationFailure, 0.9),
    ("invalid credentials", Category::AuthenticationFailure, 0.9),
    ("invalid login", Category::AuthenticationFailure, 0.8),
    ("permission denied", Category::AuthenticationFailure, 0.8),
    ("wrong password", Category::AuthenticationFailure, 0.8),
    ("config not loaded", Category::ConfigError, 0.8),
    ("flag disabled", Category::ConfigError, 0.7),
    ("settings not applied", Category::ConfigError, 0.7),
    ("flag enabled", Category::ConfigError, 0.6),
    ("wrong environment", Category::ConfigError, 0.6),
    ("rate limit", Category::ExternalDependency, 0.8),
    ("provider outage", Category::ExternalDependency, 0.8),
    ("webhook", Category::ExternalDependency, 0.7),
    ("vendor api", Category::ExternalDependency, 0.6),
    ("network", Category::Infra, 0.9),
    ("out of memory", Category::Infra, 0.8),
    ("unreachable", Category::Infra, 0.7),
    ("kubernetes", Category::Infra, 0.7),
    ("pod evicted", Category::Infra, 0.7),
];

/// The built-in keyword table.
#[must_use]
pub fn default_keyword_entries() -> Vec<KeywordEntry> {
    BUILTIN_KEYWORDS
        .iter()
        .map(|&(keyword, category, weight)| KeywordEntry::new(keyword, category, weight))
        .collect()
}

/// Outcome of keyword scoring.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeywordScore {
    pub category: Category,
    pub confidence: f64,
    /// Every contributing keyword, in table order, across all categories.
    pub matched: Vec<String>,
    pub weights: BTreeMap<String, f64>,
    /// Accumulated score of the winning category.
    pub score: f64,
}

/// Immutable keyword table plus the confidence formula constants.
#[derive(Debug, Clone)]
pub struct KeywordTable {
    entries: Vec<KeywordEntry>,
    params: ScoringParams,
    /// Largest total weight a single category can accumulate.
    saturation: f64,
}

impl KeywordTable {
    /// Build a table. Keywords are lower-cased; empty tables, blank or duplicate
    /// keywords and non-positive weights are configuration errors.
    pub fn new(entries: Vec<KeywordEntry>, params: ScoringParams) -> Result<Self> {
        params.validate()?;
        if entries.is_empty() {
            return Err(Error::config(
                "keyword table must contain at least one keyword",
            ));
        }

        let mut seen = BTreeSet::new();
        let mut normalized = Vec::with_capacity(entries.len());
        for entry in entries {
            let keyword = entry.keyword.trim().to_lowercase();
            if keyword.is_empty() {
                return Err(Error::config("keyword must not be empty"));
            }
            if !entry.weight.is_finite() || entry.weight <= 0.0 {
                return Err(Error::config(format!(
                    "keyword {keyword}: weight must be a positive number"
                )));
            }
            if !seen.insert(keyword.clone()) {
                return Err(Error::config(format!("duplicate keyword: {keyword}")));
            }
            normalized.push(KeywordEntry {
                keyword,
                ..entry
            });
        }

        let mut totals: BTreeMap<Category, f64> = BTreeMap::new();
        for entry in &normalized {
            *totals.entry(entry.category).or_default() += entry.weight;
        }
        let saturation = totals.values().copied().fold(0.0_f64, f64::max);

        Ok(Self {
            entries: normalized,
            params,
            saturation,
        })
    }

    /// Compile the built-in table with the given constants.
    pub fn builtin(params: ScoringParams) -> Result<Self> {
        Self::new(default_keyword_entries(), params)
    }

    #[must_use]
    pub const fn params(&self) -> ScoringParams {
        self.params
    }

    #[must_use]
    pub fn entries(&self) -> &[KeywordEntry] {
        &self.entries
    }

    /// Score `text` (already normalized). `None` when no keyword occurs.
    #[must_use]
    pub fn score(&self, text: &str) -> Option<KeywordScore> {
        // Insertion order doubles as the tie-break order.
        let mut totals: Vec<(Category, f64)> = Vec::new();
        let mut matched = Vec::new();
        let mut weights = BTreeMap::new();

        for entry in &self.entries {
            if !text.contains(entry.keyword.as_str()) {
                continue;
            }
            match totals.iter_mut().find(|(category, _)| *category == entry.category) {
                Some((_, total)) => *total += entry.weight,
                None => totals.push((entry.category, entry.weight)),
            }
            matched.push(entry.keyword.clone());
            weights.insert(entry.keyword.clone(), entry.weight);
        }

        let mut best: Option<(Category, f64)> = None;
        for &(category, total) in &totals {
            if best.is_none_or(|(_, best_total)| total > best_total) {
                best = Some((category, total));
            }
        }
        let (category, score) = best?;

        Some(KeywordScore {
            category,
            confidence: self.confidence_for(score),
            matched,
            weights,
            score,
        })
    }

    /// Largest total weight a single category can accumulate in this table.
    #[must_use]
    pub const fn saturation(&self) -> f64 {
        self.saturation
    }

    fn confidence_for(&self, score: f64) -> f64 {
        let ScoringParams {
            base_confidence,
            confidence_cap,
        } = self.params;
        let span = confidence_cap - base_confidence;
        let raw = base_confidence + span * (score / self.saturation).min(1.0);
        round3(raw.min(confidence_cap).clamp(0.0, 1.0))
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
