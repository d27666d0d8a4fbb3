//! High-confidence failure signatures.
//!
//! A [`RuleSet`] is an ordered list of case-insensitive patterns. Matching is
//! first-match-wins: rule order encodes priority, so a specific signature such
//! as an expired wait is placed ahead of the generic assertion rule that the
//! same text would also satisfy.

use crate::error::{Error, Result};
use crate::taxonomy::Category;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Serializable rule definition, as written in settings files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub name: String,
    pub pattern: String,
    pub category: Category,
    pub confidence: f64,
}

/// A compiled rule.
#[derive(Debug, Clone)]
pub struct Rule {
    name: String,
    pattern: Regex,
    category: Category,
    confidence: f64,
}

impl Rule {
    pub fn new(
        name: impl Into<String>,
        pattern: &str,
        category: Category,
        confidence: f64,
    ) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::config("rule name must not be empty"));
        }
        if !(0.0..=1.0).contains(&confidence) {
            return Err(Error::config(format!(
                "rule {name}: confidence {confidence} is outside [0, 1]"
            )));
        }
        let pattern = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| Error::config(format!("rule {name}: invalid pattern: {e}")))?;
        Ok(Self {
            name,
            pattern,
            category,
            confidence,
        })
    }

    pub fn from_spec(spec: &RuleSpec) -> Result<Self> {
        Self::new(&spec.name, &spec.pattern, spec.category, spec.confidence)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn category(&self) -> Category {
        self.category
    }

    #[must_use]
    pub const fn confidence(&self) -> f64 {
        self.confidence
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}

// Format: (name, pattern, category, confidence). Order is significant.
const BUILTIN_RULES: &[(&str, &str, Category, f64)] = &[
    (
        "environment-build",
        r"build failed|module not found|cannot find module|npm err|yarn error|importerror|modulenotfounderror|dependency resolution|compilation failed",
        Category::EnvironmentBuild,
        0.98,
    ),
    (
        "infra",
        r"\binfra(structure)?\b|deployment failed|connection refused|econnrefused|\bdns\b|server down|network (error|unreachable)|host unreachable|no space left on device",
        Category::Infra,
        0.97,
    ),
    (
        "backend-failure",
        r"\bbackend\b|internal server error|\bapi error\b|\b50[0-4]\b|\bdatabase\b|\bdb error\b|\bsql\w*exception\b|service bug",
        Category::BackendFailure,
        0.96,
    ),
    (
        "auth-failure",
        r"\b40[13]\b|unauthori[sz]ed|forbidden|authentication|\bauth(orization)? (failed|error)\b|token (has )?expired|invalid token|\boauth\b|session expired",
        Category::AuthenticationFailure,
        0.95,
    ),
    (
        "external-dependency",
        r"third.?party|external (provider|service|dependency|api)|api gateway|provider downtime|\bstripe\b|\btwilio\b|\bsendgrid\b|\bsms\b|upstream (service|provider)",
        Category::ExternalDependency,
        0.90,
    ),
    (
        "config-error",
        r"feature flag|misconfigur|config(uration)? error|invalid config|\benv(ironment)? var(iable)?s?\b|missing (setting|parameter|config)",
        Category::ConfigError,
        0.93,
    ),
    (
        "timeout",
        r"timeout|timed out|waited for|waiting for .+ exceeded|promise not resolved|deadline exceeded",
        Category::Timeout,
        0.99,
    ),
    (
        "stale-element",
        r"stale element|staleelementreference|element is not attached|detached from (the )?dom",
        Category::StaleElement,
        0.92,
    ),
    (
        "locator-issue",
        r"no such element|element not found|cannot find element|nosuchelement|unable to locate|\bselector\b|\bxpath\b|strict mode violation|resolved to 0 elements",
        Category::LocatorIssue,
        0.94,
    ),
    (
        "assertion",
        r"\bassert(ion)?\b|assertionerror|\bexpected\b|should (be|equal|have|contain)|\bto(be|equal|have|contain)\w*|but (found|got|received)|\breceived:|\s(==|!=)\s",
        Category::AssertionFailure,
        0.95,
    ),
    (
        "driver",
        r"selenium|webdriver|chromedriver|geckodriver|browser (context|has been closed|crashed|disconnected)|target (page|closed)|protocol error|session not created",
        Category::DriverFramework,
        0.90,
    ),
];

/// The built-in rule table in evaluation order.
#[must_use]
pub fn default_rule_specs() -> Vec<RuleSpec> {
    BUILTIN_RULES
        .iter()
        .map(|&(name, pattern, category, confidence)| RuleSpec {
            name: name.to_string(),
            pattern: pattern.to_string(),
            category,
            confidence,
        })
        .collect()
}

/// Ordered, immutable rule table.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Build a rule set, rejecting an empty table and duplicate rule names.
    pub fn new(rules: Vec<Rule>) -> Result<Self> {
        if rules.is_empty() {
            return Err(Error::config("rule table must contain at least one rule"));
        }
        let mut seen = BTreeSet::new();
        for rule in &rules {
            if !seen.insert(rule.name.as_str()) {
                return Err(Error::config(format!("duplicate rule name: {}", rule.name)));
            }
        }
        Ok(Self { rules })
    }

    pub fn from_specs(specs: &[RuleSpec]) -> Result<Self> {
        let rules = specs.iter().map(Rule::from_spec).collect::<Result<Vec<_>>>()?;
        Self::new(rules)
    }

    /// Compile the built-in table.
    pub fn builtin() -> Result<Self> {
        Self::from_specs(&default_rule_specs())
    }

    /// First rule, in declaration order, whose pattern matches anywhere in `text`.
    #[must_use]
    pub fn match_rule(&self, text: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.is_match(text))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }
}
