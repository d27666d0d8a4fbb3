//! Failure categories and triage priorities.
//!
//! Labels are the exact, case-sensitive strings written to enriched output and
//! read back by dashboard/report consumers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Predicted failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Timeout")]
    Timeout,
    #[serde(rename = "Assertion Failure")]
    AssertionFailure,
    #[serde(rename = "Locator/Selector Issue")]
    LocatorIssue,
    #[serde(rename = "Stale Element")]
    StaleElement,
    #[serde(rename = "Driver/Automation Framework")]
    DriverFramework,
    #[serde(rename = "Environment/Build Error")]
    EnvironmentBuild,
    #[serde(rename = "Backend Failure")]
    BackendFailure,
    #[serde(rename = "Authentication Failure")]
    AuthenticationFailure,
    #[serde(rename = "Config Error")]
    ConfigError,
    #[serde(rename = "External Dependency Failure")]
    ExternalDependency,
    #[serde(rename = "Infra")]
    Infra,
    #[serde(rename = "Other")]
    Other,
    #[serde(rename = "Unknown")]
    Unknown,
}

impl Category {
    /// Every category, in taxonomy order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Timeout,
            Self::AssertionFailure,
            Self::LocatorIssue,
            Self::StaleElement,
            Self::DriverFramework,
            Self::EnvironmentBuild,
            Self::BackendFailure,
            Self::AuthenticationFailure,
            Self::ConfigError,
            Self::ExternalDependency,
            Self::Infra,
            Self::Other,
            Self::Unknown,
        ]
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Timeout => "Timeout",
            Self::AssertionFailure => "Assertion Failure",
            Self::LocatorIssue => "Locator/Selector Issue",
            Self::StaleElement => "Stale Element",
            Self::DriverFramework => "Driver/Automation Framework",
            Self::EnvironmentBuild => "Environment/Build Error",
            Self::BackendFailure => "Backend Failure",
            Self::AuthenticationFailure => "Authentication Failure",
            Self::ConfigError => "Config Error",
            Self::ExternalDependency => "External Dependency Failure",
            Self::Infra => "Infra",
            Self::Other => "Other",
            Self::Unknown => "Unknown",
        }
    }

    /// Whether this is one of the catch-all buckets.
    #[must_use]
    pub const fn is_catch_all(self) -> bool {
        matches!(self, Self::Other | Self::Unknown)
    }

    /// Parse a label, falling back to [`Category::Other`] for anything unrecognized.
    #[must_use]
    pub fn parse_or_other(label: &str) -> Self {
        label.parse().unwrap_or(Self::Other)
    }

    /// Apply an allow-list: categories outside it collapse to [`Category::Other`].
    #[must_use]
    pub fn restrict_to(self, allowed: &[Self]) -> Self {
        if allowed.contains(&self) {
            self
        } else {
            Self::Other
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|category| category.label() == s)
            .ok_or_else(|| format!("unknown category: {s}"))
    }
}

/// Triage urgency bucket. `P1` is the most urgent level the assigner emits.
///
/// `P0`, `P4` and `Unknown` exist because downstream validators accept them;
/// the priority assigner never produces them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    P0,
    P1,
    P2,
    P3,
    P4,
    Unknown,
}

impl Priority {
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::P0,
            Self::P1,
            Self::P2,
            Self::P3,
            Self::P4,
            Self::Unknown,
        ]
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::P0 => "P0",
            Self::P1 => "P1",
            Self::P2 => "P2",
            Self::P3 => "P3",
            Self::P4 => "P4",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|priority| priority.as_str() == s)
            .ok_or_else(|| format!("unknown priority: {s}"))
    }
}
