//! Triage priority assignment.
//!
//! Priority depends on the predicted category and on severity signals carried
//! by the record itself: an explicit "critical" failure type and the number of
//! impacted layers (blast radius). The checks form an ordered decision list;
//! the first one that applies decides, and anything left over is P3.

use crate::error::{Error, Result};
use crate::record::FailureRecord;
use crate::taxonomy::{Category, Priority};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Thresholds used by the decision list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PriorityThresholds {
    /// Impacted-layer count at which a backend failure becomes P1.
    pub widespread_layers: usize,
    /// Impacted-layer count at which an external-dependency failure becomes P1.
    pub dependency_layers: usize,
    /// Case-insensitive marker searched for in `failure_type`.
    pub critical_marker: String,
}

impl Default for PriorityThresholds {
    fn default() -> Self {
        Self {
            widespread_layers: 3,
            dependency_layers: 2,
            critical_marker: "critical".to_string(),
        }
    }
}

impl PriorityThresholds {
    pub fn validate(&self) -> Result<()> {
        if self.widespread_layers == 0 || self.dependency_layers == 0 {
            return Err(Error::config("layer thresholds must be at least 1"));
        }
        if self.critical_marker.trim().is_empty() {
            return Err(Error::config("criticalMarker must not be empty"));
        }
        Ok(())
    }
}

/// The decision-list entry that produced a priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityReason {
    InfrastructureFailure,
    CriticalFailureType,
    AuthenticationFailure,
    WidespreadBackendFailure,
    ExternalDependencyBlastRadius,
    FunctionalDefect,
    ContainedBackendFailure,
    TransientOrTooling,
    Default,
}

impl PriorityReason {
    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Self::InfrastructureFailure => "infrastructure or environment failure blocks the run",
            Self::CriticalFailureType => "failure type is tagged critical",
            Self::AuthenticationFailure => "authentication failure blocks users",
            Self::WidespreadBackendFailure => "backend failure spans many layers",
            Self::ExternalDependencyBlastRadius => "external dependency failure spans several layers",
            Self::FunctionalDefect => "likely functional or test defect",
            Self::ContainedBackendFailure => "backend failure with contained blast radius",
            Self::TransientOrTooling => "transient, tooling or unclassified failure",
            Self::Default => "no escalation signal",
        }
    }
}

impl fmt::Display for PriorityReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityDecision {
    pub priority: Priority,
    pub reason: PriorityReason,
}

/// Stateless priority assigner.
#[derive(Debug, Clone, Default)]
pub struct PriorityAssigner {
    thresholds: PriorityThresholds,
}

impl PriorityAssigner {
    pub fn new(thresholds: PriorityThresholds) -> Result<Self> {
        thresholds.validate()?;
        Ok(Self { thresholds })
    }

    #[must_use]
    pub const fn thresholds(&self) -> &PriorityThresholds {
        &self.thresholds
    }

    /// Priority for `record` given its predicted `category`. Always P1, P2 or P3.
    #[must_use]
    pub fn assign(&self, record: &FailureRecord, category: Category) -> Priority {
        self.decide(record, category).priority
    }

    #[must_use]
    pub fn decide(&self, record: &FailureRecord, category: Category) -> PriorityDecision {
        let failure_type = record
            .failure_type
            .as_deref()
            .unwrap_or_default()
            .to_lowercase();
        let critical = failure_type.contains(&self.thresholds.critical_marker.to_lowercase());
        self.decide_with(category, critical, record.impacted_layer_count())
    }

    /// Decision list over the raw signals.
    #[must_use]
    pub fn decide_with(&self, category: Category, critical: bool, layers: usize) -> PriorityDecision {
        use Category as C;
        use PriorityReason as R;

        let widespread = layers >= self.thresholds.widespread_layers;
        let spread = layers >= self.thresholds.dependency_layers;

        let (priority, reason) = if matches!(category, C::Infra | C::EnvironmentBuild) {
            (Priority::P1, R::InfrastructureFailure)
        } else if critical {
            (Priority::P1, R::CriticalFailureType)
        } else if category == C::AuthenticationFailure {
            (Priority::P1, R::AuthenticationFailure)
        } else if category == C::BackendFailure && widespread {
            (Priority::P1, R::WidespreadBackendFailure)
        } else if category == C::ExternalDependency && spread {
            (Priority::P1, R::ExternalDependencyBlastRadius)
        } else if matches!(category, C::AssertionFailure | C::ConfigError | C::LocatorIssue) {
            (Priority::P2, R::FunctionalDefect)
        } else if category == C::BackendFailure {
            (Priority::P2, R::ContainedBackendFailure)
        } else if matches!(
            category,
            C::Timeout | C::Other | C::Unknown | C::DriverFramework | C::StaleElement
        ) {
            (Priority::P3, R::TransientOrTooling)
        } else {
            (Priority::P3, R::Default)
        };

        PriorityDecision { priority, reason }
    }
}
