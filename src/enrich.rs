//! Batch enrichment.
//!
//! Each record is classified, prioritized and annotated independently of every
//! other record, so batches may fan out across threads. Output order always
//! matches input order.

use crate::classifier::{ClassificationResult, Classifier, Explanation};
use crate::error::{Error, Result};
use crate::jsonl::parse_records;
use crate::priority::{PriorityAssigner, PriorityDecision};
use crate::reasoning;
use crate::record::FailureRecord;
use crate::taxonomy::{Category, Priority};
use chrono::{DateTime, SecondsFormat, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Output fields written by enrichment. Input values under these keys are replaced.
pub const ENRICHMENT_FIELDS: &[&str] = &[
    "predicted_category",
    "confidence",
    "reasoning_short",
    "reasoning_long",
    "explainability",
    "triage_priority",
    "enriched_at",
    "reasoning",
];

/// What to do with an input line that does not parse into a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedPolicy {
    /// Keep going and report the line in [`EnrichmentBatch::errors`].
    #[default]
    Collect,
    /// Fail the whole batch on the first malformed line.
    Abort,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnrichOptions {
    pub on_malformed: MalformedPolicy,
    pub parallel: bool,
    /// When set, categories outside this list are reported as `Other`.
    pub allowed_categories: Option<Vec<Category>>,
}

/// A failure record with its enrichment attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    #[serde(flatten)]
    pub record: FailureRecord,
    pub predicted_category: Category,
    pub confidence: f64,
    pub reasoning_short: String,
    pub reasoning_long: String,
    pub explainability: Explanation,
    pub triage_priority: Priority,
    pub enriched_at: String,
    /// Mirror of `reasoning_short` for older consumers.
    pub reasoning: String,
}

/// An input line that could not be enriched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordError {
    /// Position among non-blank input lines (0-based).
    pub index: usize,
    /// Source line number (1-based).
    pub line: usize,
    pub message: String,
}

/// Result of enriching a JSONL batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentBatch {
    pub records: Vec<EnrichedRecord>,
    pub errors: Vec<RecordError>,
}

impl EnrichmentBatch {
    /// Number of non-blank input lines seen.
    #[must_use]
    pub fn input_count(&self) -> usize {
        self.records.len() + self.errors.len()
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Classifier, priority assigner and batch options bundled together.
#[derive(Debug, Clone)]
pub struct Enricher {
    classifier: Classifier,
    priority: PriorityAssigner,
    options: EnrichOptions,
}

impl Enricher {
    #[must_use]
    pub const fn new(
        classifier: Classifier,
        priority: PriorityAssigner,
        options: EnrichOptions,
    ) -> Self {
        Self {
            classifier,
            priority,
            options,
        }
    }

    /// Built-in tables, default thresholds, default options.
    pub fn builtin() -> Result<Self> {
        Ok(Self::new(
            Classifier::builtin()?,
            PriorityAssigner::default(),
            EnrichOptions::default(),
        ))
    }

    #[must_use]
    pub fn with_options(mut self, options: EnrichOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub const fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    #[must_use]
    pub const fn priority(&self) -> &PriorityAssigner {
        &self.priority
    }

    #[must_use]
    pub const fn options(&self) -> &EnrichOptions {
        &self.options
    }

    /// Collapse a category outside the allow-list to `Other`.
    fn restrict(&self, mut classification: ClassificationResult) -> ClassificationResult {
        if let Some(allowed) = &self.options.allowed_categories {
            let category = classification.category.restrict_to(allowed);
            if category != classification.category {
                tracing::debug!(
                    predicted = %classification.category,
                    "category outside allow-list, reporting as Other"
                );
                classification.category = category;
            }
        }
        classification
    }

    /// Classify free text with no record context: no critical marker, no
    /// impacted layers. The allow-list applies as it does for records.
    #[must_use]
    pub fn classify_text(&self, text: &str) -> (ClassificationResult, PriorityDecision) {
        let classification = self.restrict(self.classifier.classify_text(&text.to_lowercase()));
        let decision = self.priority.decide_with(classification.category, false, 0);
        (classification, decision)
    }

    /// Enrich one record with the given `enriched_at` stamp.
    #[must_use]
    pub fn enrich_record(&self, record: &FailureRecord, enriched_at: &str) -> EnrichedRecord {
        let classification = self.restrict(self.classifier.classify(record));
        let category = classification.category;
        let decision = self.priority.decide(record, category);
        let reasoning = reasoning::generate(record, &classification, &decision);

        let mut record = record.clone();
        record
            .extra
            .retain(|key, _| !ENRICHMENT_FIELDS.contains(&key.as_str()));
        record.classification = Some(
            record
                .classification
                .take()
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| "Unknown".to_string()),
        );
        record.defect_correlation = Some(record.defect_correlation.take().unwrap_or_default());

        EnrichedRecord {
            record,
            predicted_category: category,
            confidence: classification.confidence.clamp(0.0, 1.0),
            reasoning: reasoning.short.clone(),
            reasoning_short: reasoning.short,
            reasoning_long: reasoning.long,
            explainability: classification.explanation,
            triage_priority: decision.priority,
            enriched_at: enriched_at.to_string(),
        }
    }

    /// Enrich records in order, stamped with the current time.
    #[must_use]
    pub fn enrich(&self, records: &[FailureRecord]) -> Vec<EnrichedRecord> {
        self.enrich_at(records, Utc::now())
    }

    /// Enrich records in order, stamped with `now`.
    #[must_use]
    pub fn enrich_at(&self, records: &[FailureRecord], now: DateTime<Utc>) -> Vec<EnrichedRecord> {
        let stamp = format_timestamp(now);
        if self.options.parallel {
            records
                .par_iter()
                .map(|record| self.enrich_record(record, &stamp))
                .collect()
        } else {
            records
                .iter()
                .map(|record| self.enrich_record(record, &stamp))
                .collect()
        }
    }

    /// Parse and enrich JSONL text, stamped with the current time.
    pub fn enrich_jsonl(&self, text: &str) -> Result<EnrichmentBatch> {
        self.enrich_jsonl_at(text, Utc::now())
    }

    /// Parse and enrich JSONL text, stamped with `now`.
    ///
    /// Malformed lines are handled according to [`EnrichOptions::on_malformed`].
    pub fn enrich_jsonl_at(&self, text: &str, now: DateTime<Utc>) -> Result<EnrichmentBatch> {
        let mut records = Vec::new();
        let mut errors = Vec::new();

        for parsed in parse_records(text) {
            match parsed.record {
                Ok(record) => records.push(record),
                Err(err) => {
                    let message = err.to_string();
                    if self.options.on_malformed == MalformedPolicy::Abort {
                        return Err(Error::malformed(parsed.line, message));
                    }
                    tracing::warn!(line = parsed.line, "skipping malformed record: {message}");
                    errors.push(RecordError {
                        index: parsed.index,
                        line: parsed.line,
                        message,
                    });
                }
            }
        }

        tracing::info!(
            records = records.len(),
            malformed = errors.len(),
            parallel = self.options.parallel,
            "enriching batch"
        );
        let records = self.enrich_at(&records, now);
        tracing::info!(enriched = records.len(), "enrichment complete");

        Ok(EnrichmentBatch { records, errors })
    }
}

/// RFC 3339, UTC, millisecond precision.
#[must_use]
pub fn format_timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}
