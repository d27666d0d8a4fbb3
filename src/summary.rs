//! Aggregate counts over enriched output.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Confidence below which a record is counted as low-confidence.
pub const LOW_CONFIDENCE_THRESHOLD: f64 = 0.7;

/// Fields the summary reads from an enriched line. Everything else is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SummaryRow {
    #[serde(default)]
    pub predicted_category: Option<String>,
    #[serde(default)]
    pub triage_priority: Option<String>,
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriageSummary {
    pub total: usize,
    pub by_category: BTreeMap<String, usize>,
    pub by_priority: BTreeMap<String, usize>,
    pub by_module: BTreeMap<String, usize>,
    /// Mean over records that carry a confidence; `None` when none do.
    pub mean_confidence: Option<f64>,
    pub low_confidence: usize,
}

impl TriageSummary {
    #[must_use]
    pub fn from_rows<'a, I>(rows: I) -> Self
    where
        I: IntoIterator<Item = &'a SummaryRow>,
    {
        let mut summary = Self::default();
        let mut confidence_sum = 0.0;
        let mut confidence_count = 0_u32;

        for row in rows {
            summary.total += 1;
            *summary
                .by_category
                .entry(label_or_unknown(row.predicted_category.as_deref()))
                .or_default() += 1;
            *summary
                .by_priority
                .entry(label_or_unknown(row.triage_priority.as_deref()))
                .or_default() += 1;
            *summary
                .by_module
                .entry(label_or_unknown(row.module.as_deref()))
                .or_default() += 1;
            if let Some(confidence) = row.confidence {
                confidence_sum += confidence;
                confidence_count += 1;
                if confidence < LOW_CONFIDENCE_THRESHOLD {
                    summary.low_confidence += 1;
                }
            }
        }

        if confidence_count > 0 {
            let mean = confidence_sum / f64::from(confidence_count);
            summary.mean_confidence = Some((mean * 1000.0).round() / 1000.0);
        }
        summary
    }

    /// Plain-text rendering for terminals.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Total records: {}", self.total);
        if let Some(mean) = self.mean_confidence {
            let _ = writeln!(out, "Mean confidence: {mean:.3}");
        }
        let _ = writeln!(
            out,
            "Low confidence (< {LOW_CONFIDENCE_THRESHOLD}): {}",
            self.low_confidence
        );
        render_counts(&mut out, "By priority", &self.by_priority);
        render_counts(&mut out, "By category", &self.by_category);
        render_counts(&mut out, "By module", &self.by_module);
        out
    }
}

fn label_or_unknown(value: Option<&str>) -> String {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("Unknown")
        .to_string()
}

fn render_counts(out: &mut String, title: &str, counts: &BTreeMap<String, usize>) {
    if counts.is_empty() {
        return;
    }
    let width = counts.keys().map(String::len).max().unwrap_or(0);
    let _ = writeln!(out, "\n{title}:");
    for (label, count) in counts {
        let _ = writeln!(out, "  {label:<width$}  {count}");
    }
}
