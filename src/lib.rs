//! Deterministic failure triage for UI test results.
//!
//! Records arrive as JSON lines. Each one is normalized into a single
//! lowercase text, classified against an ordered rule table (falling back to
//! weighted keyword scoring and then a catch-all), given a P1–P3 triage
//! priority and annotated with human-readable reasoning.
//!
//! ```no_run
//! use triage::enrich::Enricher;
//!
//! let enricher = Enricher::builtin()?;
//! let batch = enricher.enrich_jsonl(r#"{"test_id":"T1","error_message":"timeout exceeded"}"#)?;
//! assert_eq!(batch.records[0].triage_priority.as_str(), "P3");
//! # Ok::<(), triage::Error>(())
//! ```

#![forbid(unsafe_code)]

pub mod classifier;
pub mod cli;
pub mod config;
pub mod enrich;
pub mod error;
pub mod jsonl;
pub mod keywords;
pub mod normalize;
pub mod priority;
pub mod reasoning;
pub mod record;
pub mod rules;
pub mod summary;
pub mod taxonomy;
pub mod validate;

pub use classifier::{ClassificationResult, Classifier};
pub use config::Config;
pub use enrich::{EnrichedRecord, Enricher, EnrichmentBatch};
pub use error::{Error, Result};
pub use record::FailureRecord;
pub use taxonomy::{Category, Priority};
