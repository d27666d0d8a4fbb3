//! Layered settings.
//!
//! Precedence, lowest to highest: built-in defaults, global settings
//! (`$TRIAGE_CONFIG_PATH` or `~/.triage/settings.json`), project settings
//! (`./.triage/settings.json`), an explicit `--config` file, then CLI flags
//! applied by the binary. JSON objects merge key by key; scalars and arrays
//! replace whatever a lower layer set.
//!
//! Everything is validated up front: a bad table or threshold is reported
//! before the first record is read.

use crate::classifier::{Classifier, Fallback};
use crate::enrich::{EnrichOptions, Enricher};
use crate::error::{Error, Result};
use crate::keywords::{KeywordEntry, KeywordTable, ScoringParams};
use crate::priority::{PriorityAssigner, PriorityThresholds};
use crate::rules::{RuleSet, RuleSpec};
use crate::taxonomy::Category;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Environment variable overriding the global settings path.
pub const CONFIG_PATH_ENV: &str = "TRIAGE_CONFIG_PATH";
const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClassifierSettings {
    pub fallback_category: Category,
    pub fallback_confidence: f64,
    pub base_confidence: f64,
    pub confidence_cap: f64,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        let fallback = Fallback::default();
        let scoring = ScoringParams::default();
        Self {
            fallback_category: fallback.category,
            fallback_confidence: fallback.confidence,
            base_confidence: scoring.base_confidence,
            confidence_cap: scoring.confidence_cap,
        }
    }
}

impl ClassifierSettings {
    #[must_use]
    pub const fn scoring(&self) -> ScoringParams {
        ScoringParams {
            base_confidence: self.base_confidence,
            confidence_cap: self.confidence_cap,
        }
    }

    #[must_use]
    pub const fn fallback(&self) -> Fallback {
        Fallback {
            category: self.fallback_category,
            confidence: self.fallback_confidence,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub classifier: ClassifierSettings,
    pub priority: PriorityThresholds,
    pub enrich: EnrichOptions,
    /// Replaces the built-in rule table when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<RuleSpec>>,
    /// Replaces the built-in keyword table when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<KeywordEntry>>,
}

impl Config {
    /// `~/.triage`, or `./.triage` when no home directory is known.
    #[must_use]
    pub fn global_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::project_dir())
    }

    #[must_use]
    pub const fn project_dir() -> &'static str {
        ".triage"
    }

    /// Global settings file, honoring [`CONFIG_PATH_ENV`].
    #[must_use]
    pub fn global_path() -> PathBuf {
        std::env::var(CONFIG_PATH_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map_or_else(|| Self::global_dir().join(SETTINGS_FILE), PathBuf::from)
    }

    #[must_use]
    pub fn project_path(cwd: &Path) -> PathBuf {
        cwd.join(Self::project_dir()).join(SETTINGS_FILE)
    }

    /// Load global and project settings relative to the current directory.
    pub fn load() -> Result<Self> {
        Self::load_with(None)
    }

    /// Like [`Config::load`], with an extra explicit settings file on top.
    ///
    /// Unlike the implicit layers, an explicit file must exist.
    pub fn load_with(explicit: Option<&Path>) -> Result<Self> {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let mut layers = vec![Self::global_path(), Self::project_path(&cwd)];
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(Error::config(format!(
                    "Settings file not found: {}",
                    path.display()
                )));
            }
            layers.push(path.to_path_buf());
        }
        Self::load_layers(&layers)
    }

    /// Merge the given settings files in order; missing files are skipped.
    pub fn load_layers(paths: &[PathBuf]) -> Result<Self> {
        let mut merged = Value::Object(Map::new());
        for path in paths {
            if !path.exists() {
                continue;
            }
            let raw = std::fs::read_to_string(path).map_err(|e| {
                Error::config(format!("Failed to read {}: {e}", path.display()))
            })?;
            let layer: Value = serde_json::from_str(&raw).map_err(|e| {
                Error::config(format!("Failed to parse {}: {e}", path.display()))
            })?;
            if !layer.is_object() {
                return Err(Error::config(format!(
                    "Settings in {} must be a JSON object",
                    path.display()
                )));
            }
            tracing::debug!(path = %path.display(), "applying settings layer");
            merge_json(&mut merged, layer);
        }

        let config: Self = serde_json::from_value(merged)
            .map_err(|e| Error::config(format!("Invalid settings: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every table and threshold by building the pipeline once.
    pub fn validate(&self) -> Result<()> {
        if self
            .enrich
            .allowed_categories
            .as_ref()
            .is_some_and(Vec::is_empty)
        {
            return Err(Error::config("allowedCategories must not be empty when set"));
        }
        self.build_enricher().map(|_| ())
    }

    pub fn build_classifier(&self) -> Result<Classifier> {
        let rules = match &self.rules {
            Some(specs) => RuleSet::from_specs(specs)?,
            None => RuleSet::builtin()?,
        };
        let scoring = self.classifier.scoring();
        let keywords = match &self.keywords {
            Some(entries) => KeywordTable::new(entries.clone(), scoring)?,
            None => KeywordTable::builtin(scoring)?,
        };
        Classifier::new(rules, keywords, self.classifier.fallback())
    }

    pub fn build_priority(&self) -> Result<PriorityAssigner> {
        PriorityAssigner::new(self.priority.clone())
    }

    pub fn build_enricher(&self) -> Result<Enricher> {
        Ok(Enricher::new(
            self.build_classifier()?,
            self.build_priority()?,
            self.enrich.clone(),
        ))
    }
}

fn merge_json(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrich::MalformedPolicy;
    use serde_json::json;

    fn write(dir: &Path, name: &str, value: &Value) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
        path
    }

    #[test]
    fn defaults_when_no_files_exist() {
        let config = Config::load_layers(&[PathBuf::from("/no/such/settings.json")]).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.classifier.fallback_category, Category::Other);
        assert_eq!(config.priority.widespread_layers, 3);
    }

    #[test]
    fn later_layers_override_field_by_field() {
        let dir = tempfile::tempdir().unwrap();
        let global = write(
            dir.path(),
            "global.json",
            &json!({"classifier": {"confidenceCap": 0.98, "fallbackConfidence": 0.6},
                    "enrich": {"parallel": true}}),
        );
        let project = write(
            dir.path(),
            "project.json",
            &json!({"classifier": {"fallbackConfidence": 0.5},
                    "enrich": {"onMalformed": "abort"}}),
        );

        let config = Config::load_layers(&[global, project]).unwrap();
        assert!((config.classifier.confidence_cap - 0.98).abs() < 1e-9);
        assert!((config.classifier.fallback_confidence - 0.5).abs() < 1e-9);
        assert!(config.enrich.parallel);
        assert_eq!(config.enrich.on_malformed, MalformedPolicy::Abort);
    }

    #[test]
    fn invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ invalid json").unwrap();
        assert!(matches!(Config::load_layers(&[path]), Err(Error::Config(_))));
    }

    #[test]
    fn empty_tables_are_rejected_at_load() {
        let dir = tempfile::tempdir().unwrap();
        let rules = write(dir.path(), "rules.json", &json!({"rules": []}));
        assert!(matches!(Config::load_layers(&[rules]), Err(Error::Config(_))));

        let keywords = write(dir.path(), "kw.json", &json!({"keywords": []}));
        assert!(matches!(Config::load_layers(&[keywords]), Err(Error::Config(_))));
    }

    #[test]
    fn unknown_category_label_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "settings.json",
            &json!({"rules": [{"name": "x", "pattern": "x", "category": "Gremlins", "confidence": 0.9}]}),
        );
        assert!(matches!(Config::load_layers(&[path]), Err(Error::Config(_))));
    }

    #[test]
    fn custom_tables_replace_builtins() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "settings.json",
            &json!({
                "rules": [{"name": "gateway", "pattern": "bad gateway", "category": "External Dependency Failure", "confidence": 0.92}],
                "keywords": [{"keyword": "flaky", "category": "Timeout", "weight": 1.0}],
                "classifier": {"fallbackCategory": "Unknown"}
            }),
        );
        let config = Config::load_layers(&[path]).unwrap();
        let classifier = config.build_classifier().unwrap();
        assert_eq!(classifier.rules().len(), 1);
        assert_eq!(
            classifier.classify_text("502 bad gateway").category,
            Category::ExternalDependency
        );
        assert_eq!(classifier.classify_text("timeout").category, Category::Unknown);
    }

    #[test]
    fn inconsistent_constants_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "settings.json",
            &json!({"classifier": {"baseConfidence": 0.97, "confidenceCap": 0.9}}),
        );
        assert!(Config::load_layers(&[path]).is_err());

        let path = write(
            dir.path(),
            "fallback.json",
            &json!({"classifier": {"fallbackCategory": "Timeout"}}),
        );
        assert!(Config::load_layers(&[path]).is_err());
    }

    #[test]
    fn empty_allow_list_is_rejected() {
        let config = Config {
            enrich: EnrichOptions {
                allowed_categories: Some(Vec::new()),
                ..EnrichOptions::default()
            },
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn explicit_file_must_exist() {
        let err = Config::load_with(Some(Path::new("/no/such/explicit.json"))).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn arrays_replace_instead_of_merging() {
        let mut base = json!({"enrich": {"allowedCategories": ["Timeout", "Other"]}});
        merge_json(&mut base, json!({"enrich": {"allowedCategories": ["Infra"]}}));
        assert_eq!(base["enrich"]["allowedCategories"], json!(["Infra"]));
    }
}
