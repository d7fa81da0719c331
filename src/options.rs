use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::errors::{IOErrorContext, SimilarityError, SimilarityResult};
use crate::similarity_search::SearchMode;
use crate::types::Namespace;
use crate::validation;

/// Default file name of the weighted distance options document
pub const DEFAULT_OPTIONS_FILE: &str = "metric_ops.yaml";

/// Weighted distance options, loaded once per run
///
/// ```yaml
/// class: stats
/// n: 5
/// exclusive_weights: false
/// weights:
///   lowlevel_loudness_ebu128_integrated: 2.0
///   rhythm_bpm: 0.5
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DistanceOptions {
    /// Namespace of the compared columns
    pub class: String,
    /// Number of similar items to return
    pub n: usize,
    /// Column suffix (after `<class>_`) to weight
    #[serde(default)]
    pub weights: BTreeMap<String, f64>,
    /// When set, columns missing from `weights` get weight 0 instead of 1
    #[serde(default)]
    pub exclusive_weights: bool,
}

impl DistanceOptions {
    pub fn load(path: &Path) -> SimilarityResult<Self> {
        let path_str = path.to_string_lossy();
        let content = fs::read_to_string(path).with_path_context(&path_str, "read options")?;
        let options = Self::from_yaml_str(&content).map_err(|e| match e {
            SimilarityError::Config { message } => SimilarityError::Config {
                message: format!("{}: {}", path_str, message),
            },
            other => other,
        })?;
        log::info!(
            "⚖️ Loaded distance options from {} ({} weights, exclusive: {})",
            path.display(),
            options.weights.len(),
            options.exclusive_weights
        );
        Ok(options)
    }

    pub fn from_yaml_str(content: &str) -> SimilarityResult<Self> {
        let options: Self = serde_yaml::from_str(content)
            .map_err(|e| SimilarityError::config(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> SimilarityResult<()> {
        validation::validate_class_token(&self.class)?;
        validation::validate_result_count(self.n)?;
        for (key, weight) in &self.weights {
            validation::validate_weight(key, *weight)?;
        }
        Ok(())
    }

    pub fn namespace(&self) -> Namespace {
        Namespace::from_token(self.class.trim())
    }

    /// Weight applied to columns without an explicit entry
    pub fn default_weight(&self) -> f64 {
        if self.exclusive_weights {
            0.0
        } else {
            1.0
        }
    }
}

/// Everything the command surface hands to a run
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub data_path: PathBuf,
    pub identifier: Option<String>,
    pub base_path: PathBuf,
    pub class: Namespace,
    pub metric: Option<String>,
    pub n: usize,
    pub options: Option<DistanceOptions>,
    /// Stop once this many items are grouped; `None` means the whole corpus
    pub n_max: Option<usize>,
}

impl RunSettings {
    pub fn validate(&self) -> SimilarityResult<()> {
        validation::validate_result_count(self.n)?;
        if let Some(metric) = &self.metric {
            if metric.trim().is_empty() {
                return Err(SimilarityError::config("metric must not be empty"));
            }
        }
        if let Some(options) = &self.options {
            options.validate()?;
        }
        Ok(())
    }

    /// Pick the ranking mode for this run
    ///
    /// The classifications class always compares raw classifier outputs (the
    /// metric, if any, narrows it to one sub-category). Otherwise an options
    /// document selects weighted mode, and plain standardized Euclidean is the
    /// fallback.
    pub fn search_mode(&self) -> SearchMode {
        if self.class == Namespace::Classifications {
            return SearchMode::Classification {
                category: self.metric.clone(),
                n: self.n,
            };
        }
        match &self.options {
            Some(options) => SearchMode::Weighted(options.clone()),
            None => SearchMode::Standardized {
                namespace: self.class.clone(),
                metric: self.metric.clone(),
                n: self.n,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn settings() -> RunSettings {
        RunSettings {
            data_path: PathBuf::from("data/analysis"),
            identifier: None,
            base_path: PathBuf::from("similar_files"),
            class: Namespace::Stats,
            metric: None,
            n: 5,
            options: None,
            n_max: None,
        }
    }

    #[test]
    fn test_parse_full_document() {
        let options = DistanceOptions::from_yaml_str(
            "class: stats\nn: 3\nexclusive_weights: true\nweights:\n  bpm: 2.0\n  zcr: 0.5\n",
        )
        .unwrap();

        assert_eq!(options.namespace(), Namespace::Stats);
        assert_eq!(options.n, 3);
        assert!(options.exclusive_weights);
        assert_eq!(options.weights.get("bpm"), Some(&2.0));
        assert_eq!(options.default_weight(), 0.0);
    }

    #[test]
    fn test_optional_fields_default() {
        let options = DistanceOptions::from_yaml_str("class: stats\nn: 5\n").unwrap();
        assert!(options.weights.is_empty());
        assert!(!options.exclusive_weights);
        assert_eq!(options.default_weight(), 1.0);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let result = DistanceOptions::from_yaml_str("class: stats\nn: 5\nweigths: {}\n");
        assert!(matches!(result, Err(SimilarityError::Config { .. })));
    }

    #[test]
    fn test_malformed_values_are_rejected() {
        assert!(DistanceOptions::from_yaml_str("class: stats\nn: 0\n").is_err());
        assert!(DistanceOptions::from_yaml_str("class: stats\nn: five\n").is_err());
        assert!(DistanceOptions::from_yaml_str("class: ''\nn: 5\n").is_err());
        assert!(DistanceOptions::from_yaml_str("n: 5\n").is_err());
        assert!(DistanceOptions::from_yaml_str("class: stats\nn: 5\nweights:\n  bpm: .nan\n").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(DEFAULT_OPTIONS_FILE);
        std::fs::write(&path, "class: stats\nn: 4\nweights:\n  bpm: 3\n").unwrap();

        let options = DistanceOptions::load(&path).unwrap();
        assert_eq!(options.n, 4);
        assert_eq!(options.weights.get("bpm"), Some(&3.0));

        let missing = DistanceOptions::load(&temp_dir.path().join("absent.yaml"));
        assert!(matches!(missing, Err(SimilarityError::Io { .. })));
    }

    #[test]
    fn test_search_mode_selection() {
        let mut run = settings();
        assert!(matches!(run.search_mode(), SearchMode::Standardized { n: 5, .. }));

        run.options = Some(DistanceOptions::from_yaml_str("class: stats\nn: 2\n").unwrap());
        assert!(matches!(run.search_mode(), SearchMode::Weighted(_)));
        assert_eq!(run.search_mode().n(), 2);

        run.class = Namespace::Classifications;
        run.metric = Some("genre".to_string());
        match run.search_mode() {
            SearchMode::Classification { category, n } => {
                assert_eq!(category.as_deref(), Some("genre"));
                assert_eq!(n, 5);
            }
            other => panic!("unexpected mode {:?}", other),
        }
    }

    #[test]
    fn test_run_settings_validation() {
        let mut run = settings();
        assert!(run.validate().is_ok());
        run.n = 0;
        assert!(run.validate().is_err());
        run.n = 1;
        run.metric = Some("  ".to_string());
        assert!(run.validate().is_err());
    }
}
