//! # Configuration
//!
//! Search settings and per-model search spaces, loadable from TOML:
//!
//! ```toml
//! [search]
//! cv = 3
//! error_score = "nan"
//! n_jobs = 4
//!
//! [params."Random Forest"]
//! n_estimators = [8, 16, 32]
//!
//! [params."K-Neighbors"]
//! n_neighbors = [3, 5]
//! weights = ["uniform", "distance"]
//! ```

use crate::error::{PipelineError, PipelineErrorKind};
use crate::model_selection::ErrorScore;
use crate::params::ParamGrid;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Number of cross-validation folds used when nothing else is configured.
pub const DEFAULT_CV_FOLDS: usize = 3;

/// Settings applied to every grid search run by the evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub cv: usize,
    pub error_score: ErrorScore,
    /// Candidates evaluated concurrently; unset means sequential.
    pub n_jobs: Option<usize>,
    pub verbose: u8,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            cv: DEFAULT_CV_FOLDS,
            error_score: ErrorScore::Nan,
            n_jobs: None,
            verbose: 0,
        }
    }
}

impl SearchConfig {
    #[track_caller]
    pub fn from_toml_str(text: &str) -> Result<Self, PipelineError> {
        let config: SearchConfig = parse_toml(text)?;
        config.validate()?;
        Ok(config)
    }

    #[track_caller]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    #[track_caller]
    fn validate(&self) -> Result<(), PipelineError> {
        if self.cv < 2 {
            return Err(PipelineError::new(PipelineErrorKind::Config(format!(
                "cv must be at least 2, got {}",
                self.cv
            ))));
        }
        if self.n_jobs == Some(0) {
            return Err(PipelineError::new(PipelineErrorKind::Config(
                "n_jobs must be at least 1".to_string(),
            )));
        }
        Ok(())
    }
}

/// A full evaluation setup: search settings plus one search space per model name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub search: SearchConfig,
    pub params: BTreeMap<String, ParamGrid>,
}

impl EvaluationConfig {
    #[track_caller]
    pub fn from_toml_str(text: &str) -> Result<Self, PipelineError> {
        let config: EvaluationConfig = parse_toml(text)?;
        config.search.validate()?;
        Ok(config)
    }

    #[track_caller]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

#[track_caller]
fn parse_toml<T: serde::de::DeserializeOwned>(text: &str) -> Result<T, PipelineError> {
    toml::from_str(text).map_err(|e| PipelineError::new(PipelineErrorKind::Config(e.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_document_uses_defaults() {
        let config = SearchConfig::from_toml_str("").unwrap();
        assert_eq!(config, SearchConfig::default());
        assert_eq!(config.cv, 3);
    }

    #[test]
    fn parses_full_evaluation_config() {
        let text = r#"
            [search]
            cv = 5
            error_score = "raise"
            n_jobs = 2

            [params."Random Forest"]
            n_estimators = [8, 16]
            max_depth = [4, "none"]

            [params."Linear Regression"]
        "#;
        let config = EvaluationConfig::from_toml_str(text).unwrap();
        assert_eq!(config.search.cv, 5);
        assert_eq!(config.search.error_score, ErrorScore::Raise);
        assert_eq!(config.search.n_jobs, Some(2));
        assert_eq!(config.params["Random Forest"].len(), 4);
        assert_eq!(config.params["Linear Regression"].len(), 1);
    }

    #[test]
    fn rejects_single_fold() {
        let err = SearchConfig::from_toml_str("cv = 1").unwrap_err();
        assert!(matches!(err.kind(), PipelineErrorKind::Config(_)));
    }

    #[test]
    fn malformed_toml_is_config_error() {
        let err = EvaluationConfig::from_toml_str("[search\ncv = ").unwrap_err();
        assert!(matches!(err.kind(), PipelineErrorKind::Config(_)));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("search.toml");
        std::fs::write(&path, "cv = 4\nverbose = 1\n").unwrap();
        let config = SearchConfig::from_file(&path).unwrap();
        assert_eq!(config.cv, 4);
        assert_eq!(config.verbose, 1);
    }
}
