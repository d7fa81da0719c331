use std::path::Path;
use crate::errors::{SimilarityError, SimilarityResult};

/// Validate that the data path is an existing directory
pub fn validate_is_directory(path: &Path) -> SimilarityResult<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(SimilarityError::NotADirectory {
            path: path.to_string_lossy().to_string(),
        })
    }
}

/// Validate that a file carries the analysis record extension
pub fn is_analysis_record(path: &Path) -> bool {
    path.is_file() && matches!(path.extension(), Some(ext) if ext == "json")
}

/// Validate the number of similar items requested per group
pub fn validate_result_count(n: usize) -> SimilarityResult<()> {
    if n == 0 {
        return Err(SimilarityError::config("n must be at least 1"));
    }
    Ok(())
}

/// Validate a class (namespace) token
pub fn validate_class_token(class: &str) -> SimilarityResult<()> {
    if class.trim().is_empty() {
        return Err(SimilarityError::config("class must not be empty"));
    }
    if class.contains('_') {
        return Err(SimilarityError::config(format!(
            "class '{}' must be a single namespace token without '_'",
            class
        )));
    }
    Ok(())
}

/// Validate a weight value from the options document
pub fn validate_weight(key: &str, weight: f64) -> SimilarityResult<()> {
    if !weight.is_finite() {
        return Err(SimilarityError::config(format!(
            "weight for '{}' must be a finite number, got {}",
            key, weight
        )));
    }
    Ok(())
}
