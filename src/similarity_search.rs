//! Similarity ranking over tabular audio descriptors
//!
//! Every ranking mode compares one reference item against a pool of candidate
//! rows and returns `(id, distance)` pairs, ascending by distance.
//!
//! ## Modes
//!
//! - **Standardized:** one named column of a namespace, or the whole namespace,
//!   z-scored over the candidate pool, compared with plain Euclidean distance.
//! - **Weighted:** the whole namespace, z-scored, each per-column difference
//!   scaled by a weight before squaring:
//!   ```text
//!   d(a, b) = sqrt( Σ ((a[i] - b[i]) * w[i])² )
//!   ```
//!   Weights default to 1 (or 0 with `exclusive_weights`).
//! - **Classification:** classifier outputs (`classifications_*`, optionally
//!   narrowed by a sub-category token) compared raw, without standardization.
//!
//! ## Ordering
//!
//! Results are sorted with a stable sort, so equal distances keep the row
//! order of the candidate pool. The reference item never appears in its own
//! results, and fewer than `n` candidates is not an error.

use std::cmp::Ordering;
use serde::{Deserialize, Serialize};
use crate::errors::{SimilarityError, SimilarityResult};
use crate::feature_table::FeatureTable;
use crate::options::DistanceOptions;
use crate::standardizer::{FeatureMatrix, Standardizer};
use crate::types::{Namespace, COLUMN_SEPARATOR};

/// One ranked candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Candidate item identifier
    pub id: String,
    /// Distance to the reference item (0 = identical over compared columns)
    pub distance: f64,
}

/// Ranking mode chosen for a run
#[derive(Debug, Clone, PartialEq)]
pub enum SearchMode {
    Standardized {
        namespace: Namespace,
        metric: Option<String>,
        n: usize,
    },
    Weighted(DistanceOptions),
    Classification {
        category: Option<String>,
        n: usize,
    },
}

impl SearchMode {
    /// Number of similar items requested per reference
    pub fn n(&self) -> usize {
        match self {
            SearchMode::Standardized { n, .. } => *n,
            SearchMode::Weighted(options) => options.n,
            SearchMode::Classification { n, .. } => *n,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SearchMode::Standardized { metric: Some(_), .. } => "single-metric",
            SearchMode::Standardized { metric: None, .. } => "all-metric",
            SearchMode::Weighted(_) => "weighted",
            SearchMode::Classification { .. } => "classification",
        }
    }
}

/// Distance computations and ranking entry points
pub struct SimilaritySearch;

impl SimilaritySearch {
    /// Euclidean distance between two equally sized vectors
    ///
    /// # Errors
    ///
    /// * `DimensionMismatch` - If the vectors have different lengths
    pub fn euclidean_distance(vector_a: &[f64], vector_b: &[f64]) -> SimilarityResult<f64> {
        check_dimensions(vector_a.len(), vector_b.len())?;

        let sum_sq: f64 = vector_a
            .iter()
            .zip(vector_b)
            .map(|(a, b)| (a - b).powi(2))
            .sum();

        Ok(sum_sq.sqrt())
    }

    /// Euclidean distance with each difference scaled by its weight before
    /// squaring, so a weight of 2 counts the column four times as much
    pub fn weighted_euclidean_distance(
        vector_a: &[f64],
        vector_b: &[f64],
        weights: &[f64],
    ) -> SimilarityResult<f64> {
        check_dimensions(vector_a.len(), vector_b.len())?;
        check_dimensions(vector_a.len(), weights.len())?;

        let sum_sq: f64 = vector_a
            .iter()
            .zip(vector_b)
            .zip(weights)
            .map(|((a, b), w)| ((a - b) * w).powi(2))
            .sum();

        Ok(sum_sq.sqrt())
    }

    /// Rank `rows` against `identifier` using the given mode
    pub fn rank(
        table: &FeatureTable,
        rows: &[usize],
        identifier: &str,
        mode: &SearchMode,
    ) -> SimilarityResult<Vec<SearchResult>> {
        match mode {
            SearchMode::Standardized { namespace, metric, n } => {
                Self::find_n_most_similar(table, rows, identifier, metric.as_deref(), *n, namespace)
            }
            SearchMode::Weighted(options) => {
                Self::find_n_most_similar_weighted(table, rows, identifier, options)
            }
            SearchMode::Classification { category, n } => {
                Self::find_n_most_similar_classifications(table, rows, identifier, category.as_deref(), *n)
            }
        }
    }

    /// Find the `n` items closest to `identifier` over one metric or a whole
    /// namespace, after standardizing over the candidate pool
    ///
    /// # Errors
    ///
    /// * `UnknownMetric` - If `<namespace>_<metric>` is not a column
    /// * `Config` - If the namespace has no columns
    /// * `NotFound` - If `identifier` is not in the candidate pool
    /// * `InvalidRow` - If the reference has a null compared value
    pub fn find_n_most_similar(
        table: &FeatureTable,
        rows: &[usize],
        identifier: &str,
        metric: Option<&str>,
        n: usize,
        namespace: &Namespace,
    ) -> SimilarityResult<Vec<SearchResult>> {
        let columns = match metric {
            Some(metric) => {
                let column = namespace.column_for(metric);
                if !table.has_column(&column) {
                    return Err(SimilarityError::UnknownMetric { metric: column });
                }
                vec![column]
            }
            None => namespace_columns(table, namespace)?,
        };

        let matrix = Standardizer::standardize(table, rows, &columns)?;
        rank_matrix(table, &matrix, identifier, None, n)
    }

    /// Find the `n` closest items using weighted Euclidean distance over the
    /// standardized columns of `options.class`
    ///
    /// # Errors
    ///
    /// * `Config` - If a weight names a column that does not exist, or the
    ///   namespace has no columns
    /// * `NotFound` - If `identifier` is not in the candidate pool
    /// * `InvalidRow` - If the reference has a null compared value
    pub fn find_n_most_similar_weighted(
        table: &FeatureTable,
        rows: &[usize],
        identifier: &str,
        options: &DistanceOptions,
    ) -> SimilarityResult<Vec<SearchResult>> {
        let columns = namespace_columns(table, &options.namespace())?;
        let weights = Self::resolve_weights(&columns, options)?;

        let matrix = Standardizer::standardize(table, rows, &columns)?;
        rank_matrix(table, &matrix, identifier, Some(&weights), options.n)
    }

    /// Find the `n` closest items over raw classifier outputs
    ///
    /// `category` keeps only the columns under `classifications_<category>`,
    /// matched on whole `_`-separated tokens.
    pub fn find_n_most_similar_classifications(
        table: &FeatureTable,
        rows: &[usize],
        identifier: &str,
        category: Option<&str>,
        n: usize,
    ) -> SimilarityResult<Vec<SearchResult>> {
        let namespace = Namespace::Classifications;
        let mut columns = namespace_columns(table, &namespace)?;

        if let Some(category) = category {
            columns.retain(|column| in_sub_category(column, &namespace, category));
            if columns.is_empty() {
                return Err(SimilarityError::UnknownMetric {
                    metric: namespace.column_for(category),
                });
            }
        }

        let matrix = FeatureMatrix::raw(table, rows, &columns)?;
        rank_matrix(table, &matrix, identifier, None, n)
    }

    /// Per-column weights aligned with `columns`
    pub fn resolve_weights(columns: &[String], options: &DistanceOptions) -> SimilarityResult<Vec<f64>> {
        let mut weights = vec![options.default_weight(); columns.len()];
        let namespace = options.namespace();

        for (key, weight) in &options.weights {
            let column = namespace.column_for(key);
            match columns.iter().position(|name| *name == column) {
                Some(idx) => weights[idx] = *weight,
                None => {
                    return Err(SimilarityError::config(format!(
                        "weight '{}' does not match any column (looked for '{}')",
                        key, column
                    )))
                }
            }
        }

        Ok(weights)
    }
}

fn check_dimensions(query_dim: usize, target_dim: usize) -> SimilarityResult<()> {
    if query_dim != target_dim {
        return Err(SimilarityError::DimensionMismatch { query_dim, target_dim });
    }
    Ok(())
}

/// Column is `<namespace>_<category>` or nested below it
fn in_sub_category(column: &str, namespace: &Namespace, category: &str) -> bool {
    let prefix = namespace.column_for(category);
    match column.strip_prefix(prefix.as_str()) {
        Some(rest) => rest.is_empty() || rest.starts_with(COLUMN_SEPARATOR),
        None => false,
    }
}

fn namespace_columns(table: &FeatureTable, namespace: &Namespace) -> SimilarityResult<Vec<String>> {
    let columns = table.columns_matching(namespace);
    if columns.is_empty() {
        return Err(SimilarityError::config(format!(
            "no columns found for class '{}'",
            namespace
        )));
    }
    Ok(columns.to_vec())
}

/// Distance from the reference to every other matrix row, sorted and truncated
fn rank_matrix(
    table: &FeatureTable,
    matrix: &FeatureMatrix,
    identifier: &str,
    weights: Option<&[f64]>,
    n: usize,
) -> SimilarityResult<Vec<SearchResult>> {
    let reference_row = table.row_for(identifier)?;
    let reference_pos = matrix
        .position_of(reference_row)
        .ok_or_else(|| SimilarityError::NotFound { id: identifier.to_string() })?;

    let reference = complete_values(matrix, reference_pos).map_err(|column| SimilarityError::InvalidRow {
        id: identifier.to_string(),
        column,
    })?;

    let mut results = Vec::with_capacity(matrix.len().saturating_sub(1));
    for position in 0..matrix.len() {
        if position == reference_pos {
            continue;
        }

        let candidate_id = table.id_at(matrix.rows()[position]);
        let candidate = match complete_values(matrix, position) {
            Ok(values) => values,
            Err(column) => {
                log::debug!("🔍 Skipping candidate {}: null value in {}", candidate_id, column);
                continue;
            }
        };

        let distance = match weights {
            Some(weights) => SimilaritySearch::weighted_euclidean_distance(&reference, &candidate, weights)?,
            None => SimilaritySearch::euclidean_distance(&reference, &candidate)?,
        };

        results.push(SearchResult {
            id: candidate_id.to_string(),
            distance,
        });
    }

    // stable: ties keep candidate pool order
    results.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(Ordering::Equal));
    log::trace!("📏 Distances for {}: {:?}", identifier, results);

    results.truncate(n);
    Ok(results)
}

/// Values at `position`, or the name of the first null column
fn complete_values(matrix: &FeatureMatrix, position: usize) -> Result<Vec<f64>, String> {
    matrix
        .row(position)
        .iter()
        .zip(matrix.columns())
        .map(|(value, column)| value.ok_or_else(|| column.clone()))
        .collect()
}
