//! Per-column z-score standardization
//!
//! Statistics are fitted over exactly the rows being compared (the active
//! candidate pool of the current batch), so they change as the pool shrinks.
//! Nothing is cached between calls and the feature table is never modified:
//! standardized values live in a [`FeatureMatrix`] overlay.

use crate::errors::SimilarityResult;
use crate::feature_table::FeatureTable;

/// Population mean and standard deviation of one column
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnStats {
    pub mean: f64,
    pub std_dev: f64,
}

impl ColumnStats {
    /// Fit over the non-null values. An empty input yields mean 0, deviation 0.
    pub fn fit<I>(values: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let values: Vec<f64> = values.into_iter().collect();
        if values.is_empty() {
            return Self { mean: 0.0, std_dev: 0.0 };
        }

        let count = values.len() as f64;
        let mean = values.iter().sum::<f64>() / count;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count;

        Self {
            mean,
            std_dev: variance.sqrt(),
        }
    }

    /// Divisor used by [`transform`](Self::transform)
    ///
    /// A constant column has zero deviation; it is scaled by 1 so every value
    /// standardizes to 0 and the column adds nothing to a distance.
    pub fn scale(&self) -> f64 {
        if self.std_dev == 0.0 || !self.std_dev.is_finite() {
            1.0
        } else {
            self.std_dev
        }
    }

    pub fn transform(&self, value: f64) -> f64 {
        (value - self.mean) / self.scale()
    }

    pub fn inverse(&self, standardized: f64) -> f64 {
        standardized * self.scale() + self.mean
    }
}

/// Row-major matrix of compared values for a set of table rows
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    columns: Vec<String>,
    rows: Vec<usize>,
    values: Vec<Vec<Option<f64>>>,
    stats: Option<Vec<ColumnStats>>,
}

impl FeatureMatrix {
    /// Raw values, no standardization
    pub fn raw(table: &FeatureTable, rows: &[usize], columns: &[String]) -> SimilarityResult<Self> {
        let values = gather(table, rows, columns)?;
        Ok(Self {
            columns: columns.to_vec(),
            rows: rows.to_vec(),
            values,
            stats: None,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Table rows backing each matrix position
    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of the item at `position` (not the table row)
    pub fn row(&self, position: usize) -> &[Option<f64>] {
        &self.values[position]
    }

    /// Position of a table row inside the matrix
    pub fn position_of(&self, table_row: usize) -> Option<usize> {
        self.rows.iter().position(|&row| row == table_row)
    }

    /// Fitted statistics, present only for standardized matrices
    pub fn stats(&self) -> Option<&[ColumnStats]> {
        self.stats.as_deref()
    }
}

/// Z-score standardization over a row subset
pub struct Standardizer;

impl Standardizer {
    /// Standardize `columns` over `rows`, returning an overlay matrix
    pub fn standardize(
        table: &FeatureTable,
        rows: &[usize],
        columns: &[String],
    ) -> SimilarityResult<FeatureMatrix> {
        let mut values = gather(table, rows, columns)?;

        let stats: Vec<ColumnStats> = (0..columns.len())
            .map(|col| ColumnStats::fit(values.iter().filter_map(|row| row[col])))
            .collect();

        for row in &mut values {
            for (cell, column_stats) in row.iter_mut().zip(&stats) {
                *cell = cell.map(|value| column_stats.transform(value));
            }
        }

        Ok(FeatureMatrix {
            columns: columns.to_vec(),
            rows: rows.to_vec(),
            values,
            stats: Some(stats),
        })
    }
}

fn gather(
    table: &FeatureTable,
    rows: &[usize],
    columns: &[String],
) -> SimilarityResult<Vec<Vec<Option<f64>>>> {
    let column_values = columns
        .iter()
        .map(|name| table.column_values(name))
        .collect::<SimilarityResult<Vec<_>>>()?;

    Ok(rows
        .iter()
        .map(|&row| column_values.iter().map(|values| values[row]).collect())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ItemRecord;

    const TOLERANCE: f64 = 1e-9;

    fn table_with(values: &[Option<f64>]) -> FeatureTable {
        FeatureTable::from_records(
            values
                .iter()
                .enumerate()
                .map(|(i, value)| match value {
                    Some(v) => ItemRecord::new(format!("f{}", i)).with_feature("stats_x", *v),
                    None => ItemRecord::new(format!("f{}", i)).with_null("stats_x"),
                })
                .collect(),
        )
    }

    #[test]
    fn test_fit_population_statistics() {
        let stats = ColumnStats::fit(vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((stats.mean - 5.0).abs() < TOLERANCE);
        assert!((stats.std_dev - 2.0).abs() < TOLERANCE);
    }

    #[test]
    fn test_standardized_column_has_zero_mean_unit_variance() {
        let table = table_with(&[Some(1.0), Some(2.0), Some(3.0), Some(10.0)]);
        let rows: Vec<usize> = (0..table.len()).collect();
        let columns = vec!["stats_x".to_string()];

        let matrix = Standardizer::standardize(&table, &rows, &columns).unwrap();
        let values: Vec<f64> = (0..matrix.len()).filter_map(|p| matrix.row(p)[0]).collect();

        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
        assert!(mean.abs() < TOLERANCE);
        assert!((variance - 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn test_inverse_reconstructs_original_values() {
        let original = [Some(0.5), Some(-3.25), Some(12.0), Some(7.75)];
        let table = table_with(&original);
        let rows: Vec<usize> = (0..table.len()).collect();
        let columns = vec!["stats_x".to_string()];

        let matrix = Standardizer::standardize(&table, &rows, &columns).unwrap();
        let stats = matrix.stats().unwrap()[0];
        for (position, expected) in original.iter().enumerate() {
            let restored = stats.inverse(matrix.row(position)[0].unwrap());
            assert!((restored - expected.unwrap()).abs() < TOLERANCE);
        }
    }

    #[test]
    fn test_constant_column_standardizes_to_zero() {
        let table = table_with(&[Some(5.0), Some(5.0), Some(5.0)]);
        let rows: Vec<usize> = (0..table.len()).collect();
        let matrix = Standardizer::standardize(&table, &rows, &["stats_x".to_string()]).unwrap();

        for position in 0..matrix.len() {
            assert_eq!(matrix.row(position)[0], Some(0.0));
        }
        assert_eq!(matrix.stats().unwrap()[0].scale(), 1.0);
    }

    #[test]
    fn test_nulls_are_ignored_when_fitting_and_kept_null() {
        let table = table_with(&[Some(1.0), None, Some(3.0)]);
        let rows: Vec<usize> = (0..table.len()).collect();
        let matrix = Standardizer::standardize(&table, &rows, &["stats_x".to_string()]).unwrap();

        assert_eq!(matrix.stats().unwrap()[0].mean, 2.0);
        assert_eq!(matrix.row(1)[0], None);
        assert_eq!(matrix.row(0)[0], Some(-1.0));
        assert_eq!(matrix.row(2)[0], Some(1.0));
    }

    #[test]
    fn test_fit_uses_only_selected_rows() {
        let table = table_with(&[Some(1.0), Some(3.0), Some(100.0)]);
        let matrix = Standardizer::standardize(&table, &[0, 1], &["stats_x".to_string()]).unwrap();

        assert_eq!(matrix.len(), 2);
        assert_eq!(matrix.stats().unwrap()[0].mean, 2.0);
        assert_eq!(matrix.position_of(1), Some(1));
        assert_eq!(matrix.position_of(2), None);
    }

    #[test]
    fn test_raw_matrix_has_no_stats() {
        let table = table_with(&[Some(1.0), Some(3.0)]);
        let matrix = FeatureMatrix::raw(&table, &[1, 0], &["stats_x".to_string()]).unwrap();
        assert!(matrix.stats().is_none());
        assert_eq!(matrix.row(0)[0], Some(3.0));
        assert_eq!(matrix.rows(), &[1, 0]);
    }
}
