//! Column-oriented store of flattened descriptor values
//!
//! Every item has a value (possibly null) for every column. Columns are
//! indexed once at construction time by name and by [`Namespace`], so
//! selecting "all `stats` columns" is a lookup rather than a scan.

use std::collections::HashMap;
use crate::errors::{SimilarityError, SimilarityResult};
use crate::performance::time_operation;
use crate::types::{ItemRecord, Namespace};

/// A single named column of per-item values
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

/// In-memory feature table over the whole corpus
#[derive(Debug, Clone, Default)]
pub struct FeatureTable {
    ids: Vec<String>,
    columns: Vec<Column>,
    row_index: HashMap<String, usize>,
    column_index: HashMap<String, usize>,
    namespaces: HashMap<Namespace, Vec<String>>,
}

impl FeatureTable {
    /// Build a table from loaded records
    ///
    /// Column order is first-seen order across the records. A record whose id
    /// was already seen is dropped so lookups resolve to the first match.
    pub fn from_records(records: Vec<ItemRecord>) -> Self {
        time_operation!({
            let mut table = FeatureTable::default();

            for record in records {
                if table.row_index.contains_key(&record.id) {
                    log::warn!("⚠️ Duplicate item id '{}', keeping the first record", record.id);
                    continue;
                }
                table.push_record(record);
            }

            table.index_namespaces();
            log::debug!(
                "📊 Feature table built: {} items x {} columns",
                table.len(),
                table.columns.len()
            );
            table
        }, "build_feature_table")
    }

    fn push_record(&mut self, record: ItemRecord) {
        let row = self.ids.len();

        for (name, value) in record.features {
            let col = match self.column_index.get(&name) {
                Some(&col) => col,
                None => {
                    // columns first seen here are null for every earlier row
                    self.columns.push(Column {
                        name: name.clone(),
                        values: vec![None; row],
                    });
                    self.column_index.insert(name, self.columns.len() - 1);
                    self.columns.len() - 1
                }
            };

            let values = &mut self.columns[col].values;
            if values.len() == row {
                values.push(value);
            } else {
                // repeated name inside one record: last value wins
                values[row] = value;
            }
        }

        for column in &mut self.columns {
            if column.values.len() == row {
                column.values.push(None);
            }
        }

        self.row_index.insert(record.id.clone(), row);
        self.ids.push(record.id);
    }

    fn index_namespaces(&mut self) {
        self.namespaces.clear();
        for column in &self.columns {
            self.namespaces
                .entry(Namespace::of_column(&column.name))
                .or_default()
                .push(column.name.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Item identifiers in row order
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn id_at(&self, row: usize) -> &str {
        &self.ids[row]
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index.contains_key(name)
    }

    /// Ordered column names belonging to a namespace (empty if none)
    pub fn columns_matching(&self, namespace: &Namespace) -> &[String] {
        self.namespaces
            .get(namespace)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Row index of the item with the given id
    pub fn row_for(&self, id: &str) -> SimilarityResult<usize> {
        self.row_index
            .get(id)
            .copied()
            .ok_or_else(|| SimilarityError::NotFound { id: id.to_string() })
    }

    pub fn column_values(&self, name: &str) -> SimilarityResult<&[Option<f64>]> {
        self.column_index
            .get(name)
            .map(|&col| self.columns[col].values.as_slice())
            .ok_or_else(|| SimilarityError::UnknownMetric { metric: name.to_string() })
    }

    /// Value of one cell; `None` for a null cell
    pub fn value(&self, row: usize, column: &str) -> SimilarityResult<Option<f64>> {
        Ok(self.column_values(column)?.get(row).copied().flatten())
    }

    /// Group item ids by equal non-null value in a column
    ///
    /// Groups are ordered by the first row holding each value; rows with a
    /// null value are left out.
    pub fn group_by(&self, column: &str) -> SimilarityResult<Vec<Vec<String>>> {
        let values = self.column_values(column)?;
        let mut groups: Vec<(f64, Vec<String>)> = Vec::new();

        for (row, value) in values.iter().enumerate() {
            let Some(value) = value else { continue };
            match groups.iter_mut().find(|(key, _)| key == value) {
                Some((_, ids)) => ids.push(self.ids[row].clone()),
                None => groups.push((*value, vec![self.ids[row].clone()])),
            }
        }

        Ok(groups.into_iter().map(|(_, ids)| ids).collect())
    }
}
