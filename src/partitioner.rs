//! Exhaustive grouping of a corpus into similarity groups
//!
//! Each batch picks a primary item that is not yet grouped, ranks the items
//! that are still ungrouped against it, hands the group to a
//! [`GroupingSink`] and then marks every member as grouped. Batches run
//! strictly one after another: the sink is awaited before the state update,
//! and the next candidate pool is computed from the updated state.
//!
//! Policies:
//! - a fixed identifier runs exactly one batch;
//! - a primary whose own row cannot be compared (`InvalidRow`) is orphaned
//!   and the run continues;
//! - any other ranking error aborts the run.

use std::collections::{BTreeSet, HashSet};
use crate::errors::SimilarityResult;
use crate::feature_table::FeatureTable;
use crate::grouping::{GroupingSink, SimilarityGroup, SinkReport};
use crate::performance::PerformanceTracker;
use crate::similarity_search::{SearchMode, SimilaritySearch};

/// Run-scoped bookkeeping of which items are still available
///
/// `remaining`, `grouped` and `orphaned` are pairwise disjoint and together
/// hold every id of the corpus.
#[derive(Debug, Clone, Default)]
pub struct GroupingState {
    remaining: BTreeSet<String>,
    grouped: HashSet<String>,
    orphaned: HashSet<String>,
}

impl GroupingState {
    pub fn new<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            remaining: ids.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Next primary candidate: the smallest remaining id
    pub fn next_primary(&self) -> Option<&str> {
        self.remaining.first().map(String::as_str)
    }

    /// Mark a primary and its similar items as grouped
    pub fn record_group<'a, I>(&mut self, primary: &'a str, similar: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        for id in similar.into_iter().chain(std::iter::once(primary)) {
            self.remaining.remove(id);
            self.orphaned.remove(id);
            self.grouped.insert(id.to_string());
        }
    }

    /// Take a primary out of the rotation without grouping it
    pub fn record_orphan(&mut self, primary: &str) {
        if self.remaining.remove(primary) {
            self.orphaned.insert(primary.to_string());
        }
    }

    pub fn is_grouped(&self, id: &str) -> bool {
        self.grouped.contains(id)
    }

    pub fn remaining(&self) -> &BTreeSet<String> {
        &self.remaining
    }

    pub fn grouped(&self) -> &HashSet<String> {
        &self.grouped
    }

    pub fn orphaned(&self) -> &HashSet<String> {
        &self.orphaned
    }

    /// No remaining items, or the grouped count reached `n_max`
    pub fn is_terminal(&self, n_max: Option<usize>) -> bool {
        self.remaining.is_empty() || n_max.is_some_and(|max| self.grouped.len() >= max)
    }
}

/// Settings for one partitioning run
#[derive(Debug, Clone)]
pub struct PartitionSettings {
    pub mode: SearchMode,
    /// Run a single batch for this item instead of the whole corpus
    pub identifier: Option<String>,
    pub n_max: Option<usize>,
}

/// Result of one batch
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    Grouped {
        group: SimilarityGroup,
        report: SinkReport,
    },
    Orphaned {
        primary: String,
        reason: String,
    },
}

/// Totals for a finished run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartitionSummary {
    pub batches: usize,
    pub groups: Vec<SimilarityGroup>,
    pub grouped: usize,
    pub orphaned: Vec<String>,
    pub copy_failures: usize,
}

/// Drives batches over a feature table until the corpus is exhausted
pub struct BatchPartitioner<'t> {
    table: &'t FeatureTable,
    settings: PartitionSettings,
    state: GroupingState,
}

impl<'t> BatchPartitioner<'t> {
    pub fn new(table: &'t FeatureTable, settings: PartitionSettings) -> Self {
        Self {
            table,
            settings,
            state: GroupingState::new(table.ids().iter().cloned()),
        }
    }

    pub fn state(&self) -> &GroupingState {
        &self.state
    }

    /// Table rows of every item not yet grouped, in table order
    pub fn candidate_rows(&self) -> Vec<usize> {
        self.table
            .ids()
            .iter()
            .enumerate()
            .filter(|(_, id)| !self.state.is_grouped(id))
            .map(|(row, _)| row)
            .collect()
    }

    /// Run one batch for `primary`
    pub async fn run_batch<S: GroupingSink>(
        &mut self,
        primary: &str,
        sink: &mut S,
    ) -> SimilarityResult<BatchOutcome> {
        let tracker = PerformanceTracker::start(&format!("batch({})", primary));
        let rows = self.candidate_rows();

        let similar = match SimilaritySearch::rank(self.table, &rows, primary, &self.settings.mode) {
            Ok(similar) => similar,
            Err(e) if e.is_row_local() => {
                log::warn!("⚠️ Leaving {} ungrouped: {}", primary, e);
                self.state.record_orphan(primary);
                return Ok(BatchOutcome::Orphaned {
                    primary: primary.to_string(),
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        };
        tracker.checkpoint("ranked");

        log::info!("🔎 Found {} similar files for {}", similar.len(), primary);
        let group = SimilarityGroup {
            primary: primary.to_string(),
            similar,
        };

        let report = sink.emit(&group).await;
        tracker.checkpoint("emitted");

        self.state.record_group(&group.primary, group.similar_ids());
        tracker.finish();

        Ok(BatchOutcome::Grouped { group, report })
    }

    /// Process batches until the corpus is exhausted or `n_max` is reached
    pub async fn run<S: GroupingSink>(&mut self, sink: &mut S) -> SimilarityResult<PartitionSummary> {
        let mut summary = PartitionSummary::default();
        log::info!(
            "🚀 Grouping {} items ({} mode, n = {})",
            self.table.len(),
            self.settings.mode.label(),
            self.settings.mode.n()
        );

        if let Some(identifier) = self.settings.identifier.clone() {
            self.table.row_for(&identifier)?;
            let outcome = self.run_batch(&identifier, sink).await?;
            summary.record(outcome);
        } else {
            while !self.state.is_terminal(self.settings.n_max) {
                let Some(primary) = self.state.next_primary().map(str::to_string) else {
                    break;
                };
                let outcome = self.run_batch(&primary, sink).await?;
                summary.record(outcome);
            }
        }

        summary.grouped = self.state.grouped().len();
        log::info!(
            "✅ Finished {} batches: {} items grouped, {} orphaned, {} copy failures",
            summary.batches,
            summary.grouped,
            summary.orphaned.len(),
            summary.copy_failures
        );
        Ok(summary)
    }
}

impl PartitionSummary {
    fn record(&mut self, outcome: BatchOutcome) {
        self.batches += 1;
        match outcome {
            BatchOutcome::Grouped { group, report } => {
                self.copy_failures += report.failures.len();
                self.groups.push(group);
            }
            BatchOutcome::Orphaned { primary, .. } => self.orphaned.push(primary),
        }
    }
}
