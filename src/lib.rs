use std::path::Path;

// Module declarations
pub mod performance;
pub mod errors;
pub mod types;
pub mod validation;
pub mod loader;
pub mod feature_table;
pub mod standardizer;
pub mod similarity_search;
pub mod options;
pub mod grouping;
pub mod partitioner;

// Re-exports for commonly used types
pub use errors::{SimilarityError, SimilarityResult};
pub use types::{ItemRecord, Namespace};
pub use feature_table::FeatureTable;
pub use similarity_search::{SearchMode, SearchResult, SimilaritySearch};
pub use options::{DistanceOptions, RunSettings};
pub use grouping::{FolderSink, GroupingSink, RecordingSink, SimilarityGroup};
pub use partitioner::{BatchPartitioner, GroupingState, PartitionSettings, PartitionSummary};

/// Load the corpus and group it with the given sink
pub async fn run_with_sink<S: GroupingSink>(
    settings: &RunSettings,
    sink: &mut S,
) -> SimilarityResult<PartitionSummary> {
    settings.validate()?;

    let records = loader::load_records(&settings.data_path)?;
    let table = FeatureTable::from_records(records);
    if table.is_empty() {
        log::warn!("⚠️ No analysis records found in {}", settings.data_path.display());
        return Ok(PartitionSummary::default());
    }

    let mut partitioner = BatchPartitioner::new(
        &table,
        PartitionSettings {
            mode: settings.search_mode(),
            identifier: settings.identifier.clone(),
            n_max: settings.n_max,
        },
    );
    partitioner.run(sink).await
}

/// Run a full grouping pass, copying groups into `settings.base_path`
pub async fn run(settings: &RunSettings) -> SimilarityResult<PartitionSummary> {
    let mut sink = FolderSink::new(&settings.base_path, &settings.data_path);
    run_with_sink(settings, &mut sink).await
}

/// Load the corpus and list the ids sharing each value of `column`
pub fn group_by_column(data_path: &Path, column: &str) -> SimilarityResult<Vec<Vec<String>>> {
    let table = FeatureTable::from_records(loader::load_records(data_path)?);
    let groups = table.group_by(column)?;
    log::info!("🗂️ {} groups of equal '{}' over {} items", groups.len(), column, table.len());
    Ok(groups)
}
