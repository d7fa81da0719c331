use std::future::Future;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::similarity_search::SearchResult;

/// Name of the per-group folder receiving analysis records
pub const ANALYSIS_FOLDER: &str = "analysis";

/// Suffix the feature extractor appends to an audio file stem
pub const ANALYSIS_SUFFIX: &str = "_analysis.json";

/// A primary item and its ranked similar items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityGroup {
    pub primary: String,
    pub similar: Vec<SearchResult>,
}

impl SimilarityGroup {
    pub fn similar_ids(&self) -> impl Iterator<Item = &str> {
        self.similar.iter().map(|result| result.id.as_str())
    }

    /// Similar ids followed by the primary, the order files are copied in
    pub fn members(&self) -> impl Iterator<Item = &str> {
        self.similar_ids().chain(std::iter::once(self.primary.as_str()))
    }
}

/// A file the sink could not copy
#[derive(Debug, Clone, PartialEq)]
pub struct CopyFailure {
    pub path: PathBuf,
    pub message: String,
}

/// Outcome of emitting one group
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SinkReport {
    pub copied: usize,
    pub skipped: usize,
    pub failures: Vec<CopyFailure>,
}

impl SinkReport {
    fn fail(&mut self, path: &Path, message: impl Into<String>) {
        let message = message.into();
        log::warn!("⚠️ {}: {}", path.display(), message);
        self.failures.push(CopyFailure {
            path: path.to_path_buf(),
            message,
        });
    }
}

/// Receives every computed group
///
/// The partitioner awaits `emit` before it updates its grouping state, so all
/// side effects for a group complete before the next batch starts. Failures
/// are reported per file in the returned [`SinkReport`] and never abort a run.
pub trait GroupingSink {
    fn emit<'a>(&'a mut self, group: &'a SimilarityGroup) -> impl Future<Output = SinkReport> + Send + 'a;
}

/// Copies each group's audio files and analysis records into
/// `<base>/<primary>/` and `<base>/<primary>/analysis/`
///
/// Audio files are looked up in the parent of the data directory, analysis
/// records (`<stem>_analysis.json`) in the data directory itself.
#[derive(Debug, Clone)]
pub struct FolderSink {
    base_path: PathBuf,
    data_path: PathBuf,
    source_root: PathBuf,
}

impl FolderSink {
    pub fn new(base_path: impl Into<PathBuf>, data_path: impl Into<PathBuf>) -> Self {
        let data_path = data_path.into();
        let source_root = data_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| data_path.clone());
        Self {
            base_path: base_path.into(),
            data_path,
            source_root,
        }
    }

    pub fn target_folder(&self, primary: &str) -> PathBuf {
        self.base_path.join(primary)
    }

    /// Analysis record path for an item id
    pub fn analysis_source(&self, id: &str) -> PathBuf {
        let stem = Path::new(id).with_extension("");
        self.data_path
            .join(format!("{}{}", stem.to_string_lossy(), ANALYSIS_SUFFIX))
    }

    async fn copy_group(&self, group: &SimilarityGroup) -> SinkReport {
        let mut report = SinkReport::default();
        if group.similar.is_empty() {
            log::info!("📭 No similar sounds for {}, nothing to copy", group.primary);
            return report;
        }

        let target_folder = self.target_folder(&group.primary);
        let analysis_folder = target_folder.join(ANALYSIS_FOLDER);
        if let Err(e) = tokio::fs::create_dir_all(&analysis_folder).await {
            report.fail(&analysis_folder, format!("failed to create folder: {}", e));
            return report;
        }

        for id in group.members() {
            let source = self.source_root.join(id);
            if !exists(&source).await {
                report.fail(&source, "file not found");
                continue;
            }

            copy_into(&source, &target_folder, &mut report).await;
            copy_into(&self.analysis_source(id), &analysis_folder, &mut report).await;
        }

        log::info!(
            "📁 Copied similar sounds for {} to {} ({} copied, {} already present, {} failed)",
            group.primary,
            target_folder.display(),
            report.copied,
            report.skipped,
            report.failures.len()
        );
        report
    }
}

impl GroupingSink for FolderSink {
    fn emit<'a>(&'a mut self, group: &'a SimilarityGroup) -> impl Future<Output = SinkReport> + Send + 'a {
        async move { self.copy_group(group).await }
    }
}

async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

/// Copy `source` into `folder` unless a file of that name is already there
async fn copy_into(source: &Path, folder: &Path, report: &mut SinkReport) {
    let Some(file_name) = source.file_name() else {
        report.fail(source, "path has no file name");
        return;
    };

    let destination = folder.join(file_name);
    if exists(&destination).await {
        report.skipped += 1;
        return;
    }

    log::debug!("📄 Copying {} to {}", source.display(), folder.display());
    match tokio::fs::copy(source, &destination).await {
        Ok(_) => report.copied += 1,
        Err(e) => report.fail(source, format!("copy failed: {}", e)),
    }
}

/// Keeps emitted groups in memory; used for dry runs and tests
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub groups: Vec<SimilarityGroup>,
}

impl GroupingSink for RecordingSink {
    fn emit<'a>(&'a mut self, group: &'a SimilarityGroup) -> impl Future<Output = SinkReport> + Send + 'a {
        async move {
            log::info!(
                "📝 {} -> [{}]",
                group.primary,
                group.similar_ids().collect::<Vec<_>>().join(", ")
            );
            self.groups.push(group.clone());
            SinkReport::default()
        }
    }
}
