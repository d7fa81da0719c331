//! soundsift command line
//!
//! Groups analysed sound files into folders of their most similar recordings.

use std::path::PathBuf;
use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use soundsift_lib::options::DEFAULT_OPTIONS_FILE;
use soundsift_lib::{DistanceOptions, Namespace, RecordingSink, RunSettings, SimilarityError};

/// Find the most similar sounds for every analysed file and group them
#[derive(Parser, Debug)]
#[command(name = "soundsift")]
#[command(version)]
#[command(about = "Group analysed sound files by feature similarity")]
struct Cli {
    /// Path to the directory holding the *_analysis.json records
    #[arg(short = 'd', long)]
    data_path: PathBuf,

    /// Identifier to test (runs a single batch for this item)
    #[arg(long = "id", alias = "identifier")]
    identifier: Option<String>,

    /// Base directory to store all similar file groups
    #[arg(long, default_value = "./similar_files")]
    base_path: PathBuf,

    /// Class (descriptor namespace) to analyse
    #[arg(long = "class", default_value = "stats")]
    class: String,

    /// Single metric of the class to compare
    #[arg(short = 'm', long = "metric")]
    metric: Option<String>,

    /// Number of similar sounds to retrieve per group
    #[arg(short = 'n', default_value_t = 5)]
    n: usize,

    /// Use the weighted distance options file
    #[arg(long)]
    ops: bool,

    /// Location of the weighted distance options file
    #[arg(long, default_value = DEFAULT_OPTIONS_FILE)]
    ops_file: PathBuf,

    /// Stop once this many sounds are grouped (default: all)
    #[arg(long)]
    n_max: Option<usize>,

    /// Print the groups instead of copying files
    #[arg(long)]
    dry_run: bool,

    /// Only list the sounds sharing each value of this column
    #[arg(long, value_name = "COLUMN")]
    group_by: Option<String>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn into_settings(self) -> anyhow::Result<RunSettings> {
        let options = if self.ops {
            Some(DistanceOptions::load(&self.ops_file).map_err(user_error)?)
        } else {
            None
        };

        let class: Namespace = self.class.parse().map_err(user_error)?;
        let data_path = self
            .data_path
            .canonicalize()
            .with_context(|| format!("cannot resolve data path {}", self.data_path.display()))?;

        Ok(RunSettings {
            data_path,
            identifier: self.identifier,
            base_path: self.base_path,
            class,
            metric: self.metric,
            n: self.n,
            options,
            n_max: self.n_max,
        })
    }
}

fn user_error(error: SimilarityError) -> anyhow::Error {
    anyhow::anyhow!(error.user_message())
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

async fn execute(cli: Cli) -> anyhow::Result<()> {
    let dry_run = cli.dry_run;
    let group_by = cli.group_by.clone();
    let settings = cli.into_settings()?;

    if let Some(column) = group_by {
        let groups = soundsift_lib::group_by_column(&settings.data_path, &column).map_err(user_error)?;
        for (idx, ids) in groups.iter().enumerate() {
            log::info!("🗂️ group {}: {}", idx + 1, ids.join(", "));
        }
        return Ok(());
    }

    let result = if dry_run {
        let mut sink = RecordingSink::default();
        soundsift_lib::run_with_sink(&settings, &mut sink).await
    } else {
        soundsift_lib::run(&settings).await
    };
    let summary = result.map_err(user_error)?;

    log::info!(
        "🎧 {} groups written, {} sounds grouped, {} left ungrouped",
        summary.groups.len(),
        summary.grouped,
        summary.orphaned.len()
    );
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = execute(cli).await {
        log::error!("❌ {:#}", e);
        std::process::exit(1);
    }
}
