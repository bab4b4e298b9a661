//! Application module
//!
//! One invocation compiles a batch of GPX files and regenerates the manifest:
//! - Create the output directories and open the SRTM tile cache
//! - Clear stale summary records (unless asked to keep them)
//! - Compile every input, on the rayon pool unless running sequentially
//! - Assemble the manifest from the records now on disk

pub(crate) mod settings;

use crate::app::settings::Settings;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use thiserror::Error;
use walk_summary_lib::{
    ArtifactStore, CompileOutcome, SrtmTileCache, WalkCompiler, WalkError, manifest,
};

/// Errors that abort the whole run
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Walk(#[from] WalkError),

    #[error("Cannot read input directory {path}: {source}")]
    InputDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Cannot build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Summary of a completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub compiled: usize,
    pub failed: Vec<PathBuf>,
    pub manifest_walks: usize,
}

impl RunReport {
    /// 0 when every file compiled, 2 when some failed
    pub fn exit_status(&self) -> u8 {
        if self.failed.is_empty() { 0 } else { 2 }
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.exit_status())
    }
}

/// Install the `tracing` subscriber; `RUST_LOG` overrides the default `info` level
pub fn setup_logging() {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer().with_target(false).with_filter(filter);
    let _ = tracing_subscriber::registry().with(fmt_layer).try_init();
}

/// Compile the configured inputs and write the manifest
pub fn run(settings: &Settings) -> Result<RunReport, AppError> {
    let start = Instant::now();

    let store = ArtifactStore::create(&settings.tracks_dir, &settings.summaries_dir)?;
    if !settings.keep_summaries {
        let removed = store.clear_summaries()?;
        tracing::debug!(
            "Cleared {} records from {}",
            removed,
            store.summaries_dir().display()
        );
    }
    let elevation = SrtmTileCache::open(&settings.srtm_cache, settings.tile_cache_size)?;
    tracing::debug!("Reading elevation tiles from {}", elevation.dir().display());

    let inputs = if settings.gpx_files.is_empty() {
        collect_inputs(&settings.input_dir)?
    } else {
        settings.gpx_files.clone()
    };
    tracing::info!("Compiling {} GPX files", inputs.len());

    let compiler = WalkCompiler::new(settings.compiler_config(), store, &elevation);
    let outcomes = match settings.jobs {
        Some(jobs) if !settings.sequential => rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build()?
            .install(|| compiler.compile_all(&inputs)),
        _ => compiler.compile_all(&inputs),
    };
    let (compiled, failed) = partition(outcomes);

    let store = compiler.store();
    let manifest_walks = manifest::write_manifest(store, &store.index()?, &settings.manifest)?;

    tracing::info!(
        "Compiled {} of {} files in {:.3} seconds",
        compiled,
        compiled + failed.len(),
        start.elapsed().as_secs_f64()
    );
    for path in &failed {
        tracing::warn!("Not compiled: {}", path.display());
    }

    Ok(RunReport {
        compiled,
        failed,
        manifest_walks,
    })
}

/// Every `.gpx` file directly inside `dir`, sorted by path
fn collect_inputs(dir: &Path) -> Result<Vec<PathBuf>, AppError> {
    let input_dir_error = |source| AppError::InputDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut inputs = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(input_dir_error)? {
        let path = entry.map_err(input_dir_error)?.path();
        let is_gpx = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("gpx"));
        if is_gpx && path.is_file() {
            inputs.push(path);
        }
    }
    inputs.sort();
    Ok(inputs)
}

fn partition(outcomes: Vec<CompileOutcome>) -> (usize, Vec<PathBuf>) {
    let mut compiled = 0;
    let mut failed = Vec::new();
    for outcome in outcomes {
        match outcome.result {
            Ok(_) => compiled += 1,
            Err(_) => failed.push(outcome.input),
        }
    }
    (compiled, failed)
}
