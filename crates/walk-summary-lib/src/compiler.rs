//! WalkCompiler - Per-file pipeline from raw GPX to committed artifacts
//!
//! Compiling a file runs every stage in memory first (normalization, simplification, elevation
//! lookup, resampling, identification) and only then touches the filesystem. A failure at any
//! stage leaves the input file and all previously committed artifacts untouched.

use crate::elevation::ElevationLookup;
use crate::profile::{self, DEFAULT_SAMPLE_COUNT};
use crate::simplify::simplify;
use crate::store::TRACK_EXTENSION;
use crate::track::encode_points;
use crate::{ArtifactStore, Result, Track, WalkId, WalkMetadata, WalkSummary};

use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Configuration for walk compilation
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Maximum number of samples in the elevation profile.
    /// Default: 100
    pub elevation_samples: usize,
    /// Simplification tolerance in meters, the maximum distance between the recorded points
    /// and the simplified line. Zero disables simplification.
    /// Default: 5.0
    pub simplification_m: f64,
    /// Prefix of the `filename` field, the location clients fetch normalized tracks from.
    /// Default: "gpx"
    pub href_base: String,
    /// Time allowed for the elevation lookup of a single file
    pub lookup_timeout: Option<Duration>,
    /// Compile files on the rayon thread pool
    pub parallel: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            elevation_samples: DEFAULT_SAMPLE_COUNT,
            simplification_m: 5.0,
            href_base: "gpx".to_string(),
            lookup_timeout: None,
            parallel: true,
        }
    }
}

/// A compiled walk that has not been written anywhere yet
#[derive(Debug, Clone)]
pub struct CompiledWalk {
    pub summary: WalkSummary,
    /// Normalized, elevation-annotated GPX document
    pub normalized: gpx::Gpx,
    /// Encoded polyline of the full geometry the id was derived from
    pub full_polyline: String,
}

/// Result of compiling one input file
#[derive(Debug)]
pub struct CompileOutcome {
    pub input: PathBuf,
    pub elapsed: Duration,
    pub result: Result<WalkSummary>,
}

/// Compiles GPX files into content-addressed artifacts
pub struct WalkCompiler<'a> {
    config: CompilerConfig,
    store: ArtifactStore,
    elevation: &'a dyn ElevationLookup,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl<'a> WalkCompiler<'a> {
    /// Create a compiler writing into `store` and annotating with `elevation`
    pub fn new(
        config: CompilerConfig,
        store: ArtifactStore,
        elevation: &'a dyn ElevationLookup,
    ) -> Self {
        Self {
            config,
            store,
            elevation,
        }
    }

    #[inline]
    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    #[inline]
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Run the in-memory part of the pipeline on a parsed GPX document
    pub fn compile_gpx(&self, gpx: &gpx::Gpx) -> Result<CompiledWalk> {
        let metadata = WalkMetadata::from_gpx(gpx);
        let track = Track::from_gpx(gpx)?;

        let full_polyline = track.encoded_polyline();
        let polyline = if self.config.simplification_m > 0.0 {
            let simplified = simplify(track.points(), self.config.simplification_m);
            tracing::debug!(
                "Simplified {} points to {}",
                track.len(),
                simplified.len()
            );
            encode_points(&simplified)
        } else {
            full_polyline.clone()
        };

        let length_m = track.length_m();
        let track = self
            .elevation
            .annotate(track, self.config.lookup_timeout)?;
        let profile = profile::resample(
            track.points(),
            length_m.round(),
            self.config.elevation_samples,
        )?;

        let id = WalkId::from_geometry(&full_polyline);
        let summary = WalkSummary::new(
            id.clone(),
            self.href(&id),
            metadata.clone(),
            length_m,
            polyline,
            &profile,
        );

        Ok(CompiledWalk {
            summary,
            normalized: track.to_gpx(&metadata),
            full_polyline,
        })
    }

    /// Compile one GPX file and commit its artifacts
    ///
    /// Once both artifacts are committed, the input file is deleted unless it is the
    /// normalized track itself.
    pub fn compile_file(&self, input: &Path) -> Result<WalkSummary> {
        let file = std::fs::File::open(input)?;
        let gpx = gpx::read(std::io::BufReader::new(file))?;
        let compiled = self.compile_gpx(&gpx)?;
        let id = compiled.summary.id();

        self.warn_on_collision(id, &compiled.full_polyline);
        let track_path = self.store.commit(&compiled.normalized, &compiled.summary)?;

        if !same_file(input, &track_path) {
            let removed = match self.stored_id(input) {
                // An edited track whose geometry now hashes to another id
                Some(previous) => self.store.remove(&previous),
                None => std::fs::remove_file(input).map_err(Into::into),
            };
            match removed {
                Ok(()) => tracing::debug!(
                    "Removed {} superseded by {}",
                    input.display(),
                    track_path.display()
                ),
                Err(e) => tracing::warn!("Could not remove {}: {}", input.display(), e),
            }
        }

        Ok(compiled.summary)
    }

    /// Id of `path` if it is a normalized track of this store
    fn stored_id(&self, path: &Path) -> Option<WalkId> {
        let name = path.file_name()?.to_str()?;
        let id = WalkId::from_file_name(name, TRACK_EXTENSION)?;
        same_file(path, &self.store.track_path(&id)).then_some(id)
    }

    /// Compile every file, in parallel if configured
    ///
    /// Failures are reported per file and never stop the batch. Outcomes are returned in
    /// input order.
    pub fn compile_all<P: AsRef<Path> + Sync>(&self, inputs: &[P]) -> Vec<CompileOutcome> {
        if self.config.parallel {
            inputs
                .par_iter()
                .map(|input| self.compile_timed(input.as_ref()))
                .collect()
        } else {
            inputs
                .iter()
                .map(|input| self.compile_timed(input.as_ref()))
                .collect()
        }
    }

    fn compile_timed(&self, input: &Path) -> CompileOutcome {
        let start = Instant::now();
        let result = self.compile_file(input);
        let elapsed = start.elapsed();

        match &result {
            Ok(summary) => tracing::info!(
                "{} processed in {:.3} seconds (id {})",
                input.display(),
                elapsed.as_secs_f64(),
                summary.id()
            ),
            Err(e) => tracing::error!(
                "{} failed after {:.3} seconds: {}",
                input.display(),
                elapsed.as_secs_f64(),
                e
            ),
        }

        CompileOutcome {
            input: input.to_path_buf(),
            elapsed,
            result,
        }
    }

    /// Location of the normalized track as referenced from the summary
    fn href(&self, id: &WalkId) -> String {
        let file_name = format!("{}.{}", id.file_stem(), crate::store::TRACK_EXTENSION);
        let base = self.config.href_base.trim_end_matches('/');
        if base.is_empty() {
            file_name
        } else {
            format!("{base}/{file_name}")
        }
    }

    /// Log when a different geometry already owns `id`; the new walk overwrites it
    fn warn_on_collision(&self, id: &WalkId, full_polyline: &str) {
        match self.store.load_track(id) {
            Ok(Some(existing)) if existing.encoded_polyline() != full_polyline => {
                tracing::warn!(
                    "Id collision: {} holds a different route and will be overwritten",
                    self.store.track_path(id).display()
                );
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(
                "Could not read existing {}: {}",
                self.store.track_path(id).display(),
                e
            ),
        }
    }
}

/// Whether two paths name the same existing file
fn same_file(a: &Path, b: &Path) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
