//! Walk Summary Library - Compile GPX walks into content-addressed summaries
//!
//! This library turns raw GPX recordings into compact, deterministic artifacts meant to be
//! served in bulk to a map client: an encoded route polyline, a downsampled elevation profile
//! and a few scalar metrics. Every artifact is named after a digest of its geometry, so
//! recompiling the same walk reproduces the same files.
//!
//! # Architecture
//!
//! - **[`polyline`]**: Delta/zig-zag encoded polyline codec, generic over point dimension
//! - **[`simplify`]**: Douglas-Peucker simplification with a tolerance in meters
//! - **[`profile`]**: Distance-adaptive elevation resampler and ascent accumulation
//! - **[`WalkId`]**: Short content identifier derived from the full route polyline
//! - **[`WalkCompiler`]**: Per-file pipeline and artifact lifecycle
//! - **[`ArtifactStore`]**: Atomic persistence of normalized tracks and summary records
//! - **[`manifest`]**: Deterministic assembly of all summary records into one JSON array
//!
//! # Pipeline
//!
//! ```text
//! GPX file -> Track + WalkMetadata -> (simplify, polyline, elevation lookup, profile, id)
//!          -> route_<id>.gpx + route_<id>.json -> manifest
//! ```

mod compiler;
pub mod elevation;
mod identity;
pub mod manifest;
pub mod polyline;
pub mod profile;
pub mod simplify;
mod store;
mod summary;
mod track;

#[doc(hidden)]
pub mod test_support;

// Public API exports
pub use compiler::{CompileOutcome, CompiledWalk, CompilerConfig, WalkCompiler};
pub use elevation::{ElevationLookup, FlatElevation, SrtmTileCache};
pub use identity::WalkId;
pub use polyline::PolylineError;
pub use profile::{ElevationProfile, ElevationSample};
pub use store::{ArtifactIndex, ArtifactStore};
pub use summary::WalkSummary;
pub use track::{GeoPoint, Track, WalkMetadata};

use std::path::PathBuf;
use std::time::Duration;

/// Error types for walk compilation
#[derive(Debug, thiserror::Error)]
pub enum WalkError {
    #[error("GPX error: {0}")]
    Gpx(#[from] gpx::errors::GpxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Empty track")]
    EmptyTrack,

    #[error("Invalid coordinate: ({latitude}, {longitude})")]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    #[error("No elevation data for any point of the track")]
    NoElevationData,

    #[error("Elevation lookup failed: {0}")]
    ElevationLookup(String),

    #[error("Elevation lookup timed out after {0:?}")]
    ElevationTimeout(Duration),

    #[error("Polyline error: {0}")]
    Polyline(#[from] PolylineError),

    #[error("Invalid walk id: {0:?}")]
    InvalidWalkId(String),

    #[error("Corrupt artifact {path}: {reason}")]
    CorruptArtifact { path: PathBuf, reason: String },
}

pub type Result<T> = std::result::Result<T, WalkError>;
