//! Elevation lookup for normalized tracks
//!
//! The compiler only depends on the [`ElevationLookup`] trait. [`SrtmTileCache`] answers
//! queries from SRTM `.hgt` tiles stored in a local cache directory, keeping recently used
//! tiles decoded in memory. Tiles are never downloaded: a missing tile is a lookup failure.

use crate::{Result, Track, WalkError};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Marker for samples without data in SRTM tiles
const SRTM_VOID: i16 = -32768;

/// Default number of decoded tiles kept in memory
pub const DEFAULT_TILE_CAPACITY: usize = 16;

/// A source of terrain elevation for geographic coordinates
pub trait ElevationLookup: Send + Sync {
    /// Elevation in meters at the given coordinate, `None` where the source has no data
    fn elevation_at(&self, latitude: f64, longitude: f64) -> Result<Option<f64>>;

    /// Annotate every point of `track` with an elevation
    ///
    /// Fails with `WalkError::ElevationTimeout` once `timeout` has elapsed. The deadline is
    /// checked after every point: a blocking `elevation_at` call is not interrupted, but its
    /// overrun is still reported.
    fn annotate(&self, track: Track, timeout: Option<Duration>) -> Result<Track> {
        let started = Instant::now();
        let mut elevations = Vec::with_capacity(track.len());

        for point in track.points() {
            elevations.push(self.elevation_at(point.latitude(), point.longitude())?);
            if let Some(limit) = timeout.filter(|limit| started.elapsed() > *limit) {
                return Err(WalkError::ElevationTimeout(limit));
            }
        }

        Ok(track.with_elevations(&elevations))
    }
}

/// Constant elevation everywhere, for dry runs and tests
#[derive(Clone, Copy, Debug, Default)]
pub struct FlatElevation(pub f64);

impl ElevationLookup for FlatElevation {
    fn elevation_at(&self, _latitude: f64, _longitude: f64) -> Result<Option<f64>> {
        Ok(Some(self.0))
    }
}

/// Integer degree cell covered by one tile, identified by its south-west corner
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct TileKey {
    latitude: i32,
    longitude: i32,
}

impl TileKey {
    fn containing(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude: (latitude.floor() as i32).min(89),
            longitude: (longitude.floor() as i32).min(179),
        }
    }

    /// Standard SRTM file name, e.g. `N51W001.hgt`
    fn file_name(&self) -> String {
        format!(
            "{}{:02}{}{:03}.hgt",
            if self.latitude >= 0 { 'N' } else { 'S' },
            self.latitude.unsigned_abs(),
            if self.longitude >= 0 { 'E' } else { 'W' },
            self.longitude.unsigned_abs()
        )
    }
}

/// A decoded square grid of elevation samples, row 0 at the northern edge
#[derive(Debug)]
struct HgtTile {
    size: usize,
    samples: Vec<i16>,
}

impl HgtTile {
    fn parse(bytes: &[u8], name: &str) -> Result<Self> {
        let count = bytes.len() / 2;
        let size = (count as f64).sqrt().round() as usize;
        if bytes.len() % 2 != 0 || size < 2 || size * size != count {
            return Err(WalkError::ElevationLookup(format!(
                "tile {name} has unexpected size of {} bytes",
                bytes.len()
            )));
        }

        let samples = bytes
            .chunks_exact(2)
            .map(|b| i16::from_be_bytes([b[0], b[1]]))
            .collect();
        Ok(Self { size, samples })
    }

    /// Nearest sample to the coordinate
    fn sample(&self, key: TileKey, latitude: f64, longitude: f64) -> Option<f64> {
        let last = (self.size - 1) as f64;
        let row = ((f64::from(key.latitude + 1) - latitude) * last)
            .round()
            .clamp(0.0, last) as usize;
        let col = ((longitude - f64::from(key.longitude)) * last)
            .round()
            .clamp(0.0, last) as usize;

        match self.samples[row * self.size + col] {
            SRTM_VOID => None,
            value => Some(f64::from(value)),
        }
    }
}

/// Elevation lookup backed by a directory of SRTM `.hgt` tiles
pub struct SrtmTileCache {
    dir: PathBuf,
    tiles: Mutex<LruCache<TileKey, Arc<HgtTile>>>,
}

impl SrtmTileCache {
    /// Open the tile directory, creating it if needed
    ///
    /// # Arguments
    /// * `dir` - Directory holding `.hgt` files
    /// * `capacity` - Number of decoded tiles kept in memory (at least one)
    pub fn open(dir: impl Into<PathBuf>, capacity: usize) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);

        tracing::debug!("Opened SRTM tile cache at {}", dir.display());
        Ok(Self {
            dir,
            tiles: Mutex::new(LruCache::new(capacity)),
        })
    }

    /// Directory the tiles are read from
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn tile(&self, key: TileKey) -> Result<Arc<HgtTile>> {
        if let Some(tile) = self
            .tiles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Ok(tile.clone());
        }

        // Decode outside the lock; a concurrent duplicate load is harmless
        let name = key.file_name();
        let path = self.dir.join(&name);
        let bytes = std::fs::read(&path).map_err(|e| {
            WalkError::ElevationLookup(format!("cannot read tile {}: {e}", path.display()))
        })?;
        let tile = Arc::new(HgtTile::parse(&bytes, &name)?);
        tracing::debug!("Loaded SRTM tile {} ({}x{})", name, tile.size, tile.size);

        self.tiles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .put(key, tile.clone());
        Ok(tile)
    }
}

impl ElevationLookup for SrtmTileCache {
    fn elevation_at(&self, latitude: f64, longitude: f64) -> Result<Option<f64>> {
        let key = TileKey::containing(latitude, longitude);
        Ok(self.tile(key)?.sample(key, latitude, longitude))
    }
}
