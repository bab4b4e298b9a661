//! Content-addressed artifact storage
//!
//! Every compiled walk owns two files sharing one id: the normalized track
//! `<tracks_dir>/route_<id>.gpx` and the summary record `<summaries_dir>/route_<id>.json`.
//! Both are staged to temporary files in their target directory and renamed into place, so
//! readers never observe a partially written artifact.

use crate::{Result, Track, WalkError, WalkId, WalkSummary};
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

pub(crate) const TRACK_EXTENSION: &str = "gpx";
pub(crate) const SUMMARY_EXTENSION: &str = "json";
const TEMP_EXTENSION: &str = "tmp";

static STAGE_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Hidden, uniquely named path next to `target`, in the same directory so renames stay atomic
fn temp_sibling(target: &Path) -> PathBuf {
    let dir = target.parent().unwrap_or(Path::new("."));
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    dir.join(format!(
        ".{name}.{}.{}.{TEMP_EXTENSION}",
        std::process::id(),
        STAGE_COUNTER.fetch_add(1, Ordering::Relaxed)
    ))
}

/// A fully written temporary file waiting to be renamed over its target
pub(crate) struct StagedFile {
    temp: PathBuf,
    target: PathBuf,
    persisted: bool,
}

impl StagedFile {
    /// Write a temporary sibling of `target` with `write`
    pub(crate) fn write<F>(target: &Path, write: F) -> Result<Self>
    where
        F: FnOnce(&mut BufWriter<File>) -> Result<()>,
    {
        let temp = temp_sibling(target);

        let staged = Self {
            temp,
            target: target.to_path_buf(),
            persisted: false,
        };

        let mut writer = BufWriter::new(File::create(&staged.temp)?);
        write(&mut writer)?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;

        Ok(staged)
    }

    /// Atomically replace the target with the staged content
    pub(crate) fn persist(mut self) -> Result<()> {
        fs::rename(&self.temp, &self.target)?;
        self.persisted = true;
        Ok(())
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.persisted {
            let _ = fs::remove_file(&self.temp);
        }
    }
}

/// An existing file moved out of the way until a replacement is known to be complete
struct SetAside {
    original: PathBuf,
    backup: Option<PathBuf>,
}

impl SetAside {
    /// Rename `original` to a hidden sibling; a missing file sets nothing aside
    fn take(original: &Path) -> Result<Self> {
        let backup = temp_sibling(original);
        let backup = match fs::rename(original, &backup) {
            Ok(()) => Some(backup),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            original: original.to_path_buf(),
            backup,
        })
    }

    /// Put the previous file back over whatever now sits at the original path
    fn restore(mut self) -> Result<()> {
        match self.backup.take() {
            Some(backup) => fs::rename(&backup, &self.original)?,
            None => match fs::remove_file(&self.original) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e.into()),
                _ => {}
            },
        }
        Ok(())
    }
}

impl Drop for SetAside {
    /// Discard the backup once the replacement is in place
    fn drop(&mut self) {
        if let Some(backup) = self.backup.take() {
            let _ = fs::remove_file(backup);
        }
    }
}

/// Sorted set of walk ids whose artifacts should appear in the manifest
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArtifactIndex {
    ids: BTreeSet<WalkId>,
}

impl ArtifactIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: WalkId) -> bool {
        self.ids.insert(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Ids in lexicographic order
    pub fn iter(&self) -> impl Iterator<Item = &WalkId> {
        self.ids.iter()
    }
}

impl FromIterator<WalkId> for ArtifactIndex {
    fn from_iter<I: IntoIterator<Item = WalkId>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

/// Location of normalized tracks and summary records
#[derive(Clone, Debug)]
pub struct ArtifactStore {
    tracks_dir: PathBuf,
    summaries_dir: PathBuf,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl ArtifactStore {
    /// Use the given directories, creating them if needed
    pub fn create(
        tracks_dir: impl Into<PathBuf>,
        summaries_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        let store = Self {
            tracks_dir: tracks_dir.into(),
            summaries_dir: summaries_dir.into(),
        };
        fs::create_dir_all(&store.tracks_dir)?;
        fs::create_dir_all(&store.summaries_dir)?;
        Ok(store)
    }

    #[inline]
    pub fn tracks_dir(&self) -> &Path {
        &self.tracks_dir
    }

    #[inline]
    pub fn summaries_dir(&self) -> &Path {
        &self.summaries_dir
    }

    pub fn track_path(&self, id: &WalkId) -> PathBuf {
        self.tracks_dir
            .join(format!("{}.{TRACK_EXTENSION}", id.file_stem()))
    }

    pub fn summary_path(&self, id: &WalkId) -> PathBuf {
        self.summaries_dir
            .join(format!("{}.{SUMMARY_EXTENSION}", id.file_stem()))
    }

    /// Write both artifacts of a walk
    ///
    /// Nothing is renamed into place until both files are fully staged. A previous track with
    /// the same id is set aside first, and put back if either rename fails, so a failed
    /// commit leaves both previous artifacts exactly as they were.
    ///
    /// # Returns
    /// The path of the committed normalized track
    pub fn commit(&self, gpx: &gpx::Gpx, summary: &WalkSummary) -> Result<PathBuf> {
        let id = summary.id();
        let track_path = self.track_path(id);
        let summary_path = self.summary_path(id);
        let json = summary.to_json()?;

        let staged_track = StagedFile::write(&track_path, |w| Ok(gpx::write(gpx, w)?))?;
        let staged_summary =
            StagedFile::write(&summary_path, |w| Ok(w.write_all(json.as_bytes())?))?;

        let previous = SetAside::take(&track_path)?;
        let placed = staged_track
            .persist()
            .and_then(|()| staged_summary.persist());
        if let Err(e) = placed {
            if let Err(restore) = previous.restore() {
                tracing::error!(
                    "Could not restore {} after a failed commit: {}",
                    track_path.display(),
                    restore
                );
            }
            return Err(e);
        }
        drop(previous);

        tracing::debug!(
            "Committed {} and {}",
            track_path.display(),
            summary_path.display()
        );
        Ok(track_path)
    }

    /// Remove both artifacts of a walk, ignoring files that are already gone
    pub fn remove(&self, id: &WalkId) -> Result<()> {
        for path in [self.summary_path(id), self.track_path(id)] {
            match fs::remove_file(&path) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e.into()),
                _ => {}
            }
        }
        Ok(())
    }

    /// Raw bytes of a summary record, exactly as written
    pub fn read_summary_bytes(&self, id: &WalkId) -> Result<Vec<u8>> {
        Ok(fs::read(self.summary_path(id))?)
    }

    /// Geometry of the stored normalized track, if there is one
    pub fn load_track(&self, id: &WalkId) -> Result<Option<Track>> {
        let path = self.track_path(id);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let gpx = gpx::read(std::io::BufReader::new(file))?;
        Ok(Some(Track::from_gpx(&gpx)?))
    }

    /// Delete every summary record (and leftover staging file) from the summaries directory
    ///
    /// Normalized tracks are kept; compiling them again regenerates their records.
    pub fn clear_summaries(&self) -> Result<usize> {
        let mut removed = 0;
        for entry in fs::read_dir(&self.summaries_dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let is_record = WalkId::from_file_name(&name, SUMMARY_EXTENSION).is_some();
            let is_leftover = name.starts_with('.') && name.ends_with(TEMP_EXTENSION);

            if (is_record || is_leftover) && entry.file_type()?.is_file() {
                fs::remove_file(entry.path())?;
                removed += 1;
            }
        }
        tracing::debug!("Removed {} stale summary files", removed);
        Ok(removed)
    }

    /// Ids of all walks whose summary record and normalized track both exist
    ///
    /// Records without a track are skipped with a warning.
    pub fn index(&self) -> Result<ArtifactIndex> {
        let mut index = ArtifactIndex::new();
        for entry in fs::read_dir(&self.summaries_dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(id) = WalkId::from_file_name(&name.to_string_lossy(), SUMMARY_EXTENSION)
            else {
                continue;
            };

            if self.track_path(&id).is_file() {
                index.insert(id);
            } else {
                tracing::warn!(
                    "Skipping summary {} without normalized track {}",
                    entry.path().display(),
                    self.track_path(&id).display()
                );
            }
        }
        Ok(index)
    }
}

/// Parse a summary record and check it matches the id in its file name
pub(crate) fn parse_record(bytes: &[u8], id: &WalkId, path: &Path) -> Result<WalkSummary> {
    let summary = WalkSummary::from_json(bytes).map_err(|e| WalkError::CorruptArtifact {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    if summary.id() != id {
        return Err(WalkError::CorruptArtifact {
            path: path.to_path_buf(),
            reason: format!("record id {} does not match file name", summary.id()),
        });
    }
    Ok(summary)
}
