//! Combined manifest of all compiled walks
//!
//! The manifest is a JSON array made by concatenating the raw bytes of every summary record
//! listed in an [`ArtifactIndex`], in id order. Since ids are the only varying part of the
//! record file names, this is also the on-disk file name order, and the output depends only on
//! the set of artifacts, never on the order in which walks were compiled.

use crate::store::{StagedFile, parse_record};
use crate::{ArtifactIndex, ArtifactStore, Result};
use std::io::Write;
use std::path::Path;

const OPEN: &[u8] = b"[\n";
const SEPARATOR: &[u8] = b",\n";
const CLOSE: &[u8] = b"\n]";

/// Write the manifest for `index` into `writer`
///
/// Every record is validated before it is written; a malformed record stops the assembly
/// with `WalkError::CorruptArtifact`, since it passed validation when it was committed.
///
/// # Returns
/// The number of records written
pub fn assemble<W: Write>(
    store: &ArtifactStore,
    index: &ArtifactIndex,
    writer: &mut W,
) -> Result<usize> {
    writer.write_all(OPEN)?;

    for (i, id) in index.iter().enumerate() {
        let bytes = store.read_summary_bytes(id)?;
        parse_record(&bytes, id, &store.summary_path(id))?;

        if i > 0 {
            writer.write_all(SEPARATOR)?;
        }
        writer.write_all(&bytes)?;
    }

    writer.write_all(CLOSE)?;
    Ok(index.len())
}

/// Assemble the manifest into memory
pub fn assemble_to_vec(store: &ArtifactStore, index: &ArtifactIndex) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    assemble(store, index, &mut out)?;
    Ok(out)
}

/// Atomically write the manifest for `index` to `path`
///
/// The previous manifest stays in place if assembly fails.
pub fn write_manifest(
    store: &ArtifactStore,
    index: &ArtifactIndex,
    path: &Path,
) -> Result<usize> {
    let mut count = 0;
    let staged = StagedFile::write(path, |w| {
        count = assemble(store, index, w)?;
        Ok(())
    })?;
    staged.persist()?;

    tracing::info!("Wrote {} walks to {}", count, path.display());
    Ok(count)
}
