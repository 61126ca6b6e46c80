//! JSON snapshot persistence for `MemoryVectorIndex`.
//!
//! The snapshot holds only the primary entries; the secondary document
//! map is rebuilt on load, so a snapshot can never carry an orphaned
//! secondary reference.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use ragdb_core::types::IndexEntry;
use ragdb_core::{Error, Result};

use crate::MemoryVectorIndex;

/// Write the index to `path` atomically: serialize into a temp file in
/// the same directory, then rename over the target.
pub fn save_snapshot(index: &MemoryVectorIndex, path: &Path) -> Result<()> {
    let entries = index.export_entries();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::path::PathBuf::from("."),
    };
    fs::create_dir_all(&dir)?;

    let tmp = NamedTempFile::new_in(&dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        serde_json::to_writer(&mut writer, &entries).map_err(|e| Error::Backend(e.into()))?;
        writer.flush()?;
    }
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

/// Load an index snapshot. A missing file is an empty index, not an
/// error, so first startup needs no special casing.
pub fn load_snapshot(path: &Path) -> Result<MemoryVectorIndex> {
    if !path.exists() {
        return Ok(MemoryVectorIndex::new());
    }
    let file = File::open(path)?;
    let entries: Vec<IndexEntry> =
        serde_json::from_reader(BufReader::new(file)).map_err(|e| Error::Backend(e.into()))?;
    MemoryVectorIndex::from_entries(entries)
}
