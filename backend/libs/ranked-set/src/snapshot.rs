//! Durable snapshots of a ranked set
//!
//! A snapshot is the backing array written verbatim as a JSON array.
//! Writes go to a sibling `.tmp` file first and are renamed into place, so
//! a crash mid-write leaves the previous snapshot intact.

use crate::error::RankedSetResult;
use crate::heap::RankedSet;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Outcome of loading a snapshot into a ranked set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RestoreReport {
    /// Items present after the load
    pub loaded: usize,
    /// Records skipped because their id had already been seen
    pub duplicates_dropped: usize,
    /// Whether the stored order violated the heap invariant
    pub reheapified: bool,
}

/// Snapshot file for one ranked set
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot into `set`.
    ///
    /// Returns `Ok(None)` when no snapshot file exists yet; `set` is not
    /// touched in that case or when decoding fails.
    pub fn load_into(&self, set: &mut RankedSet) -> RankedSetResult<Option<RestoreReport>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No snapshot file present");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let report = set.restore_from_reader(BufReader::new(file))?;
        debug!(
            path = %self.path.display(),
            loaded = report.loaded,
            "Snapshot loaded"
        );
        Ok(Some(report))
    }

    /// Overwrite the snapshot with the current contents of `set`.
    pub fn save(&self, set: &RankedSet) -> RankedSetResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = self.temp_path();
        if let Err(e) = self.write_and_swap(set, &tmp_path) {
            // Leave no partial temp file behind
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        debug!(path = %self.path.display(), items = set.len(), "Snapshot saved");
        Ok(())
    }

    fn write_and_swap(&self, set: &RankedSet, tmp_path: &Path) -> RankedSetResult<()> {
        {
            let mut writer = BufWriter::new(File::create(tmp_path)?);
            set.serialize_to(&mut writer)?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(tmp_path, &self.path)?;
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "snapshot".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
