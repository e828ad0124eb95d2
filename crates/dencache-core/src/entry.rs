//! Per-key entry records
//!
//! An entry tracks everything the engine knows about one key: the committed
//! byte length, whether a clean file has been published, and the generation
//! of the sole live writer (if an edit is in progress). The on-disk paths
//! are derived from the key rather than stored.

use std::path::{Path, PathBuf};

/// Filename suffix of a committed, readable payload
pub const CLEAN_SUFFIX: &str = ".clean";

/// Filename suffix of an in-progress edit
pub const DIRTY_SUFFIX: &str = ".tmp";

/// State of one cached key.
///
/// An entry stays in the index iff it is readable or an edit is in
/// progress. The writer generation stands in for a back-pointer to the
/// live `WriterHandle`: every terminal writer operation proves it still
/// owns the edit by matching generations under the index lock.
#[derive(Debug)]
pub(crate) struct Entry {
    /// The validated key, used verbatim as the filename stem
    pub key: String,
    /// Size of the clean file, authoritative once `readable`; 0 otherwise
    pub length_bytes: u64,
    /// True iff a clean file has been committed and not invalidated
    pub readable: bool,
    /// Generation of the sole live writer; `None` when no edit is open
    pub writer: Option<u64>,
}

impl Entry {
    pub fn new(key: String) -> Self {
        Self {
            key,
            length_bytes: 0,
            readable: false,
            writer: None,
        }
    }

    /// `<dir>/<key>.clean` — the published payload
    pub fn clean_path(&self, dir: &Path) -> PathBuf {
        clean_path(dir, &self.key)
    }

    /// `<dir>/<key>.tmp` — the in-progress payload
    pub fn dirty_path(&self, dir: &Path) -> PathBuf {
        dirty_path(dir, &self.key)
    }
}

pub(crate) fn clean_path(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{}{}", key, CLEAN_SUFFIX))
}

pub(crate) fn dirty_path(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{}{}", key, DIRTY_SUFFIX))
}
