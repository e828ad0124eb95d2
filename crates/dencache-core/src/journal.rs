//! Append-only journal of entry state transitions
//!
//! The journal is a line-oriented ASCII log in the cache directory:
//!
//! ```text
//! CLEAN <key> <length>\n     an entry's clean file was published
//! DIRTY <key>\n              an edit started for this key
//! ```
//!
//! Replay on open reconstructs the entry index; keys whose last DIRTY has
//! no following CLEAN are purged. Any deviation from the grammar marks the
//! whole journal corrupted — partial recovery is not attempted.
//!
//! Periodic rebuild compacts the log to one line per surviving entry using
//! the atomic swap pattern:
//! 1. Write the compacted log to `journal.tmp` and sync it
//! 2. Rename `journal` to `journal.bkp`
//! 3. Rename `journal.tmp` to `journal`
//! 4. Delete `journal.bkp`, sync the directory
//!
//! A crash between steps 2 and 3 leaves only the backup, which open-time
//! promotion moves back into place. A crash between 3 and 4 leaves an
//! obsolete backup that promotion deletes.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use hashbrown::{HashMap, HashSet};
use tracing::{debug, warn};

use crate::key::is_valid_key;

/// The live log
pub(crate) const JOURNAL_FILE: &str = "journal";

/// Scratch file used only during rebuild
pub(crate) const JOURNAL_TMP: &str = "journal.tmp";

/// Backup produced mid-rebuild; present at open time only after a crash
pub(crate) const JOURNAL_BKP: &str = "journal.bkp";

/// Soft bound on appended lines before a rebuild is scheduled
pub(crate) const REBUILD_THRESHOLD: usize = 1000;

/// One parsed journal line.
#[derive(Debug, PartialEq, Eq)]
enum Line {
    Clean { key: String, length: u64 },
    Dirty { key: String },
}

/// Parse a single journal line. `None` means the journal is corrupted.
fn parse_line(line: &str) -> Option<Line> {
    let mut tokens = line.split(' ');
    let verb = tokens.next()?;
    match verb {
        "CLEAN" => {
            let key = tokens.next()?;
            let length = tokens.next()?;
            if tokens.next().is_some() || !is_valid_key(key) {
                return None;
            }
            if length.is_empty() || !length.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let length: u64 = length.parse().ok()?;
            Some(Line::Clean { key: key.to_string(), length })
        }
        "DIRTY" => {
            let key = tokens.next()?;
            if tokens.next().is_some() || !is_valid_key(key) {
                return None;
            }
            Some(Line::Dirty { key: key.to_string() })
        }
        _ => None,
    }
}

/// Result of replaying the journal at open time.
#[derive(Debug)]
pub(crate) struct Replay {
    /// Readable entries as `(key, length)`, ordered oldest CLEAN first
    pub entries: Vec<(String, u64)>,
    /// Keys whose last DIRTY was never followed by a CLEAN
    pub dirty_pending: Vec<String>,
    /// Number of lines replayed
    pub line_count: usize,
}

#[derive(Debug)]
pub(crate) enum ReplayOutcome {
    /// No journal file exists; start with an empty cache
    Missing,
    /// Parse failure or I/O error; the directory must be swept
    Corrupt,
    Recovered(Replay),
}

/// Promote or discard a leftover backup before replay.
///
/// If only the backup exists, a crash hit between rebuild steps 2 and 3:
/// the backup is the sole surviving generation and becomes the primary.
/// If both exist, the backup is an obsolete duplicate and is deleted.
/// Failures here are absorbed; replay decides what to do with whatever
/// file ends up at the primary path.
pub(crate) fn promote_backup(dir: &Path) {
    let backup = dir.join(JOURNAL_BKP);
    if !backup.exists() {
        return;
    }
    let primary = dir.join(JOURNAL_FILE);
    if primary.exists() {
        if let Err(e) = std::fs::remove_file(&backup) {
            warn!(path = %backup.display(), error = %e, "failed to delete obsolete journal backup");
        }
    } else if let Err(e) = std::fs::rename(&backup, &primary) {
        warn!(path = %backup.display(), error = %e, "failed to promote journal backup");
    }
}

/// Replay the journal line by line.
pub(crate) fn replay(dir: &Path) -> ReplayOutcome {
    let path = dir.join(JOURNAL_FILE);
    let bytes = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return ReplayOutcome::Missing,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "journal unreadable");
            return ReplayOutcome::Corrupt;
        }
    };

    if !bytes.is_ascii() {
        return ReplayOutcome::Corrupt;
    }
    // ASCII is a subset of UTF-8.
    let content = std::str::from_utf8(&bytes).expect("ascii bytes are valid utf-8");

    if !content.is_empty() && !content.ends_with('\n') {
        // Trailing newline is part of the grammar; a torn final line
        // invalidates the whole journal.
        return ReplayOutcome::Corrupt;
    }

    let mut order: Vec<String> = Vec::new();
    let mut lengths: HashMap<String, u64> = HashMap::new();
    let mut pending: HashSet<String> = HashSet::new();
    let mut line_count = 0usize;

    for line in content.split('\n') {
        if line.is_empty() {
            continue;
        }
        line_count += 1;
        match parse_line(line) {
            Some(Line::Clean { key, length }) => {
                pending.remove(&key);
                if lengths.insert(key.clone(), length).is_some() {
                    // Re-commit: latest CLEAN position wins the ordering.
                    order.retain(|k| *k != key);
                }
                order.push(key);
            }
            Some(Line::Dirty { key }) => {
                pending.insert(key);
            }
            None => {
                warn!(path = %path.display(), line, "corrupt journal line");
                return ReplayOutcome::Corrupt;
            }
        }
    }

    // A key whose last DIRTY was never cleaned is purged entirely, even if
    // an earlier CLEAN published it.
    for key in &pending {
        if lengths.remove(key).is_some() {
            order.retain(|k| k != key);
        }
    }

    let entries = order
        .into_iter()
        .map(|key| {
            let length = lengths[&key];
            (key, length)
        })
        .collect();

    ReplayOutcome::Recovered(Replay {
        entries,
        dirty_pending: pending.into_iter().collect(),
        line_count,
    })
}

/// Snapshot of one entry for journal rebuild.
pub(crate) struct RebuildLine {
    pub key: String,
    pub readable: bool,
    pub length_bytes: u64,
}

/// The journal append writer.
///
/// Only ever touched from the serial executor thread (and from `close`,
/// behind the drain barrier), so a plain mutex around the whole struct is
/// enough. The underlying file is opened lazily: a fresh cache directory
/// gets its journal on the first edit.
pub(crate) struct Journal {
    dir: PathBuf,
    writer: Option<BufWriter<File>>,
    closed: bool,
}

impl Journal {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir, writer: None, closed: false }
    }

    /// Open the append writer eagerly (after a successful replay).
    pub fn open_append(&mut self) -> std::io::Result<()> {
        self.ensure_writer().map(|_| ())
    }

    fn ensure_writer(&mut self) -> std::io::Result<&mut BufWriter<File>> {
        if self.writer.is_none() {
            let path = self.dir.join(JOURNAL_FILE);
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            self.writer = Some(BufWriter::new(file));
        }
        Ok(self.writer.as_mut().expect("writer was just opened"))
    }

    /// Append `DIRTY <key>`.
    pub fn append_dirty(&mut self, key: &str) -> std::io::Result<()> {
        if self.closed {
            debug!(key, "journal closed, dropping DIRTY record");
            return Ok(());
        }
        let writer = self.ensure_writer()?;
        writer.write_all(format!("DIRTY {}\n", key).as_bytes())?;
        writer.flush()
    }

    /// Append `CLEAN <key> <length>`.
    pub fn append_clean(&mut self, key: &str, length: u64) -> std::io::Result<()> {
        if self.closed {
            debug!(key, "journal closed, dropping CLEAN record");
            return Ok(());
        }
        let writer = self.ensure_writer()?;
        writer.write_all(format!("CLEAN {} {}\n", key, length).as_bytes())?;
        writer.flush()
    }

    /// Compact the journal to one line per surviving entry.
    pub fn rebuild(&mut self, entries: &[RebuildLine]) -> std::io::Result<()> {
        if self.closed {
            return Ok(());
        }

        // Step 1: close the current writer so the primary is quiescent.
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }

        let primary = self.dir.join(JOURNAL_FILE);
        let tmp = self.dir.join(JOURNAL_TMP);
        let backup = self.dir.join(JOURNAL_BKP);

        // Step 2: write the compacted log to the scratch file and sync it.
        {
            let file = File::create(&tmp)?;
            let mut writer = BufWriter::new(file);
            for entry in entries {
                if entry.readable {
                    writer.write_all(
                        format!("CLEAN {} {}\n", entry.key, entry.length_bytes).as_bytes(),
                    )?;
                } else {
                    writer.write_all(format!("DIRTY {}\n", entry.key).as_bytes())?;
                }
            }
            writer.flush()?;
            crate::fsync::sync_file(writer.get_ref())?;
        }

        // Step 3: move the live log out of the way.
        match std::fs::rename(&primary, &backup) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }

        // Step 4: publish the compacted log.
        std::fs::rename(&tmp, &primary)?;

        // Step 5: the backup has served its purpose.
        match std::fs::remove_file(&backup) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %backup.display(), error = %e, "failed to delete journal backup"),
        }
        if let Err(e) = crate::fsync::sync_dir(&self.dir) {
            warn!(dir = %self.dir.display(), error = %e, "failed to sync cache directory after journal swap");
        }

        // Step 6: reopen the append writer on the fresh log.
        self.ensure_writer()?;
        debug!(lines = entries.len(), "journal rebuilt");
        Ok(())
    }

    /// Flush and permanently close the writer. Later appends are dropped.
    pub fn close(&mut self) -> std::io::Result<()> {
        self.closed = true;
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }
}
