//! Write-open stream over a dirty file
//!
//! State machine: open → (committed | aborted), both terminal. Writes are
//! silently tolerant: any I/O failure sets an internal flag instead of
//! surfacing, and `commit` turns a flagged edit into abort-then-remove so a
//! stale prior entry never survives a failed overwrite. Operations on a
//! terminal handle are programmer errors and raise illegal-state.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::Arc;

use tracing::debug;

use crate::engine::CacheInner;
use crate::error::{CacheError, CacheResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Open,
    Committed,
    Aborted,
}

/// The sole live editor for one cache entry.
///
/// Dropping an open handle aborts the edit, so an early return in caller
/// code cannot leave the entry wedged.
pub struct WriterHandle {
    cache: Arc<CacheInner>,
    key: String,
    generation: u64,
    file: Option<BufWriter<File>>,
    has_errors: bool,
    state: WriterState,
}

impl WriterHandle {
    pub(crate) fn new(cache: Arc<CacheInner>, key: String, generation: u64, file: File) -> Self {
        Self {
            cache,
            key,
            generation,
            file: Some(BufWriter::new(file)),
            has_errors: false,
            state: WriterState::Open,
        }
    }

    /// The key this editor belongs to.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// True once any write or close has failed.
    pub fn has_errors(&self) -> bool {
        self.has_errors
    }

    fn check_open(&self, op: &str) -> CacheResult<()> {
        if self.state != WriterState::Open {
            return Err(CacheError::IllegalState {
                reason: format!("{} on a {} writer for key {:?}",
                    op,
                    match self.state {
                        WriterState::Committed => "committed",
                        WriterState::Aborted => "aborted",
                        WriterState::Open => unreachable!(),
                    },
                    self.key
                ),
            });
        }
        Ok(())
    }

    /// Append bytes to the dirty file.
    ///
    /// I/O failures are absorbed into the error flag; only use on a
    /// terminal handle is an error.
    pub fn write(&mut self, data: &[u8]) -> CacheResult<()> {
        self.check_open("write")?;
        if self.has_errors {
            return Ok(());
        }
        if let Some(file) = self.file.as_mut() {
            if let Err(e) = file.write_all(data) {
                debug!(key = %self.key, error = %e, "write to dirty file failed");
                self.has_errors = true;
            }
        }
        Ok(())
    }

    fn close_file(&mut self) {
        if let Some(mut file) = self.file.take() {
            if let Err(e) = file.flush() {
                debug!(key = %self.key, error = %e, "flush of dirty file failed");
                self.has_errors = true;
            }
        }
    }

    /// Publish the dirty file as the entry's clean payload.
    ///
    /// Returns false when the edit had write errors; in that case the edit
    /// is aborted and the entry removed, because the bytes on disk no
    /// longer correspond to anything the caller intended.
    pub fn commit(&mut self) -> CacheResult<bool> {
        self.check_open("commit")?;
        self.close_file();

        if self.has_errors {
            self.state = WriterState::Aborted;
            CacheInner::abort_edit(&self.cache, &self.key, self.generation, true)?;
            return Ok(false);
        }

        self.state = WriterState::Committed;
        CacheInner::commit_edit(&self.cache, &self.key, self.generation)?;
        Ok(true)
    }

    /// Discard the edit, deleting the dirty file.
    pub fn abort(&mut self) -> CacheResult<()> {
        self.check_open("abort")?;
        self.close_file();
        self.state = WriterState::Aborted;
        CacheInner::abort_edit(&self.cache, &self.key, self.generation, false)
    }

    /// Idempotent safety net: aborts iff the handle is still open.
    pub fn abort_unless_committed(&mut self) {
        if self.state == WriterState::Open {
            if let Err(e) = self.abort() {
                debug!(key = %self.key, error = %e, "abort_unless_committed failed");
            }
        }
    }
}

impl Drop for WriterHandle {
    fn drop(&mut self) {
        self.abort_unless_committed();
    }
}

impl std::fmt::Debug for WriterHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriterHandle")
            .field("key", &self.key)
            .field("generation", &self.generation)
            .field("has_errors", &self.has_errors)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
