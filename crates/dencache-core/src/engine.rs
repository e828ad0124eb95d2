//! Core cache engine — the heart of dencache.
//!
//! `DenCache` combines an access-ordered entry index with one-file-per-entry
//! payloads and an append-only journal that makes the index recoverable
//! after a crash.
//!
//! **Read path**: open the clean file, bump LRU, count a hit
//! **Write path**: dirty file + DIRTY record, then atomic rename + CLEAN
//! record on commit
//! **Background**: journal appends on the embedder's serial executor,
//! trims on an engine-owned worker
//!
//! Byte and entry-count budgets are soft: the trim loop never evicts an
//! entry that is under edit, so the cache can transiently exceed its
//! limits.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::{Config, UiThreadCheck};
use crate::entry::{self, Entry, CLEAN_SUFFIX, DIRTY_SUFFIX};
use crate::error::{CacheError, CacheResult};
use crate::exec::{execute_and_wait, SerialExecutor, SerialWorker};
use crate::journal::{
    self, Journal, RebuildLine, ReplayOutcome, JOURNAL_BKP, JOURNAL_FILE, REBUILD_THRESHOLD,
};
use crate::key::validate_key;
use crate::lru::LruIndex;
use crate::reader::ReaderHandle;
use crate::writer::WriterHandle;

/// A clean-file delete that failed and is waiting to be retried.
struct RetryDelete {
    path: PathBuf,
    length_bytes: u64,
}

/// Shared engine state.
///
/// Held behind an `Arc` so live writer handles and queued background tasks
/// can reach it; background tasks hold only a `Weak` to keep shutdown from
/// deadlocking on their own queue.
pub(crate) struct CacheInner {
    /// Cache directory; `None` in stub mode
    directory: Option<PathBuf>,
    /// Byte budget, mutable at runtime
    max_bytes: AtomicU64,
    /// Entry-count budget
    max_count: usize,
    /// Access-ordered entry index
    lru: Mutex<LruIndex>,
    /// Failed clean-file deletes, retried before each eviction pass
    retry: Mutex<Vec<RetryDelete>>,
    /// Σ length_bytes over all readable entries
    size_bytes: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    /// Journal writer; only touched from the serial executor thread
    journal: Mutex<Journal>,
    /// Lines appended since the last rebuild
    journal_lines: AtomicUsize,
    rebuild_scheduled: AtomicBool,
    journal_exec: Arc<dyn SerialExecutor>,
    /// Engine-owned trim worker; `None` in stub mode
    trim_worker: Option<SerialWorker>,
    trim_scheduled: AtomicBool,
    /// Generation source for writer handles
    next_generation: AtomicU64,
    ui_thread_check: Option<UiThreadCheck>,
    closed: AtomicBool,
}

/// Bounded, journaled, LRU disk cache: short string keys to byte blobs,
/// one file per entry.
///
/// All public methods take `&self` and may be called from multiple threads.
/// Only `close` blocks on background work.
pub struct DenCache {
    inner: Arc<CacheInner>,
}

impl DenCache {
    /// Open a cache over the configured directory.
    ///
    /// Performs journal recovery and directory reconciliation. With no
    /// directory, a zero budget, or an uncreatable directory the engine
    /// comes up in stub mode, where every operation is a no-op.
    pub fn open(config: Config) -> CacheResult<DenCache> {
        assert_not_ui_thread(&config.ui_thread_check, "construction")?;

        let configured = if config.is_stub() { None } else { config.directory.clone() };
        let directory = match configured {
            Some(dir) => match fs::create_dir_all(&dir) {
                Ok(()) => Some(dir),
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "cache directory inaccessible, running as stub");
                    None
                }
            },
            None => None,
        };

        let mut lru = LruIndex::new();
        let mut size_bytes = 0u64;
        let mut journal_lines = 0usize;
        let mut journal_recovered = false;

        if let Some(dir) = directory.as_deref() {
            journal::promote_backup(dir);
            match journal::replay(dir) {
                ReplayOutcome::Missing => {}
                ReplayOutcome::Corrupt => sweep_directory(dir),
                ReplayOutcome::Recovered(replay) => {
                    for key in &replay.dirty_pending {
                        let _ = fs::remove_file(entry::clean_path(dir, key));
                        let _ = fs::remove_file(entry::dirty_path(dir, key));
                    }
                    for (key, length) in replay.entries {
                        let mut e = Entry::new(key);
                        e.readable = true;
                        e.length_bytes = length;
                        size_bytes += length;
                        lru.insert(e);
                    }
                    journal_lines = replay.line_count;
                    journal_recovered = true;
                    info!(
                        entries = lru.len(),
                        size_bytes,
                        "cache recovered from journal"
                    );
                }
            }
        }

        let trim_worker = match directory {
            Some(_) => Some(SerialWorker::new("dencache-trim")?),
            None => None,
        };

        let mut journal = Journal::new(
            directory.clone().unwrap_or_default(),
        );
        if journal_recovered {
            // A replayed journal keeps growing in place; a fresh or swept
            // directory gets its journal on the first edit instead.
            if let Err(e) = journal.open_append() {
                warn!(error = %e, "failed to reopen journal for append");
            }
        }

        let inner = Arc::new(CacheInner {
            directory,
            max_bytes: AtomicU64::new(config.max_bytes),
            max_count: config.max_count,
            lru: Mutex::new(lru),
            retry: Mutex::new(Vec::new()),
            size_bytes: AtomicU64::new(size_bytes),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            journal: Mutex::new(journal),
            journal_lines: AtomicUsize::new(journal_lines),
            rebuild_scheduled: AtomicBool::new(false),
            journal_exec: config.journal_executor,
            trim_worker,
            trim_scheduled: AtomicBool::new(false),
            next_generation: AtomicU64::new(0),
            ui_thread_check: config.ui_thread_check,
            closed: AtomicBool::new(false),
        });

        Ok(DenCache { inner })
    }

    /// True iff an indexed entry for `key` is readable and its clean file
    /// currently exists. Advisory: the answer can be stale by the time the
    /// caller acts on it. Does not reorder the LRU index.
    pub fn has(&self, key: &str) -> CacheResult<bool> {
        validate_key(key)?;
        let Some(dir) = self.inner.live_dir() else {
            return Ok(false);
        };

        let mut lru = self.inner.lru.lock();
        let Some(e) = lru.get(key) else {
            return Ok(false);
        };
        if !e.readable {
            return Ok(false);
        }
        if e.clean_path(dir).exists() {
            Ok(true)
        } else {
            self.inner.drop_vanished_entry(&mut lru, key);
            Ok(false)
        }
    }

    /// Open a reader over the entry's committed payload.
    ///
    /// Absent when the entry is missing, not yet committed, or its clean
    /// file cannot be opened. A successful open bumps the entry to
    /// most-recently-used.
    pub fn get(&self, key: &str) -> CacheResult<Option<ReaderHandle>> {
        validate_key(key)?;
        let Some(dir) = self.inner.live_dir() else {
            return Ok(None);
        };

        let mut lru = self.inner.lru.lock();
        let Some(e) = lru.get(key) else {
            self.inner.misses.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        };
        if !e.readable {
            self.inner.misses.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        }

        let path = e.clean_path(dir);
        match ReaderHandle::open(&path, e.length_bytes) {
            Ok(reader) => {
                lru.touch(key);
                self.inner.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(reader))
            }
            Err(err) => {
                if err.kind() == std::io::ErrorKind::NotFound {
                    self.inner.drop_vanished_entry(&mut lru, key);
                } else {
                    debug!(key, error = %err, "failed to open clean file");
                }
                self.inner.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    /// Start an edit for `key`, creating the entry if needed.
    ///
    /// Exactly one writer may be live per key; a second concurrent `edit`
    /// is a programmer-visible race and fails with illegal-state rather
    /// than silently waiting. Absent in stub mode or when the dirty file
    /// cannot be created even after re-creating the cache directory.
    pub fn edit(&self, key: &str) -> CacheResult<Option<WriterHandle>> {
        validate_key(key)?;
        let Some(dir) = self.inner.live_dir() else {
            return Ok(None);
        };

        let mut lru = self.inner.lru.lock();
        let created = !lru.contains(key);
        if created {
            lru.insert(Entry::new(key.to_string()));
        }

        let e = lru.get_mut(key).expect("entry was just ensured");
        if e.writer.is_some() {
            return Err(CacheError::IllegalState {
                reason: format!("another edit is in progress for key {:?}", key),
            });
        }

        let dirty = e.dirty_path(dir);
        let file = match File::create(&dirty) {
            Ok(file) => file,
            Err(first) => {
                // The directory may have been deleted underneath us.
                let _ = fs::create_dir_all(dir);
                match File::create(&dirty) {
                    Ok(file) => file,
                    Err(second) => {
                        warn!(key, first = %first, second = %second, "cannot create dirty file");
                        if created {
                            lru.remove(key);
                        }
                        return Ok(None);
                    }
                }
            }
        };

        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed) + 1;
        let e = lru.get_mut(key).expect("entry is present");
        e.writer = Some(generation);
        lru.touch(key);

        // The DIRTY record is scheduled before the editor is handed out.
        CacheInner::schedule_dirty_record(&self.inner, key.to_string());
        drop(lru);

        Ok(Some(WriterHandle::new(
            Arc::clone(&self.inner),
            key.to_string(),
            generation,
            file,
        )))
    }

    /// Remove the entry and delete its clean file.
    ///
    /// Removing a key under active edit is illegal-state. A failed delete
    /// parks the entry on the retry list instead of leaking its bytes from
    /// the accounting.
    pub fn remove(&self, key: &str) -> CacheResult<()> {
        validate_key(key)?;
        let Some(dir) = self.inner.live_dir() else {
            return Ok(());
        };

        let mut lru = self.inner.lru.lock();
        let Some(e) = lru.get(key) else {
            return Ok(());
        };
        if e.writer.is_some() {
            return Err(CacheError::IllegalState {
                reason: format!("cannot remove key {:?} while an edit is in progress", key),
            });
        }
        let removed = lru.remove(key).expect("entry is present");
        drop(lru);

        self.inner.dispose_entry(dir, removed);
        Ok(())
    }

    /// Evict to the current budgets and compact the journal if it has
    /// grown past the rebuild threshold.
    pub fn flush(&self) {
        let Some(dir) = self.inner.live_dir() else {
            return;
        };
        self.inner.drain_retry();
        self.inner.trim_to_limits(dir);
        if self.inner.journal_lines.load(Ordering::Acquire) > REBUILD_THRESHOLD {
            CacheInner::schedule_rebuild(&self.inner);
        }
    }

    /// Evict, compact the journal one final time, and close it.
    ///
    /// Blocks until every previously scheduled journal append has reached
    /// the file. Idempotent. Must not be called on the embedder's UI
    /// thread.
    pub fn close(&self) -> CacheResult<()> {
        assert_not_ui_thread(&self.inner.ui_thread_check, "close")?;
        self.close_internal();
        Ok(())
    }

    fn close_internal(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let Some(dir) = self.inner.directory.as_deref() else {
            return;
        };

        self.inner.drain_retry();
        self.inner.trim_to_limits(dir);
        if let Some(worker) = self.inner.trim_worker.as_ref() {
            worker.shutdown();
        }

        let snapshot = self.inner.rebuild_snapshot();
        let inner = Arc::clone(&self.inner);
        // Drain barrier: every append scheduled before this point lands in
        // the journal before the final rebuild overwrites it.
        execute_and_wait(&*self.inner.journal_exec, move || {
            let mut journal = inner.journal.lock();
            if let Err(e) = journal.rebuild(&snapshot) {
                warn!(error = %e, "final journal rebuild failed");
            }
            if let Err(e) = journal.close() {
                warn!(error = %e, "journal close failed");
            }
        });
    }

    /// Replace the byte budget and schedule an eviction pass.
    pub fn set_max_bytes(&self, max_bytes: u64) {
        self.inner.max_bytes.store(max_bytes, Ordering::Release);
        CacheInner::schedule_trim(&self.inner);
    }

    /// Σ length_bytes over all readable entries.
    pub fn size_bytes(&self) -> u64 {
        self.inner.size_bytes.load(Ordering::Acquire)
    }

    /// Number of indexed entries (readable or under edit).
    pub fn count(&self) -> usize {
        self.inner.lru.lock().len()
    }

    pub fn max_bytes(&self) -> u64 {
        self.inner.max_bytes.load(Ordering::Acquire)
    }

    pub fn max_count(&self) -> usize {
        self.inner.max_count
    }

    pub fn hit_count(&self) -> u64 {
        self.inner.hits.load(Ordering::Relaxed)
    }

    pub fn miss_count(&self) -> u64 {
        self.inner.misses.load(Ordering::Relaxed)
    }

    /// Formatted counter snapshot, e.g.
    /// `Cache[max_bytes=31457280,hits=3,misses=1,hitRate=75%]`.
    pub fn stats(&self) -> String {
        let hits = self.hit_count();
        let misses = self.miss_count();
        let total = hits + misses;
        let rate = if total == 0 { 0 } else { hits * 100 / total };
        format!(
            "Cache[max_bytes={},hits={},misses={},hitRate={}%]",
            self.max_bytes(),
            hits,
            misses,
            rate
        )
    }
}

impl Drop for DenCache {
    fn drop(&mut self) {
        self.close_internal();
    }
}

impl CacheInner {
    fn live_dir(&self) -> Option<&Path> {
        if self.closed.load(Ordering::Acquire) {
            None
        } else {
            self.directory.as_deref()
        }
    }

    /// Invariant: an entry with neither a clean file on disk nor a live
    /// writer must not remain indexed.
    fn drop_vanished_entry(&self, lru: &mut LruIndex, key: &str) {
        let under_edit = lru.get(key).map_or(true, |e| e.writer.is_some());
        if under_edit {
            return;
        }
        if let Some(e) = lru.remove(key) {
            debug!(key, "clean file vanished externally, dropping entry");
            if e.readable {
                self.size_bytes.fetch_sub(e.length_bytes, Ordering::AcqRel);
            }
        }
    }

    /// Delete an entry's files after it has left the index.
    ///
    /// Must be called without the index lock held: a failed delete pushes
    /// onto the retry list, which has its own mutex.
    fn dispose_entry(&self, dir: &Path, entry: Entry) {
        let _ = fs::remove_file(entry.dirty_path(dir));
        if !entry.readable {
            return;
        }
        let clean = entry.clean_path(dir);
        match fs::remove_file(&clean) {
            Ok(()) => {
                self.size_bytes.fetch_sub(entry.length_bytes, Ordering::AcqRel);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.size_bytes.fetch_sub(entry.length_bytes, Ordering::AcqRel);
            }
            Err(e) => {
                warn!(path = %clean.display(), error = %e, "clean file delete failed, parking for retry");
                self.retry.lock().push(RetryDelete {
                    path: clean,
                    length_bytes: entry.length_bytes,
                });
            }
        }
    }

    /// Retry parked deletes, freeing accounted bytes on success.
    fn drain_retry(&self) {
        let parked = std::mem::take(&mut *self.retry.lock());
        if parked.is_empty() {
            return;
        }
        let mut still_failing = Vec::new();
        for item in parked {
            match fs::remove_file(&item.path) {
                Ok(()) => {
                    self.size_bytes.fetch_sub(item.length_bytes, Ordering::AcqRel);
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    self.size_bytes.fetch_sub(item.length_bytes, Ordering::AcqRel);
                }
                Err(e) => {
                    debug!(path = %item.path.display(), error = %e, "retried delete still failing");
                    still_failing.push(item);
                }
            }
        }
        if !still_failing.is_empty() {
            self.retry.lock().extend(still_failing);
        }
    }

    /// Evict least-recently-used entries until both budgets hold.
    ///
    /// Entries under active edit are skipped, so the loop may stop while
    /// still over budget.
    fn trim_to_limits(&self, dir: &Path) {
        loop {
            let victim = {
                let mut lru = self.lru.lock();
                let over = self.size_bytes.load(Ordering::Acquire) > self.max_bytes.load(Ordering::Acquire)
                    || lru.len() > self.max_count;
                if !over {
                    None
                } else {
                    let key = lru
                        .iter()
                        .find(|e| e.writer.is_none())
                        .map(|e| e.key.clone());
                    match key {
                        Some(key) => lru.remove(&key),
                        None => None,
                    }
                }
            };
            let Some(entry) = victim else { break };
            debug!(key = %entry.key, length = entry.length_bytes, "evicting least recently used entry");
            self.dispose_entry(dir, entry);
        }
    }

    fn over_budget(&self) -> bool {
        self.size_bytes.load(Ordering::Acquire) > self.max_bytes.load(Ordering::Acquire)
            || self.lru.lock().len() > self.max_count
    }

    fn maybe_schedule_trim(inner: &Arc<CacheInner>) {
        if inner.over_budget() {
            CacheInner::schedule_trim(inner);
        }
    }

    /// Queue one asynchronous trim pass; at most one is pending at a time.
    fn schedule_trim(inner: &Arc<CacheInner>) {
        let Some(worker) = inner.trim_worker.as_ref() else {
            return;
        };
        if inner.trim_scheduled.swap(true, Ordering::AcqRel) {
            return;
        }
        let weak = Arc::downgrade(inner);
        worker.execute(Box::new(move || {
            let Some(inner) = weak.upgrade() else { return };
            inner.trim_scheduled.store(false, Ordering::Release);
            let Some(dir) = inner.live_dir().map(Path::to_path_buf) else {
                return;
            };
            inner.drain_retry();
            inner.trim_to_limits(&dir);
        }));
    }

    fn schedule_dirty_record(inner: &Arc<CacheInner>, key: String) {
        let weak = Arc::downgrade(inner);
        inner.journal_exec.execute(Box::new(move || {
            let Some(inner) = weak.upgrade() else { return };
            {
                let mut journal = inner.journal.lock();
                if let Err(e) = journal.append_dirty(&key) {
                    warn!(key, error = %e, "failed to append DIRTY record");
                }
            }
            CacheInner::record_journal_line(&inner);
        }));
    }

    fn schedule_clean_record(inner: &Arc<CacheInner>, key: String, length: u64) {
        let weak = Arc::downgrade(inner);
        inner.journal_exec.execute(Box::new(move || {
            let Some(inner) = weak.upgrade() else { return };
            {
                let mut journal = inner.journal.lock();
                if let Err(e) = journal.append_clean(&key, length) {
                    warn!(key, error = %e, "failed to append CLEAN record");
                }
            }
            CacheInner::record_journal_line(&inner);
        }));
    }

    fn record_journal_line(inner: &Arc<CacheInner>) {
        let lines = inner.journal_lines.fetch_add(1, Ordering::AcqRel) + 1;
        if lines > REBUILD_THRESHOLD {
            CacheInner::schedule_rebuild(inner);
        }
    }

    /// Queue a journal compaction on the serial executor.
    ///
    /// The threshold is double-checked inside the task so a burst of
    /// appends cannot queue a stack of redundant rebuilds.
    fn schedule_rebuild(inner: &Arc<CacheInner>) {
        if inner.rebuild_scheduled.swap(true, Ordering::AcqRel) {
            return;
        }
        let weak = Arc::downgrade(inner);
        inner.journal_exec.execute(Box::new(move || {
            let Some(inner) = weak.upgrade() else { return };
            inner.rebuild_scheduled.store(false, Ordering::Release);
            if inner.journal_lines.load(Ordering::Acquire) <= REBUILD_THRESHOLD {
                return;
            }
            let snapshot = inner.rebuild_snapshot();
            let mut journal = inner.journal.lock();
            match journal.rebuild(&snapshot) {
                Ok(()) => {
                    inner.journal_lines.store(snapshot.len(), Ordering::Release);
                }
                Err(e) => warn!(error = %e, "journal rebuild failed"),
            }
        }));
    }

    /// One line per indexed entry, LRU order, so replay restores the
    /// access ordering.
    fn rebuild_snapshot(&self) -> Vec<RebuildLine> {
        self.lru
            .lock()
            .iter()
            .map(|e| RebuildLine {
                key: e.key.clone(),
                readable: e.readable,
                length_bytes: e.length_bytes,
            })
            .collect()
    }

    /// Engine half of `WriterHandle::commit`.
    pub(crate) fn commit_edit(inner: &Arc<CacheInner>, key: &str, generation: u64) -> CacheResult<()> {
        let Some(dir) = inner.directory.as_deref() else {
            return Ok(());
        };

        let mut lru = inner.lru.lock();
        let e = current_writer_entry(&mut lru, key, generation)?;

        let dirty = e.dirty_path(dir);
        if !dirty.exists() {
            // The edit produced nothing to publish.
            e.writer = None;
            if !e.readable {
                lru.remove(key);
            }
            return Ok(());
        }

        let clean = e.clean_path(dir);
        match fs::rename(&dirty, &clean).and_then(|()| fs::metadata(&clean)) {
            Ok(meta) => {
                let new_length = meta.len();
                let old_length = e.length_bytes;
                e.readable = true;
                e.writer = None;
                e.length_bytes = new_length;
                lru.touch(key);
                drop(lru);

                inner.size_bytes.fetch_add(new_length, Ordering::AcqRel);
                inner.size_bytes.fetch_sub(old_length, Ordering::AcqRel);

                CacheInner::schedule_clean_record(inner, key.to_string(), new_length);
                CacheInner::maybe_schedule_trim(inner);
                Ok(())
            }
            Err(err) => {
                warn!(key, error = %err, "failed to publish clean file, dropping entry");
                let _ = fs::remove_file(&dirty);
                e.writer = None;
                let removed = lru.remove(key).expect("entry is present");
                drop(lru);

                inner.dispose_entry(dir, removed);
                CacheInner::maybe_schedule_trim(inner);
                Ok(())
            }
        }
    }

    /// Engine half of `WriterHandle::abort`.
    ///
    /// `discard_entry` additionally removes the entry and its clean file:
    /// a commit with write errors must not leave the stale prior payload
    /// behind.
    pub(crate) fn abort_edit(
        inner: &Arc<CacheInner>,
        key: &str,
        generation: u64,
        discard_entry: bool,
    ) -> CacheResult<()> {
        let Some(dir) = inner.directory.as_deref() else {
            return Ok(());
        };

        let mut lru = inner.lru.lock();
        let e = current_writer_entry(&mut lru, key, generation)?;

        e.writer = None;
        let _ = fs::remove_file(e.dirty_path(dir));

        if discard_entry || !e.readable {
            let removed = lru.remove(key).expect("entry is present");
            drop(lru);
            if discard_entry {
                inner.dispose_entry(dir, removed);
            }
        } else {
            drop(lru);
        }

        CacheInner::maybe_schedule_trim(inner);
        Ok(())
    }
}

/// Look up the entry for a terminal writer operation, proving the handle
/// still owns the edit. A mismatch means two editors were somehow live —
/// that race must surface, not be silently recovered from.
fn current_writer_entry<'a>(
    lru: &'a mut LruIndex,
    key: &str,
    generation: u64,
) -> CacheResult<&'a mut Entry> {
    let Some(e) = lru.get_mut(key) else {
        return Err(CacheError::IllegalState {
            reason: format!("no entry for key {:?} during writer completion", key),
        });
    };
    if e.writer != Some(generation) {
        return Err(CacheError::IllegalState {
            reason: format!("writer for key {:?} is no longer current", key),
        });
    }
    Ok(e)
}

fn assert_not_ui_thread(check: &Option<UiThreadCheck>, what: &str) -> CacheResult<()> {
    if let Some(is_ui_thread) = check {
        if is_ui_thread() {
            return Err(CacheError::IllegalState {
                reason: format!("{} must not run on the UI thread", what),
            });
        }
    }
    Ok(())
}

/// Corruption recovery: delete every cache-owned file and stray directory,
/// then start over with an empty cache.
fn sweep_directory(dir: &Path) {
    warn!(dir = %dir.display(), "journal corrupted, sweeping cache directory");
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "cannot read cache directory for sweep");
            return;
        }
    };
    for dirent in entries.flatten() {
        let path = dirent.path();
        if dirent.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            let _ = fs::remove_dir_all(&path);
            continue;
        }
        let name = dirent.file_name();
        let name = name.to_string_lossy();
        if name.ends_with(CLEAN_SUFFIX)
            || name.ends_with(DIRTY_SUFFIX)
            || name == JOURNAL_FILE
            || name == JOURNAL_BKP
        {
            let _ = fs::remove_file(&path);
        }
    }
}
