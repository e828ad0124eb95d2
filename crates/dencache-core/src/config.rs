//! Configuration for the cache engine
//!
//! The embedder supplies the cache directory, the byte and entry budgets,
//! the serial executor that journal appends run on, and an optional
//! UI-thread predicate. A missing directory or a zero budget puts the
//! engine into stub mode, where every operation is a no-op.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::exec::SerialExecutor;

/// Default byte budget: 30 MiB
pub const DEFAULT_MAX_BYTES: u64 = 30 * 1024 * 1024;

/// Default entry-count budget
pub const DEFAULT_MAX_COUNT: usize = 1000;

/// Predicate answering "is the current thread the embedder's UI thread?".
///
/// Construction and close assert this returns false. Embedders without a
/// meaningful UI thread leave it unset, which disables the check.
pub type UiThreadCheck = Arc<dyn Fn() -> bool + Send + Sync>;

/// Cache engine configuration.
#[derive(Clone)]
pub struct Config {
    /// Cache directory; `None` selects stub mode
    pub directory: Option<PathBuf>,
    /// Byte budget; 0 selects stub mode
    pub max_bytes: u64,
    /// Entry-count budget; 0 selects stub mode
    pub max_count: usize,
    /// Executor that journal appends and rebuilds run on (host-provided)
    pub journal_executor: Arc<dyn SerialExecutor>,
    /// Optional UI-thread assertion
    pub ui_thread_check: Option<UiThreadCheck>,
}

impl Config {
    /// Configuration with default budgets over `directory`.
    pub fn new<P: AsRef<Path>>(directory: P, journal_executor: Arc<dyn SerialExecutor>) -> Self {
        Self {
            directory: Some(directory.as_ref().to_path_buf()),
            max_bytes: DEFAULT_MAX_BYTES,
            max_count: DEFAULT_MAX_COUNT,
            journal_executor,
            ui_thread_check: None,
        }
    }

    /// Configuration with no directory: the engine comes up in stub mode.
    pub fn stub(journal_executor: Arc<dyn SerialExecutor>) -> Self {
        Self {
            directory: None,
            max_bytes: DEFAULT_MAX_BYTES,
            max_count: DEFAULT_MAX_COUNT,
            journal_executor,
            ui_thread_check: None,
        }
    }

    /// True iff this configuration selects the degenerate stub engine.
    pub fn is_stub(&self) -> bool {
        self.directory.is_none() || self.max_bytes == 0 || self.max_count == 0
    }
}
