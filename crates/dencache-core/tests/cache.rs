//! Integration tests: full cache lifecycle over a real directory.
//!
//! These exercise the public surface end to end — edit/commit/get round
//! trips, byte-pressure eviction, snapshot-stable readers, crash recovery
//! from seeded journals, and the concurrent-editor contract.

use std::path::Path;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use tempfile::TempDir;

use dencache_core::{CacheError, Config, DenCache, SerialWorker};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn open_cache(dir: &Path) -> DenCache {
    let executor = Arc::new(SerialWorker::new("test-journal").unwrap());
    DenCache::open(Config::new(dir, executor)).unwrap()
}

fn open_cache_with(dir: &Path, max_bytes: u64, max_count: usize) -> DenCache {
    let executor = Arc::new(SerialWorker::new("test-journal").unwrap());
    let mut config = Config::new(dir, executor);
    config.max_bytes = max_bytes;
    config.max_count = max_count;
    DenCache::open(config).unwrap()
}

fn set(cache: &DenCache, key: &str, value: &[u8]) {
    let mut writer = cache.edit(key).unwrap().expect("editor available");
    writer.write(value).unwrap();
    assert!(writer.commit().unwrap());
}

fn read(cache: &DenCache, key: &str) -> Option<Vec<u8>> {
    cache
        .get(key)
        .unwrap()
        .map(|reader| reader.read_to_vec().unwrap())
}

// ---------------------------------------------------------------------------
// Round trips
// ---------------------------------------------------------------------------

#[test]
fn test_basic_write_read() {
    let dir = TempDir::new().unwrap();
    let cache = open_cache(dir.path());

    set(&cache, "k1", b"ABC");

    assert_eq!(read(&cache, "k1"), Some(b"ABC".to_vec()));
    assert!(dir.path().join("k1.clean").exists());
    assert!(!dir.path().join("k1.tmp").exists());
}

#[test]
fn test_abort_leaves_presence_unchanged() {
    let dir = TempDir::new().unwrap();
    let cache = open_cache(dir.path());

    // Abort of a first edit: key absent before, absent after.
    let mut writer = cache.edit("fresh").unwrap().unwrap();
    writer.write(b"discard").unwrap();
    writer.abort().unwrap();
    assert!(!cache.has("fresh").unwrap());

    // Abort of an overwrite: prior bytes survive.
    set(&cache, "kept", b"original");
    let mut writer = cache.edit("kept").unwrap().unwrap();
    writer.write(b"discard").unwrap();
    writer.abort().unwrap();
    assert!(cache.has("kept").unwrap());
    assert_eq!(read(&cache, "kept"), Some(b"original".to_vec()));
}

#[test]
fn test_remove_then_rewrite() {
    let dir = TempDir::new().unwrap();
    let cache = open_cache(dir.path());

    set(&cache, "k1", b"first");
    cache.remove("k1").unwrap();
    assert_eq!(read(&cache, "k1"), None);

    set(&cache, "k1", b"second");
    assert_eq!(read(&cache, "k1"), Some(b"second".to_vec()));
}

// ---------------------------------------------------------------------------
// Eviction
// ---------------------------------------------------------------------------

#[test]
fn test_lru_eviction_under_byte_pressure() {
    let dir = TempDir::new().unwrap();
    let cache = open_cache_with(dir.path(), 7, 1000);

    set(&cache, "a", b"aaa");
    set(&cache, "b", b"bbbb");
    assert_eq!(cache.size_bytes(), 7);

    set(&cache, "c", b"c");
    cache.flush();

    assert_eq!(cache.size_bytes(), 5);
    assert!(!cache.has("a").unwrap());
    assert!(cache.has("b").unwrap());
    assert!(cache.has("c").unwrap());

    set(&cache, "d", b"d");
    set(&cache, "e", b"eeeeee");
    cache.flush();

    assert_eq!(cache.size_bytes(), 7);
    assert!(!cache.has("b").unwrap());
    assert!(!cache.has("c").unwrap());
    assert!(cache.has("d").unwrap());
    assert!(cache.has("e").unwrap());
}

// ---------------------------------------------------------------------------
// Reader stability
// ---------------------------------------------------------------------------

#[test]
fn test_read_stability_across_overwrite() {
    use std::io::Read;

    let dir = TempDir::new().unwrap();
    let cache = open_cache(dir.path());

    set(&cache, "k1", b"AAaa");

    let mut r1 = cache.get("k1").unwrap().unwrap();
    let mut first = [0u8; 2];
    r1.read_exact(&mut first).unwrap();
    assert_eq!(&first, b"AA");

    set(&cache, "k1", b"CCcc");

    // A new reader sees the replacement...
    assert_eq!(read(&cache, "k1"), Some(b"CCcc".to_vec()));

    // ...while the old snapshot keeps its inode and its length.
    let mut rest = Vec::new();
    r1.read_to_end(&mut rest).unwrap();
    assert_eq!(rest, b"aa");
    assert_eq!(r1.len(), 4);
}

// ---------------------------------------------------------------------------
// Crash recovery
// ---------------------------------------------------------------------------

#[test]
fn test_recovery_purges_dirty_never_cleaned() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("k1.clean"), b"A").unwrap();
    std::fs::write(dir.path().join("k1.tmp"), b"D").unwrap();
    std::fs::write(dir.path().join("journal"), "CLEAN k1 1\nDIRTY k1\n").unwrap();

    let cache = open_cache(dir.path());

    assert!(!dir.path().join("k1.clean").exists());
    assert!(!dir.path().join("k1.tmp").exists());
    assert_eq!(read(&cache, "k1"), None);
    assert_eq!(cache.count(), 0);
    assert_eq!(cache.size_bytes(), 0);
}

#[test]
fn test_backup_journal_is_promoted() {
    let dir = TempDir::new().unwrap();
    {
        let cache = open_cache(dir.path());
        set(&cache, "k1", b"ABC");
        cache.close().unwrap();
    }

    // Simulate a crash between rebuild steps 3 and 4: only the backup
    // survives.
    std::fs::rename(dir.path().join("journal"), dir.path().join("journal.bkp")).unwrap();

    let cache = open_cache(dir.path());
    let reader = cache.get("k1").unwrap().unwrap();
    assert_eq!(reader.len(), 3);
    assert_eq!(reader.read_to_vec().unwrap(), b"ABC");

    assert!(dir.path().join("journal").exists());
    assert!(!dir.path().join("journal.bkp").exists());
}

#[test]
fn test_corrupt_journal_sweeps_directory() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("g1.clean"), b"stray").unwrap();
    std::fs::write(dir.path().join("otherFile.tmp"), b"stray").unwrap();
    std::fs::create_dir(dir.path().join("subdir")).unwrap();
    std::fs::write(dir.path().join("subdir/nested"), b"stray").unwrap();
    std::fs::write(dir.path().join("journal"), "CLEAN g1 5\nBOGUS\n").unwrap();

    let cache = open_cache(dir.path());

    assert!(!dir.path().join("g1.clean").exists());
    assert!(!dir.path().join("otherFile.tmp").exists());
    assert!(!dir.path().join("subdir").exists());
    assert_eq!(cache.count(), 0);
    assert_eq!(cache.size_bytes(), 0);

    // The cache is fully usable again and rebuilds a fresh journal.
    set(&cache, "k1", b"v");
    cache.close().unwrap();
    let journal = std::fs::read_to_string(dir.path().join("journal")).unwrap();
    assert_eq!(journal, "CLEAN k1 1\n");
}

#[test]
fn test_readable_entries_survive_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let cache = open_cache(dir.path());
        set(&cache, "k1", b"one");
        set(&cache, "k2", b"twotwo");

        // An edit left open at shutdown must not survive.
        let mut writer = cache.edit("k3").unwrap().unwrap();
        writer.write(b"half").unwrap();
        cache.close().unwrap();
        drop(writer);
    }

    let cache = open_cache(dir.path());
    assert_eq!(read(&cache, "k1"), Some(b"one".to_vec()));
    assert_eq!(read(&cache, "k2"), Some(b"twotwo".to_vec()));
    assert_eq!(read(&cache, "k3"), None);
    assert_eq!(cache.size_bytes(), 9);
}

#[test]
fn test_lru_order_survives_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let cache = open_cache(dir.path());
        set(&cache, "a", b"1");
        set(&cache, "b", b"2");
        set(&cache, "c", b"3");
        // Touch "a" so it is most recently used at close time.
        assert!(cache.get("a").unwrap().is_some());
        cache.close().unwrap();
    }

    // Reopen with room for only two entries: the least recently used key
    // before the restart ("b") is the one evicted.
    let cache = open_cache_with(dir.path(), 1000, 2);
    cache.flush();

    assert!(!cache.has("b").unwrap());
    assert!(cache.has("c").unwrap());
    assert!(cache.has("a").unwrap());
}

#[test]
fn test_close_compacts_journal() {
    let dir = TempDir::new().unwrap();
    {
        let cache = open_cache(dir.path());
        set(&cache, "k1", b"v1");
        set(&cache, "k1", b"v2-longer");
        set(&cache, "k2", b"x");
        cache.remove("k2").unwrap();
        cache.close().unwrap();
    }

    // Six appended lines compact down to one per surviving entry.
    let journal = std::fs::read_to_string(dir.path().join("journal")).unwrap();
    assert_eq!(journal, "CLEAN k1 9\n");
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[test]
fn test_concurrent_editor_rejection() {
    let dir = TempDir::new().unwrap();
    let cache = Arc::new(open_cache(dir.path()));

    let (ready_tx, ready_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();

    let holder = {
        let cache = Arc::clone(&cache);
        thread::spawn(move || {
            let mut writer = cache.edit("k1").unwrap().expect("first editor");
            writer.write(b"held").unwrap();
            ready_tx.send(()).unwrap();
            release_rx.recv().unwrap();
            assert!(writer.commit().unwrap());
        })
    };

    ready_rx.recv().unwrap();
    let err = cache.edit("k1").unwrap_err();
    assert!(matches!(err, CacheError::IllegalState { .. }));

    release_tx.send(()).unwrap();
    holder.join().unwrap();

    assert_eq!(read(&cache, "k1"), Some(b"held".to_vec()));
}

#[test]
fn test_concurrent_readers_and_writers() {
    let dir = TempDir::new().unwrap();
    let cache = Arc::new(open_cache(dir.path()));

    for i in 0..20 {
        set(&cache, &format!("k{}", i), format!("value-{}", i).as_bytes());
    }

    let mut handles = vec![];
    for _ in 0..4 {
        let cache = Arc::clone(&cache);
        handles.push(thread::spawn(move || {
            for i in 0..20 {
                let bytes = read(&cache, &format!("k{}", i)).expect("entry readable");
                assert_eq!(bytes, format!("value-{}", i).as_bytes());
            }
        }));
    }
    for i in 20..40 {
        set(&cache, &format!("k{}", i), format!("value-{}", i).as_bytes());
    }
    for handle in handles {
        handle.join().unwrap();
    }
}
