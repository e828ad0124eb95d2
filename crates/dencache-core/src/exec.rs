//! Serial task execution
//!
//! Journal appends must reach disk in the order their operations returned to
//! the caller, so they are funnelled through a single-threaded FIFO executor
//! supplied by the embedder at construction time. The engine owns a second
//! worker of the same shape for background trims.
//!
//! `SerialWorker` is the stock implementation: one named thread draining an
//! unbounded channel. Dropping the worker closes the channel, lets the thread
//! finish the queued tasks, and joins it.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use parking_lot::Mutex;
use tracing::warn;

use crate::error::{CacheError, CacheResult};

/// A unit of work scheduled on a serial executor.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Single-slot FIFO task queue.
///
/// Implementations must run tasks one at a time, in submission order, off the
/// caller's thread. Tasks submitted after shutdown may be silently dropped.
pub trait SerialExecutor: Send + Sync {
    /// Enqueue a task. Must not block on the task itself.
    fn execute(&self, task: Task);
}

/// Stock `SerialExecutor`: a named background thread draining a FIFO channel.
pub struct SerialWorker {
    sender: Mutex<Option<Sender<Task>>>,
    thread: Mutex<Option<thread::JoinHandle<()>>>,
}

impl SerialWorker {
    /// Spawn the worker thread. `name` shows up in thread listings and panics.
    pub fn new(name: &str) -> CacheResult<Self> {
        let (sender, receiver): (Sender<Task>, Receiver<Task>) = mpsc::channel();

        let thread = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                while let Ok(task) = receiver.recv() {
                    task();
                }
            })
            .map_err(|e| CacheError::Io {
                path: None,
                kind: std::io::ErrorKind::Other,
                message: format!("failed to spawn worker thread {:?}: {}", name, e),
            })?;

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            thread: Mutex::new(Some(thread)),
        })
    }

    /// Close the queue and wait for the thread to drain the remaining tasks.
    pub fn shutdown(&self) {
        let sender = self.sender.lock().take();
        drop(sender);
        if let Some(handle) = self.thread.lock().take() {
            let _ = handle.join();
        }
    }
}

impl SerialExecutor for SerialWorker {
    fn execute(&self, task: Task) {
        let sender = self.sender.lock();
        match sender.as_ref() {
            Some(tx) => {
                if tx.send(task).is_err() {
                    warn!("serial worker thread is gone, dropping task");
                }
            }
            None => warn!("serial worker already shut down, dropping task"),
        }
    }
}

impl Drop for SerialWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Run `f` on the executor and block the calling thread until it completes.
///
/// Used as a drain barrier: everything enqueued before this call has finished
/// by the time it returns. If the executor drops the task (already shut
/// down), this returns `None` rather than blocking forever.
pub fn execute_and_wait<R, F>(exec: &dyn SerialExecutor, f: F) -> Option<R>
where
    R: Send + 'static,
    F: FnOnce() -> R + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    exec.execute(Box::new(move || {
        let _ = tx.send(f());
    }));
    rx.recv().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_tasks_run_in_fifo_order() {
        let worker = SerialWorker::new("test-fifo").unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));

        for i in 0..100 {
            let log = Arc::clone(&log);
            worker.execute(Box::new(move || {
                log.lock().push(i);
            }));
        }
        worker.shutdown();

        let log = log.lock();
        assert_eq!(*log, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_execute_and_wait_is_a_barrier() {
        let worker = SerialWorker::new("test-barrier").unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..10 {
            let counter = Arc::clone(&counter);
            worker.execute(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }));
        }

        let seen = execute_and_wait(&worker, {
            let counter = Arc::clone(&counter);
            move || counter.load(Ordering::SeqCst)
        });
        assert_eq!(seen, Some(10));
    }

    #[test]
    fn test_execute_after_shutdown_is_dropped() {
        let worker = SerialWorker::new("test-shutdown").unwrap();
        worker.shutdown();

        // Must not panic or hang, and the barrier must not block.
        worker.execute(Box::new(|| panic!("should never run")));
        assert_eq!(execute_and_wait(&worker, || 1), None);
    }

    #[test]
    fn test_drop_drains_pending_tasks() {
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let worker = SerialWorker::new("test-drain").unwrap();
            for _ in 0..50 {
                let counter = Arc::clone(&counter);
                worker.execute(Box::new(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                }));
            }
        }
        assert_eq!(counter.load(Ordering::SeqCst), 50);
    }
}
