//! Fixed-size worker pool with transitive completion tracking.
//!
//! Every [`WorkQueue::submit`] bumps a pending counter *before* the task is
//! visible to workers, and every finished task decrements it under the same
//! mutex. A task that submits more work therefore keeps the counter above
//! zero until its children are done, so [`WorkQueue::await_idle`] covers the
//! whole tree of spawned tasks.
//!
//! Tasks return `anyhow::Result<()>`. Errors are logged, panics are caught at
//! the worker boundary and logged, and neither kills the worker thread.

use super::error::QueueError;
use crossbeam::channel::{self, Receiver, Sender};
use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, warn};

type Job = Box<dyn FnOnce() -> anyhow::Result<()> + Send + 'static>;

#[derive(Debug, Default)]
struct Counts {
    pending: usize,
    completed: usize,
}

/// Pending/completed counters plus the condvar `await_idle` sleeps on.
#[derive(Debug, Default)]
struct Tracker {
    counts: Mutex<Counts>,
    idle: Condvar,
}

impl Tracker {
    fn counts(&self) -> MutexGuard<'_, Counts> {
        self.counts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn increment(&self) {
        self.counts().pending += 1;
    }

    /// Undo an increment for a task that never reached the channel.
    fn cancel(&self) {
        let mut counts = self.counts();
        counts.pending -= 1;
        if counts.pending == 0 {
            self.idle.notify_all();
        }
    }

    fn finish(&self) {
        let mut counts = self.counts();
        counts.pending -= 1;
        counts.completed += 1;
        if counts.pending == 0 {
            self.idle.notify_all();
        }
    }

    fn wait_idle(&self) {
        let mut counts = self.counts();
        while counts.pending > 0 {
            counts = self
                .idle
                .wait(counts)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

/// Marks a task finished when dropped, whatever the task did.
struct FinishGuard<'a>(&'a Tracker);

impl Drop for FinishGuard<'_> {
    fn drop(&mut self) {
        self.0.finish();
    }
}

struct Inner {
    sender: Mutex<Option<Sender<Job>>>,
    tracker: Arc<Tracker>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    size: usize,
}

impl Inner {
    fn close_and_join(&self) {
        drop(
            self.sender
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take(),
        );

        let handles =
            std::mem::take(&mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner));
        let current = thread::current().id();
        for handle in handles {
            // Shutting down from inside a task: that worker exits on its own
            // once the channel drains.
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                error!("worker thread terminated abnormally");
            }
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.close_and_join();
    }
}

/// Handle to a shared pool of worker threads.
///
/// Cloning is cheap and every clone talks to the same pool, which is how
/// tasks submit follow-up work. The pool shuts down on [`shutdown`] or when
/// the last handle is dropped.
///
/// [`shutdown`]: WorkQueue::shutdown
#[derive(Clone)]
pub struct WorkQueue {
    inner: Arc<Inner>,
}

impl WorkQueue {
    /// Spawn a pool of `size` workers (at least one).
    pub fn new(size: usize) -> io::Result<Self> {
        let size = size.max(1);
        let (sender, receiver) = channel::unbounded::<Job>();
        let tracker = Arc::new(Tracker::default());

        let mut workers = Vec::with_capacity(size);
        for id in 0..size {
            let receiver = receiver.clone();
            let tracker = Arc::clone(&tracker);
            let handle = thread::Builder::new()
                .name(format!("quarry-worker-{}", id))
                .spawn(move || run_worker(receiver, tracker))?;
            workers.push(handle);
        }
        debug!(workers = size, "work queue started");

        Ok(Self {
            inner: Arc::new(Inner {
                sender: Mutex::new(Some(sender)),
                tracker,
                workers: Mutex::new(workers),
                size,
            }),
        })
    }

    /// Queue a task for execution.
    ///
    /// Fails with [`QueueError::Closed`] once the queue has been shut down.
    pub fn submit<F>(&self, task: F) -> Result<(), QueueError>
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        let sender = self
            .inner
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(QueueError::Closed)?;

        // Count the task before any worker can see it.
        self.inner.tracker.increment();
        if sender.send(Box::new(task)).is_err() {
            self.inner.tracker.cancel();
            return Err(QueueError::Closed);
        }
        Ok(())
    }

    /// Block until every submitted task, including tasks submitted by other
    /// tasks, has finished.
    ///
    /// Calling this from inside a task of the same queue never returns.
    pub fn await_idle(&self) {
        self.inner.tracker.wait_idle();
    }

    /// Stop accepting work and join the workers.
    ///
    /// Tasks already queued or running still complete. Safe to call more than
    /// once and from inside a task.
    pub fn shutdown(&self) {
        self.inner.close_and_join();
    }

    pub fn is_shutdown(&self) -> bool {
        self.inner
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Number of worker threads.
    pub fn size(&self) -> usize {
        self.inner.size
    }

    /// Tasks submitted but not yet finished.
    pub fn pending(&self) -> usize {
        self.inner.tracker.counts().pending
    }

    /// Tasks finished since the queue was created, successful or not.
    pub fn completed(&self) -> usize {
        self.inner.tracker.counts().completed
    }
}

fn run_worker(receiver: Receiver<Job>, tracker: Arc<Tracker>) {
    // Ends once every sender is gone and the channel is drained.
    for job in receiver.iter() {
        let _finish = FinishGuard(&tracker);
        match panic::catch_unwind(AssertUnwindSafe(job)) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!("task failed: {:#}", err),
            Err(payload) => error!(panic = panic_message(&*payload), "task panicked"),
        }
    }
    debug!("worker exiting");
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic payload"
    }
}
