use std::thread::ThreadId;
use thiserror::Error;

/// Misuse of a [`ReadWriteLock`](super::ReadWriteLock).
///
/// These are programming errors, never transient conditions, so callers
/// surface them instead of retrying.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockError {
    /// The write lock was released by a thread other than the one holding it.
    #[error("write lock held by {owner:?} released by {caller:?}")]
    NotOwner { owner: ThreadId, caller: ThreadId },

    /// A release was attempted with no matching acquire.
    #[error("{0} lock released without being held")]
    NotLocked(&'static str),
}

/// Errors returned by [`WorkQueue`](super::WorkQueue).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("work queue has been shut down")]
    Closed,
}
