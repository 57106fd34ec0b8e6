//! Synchronization primitives shared by the builder, crawler and query engine.
//!
//! - [`rwlock`] - reader/writer lock with owner-checked release, and
//!   [`RwCell`], the value-guarding cell built on it
//! - [`work_queue`] - fixed-size worker pool with transitive completion
//!   tracking

pub mod error;
pub mod rwlock;
pub mod work_queue;

pub use error::{LockError, QueueError};
pub use rwlock::{ReadGuard, ReadWriteLock, RwCell, WriteGuard};
pub use work_queue::WorkQueue;
