//! # Quarry - Concurrent Text Search Engine
//!
//! Quarry builds an inverted index (word -> location -> positions) from text
//! files or crawled web pages and answers ranked exact and prefix queries
//! against it.
//!
//! ## Architecture
//!
//! - [`sync`] - Reader/writer lock and the worker pool every concurrent
//!   component shares
//! - [`index`] - The inverted index, its thread-safe wrapper, file builders
//!   and JSON writers
//! - [`crawl`] - Bounded web crawler with pluggable fetching
//! - [`query`] - Query canonicalization and the query engines
//! - [`output`] - Terminal rendering of results
//! - [`utils`] - Text normalization, configuration, progress spinners
//!
//! ## Quick Start
//!
//! ```no_run
//! use quarry::index::{ConcurrentBuilder, ThreadSafeIndex};
//! use quarry::query::{ConcurrentQueryEngine, QueryProcessor};
//! use quarry::sync::WorkQueue;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let queue = WorkQueue::new(4).unwrap();
//! let index = Arc::new(ThreadSafeIndex::new());
//!
//! ConcurrentBuilder::new(Arc::clone(&index), queue.clone())
//!     .build(Path::new("corpus/"))
//!     .unwrap();
//!
//! let mut engine = ConcurrentQueryEngine::new(Arc::clone(&index), queue.clone());
//! engine.process_file(Path::new("queries.txt"), false).unwrap();
//! for result in engine.query_results("fox").unwrap_or_default() {
//!     println!("{} {} {:.8}", result.location, result.count, result.score);
//! }
//! queue.shutdown();
//! ```
//!
//! ## Concurrency
//!
//! Producers never write to the shared index term by term. Every file or
//! page task fills a private [`InvertedIndex`](index::InvertedIndex) and
//! merges it into the [`ThreadSafeIndex`](index::ThreadSafeIndex) once,
//! under the write lock. Queries only take the read lock.

pub mod crawl;
pub mod index;
pub mod output;
pub mod query;
pub mod sync;
pub mod utils;
