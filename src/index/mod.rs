//! Inverted index, its thread-safe wrapper, builders and JSON writers.

pub mod build;
pub mod inverted;
pub mod shared;
pub mod types;
pub mod writer;

pub use build::{index_file, text_files, ConcurrentBuilder, IndexBuilder};
pub use inverted::InvertedIndex;
pub use shared::ThreadSafeIndex;
pub use types::*;
pub use writer::{write_counts, write_index, write_json, write_results, QueryResults};
