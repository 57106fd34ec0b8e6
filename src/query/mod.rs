//! Query parsing and processing.

pub mod engine;
pub mod parser;

pub use engine::{ConcurrentQueryEngine, QueryEngine, QueryProcessor};
pub use parser::{parse_query, Query};
