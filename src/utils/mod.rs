//! Utility functions and data structures.
//!
//! ## Modules
//!
//! - [`app_data`] - Configuration file in the per-user config directory
//! - [`progress`] - Spinners, no-op without the `progress` feature
//! - [`tokenizer`] - Text normalization shared by indexing and queries
//!
//! ## Key Functions
//!
//! ```
//! use quarry::utils::{Normalizer, TextNormalizer};
//!
//! let terms = TextNormalizer::new().normalize("The quick, brown Fox!");
//! assert_eq!(terms, ["the", "quick", "brown", "fox"]);
//! ```

pub mod app_data;
pub mod progress;
pub mod tokenizer;

pub use app_data::*;
pub use tokenizer::*;
