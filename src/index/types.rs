use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// Positions (1-based) of one word inside one location
pub type Positions = BTreeSet<usize>;

/// word -> location -> positions, in lexicographic key order
pub type Postings = BTreeMap<String, BTreeMap<String, Positions>>;

/// location -> number of terms processed for that location
pub type WordCounts = BTreeMap<String, usize>;

/// One ranked location for a query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    #[serde(rename = "where")]
    pub location: String,
    pub count: usize,
    #[serde(serialize_with = "serialize_score")]
    pub score: f64,
}

impl SearchResult {
    pub fn new(location: impl Into<String>, count: usize, total: usize) -> Self {
        Self {
            location: location.into(),
            count,
            score: count as f64 / total.max(1) as f64,
        }
    }

    /// Ranking order: score descending, then count descending, then
    /// location ascending ignoring case.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| other.count.cmp(&self.count))
            .then_with(|| cmp_ignore_case(&self.location, &other.location))
            .then_with(|| self.location.cmp(&other.location))
    }
}

fn cmp_ignore_case(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

/// Scores are written with 8 decimal places of precision
fn serialize_score<S: Serializer>(score: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64((score * 1e8).round() / 1e8)
}

/// Counters reported by the builders
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Files handed to the indexer
    pub files: usize,
    /// Files that could not be read
    pub failed: usize,
}

impl BuildStats {
    pub fn indexed(&self) -> usize {
        self.files - self.failed
    }
}
