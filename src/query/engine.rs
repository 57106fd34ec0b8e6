//! Query processing over a built index.
//!
//! Both engines canonicalize each query line, search once per distinct key
//! and keep the ranked results keyed by that canonical form.

use crate::index::{write_results, InvertedIndex, QueryResults, SearchResult, ThreadSafeIndex};
use crate::query::parser::parse_query;
use crate::sync::WorkQueue;
use crate::utils::{Normalizer, TextNormalizer};
use anyhow::{Context, Result};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

/// Common interface of the single-threaded and concurrent engines
pub trait QueryProcessor {
    /// Run one query line. Lines already answered and lines with no
    /// searchable terms are skipped.
    fn process_line(&mut self, line: &str, exact: bool) -> Result<()>;

    /// Run every line of a query file.
    fn process_file(&mut self, path: &Path, exact: bool) -> Result<()> {
        for line in read_lines(path)? {
            self.process_line(&line, exact)?;
        }
        Ok(())
    }

    /// Canonical keys answered so far, sorted
    fn query_lines(&self) -> Vec<String>;

    /// Results for `line`, which may be raw or already canonical
    fn query_results(&self, line: &str) -> Option<Vec<SearchResult>>;

    /// Copy of every stored result
    fn results(&self) -> QueryResults;

    fn is_empty(&self) -> bool;

    /// Write all results as JSON
    fn write(&self, path: &Path) -> Result<()> {
        write_results(&self.results(), path)
    }
}

fn read_lines(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open query file {}", path.display()))?;
    BufReader::new(file)
        .lines()
        .collect::<std::io::Result<Vec<_>>>()
        .with_context(|| format!("Failed to read query file {}", path.display()))
}

/// Single-threaded engine over a borrowed index
pub struct QueryEngine<'a> {
    index: &'a InvertedIndex,
    normalizer: Arc<dyn Normalizer>,
    results: QueryResults,
}

impl<'a> QueryEngine<'a> {
    pub fn new(index: &'a InvertedIndex) -> Self {
        Self {
            index,
            normalizer: Arc::new(TextNormalizer::new()),
            results: QueryResults::new(),
        }
    }

    pub fn with_normalizer(mut self, normalizer: Arc<dyn Normalizer>) -> Self {
        self.normalizer = normalizer;
        self
    }
}

impl QueryProcessor for QueryEngine<'_> {
    fn process_line(&mut self, line: &str, exact: bool) -> Result<()> {
        let Some(query) = parse_query(line, self.normalizer.as_ref()) else {
            return Ok(());
        };
        if let Entry::Vacant(entry) = self.results.entry(query.key) {
            let found = self.index.search(&query.terms, exact);
            debug!(query = %entry.key(), results = found.len(), "query answered");
            entry.insert(found);
        }
        Ok(())
    }

    fn query_lines(&self) -> Vec<String> {
        self.results.keys().cloned().collect()
    }

    fn query_results(&self, line: &str) -> Option<Vec<SearchResult>> {
        let query = parse_query(line, self.normalizer.as_ref())?;
        self.results.get(&query.key).cloned()
    }

    fn results(&self) -> QueryResults {
        self.results.clone()
    }

    fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Engine that answers each query line as a [`WorkQueue`] task.
///
/// A task first reserves its key in the result map; if another task got
/// there first it stops. The search then runs with only the index read lock
/// held, and the reserving task alone fills the entry. Reserved keys stay
/// invisible until filled, and are released if the task never fills them.
pub struct ConcurrentQueryEngine {
    index: Arc<ThreadSafeIndex>,
    queue: WorkQueue,
    normalizer: Arc<dyn Normalizer>,
    results: Arc<Mutex<Answers>>,
}

/// Result map where `None` marks a key reserved by a running task
type Answers = BTreeMap<String, Option<Vec<SearchResult>>>;

impl ConcurrentQueryEngine {
    pub fn new(index: Arc<ThreadSafeIndex>, queue: WorkQueue) -> Self {
        Self {
            index,
            queue,
            normalizer: Arc::new(TextNormalizer::new()),
            results: Arc::default(),
        }
    }

    pub fn with_normalizer(mut self, normalizer: Arc<dyn Normalizer>) -> Self {
        self.normalizer = normalizer;
        self
    }

    fn submit_line(&self, line: String, exact: bool) -> Result<()> {
        let index = Arc::clone(&self.index);
        let normalizer = Arc::clone(&self.normalizer);
        let results = Arc::clone(&self.results);
        self.queue.submit(move || {
            answer(&index, normalizer.as_ref(), &results, &line, exact);
            Ok(())
        })?;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Answers> {
        lock_results(&self.results)
    }
}

fn lock_results(results: &Mutex<Answers>) -> MutexGuard<'_, Answers> {
    results.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Claim on one key of the result map. Dropping it unfilled removes the key.
struct Reservation<'a> {
    results: &'a Mutex<Answers>,
    key: Option<String>,
}

impl<'a> Reservation<'a> {
    /// Reserve `key`, or `None` if another task already holds or filled it.
    fn claim(results: &'a Mutex<Answers>, key: String) -> Option<Self> {
        match lock_results(results).entry(key) {
            Entry::Vacant(entry) => {
                let key = entry.key().clone();
                entry.insert(None);
                Some(Self {
                    results,
                    key: Some(key),
                })
            }
            Entry::Occupied(_) => None,
        }
    }

    fn fill(mut self, found: Vec<SearchResult>) {
        if let Some(key) = self.key.take() {
            lock_results(self.results).insert(key, Some(found));
        }
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            lock_results(self.results).remove(&key);
        }
    }
}

fn answer(
    index: &ThreadSafeIndex,
    normalizer: &dyn Normalizer,
    results: &Mutex<Answers>,
    line: &str,
    exact: bool,
) {
    let Some(query) = parse_query(line, normalizer) else {
        return;
    };
    let Some(reservation) = Reservation::claim(results, query.key.clone()) else {
        return;
    };

    let found = index.search(&query.terms, exact);
    debug!(query = %query.key, results = found.len(), "query answered");
    reservation.fill(found);
}

impl QueryProcessor for ConcurrentQueryEngine {
    /// Runs on the queue and waits for it to drain.
    fn process_line(&mut self, line: &str, exact: bool) -> Result<()> {
        self.submit_line(line.to_owned(), exact)?;
        self.queue.await_idle();
        Ok(())
    }

    fn process_file(&mut self, path: &Path, exact: bool) -> Result<()> {
        let lines = read_lines(path)?;
        let total = lines.len();
        for line in lines {
            self.submit_line(line, exact)?;
        }
        self.queue.await_idle();
        info!(lines = total, queries = self.query_lines().len(), "queries complete");
        Ok(())
    }

    fn query_lines(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|(_, found)| found.is_some())
            .map(|(key, _)| key.clone())
            .collect()
    }

    fn query_results(&self, line: &str) -> Option<Vec<SearchResult>> {
        let query = parse_query(line, self.normalizer.as_ref())?;
        self.lock().get(&query.key).cloned().flatten()
    }

    fn results(&self) -> QueryResults {
        self.lock()
            .iter()
            .filter_map(|(key, found)| Some((key.clone(), found.clone()?)))
            .collect()
    }

    fn is_empty(&self) -> bool {
        self.lock().values().all(Option::is_none)
    }
}
