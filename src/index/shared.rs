use crate::index::inverted::InvertedIndex;
use crate::index::types::{SearchResult, WordCounts};
use crate::sync::{ReadGuard, RwCell};

/// [`InvertedIndex`] behind one coarse reader/writer lock.
///
/// Mutations (`add_element`, `merge`) take the write lock; everything else
/// takes the read lock. Accessors return owned copies because borrowed views
/// cannot outlive the lock. Use [`read`](ThreadSafeIndex::read) to work with
/// the whole index under a single read lock.
#[derive(Default)]
pub struct ThreadSafeIndex {
    inner: RwCell<InvertedIndex>,
}

impl ThreadSafeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_element(&self, word: &str, location: &str, position: usize) -> bool {
        self.inner.write().add_element(word, location, position)
    }

    /// Fold a privately built shard in under the write lock.
    pub fn merge(&self, shard: InvertedIndex) {
        if shard.is_empty() {
            return;
        }
        self.inner.write().merge(shard);
    }

    pub fn search<I, S>(&self, terms: I, exact: bool) -> Vec<SearchResult>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.inner.read().search(terms, exact)
    }

    pub fn exact_search<I, S>(&self, terms: I) -> Vec<SearchResult>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.inner.read().exact_search(terms)
    }

    pub fn partial_search<I, S>(&self, terms: I) -> Vec<SearchResult>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.inner.read().partial_search(terms)
    }

    pub fn contains(&self, word: &str) -> bool {
        self.inner.read().contains(word)
    }

    pub fn contains_location(&self, word: &str, location: &str) -> bool {
        self.inner.read().contains_location(word, location)
    }

    pub fn contains_position(&self, word: &str, location: &str, position: usize) -> bool {
        self.inner.read().contains_position(word, location, position)
    }

    pub fn words(&self) -> Vec<String> {
        self.inner.read().words().map(str::to_owned).collect()
    }

    pub fn locations(&self, word: &str) -> Vec<String> {
        self.inner.read().locations(word).map(str::to_owned).collect()
    }

    pub fn positions(&self, word: &str, location: &str) -> Vec<usize> {
        self.inner
            .read()
            .positions(word, location)
            .map(|positions| positions.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn counts(&self) -> WordCounts {
        self.inner.read().counts().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn location_count(&self, word: &str) -> usize {
        self.inner.read().location_count(word)
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Hold the read lock for a batch of operations, e.g. writing the index
    /// out.
    pub fn read(&self) -> ReadGuard<'_, InvertedIndex> {
        self.inner.read()
    }

    /// Copy of the current contents
    pub fn snapshot(&self) -> InvertedIndex {
        self.inner.read().clone()
    }

    pub fn into_inner(self) -> InvertedIndex {
        self.inner.into_inner()
    }
}

impl From<InvertedIndex> for ThreadSafeIndex {
    fn from(index: InvertedIndex) -> Self {
        Self {
            inner: RwCell::new(index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_disjoint_writers_lose_nothing() {
        let index = Arc::new(ThreadSafeIndex::new());
        let handles: Vec<_> = (0..8)
            .map(|writer| {
                let index = Arc::clone(&index);
                thread::spawn(move || {
                    for n in 0..100 {
                        index.add_element(&format!("w{}", n), &format!("doc{}", writer), n + 1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(index.len(), 100);
        for writer in 0..8 {
            let location = format!("doc{}", writer);
            assert_eq!(index.counts()[&location], 100);
            for n in 0..100 {
                assert!(index.contains_position(&format!("w{}", n), &location, n + 1));
            }
        }
    }

    #[test]
    fn test_concurrent_shard_merges_equal_sequential_merge() {
        let shards: Vec<InvertedIndex> = (0..6)
            .map(|doc| {
                let mut shard = InvertedIndex::new();
                let location = format!("doc{}.txt", doc);
                shard.add_all(["alpha", "beta", "gamma"].iter().take(doc % 3 + 1), &location, 0);
                shard
            })
            .collect();

        let mut expected = InvertedIndex::new();
        for shard in shards.iter().cloned() {
            expected.merge(shard);
        }

        let shared = Arc::new(ThreadSafeIndex::new());
        let handles: Vec<_> = shards
            .into_iter()
            .map(|shard| {
                let shared = Arc::clone(&shared);
                thread::spawn(move || shared.merge(shard))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(shared.snapshot(), expected);
    }

    #[test]
    fn test_owned_accessors() {
        let index = ThreadSafeIndex::new();
        index.add_element("fox", "a.txt", 1);
        index.add_element("fox", "a.txt", 3);
        assert_eq!(index.words(), ["fox"]);
        assert_eq!(index.locations("fox"), ["a.txt"]);
        assert_eq!(index.positions("fox", "a.txt"), [1, 3]);
        assert!(index.positions("fox", "b.txt").is_empty());
        assert_eq!(index.search(["f"], false).len(), 1);
        assert!(!index.is_empty());
    }
}
