use crate::index::types::{Positions, Postings, SearchResult, WordCounts};
use rustc_hash::FxHashMap;
use std::collections::btree_map::Entry;
use std::collections::BTreeSet;
use std::ops::Bound;

/// In-memory inverted index: word -> location -> positions, plus the number
/// of terms seen per location.
///
/// Not synchronized. Concurrent producers each fill a private shard and fold
/// it into a shared [`ThreadSafeIndex`](crate::index::ThreadSafeIndex) with
/// [`merge`](InvertedIndex::merge).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvertedIndex {
    postings: Postings,
    counts: WordCounts,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `word` at `position` (1-based) in `location`.
    ///
    /// Idempotent. The location's word count becomes the largest position
    /// seen for it. Returns whether the position was new.
    pub fn add_element(&mut self, word: &str, location: &str, position: usize) -> bool {
        debug_assert!(position > 0, "positions are 1-based");

        let inserted = self
            .postings
            .entry(word.to_owned())
            .or_default()
            .entry(location.to_owned())
            .or_default()
            .insert(position);

        match self.counts.get_mut(location) {
            Some(count) => *count = (*count).max(position),
            None => {
                self.counts.insert(location.to_owned(), position);
            }
        }

        inserted
    }

    /// Add `words` at consecutive positions after `last`, returning the last
    /// position used.
    pub fn add_all<I, S>(&mut self, words: I, location: &str, last: usize) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut position = last;
        for word in words {
            position += 1;
            self.add_element(word.as_ref(), location, position);
        }
        position
    }

    /// Fold `shard` into this index.
    ///
    /// Position sets are unioned and word counts take the maximum, so merging
    /// is commutative and idempotent.
    pub fn merge(&mut self, shard: InvertedIndex) {
        for (word, locations) in shard.postings {
            match self.postings.entry(word) {
                Entry::Vacant(entry) => {
                    entry.insert(locations);
                }
                Entry::Occupied(mut entry) => {
                    let mine = entry.get_mut();
                    for (location, positions) in locations {
                        match mine.entry(location) {
                            Entry::Vacant(slot) => {
                                slot.insert(positions);
                            }
                            Entry::Occupied(mut slot) => slot.get_mut().extend(positions),
                        }
                    }
                }
            }
        }

        for (location, count) in shard.counts {
            let current = self.counts.entry(location).or_insert(0);
            *current = (*current).max(count);
        }
    }

    /// Ranked search. `exact` matches whole words, otherwise every word
    /// starting with a term matches.
    pub fn search<I, S>(&self, terms: I, exact: bool) -> Vec<SearchResult>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if exact {
            self.exact_search(terms)
        } else {
            self.partial_search(terms)
        }
    }

    pub fn exact_search<I, S>(&self, terms: I) -> Vec<SearchResult>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut matched = BTreeSet::new();
        for term in terms {
            if let Some((word, _)) = self.postings.get_key_value(term.as_ref()) {
                matched.insert(word.as_str());
            }
        }
        self.rank(matched)
    }

    /// Prefix search. A word matched by several terms counts once per term.
    pub fn partial_search<I, S>(&self, terms: I) -> Vec<SearchResult>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let terms: Vec<S> = terms.into_iter().collect();
        let unique: BTreeSet<&str> = terms.iter().map(AsRef::as_ref).collect();
        let mut matched = Vec::new();
        for term in unique {
            // Keys are sorted, so prefix matches form one contiguous run
            // starting at the first key >= term.
            let tail = self
                .postings
                .range::<str, _>((Bound::Included(term), Bound::Unbounded));
            for (word, _) in tail {
                if !word.starts_with(term) {
                    break;
                }
                matched.push(word.as_str());
            }
        }
        self.rank(matched)
    }

    /// Tally matches per location over the matched words and sort.
    fn rank<'w>(&'w self, words: impl IntoIterator<Item = &'w str>) -> Vec<SearchResult> {
        let mut tallies: FxHashMap<&str, usize> = FxHashMap::default();
        for word in words {
            if let Some(locations) = self.postings.get(word) {
                for (location, positions) in locations {
                    *tallies.entry(location.as_str()).or_insert(0) += positions.len();
                }
            }
        }

        let mut results: Vec<SearchResult> = tallies
            .into_iter()
            .map(|(location, count)| {
                let total = self.counts.get(location).copied().unwrap_or(count);
                SearchResult::new(location, count, total)
            })
            .collect();
        results.sort_by(SearchResult::rank_cmp);
        results
    }

    pub fn contains(&self, word: &str) -> bool {
        self.postings.contains_key(word)
    }

    pub fn contains_location(&self, word: &str, location: &str) -> bool {
        self.postings
            .get(word)
            .is_some_and(|locations| locations.contains_key(location))
    }

    pub fn contains_position(&self, word: &str, location: &str, position: usize) -> bool {
        self.positions(word, location)
            .is_some_and(|positions| positions.contains(&position))
    }

    /// All indexed words in sorted order
    pub fn words(&self) -> impl Iterator<Item = &str> + '_ {
        self.postings.keys().map(String::as_str)
    }

    /// Locations containing `word`, sorted; empty if the word is unknown
    pub fn locations(&self, word: &str) -> impl Iterator<Item = &str> + '_ {
        self.postings
            .get(word)
            .into_iter()
            .flat_map(|locations| locations.keys().map(String::as_str))
    }

    pub fn positions(&self, word: &str, location: &str) -> Option<&Positions> {
        self.postings.get(word)?.get(location)
    }

    pub fn counts(&self) -> &WordCounts {
        &self.counts
    }

    pub fn postings(&self) -> &Postings {
        &self.postings
    }

    /// Number of distinct words
    pub fn len(&self) -> usize {
        self.postings.len()
    }

    /// Number of locations containing `word`
    pub fn location_count(&self, word: &str) -> usize {
        self.postings.get(word).map_or(0, |locations| locations.len())
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample() -> InvertedIndex {
        let mut index = InvertedIndex::new();
        index.add_all(["fox", "ran"], "a.txt", 0);
        index.add_all(["fox", "sat"], "b.txt", 0);
        index
    }

    #[test]
    fn test_add_element_is_idempotent() {
        let mut once = InvertedIndex::new();
        once.add_element("fox", "a.txt", 3);

        let mut twice = once.clone();
        assert!(!twice.add_element("fox", "a.txt", 3));
        assert_eq!(once, twice);
        assert_eq!(twice.counts()["a.txt"], 3);
    }

    #[test]
    fn test_counts_track_largest_position() {
        let mut index = InvertedIndex::new();
        index.add_element("b", "doc", 5);
        index.add_element("a", "doc", 2);
        assert_eq!(index.counts()["doc"], 5);
    }

    #[test]
    fn test_accessors() {
        let index = sample();
        assert!(index.contains("fox"));
        assert!(!index.contains("dog"));
        assert!(index.contains_location("fox", "b.txt"));
        assert!(!index.contains_location("ran", "b.txt"));
        assert!(index.contains_position("sat", "b.txt", 2));
        assert!(!index.contains_position("sat", "b.txt", 1));
        assert_eq!(index.words().collect::<Vec<_>>(), ["fox", "ran", "sat"]);
        assert_eq!(index.locations("fox").collect::<Vec<_>>(), ["a.txt", "b.txt"]);
        assert_eq!(index.locations("dog").count(), 0);
        assert_eq!(index.len(), 3);
        assert_eq!(index.location_count("fox"), 2);
        assert_eq!(index.location_count("dog"), 0);
    }

    #[test]
    fn test_exact_search_scenario() {
        let results = sample().search(["fox"], true);
        assert_eq!(
            results,
            vec![
                SearchResult::new("a.txt", 1, 2),
                SearchResult::new("b.txt", 1, 2),
            ]
        );
        assert_eq!(results[0].score, 0.5);
    }

    #[test]
    fn test_partial_search_matches_prefixes() {
        let index = sample();
        assert_eq!(index.search(["fo"], false), index.search(["fox"], true));
        assert!(index.search(["fo"], true).is_empty());
    }

    #[test]
    fn test_partial_scan_stops_at_first_non_match() {
        let mut index = InvertedIndex::new();
        index.add_all(["car", "cart", "carton", "cat", "dog"], "doc", 0);
        let results = index.search(["car"], false);
        assert_eq!(results, vec![SearchResult::new("doc", 3, 5)]);
    }

    #[test]
    fn test_word_matched_by_two_prefixes_counts_per_prefix() {
        let mut index = InvertedIndex::new();
        index.add_all(["fox", "ran"], "a.txt", 0);
        assert_eq!(
            index.search(["f", "fo"], false),
            vec![SearchResult::new("a.txt", 2, 2)]
        );
        assert_eq!(index.search(["f", "fo"], false)[0].score, 1.0);

        // Repeated terms collapse like a query's term set
        assert_eq!(index.search(["fo", "fo"], false), index.search(["fo"], false));
    }

    #[test]
    fn test_multiple_terms_combine_per_location() {
        let index = sample();
        let results = index.search(["fox", "sat"], true);
        assert_eq!(
            results,
            vec![
                SearchResult::new("b.txt", 2, 2),
                SearchResult::new("a.txt", 1, 2),
            ]
        );
    }

    #[test]
    fn test_ties_break_on_case_insensitive_location() {
        let mut index = InvertedIndex::new();
        index.add_element("x", "b.txt", 1);
        index.add_element("x", "A.txt", 1);
        index.add_element("x", "c.txt", 1);
        let order: Vec<_> = index
            .search(["x"], true)
            .into_iter()
            .map(|r| r.location)
            .collect();
        assert_eq!(order, ["A.txt", "b.txt", "c.txt"]);
    }

    #[test]
    fn test_merge_unions_positions_and_maxes_counts() {
        let mut left = InvertedIndex::new();
        left.add_element("fox", "a.txt", 1);
        let mut right = InvertedIndex::new();
        right.add_element("fox", "a.txt", 4);
        right.add_element("dog", "b.txt", 2);

        left.merge(right);
        assert_eq!(
            left.positions("fox", "a.txt").unwrap().iter().copied().collect::<Vec<_>>(),
            [1, 4]
        );
        assert_eq!(left.counts()["a.txt"], 4);
        assert_eq!(left.counts()["b.txt"], 2);
    }

    fn arb_shard() -> impl Strategy<Value = InvertedIndex> {
        prop::collection::vec(("[a-d]{1,3}", "[xyz]\\.txt", 1usize..20), 0..30).prop_map(
            |entries| {
                let mut shard = InvertedIndex::new();
                for (word, location, position) in entries {
                    shard.add_element(&word, &location, position);
                }
                shard
            },
        )
    }

    proptest! {
        #[test]
        fn prop_merge_is_commutative(a in arb_shard(), b in arb_shard()) {
            let mut ab = InvertedIndex::new();
            ab.merge(a.clone());
            ab.merge(b.clone());

            let mut ba = InvertedIndex::new();
            ba.merge(b);
            ba.merge(a);

            prop_assert_eq!(ab, ba);
        }

        #[test]
        fn prop_merge_is_idempotent(a in arb_shard(), b in arb_shard()) {
            let mut once = a.clone();
            once.merge(b.clone());
            let mut twice = once.clone();
            twice.merge(b);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_partial_search_covers_exact(index in arb_shard(), term in "[a-d]{1,2}") {
            let exact: BTreeSet<String> =
                index.search([&term], true).into_iter().map(|r| r.location).collect();
            let partial: BTreeSet<String> =
                index.search([&term], false).into_iter().map(|r| r.location).collect();
            prop_assert!(exact.is_subset(&partial));

            let expected: BTreeSet<String> = index
                .words()
                .filter(|word| word.starts_with(term.as_str()))
                .flat_map(|word| index.locations(word).map(str::to_owned))
                .collect();
            prop_assert_eq!(partial, expected);
        }
    }
}
