use crate::utils::Normalizer;
use std::collections::BTreeSet;

/// A query line reduced to its canonical form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// Unique normalized terms, sorted
    pub terms: BTreeSet<String>,
    /// Terms joined by a single space; the key results are stored under
    pub key: String,
}

impl Query {
    /// Normalize `line` into a query. `None` when nothing searchable is
    /// left.
    pub fn parse(line: &str, normalizer: &dyn Normalizer) -> Option<Self> {
        let terms: BTreeSet<String> = normalizer.normalize(line).into_iter().collect();
        if terms.is_empty() {
            return None;
        }
        let key = terms.iter().map(String::as_str).collect::<Vec<_>>().join(" ");
        Some(Self { terms, key })
    }
}

/// Parse a raw query line
pub fn parse_query(line: &str, normalizer: &dyn Normalizer) -> Option<Query> {
    Query::parse(line, normalizer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::TextNormalizer;

    fn parse(line: &str) -> Option<Query> {
        parse_query(line, &TextNormalizer::new())
    }

    #[test]
    fn test_terms_are_sorted_and_unique() {
        let query = parse("Sat fox, FOX ran!").unwrap();
        assert_eq!(query.key, "fox ran sat");
        assert_eq!(query.terms.len(), 3);
    }

    #[test]
    fn test_equivalent_lines_share_a_key() {
        assert_eq!(parse("ran fox"), parse("  FOX\tran ran "));
    }

    #[test]
    fn test_empty_lines_are_skipped() {
        assert_eq!(parse(""), None);
        assert_eq!(parse("   "), None);
        assert_eq!(parse("42 ?!"), None);
    }
}
