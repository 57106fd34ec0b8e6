#![no_main]

use libfuzzer_sys::fuzz_target;
use quarry::query::parse_query;
use quarry::utils::TextNormalizer;

fuzz_target!(|data: &str| {
    // Parsing must never panic; the key is the sorted unique terms joined
    // by single spaces
    let normalizer = TextNormalizer::new();
    if let Some(query) = parse_query(data, &normalizer) {
        assert!(!query.terms.is_empty());
        assert!(query.terms.iter().all(|term| !term.is_empty() && !term.contains(' ')));
        let joined: Vec<&str> = query.terms.iter().map(String::as_str).collect();
        assert_eq!(query.key, joined.join(" "));
        let _ = parse_query(&query.key, &normalizer);
    }
});
