use crate::index::inverted::InvertedIndex;
use crate::index::types::SearchResult;
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Canonical query -> ranked results
pub type QueryResults = BTreeMap<String, Vec<SearchResult>>;

/// Pretty-print `value` as JSON into a new file at `path`.
pub fn write_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)
        .with_context(|| format!("Failed to serialize {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// `{ word: { location: [positions...] } }`
pub fn write_index(index: &InvertedIndex, path: &Path) -> Result<()> {
    write_json(index.postings(), path)?;
    info!(path = %path.display(), words = index.len(), "wrote index");
    Ok(())
}

/// `{ location: count }`
pub fn write_counts(index: &InvertedIndex, path: &Path) -> Result<()> {
    write_json(index.counts(), path)?;
    info!(path = %path.display(), locations = index.counts().len(), "wrote counts");
    Ok(())
}

/// `{ query: [ { "where", "count", "score" } ] }`
pub fn write_results(results: &QueryResults, path: &Path) -> Result<()> {
    write_json(results, path)?;
    info!(path = %path.display(), queries = results.len(), "wrote results");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::fs;
    use tempfile::TempDir;

    fn read(path: &Path) -> Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_write_index_and_counts() {
        let dir = TempDir::new().unwrap();
        let mut index = InvertedIndex::new();
        index.add_all(["fox", "ran", "fox"], "a.txt", 0);

        let index_path = dir.path().join("index.json");
        let counts_path = dir.path().join("counts.json");
        write_index(&index, &index_path).unwrap();
        write_counts(&index, &counts_path).unwrap();

        assert_eq!(
            read(&index_path),
            json!({ "fox": { "a.txt": [1, 3] }, "ran": { "a.txt": [2] } })
        );
        assert_eq!(read(&counts_path), json!({ "a.txt": 3 }));
    }

    #[test]
    fn test_write_results() {
        let dir = TempDir::new().unwrap();
        let mut results = QueryResults::new();
        results.insert("fox".into(), vec![SearchResult::new("a.txt", 1, 3)]);
        results.insert("zebra".into(), Vec::new());

        let path = dir.path().join("results.json");
        write_results(&results, &path).unwrap();
        assert_eq!(
            read(&path),
            json!({
                "fox": [{ "where": "a.txt", "count": 1, "score": 0.33333333 }],
                "zebra": []
            })
        );
    }

    #[test]
    fn test_unwritable_path_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("out.json");
        let err = write_json(&QueryResults::new(), &path).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to create"));
    }
}
