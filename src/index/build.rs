use crate::index::inverted::InvertedIndex;
use crate::index::shared::ThreadSafeIndex;
use crate::index::types::BuildStats;
use crate::sync::WorkQueue;
use crate::utils::{Normalizer, TextNormalizer};
use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// File name patterns picked up when walking a directory
const TEXT_PATTERNS: &[&str] = &["*.txt", "*.text"];

fn text_globs() -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in TEXT_PATTERNS {
        builder.add(
            GlobBuilder::new(pattern)
                .case_insensitive(true)
                .literal_separator(true)
                .build()?,
        );
    }
    Ok(builder.build()?)
}

/// Collect the files to index under `root`.
///
/// A root that is itself a file is returned as is, whatever its extension.
/// Directories are walked recursively, following symlinks and ignoring
/// nothing, and only `*.txt` / `*.text` files (any case) are kept. The
/// result is sorted.
pub fn text_files(root: &Path) -> Result<Vec<PathBuf>> {
    let metadata = std::fs::metadata(root)
        .with_context(|| format!("Cannot access {}", root.display()))?;
    if metadata.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }

    let globs = text_globs()?;
    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(true)
        .build();

    let mut files: Vec<PathBuf> = walker
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!("skipping unreadable entry: {}", err);
                None
            }
        })
        .filter(|entry| entry.path().is_file())
        .filter(|entry| globs.is_match(entry.file_name()))
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    Ok(files)
}

/// Index one file into `index`, line by line, with positions continuing
/// across lines. The location is the path as given.
///
/// Returns the number of terms added.
pub fn index_file(
    path: &Path,
    normalizer: &dyn Normalizer,
    index: &mut InvertedIndex,
) -> Result<usize> {
    let location = path.to_string_lossy();
    let file = File::open(path).with_context(|| format!("Failed to open {}", location))?;
    let reader = BufReader::new(file);

    let mut position = 0;
    for line in reader.lines() {
        let line = line.with_context(|| format!("Failed to read {}", location))?;
        position = index.add_all(normalizer.normalize(&line), &location, position);
    }
    debug!(file = %location, terms = position, "indexed file");
    Ok(position)
}

/// Single-threaded builder writing straight into a borrowed index.
pub struct IndexBuilder<'a> {
    index: &'a mut InvertedIndex,
    normalizer: Arc<dyn Normalizer>,
}

impl<'a> IndexBuilder<'a> {
    pub fn new(index: &'a mut InvertedIndex) -> Self {
        Self {
            index,
            normalizer: Arc::new(TextNormalizer::new()),
        }
    }

    pub fn with_normalizer(mut self, normalizer: Arc<dyn Normalizer>) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Index every eligible file under `path`.
    ///
    /// Unreadable files are logged and counted, the rest of the build
    /// continues.
    pub fn build(&mut self, path: &Path) -> Result<BuildStats> {
        let files = text_files(path)?;
        let mut stats = BuildStats {
            files: files.len(),
            failed: 0,
        };

        for file in &files {
            // Build into a scratch index so a file failing halfway leaves
            // nothing behind.
            let mut shard = InvertedIndex::new();
            match index_file(file, self.normalizer.as_ref(), &mut shard) {
                Ok(_) => self.index.merge(shard),
                Err(err) => {
                    warn!("{:#}", err);
                    stats.failed += 1;
                }
            }
        }

        info!(files = stats.files, failed = stats.failed, "build complete");
        Ok(stats)
    }
}

/// Multithreaded builder: one task per file, each filling a private shard
/// and merging it into the shared index once.
#[derive(Clone)]
pub struct ConcurrentBuilder {
    index: Arc<ThreadSafeIndex>,
    queue: WorkQueue,
    normalizer: Arc<dyn Normalizer>,
}

impl ConcurrentBuilder {
    pub fn new(index: Arc<ThreadSafeIndex>, queue: WorkQueue) -> Self {
        Self {
            index,
            queue,
            normalizer: Arc::new(TextNormalizer::new()),
        }
    }

    pub fn with_normalizer(mut self, normalizer: Arc<dyn Normalizer>) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn index(&self) -> &Arc<ThreadSafeIndex> {
        &self.index
    }

    /// Index every eligible file under `path` and wait for all tasks.
    ///
    /// If the queue closes partway, files already queued are still waited
    /// for before the error is returned.
    pub fn build(&self, path: &Path) -> Result<BuildStats> {
        let files = text_files(path)?;
        let total = files.len();
        let failed = Arc::new(AtomicUsize::new(0));

        for file in files {
            let index = Arc::clone(&self.index);
            let normalizer = Arc::clone(&self.normalizer);
            let failed = Arc::clone(&failed);
            let submitted = self.queue.submit(move || {
                let mut shard = InvertedIndex::new();
                if let Err(err) = index_file(&file, normalizer.as_ref(), &mut shard) {
                    failed.fetch_add(1, Ordering::Relaxed);
                    return Err(err);
                }
                index.merge(shard);
                Ok(())
            });
            if let Err(err) = submitted {
                self.queue.await_idle();
                return Err(err).context("Failed to queue files for indexing");
            }
        }

        self.queue.await_idle();

        let stats = BuildStats {
            files: total,
            failed: failed.load(Ordering::Relaxed),
        };
        info!(files = stats.files, failed = stats.failed, "build complete");
        Ok(stats)
    }
}
