use anyhow::{Context, Result};
use clap::Parser;
use quarry::crawl::{HtmlFetcher, WebCrawler};
use quarry::index::{
    write_counts, write_index, ConcurrentBuilder, IndexBuilder, InvertedIndex, ThreadSafeIndex,
};
use quarry::output::print_results;
use quarry::query::{ConcurrentQueryEngine, QueryEngine, QueryProcessor};
use quarry::sync::WorkQueue;
use quarry::utils::progress::spinner;
use quarry::utils::AppConfig;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "quarry")]
#[command(about = "Build an inverted index from files or the web and run ranked queries")]
struct Cli {
    /// File or directory of .txt/.text files to index
    #[arg(long)]
    path: Option<PathBuf>,

    /// Seed URL to crawl (implies multithreading)
    #[arg(long)]
    url: Option<String>,

    /// Maximum number of pages to crawl
    #[arg(long)]
    limit: Option<usize>,

    /// Use worker threads; without a value (or 0) the configured default
    #[arg(long, num_args = 0..=1, default_missing_value = "0")]
    threads: Option<usize>,

    /// File of queries, one per line
    #[arg(long)]
    query: Option<PathBuf>,

    /// Match whole words only instead of prefixes
    #[arg(long)]
    exact: bool,

    /// Write the index as JSON
    #[arg(long, num_args = 0..=1, default_missing_value = "index.json")]
    index: Option<PathBuf>,

    /// Write per-location word counts as JSON
    #[arg(long, num_args = 0..=1, default_missing_value = "counts.json")]
    counts: Option<PathBuf>,

    /// Write query results as JSON instead of printing them
    #[arg(long, num_args = 0..=1, default_missing_value = "results.json")]
    results: Option<PathBuf>,

    /// Log progress information
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn multithreaded(&self) -> bool {
        self.threads.is_some() || self.url.is_some()
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Log a failed step; the run carries on with whatever was built.
fn report<T>(result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            error!("{:#}", err);
            None
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = AppConfig::load().unwrap_or_else(|err| {
        warn!("{:#}; using default configuration", err);
        AppConfig::default()
    });

    let start = Instant::now();
    if cli.multithreaded() {
        run_concurrent(&cli, &config)?;
    } else {
        run_single(&cli);
    }
    info!(elapsed = ?start.elapsed(), "finished");
    Ok(())
}

fn run_single(cli: &Cli) {
    let mut index = InvertedIndex::new();

    if let Some(path) = &cli.path {
        let progress = spinner(format!("Indexing {}", path.display()));
        let stats = report(
            IndexBuilder::new(&mut index)
                .build(path)
                .with_context(|| format!("Unable to build index from {}", path.display())),
        );
        match stats {
            Some(stats) => progress.finish_with_message(format!("Indexed {} files", stats.indexed())),
            None => progress.finish_and_clear(),
        }
    }

    write_outputs(cli, &index);

    let mut engine = QueryEngine::new(&index);
    run_queries(cli, &mut engine);
}

fn run_concurrent(cli: &Cli, config: &AppConfig) -> Result<()> {
    let threads = config.effective_threads(cli.threads);
    let queue = WorkQueue::new(threads).context("Failed to start worker threads")?;
    let index = Arc::new(ThreadSafeIndex::new());
    info!(threads, "multithreaded run");

    if let Some(path) = &cli.path {
        let progress = spinner(format!("Indexing {}", path.display()));
        let stats = report(
            ConcurrentBuilder::new(Arc::clone(&index), queue.clone())
                .build(path)
                .with_context(|| format!("Unable to build index from {}", path.display())),
        );
        match stats {
            Some(stats) => progress.finish_with_message(format!("Indexed {} files", stats.indexed())),
            None => progress.finish_and_clear(),
        }
    }

    if let Some(seed) = &cli.url {
        let limit = cli.limit.unwrap_or(config.crawl_limit);
        let fetcher =
            HtmlFetcher::new(&config.fetch_config()).context("Failed to create HTTP client")?;
        let crawler = WebCrawler::new(Arc::clone(&index), queue.clone(), limit, Arc::new(fetcher));

        let progress = spinner(format!("Crawling {}", seed));
        match report(crawler.crawl(seed)) {
            Some(stats) => progress.finish_with_message(format!(
                "Crawled {} pages ({} failed)",
                stats.indexed, stats.failed
            )),
            None => progress.finish_and_clear(),
        }
    }

    write_outputs(cli, &index.read());

    let mut engine = ConcurrentQueryEngine::new(Arc::clone(&index), queue.clone());
    run_queries(cli, &mut engine);

    queue.shutdown();
    Ok(())
}

fn write_outputs(cli: &Cli, index: &InvertedIndex) {
    if let Some(path) = &cli.index {
        report(write_index(index, path));
    }
    if let Some(path) = &cli.counts {
        report(write_counts(index, path));
    }
}

fn run_queries(cli: &Cli, engine: &mut dyn QueryProcessor) {
    if let Some(path) = &cli.query {
        report(engine.process_file(path, cli.exact));
    }

    match &cli.results {
        Some(path) => {
            report(engine.write(path));
        }
        None if cli.query.is_some() => {
            let color = std::io::stdout().is_terminal();
            report(print_results(&engine.results(), color).context("Failed to print results"));
        }
        None => {}
    }
}
